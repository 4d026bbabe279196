//! Host scheduler contract and the incremental iterator task. Ported from
//! `ft_spawn_iter_task`/`ft_iter_task_callback` and the `ft_iter_task_state`
//! struct in `ft.c`.

use crate::entry::FlowEntry;
use crate::error::FtResult;
use crate::meta_match::{meta_match, MetaMatch};

/// Outcome of invoking the callback once: either there's more to visit, or
/// this was the terminal null-entry sentinel call and the task is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Continue,
    Finished,
}

/// The host scheduler contract `ind_soc_task_register`/the socket manager's
/// yield check stand in for. Named as a trait in the same style
/// `sase-dataplane::pipeline::Stage` names its transform seam.
pub trait IterScheduler {
    /// Enqueue `task` at `priority`. The scheduler owns driving it forward
    /// via repeated calls to [`IterTask::dispatch`]; this crate does not
    /// assume anything about how that driving happens.
    fn register(&mut self, task: IterTask, priority: i32) -> FtResult<()>;

    /// True if the currently-running task should return control now.
    fn should_yield(&self) -> bool;
}

/// The explicit, scheduler-moved state object for one incremental traversal.
/// Unlike the source's callback-pointer style, this is a plain state object
/// the scheduler stores and drives forward by repeated calls, not a closure.
pub struct IterTask {
    cookie: u64,
    filter: Option<MetaMatch>,
    cursor: usize,
    finished: bool,
}

impl IterTask {
    pub(crate) fn new(cookie: u64, filter: Option<MetaMatch>) -> Self {
        Self {
            cookie,
            filter,
            cursor: 0,
            finished: false,
        }
    }

    pub fn cookie(&self) -> u64 {
        self.cookie
    }

    /// Process slots from the cursor forward, invoking `callback(cookie,
    /// Some(entry))` for each visible match and `callback(cookie, None)`
    /// once as the end-sentinel when the traversal completes. Stops and
    /// returns [`TaskStatus::Continue`] the moment `should_yield` answers
    /// true, resuming from the same cursor on the next call.
    ///
    /// `slots` is the engine's full entry pool; this never touches the
    /// three indexes, matching `ft_iter_task_callback`'s plain slot-array
    /// sweep — the reason cursor resumption is O(1) rather than a re-probe.
    pub fn dispatch<F: FnMut(u64, Option<&FlowEntry>)>(
        &mut self,
        slots: &[FlowEntry],
        should_yield: &dyn Fn() -> bool,
        mut callback: F,
    ) -> TaskStatus {
        if self.finished {
            return TaskStatus::Finished;
        }

        while self.cursor < slots.len() {
            let entry = &slots[self.cursor];
            self.cursor += 1;

            if matches!(entry.state, crate::entry::FlowState::Free)
                || matches!(entry.state, crate::entry::FlowState::DeleteMarked)
            {
                continue;
            }

            if let Some(filter) = &self.filter {
                if !meta_match(filter, entry) {
                    continue;
                }
            }

            callback(self.cookie, Some(entry));

            if should_yield() {
                return TaskStatus::Continue;
            }
        }

        callback(self.cookie, None);
        self.finished = true;
        TaskStatus::Finished
    }
}

/// A minimal FIFO test double for [`IterScheduler`], driven explicitly by
/// the test rather than by a real event loop. Mirrors the pattern of
/// in-crate test doubles the pack uses for trait seams it cannot otherwise
/// exercise deterministically.
#[cfg(test)]
pub(crate) struct QueueScheduler {
    pub(crate) pending: Vec<(IterTask, i32)>,
    pub(crate) yield_every: usize,
    pub(crate) calls_since_yield: std::cell::Cell<usize>,
}

#[cfg(test)]
impl QueueScheduler {
    pub(crate) fn new(yield_every: usize) -> Self {
        Self {
            pending: Vec::new(),
            yield_every,
            calls_since_yield: std::cell::Cell::new(0),
        }
    }
}

#[cfg(test)]
impl IterScheduler for QueueScheduler {
    fn register(&mut self, task: IterTask, priority: i32) -> FtResult<()> {
        self.pending.push((task, priority));
        Ok(())
    }

    fn should_yield(&self) -> bool {
        let n = self.calls_since_yield.get() + 1;
        if n >= self.yield_every {
            self.calls_since_yield.set(0);
            true
        } else {
            self.calls_since_yield.set(n);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{FlowEntry, FlowState};

    fn live_entry() -> FlowEntry {
        let mut e = FlowEntry::free();
        e.state = FlowState::New;
        e
    }

    #[test]
    fn iteration_visits_all_slots_and_yields_on_schedule() {
        let slots: Vec<FlowEntry> = (0..1000).map(|_| live_entry()).collect();
        let mut task = IterTask::new(42, None);
        let scheduler = QueueScheduler::new(17);

        let mut visited = 0usize;
        let mut saw_sentinel = false;
        let mut yields = 0usize;

        loop {
            let status = task.dispatch(
                &slots,
                &|| scheduler.should_yield(),
                |cookie, entry| {
                    assert_eq!(cookie, 42);
                    match entry {
                        Some(_) => visited += 1,
                        None => saw_sentinel = true,
                    }
                },
            );
            match status {
                TaskStatus::Continue => yields += 1,
                TaskStatus::Finished => break,
            }
        }

        assert_eq!(visited, 1000);
        assert!(saw_sentinel);
        assert!(yields > 0);
    }

    #[test]
    fn skips_free_and_delete_marked_slots() {
        let mut slots = vec![live_entry(), live_entry(), live_entry()];
        slots[0].state = FlowState::Free;
        slots[1].state = FlowState::DeleteMarked;

        let mut task = IterTask::new(0, None);
        let mut visited = 0usize;
        task.dispatch(&slots, &|| false, |_, entry| {
            if entry.is_some() {
                visited += 1;
            }
        });
        assert_eq!(visited, 1);
    }
}
