//! The flow-table engine. Ported from Indigo `OFStateManager`'s
//! `ft_public_s` struct and the `ft_hash_flow_add`/`ft_hash_flow_delete`/
//! `ft_flow_first_match`/`ft_flow_query` family in `ft.c`.

use tracing::debug;

use crate::config::FtConfig;
use crate::effects::Effects;
use crate::entry::{AddMessage, FlowEntry, FlowState, RemovedReason, INVALID_ID, NO_SLOT};
use crate::error::{FtError, FtResult};
use crate::hashindex::HashIndex;
use crate::match_header::FlowMatch;
use crate::meta_match::{meta_match, MatchMode, MetaMatch};
use crate::scheduler::{IterScheduler, IterTask};
use crate::stats::FtStatus;

/// Handle to an installed entry: the slot's index in the fixed pool. Stable
/// for the entry's lifetime; invalid after `delete` (the slot may be
/// reused by a later `add`) — callers must not hold a handle across a
/// mutation the way the source's entry pointers must not outlive a
/// `ft_entry_free`.
pub type EntryHandle = usize;

/// Owns the fixed entry pool, the free-list, the all-entries list, and the
/// three hash indexes, mirroring `ft_public_s`'s fields in `ft.h`.
pub struct FlowTableEngine {
    config: FtConfig,
    status: FtStatus,
    pool: Vec<FlowEntry>,
    free_head: usize,
    list_head: usize,
    list_tail: usize,
    id_index: HashIndex<u64, usize>,
    priority_index: HashIndex<u16, usize>,
    match_index: HashIndex<FlowMatch, usize>,
}

impl FlowTableEngine {
    /// `config.max_entries` must be `> 0`. Allocates the fixed pool (every
    /// slot starts FREE, chained onto the free-list) and three empty
    /// indexes. No default size.
    pub fn create(config: FtConfig) -> FtResult<Self> {
        if config.max_entries == 0 {
            return Err(FtError::Resource("max_entries must be > 0"));
        }

        let n = config.max_entries;
        let mut pool: Vec<FlowEntry> = (0..n).map(|_| FlowEntry::free()).collect();
        for i in 0..n {
            pool[i].free_next = if i + 1 < n { i + 1 } else { NO_SLOT };
        }

        debug!(max_entries = n, "flow table engine created");

        Ok(Self {
            id_index: HashIndex::new(config.id_index_load_factor),
            priority_index: HashIndex::new(config.priority_index_load_factor),
            match_index: HashIndex::new(config.match_index_load_factor),
            config,
            status: FtStatus::default(),
            pool,
            free_head: 0,
            list_head: NO_SLOT,
            list_tail: NO_SLOT,
        })
    }

    pub fn config(&self) -> &FtConfig {
        &self.config
    }

    pub fn status(&self) -> FtStatus {
        self.status
    }

    pub fn entry(&self, handle: EntryHandle) -> &FlowEntry {
        &self.pool[handle]
    }

    /// Install a new entry under `id`, mirroring `ft_hash_flow_add`: pop a
    /// free slot, populate it from `msg`, link it into the all-entries list
    /// and the three indexes.
    pub fn add(&mut self, id: u64, msg: AddMessage) -> FtResult<EntryHandle> {
        if self.id_index.lookup_one(&id).is_some() {
            return Err(FtError::Exists);
        }

        let slot = self.free_head;
        if slot == NO_SLOT {
            self.status.on_table_full();
            return Err(FtError::Resource("flow table full"));
        }

        let output_ports = msg.effects.output_ports();
        self.free_head = self.pool[slot].free_next;

        let entry = &mut self.pool[slot];
        entry.id = id;
        entry.table_id = msg.table_id;
        entry.flow_match = msg.flow_match;
        entry.priority = msg.priority;
        entry.cookie = msg.cookie;
        entry.flags = msg.flags;
        entry.idle_timeout = msg.idle_timeout;
        entry.hard_timeout = msg.hard_timeout;
        entry.effects = msg.effects;
        entry.output_ports = output_ports;
        entry.state = FlowState::New;
        entry.removed_reason = None;

        self.link_all_entries(slot);
        self.id_index.insert(id, slot);
        self.priority_index.insert(self.pool[slot].priority, slot);
        self.match_index.insert(self.pool[slot].flow_match, slot);

        self.status.on_add();
        debug!(id, slot, "entry added");
        Ok(slot)
    }

    /// Unlink, release, and free the slot at `handle`, mirroring
    /// `ft_hash_flow_delete`.
    pub fn delete(&mut self, handle: EntryHandle) -> FtResult<()> {
        if self.pool[handle].id == INVALID_ID {
            return Err(FtError::Unknown("delete on already-invalid entry"));
        }

        let id = self.pool[handle].id;
        let priority = self.pool[handle].priority;
        let flow_match = self.pool[handle].flow_match;
        let was_pending = self.pool[handle].state == FlowState::DeleteMarked;

        self.id_index.remove(&id, &handle);
        self.priority_index.remove(&priority, &handle);
        self.match_index.remove(&flow_match, &handle);
        self.unlink_all_entries(handle);

        self.pool[handle].clear();
        self.pool[handle].free_next = self.free_head;
        self.free_head = handle;

        self.status.on_delete(was_pending);
        debug!(id, handle, "entry deleted");
        Ok(())
    }

    /// Look up by id and delegate to [`FlowTableEngine::delete`].
    pub fn delete_id(&mut self, id: u64) -> FtResult<()> {
        let handle = *self.id_index.lookup_one(&id).ok_or(FtError::NotFound)?;
        self.delete(handle)
    }

    /// Direct id-index probe. Does *not* skip DELETE_MARKED entries,
    /// matching `ft_id_lookup` — so that an id-based delete can still reach
    /// an entry already hidden from match-based queries.
    pub fn lookup(&self, id: u64) -> Option<&FlowEntry> {
        self.id_index.lookup_one(&id).map(|&slot| &self.pool[slot])
    }

    /// Replace `effects` (and the derived `output_ports`), mirroring
    /// `ft_flow_set_effects`. Does not touch state/id/match/priority/
    /// timeouts/cookie.
    pub fn modify_effects(&mut self, handle: EntryHandle, effects: Effects) -> FtResult<()> {
        let output_ports = effects.output_ports();
        let entry = &mut self.pool[handle];
        entry.effects = effects;
        entry.output_ports = output_ports;
        self.status.on_update();
        Ok(())
    }

    /// `entry.cookie ← (entry.cookie & mask) | (new_cookie & mask)`. Total.
    pub fn modify_cookie(&mut self, handle: EntryHandle, new_cookie: u64, mask: u64) {
        let entry = &mut self.pool[handle];
        entry.cookie = (entry.cookie & mask) | (new_cookie & mask);
    }

    /// Export and zero the packet/byte counters.
    pub fn clear_counters(&mut self, handle: EntryHandle) -> (u64, u64) {
        let entry = &mut self.pool[handle];
        let counters = entry.counters;
        entry.counters = Default::default();
        (counters.packets, counters.bytes)
    }

    /// Mark `handle` DELETE_MARKED. Idempotent.
    pub fn mark_deleted(&mut self, handle: EntryHandle, reason: RemovedReason) {
        let entry = &mut self.pool[handle];
        if entry.state == FlowState::DeleteMarked {
            return;
        }
        entry.state = FlowState::DeleteMarked;
        entry.removed_reason = Some(reason);
        self.status.on_mark_deleted(reason);
    }

    /// Dispatch by query mode, mirroring `ft_flow_first_match`/
    /// `ft_flow_query`: STRICT probes the match index; otherwise a
    /// priority-check probes the priority index; otherwise a full linear
    /// scan of the all-entries list. Returns the first non-deleted entry
    /// whose meta-match predicate holds.
    pub fn first_match(&self, query: &MetaMatch) -> FtResult<EntryHandle> {
        self.dispatch(query, true).first().copied().ok_or(FtError::NotFound)
    }

    /// Same dispatch as [`FlowTableEngine::first_match`], but collects every
    /// matching entry. An empty result is not an error.
    pub fn query(&self, query: &MetaMatch) -> Vec<EntryHandle> {
        self.dispatch(query, false)
    }

    fn dispatch(&self, query: &MetaMatch, stop_at_first: bool) -> Vec<EntryHandle> {
        let mut out = Vec::new();

        if query.mode == MatchMode::Strict {
            let mut state = 0usize;
            while let Some(&slot) = self.match_index.lookup(&query.flow_match, &mut state) {
                if meta_match(query, &self.pool[slot]) {
                    out.push(slot);
                    if stop_at_first {
                        return out;
                    }
                }
            }
            return out;
        }

        if query.check_priority {
            let mut state = 0usize;
            while let Some(&slot) = self.priority_index.lookup(&query.priority, &mut state) {
                if meta_match(query, &self.pool[slot]) {
                    out.push(slot);
                    if stop_at_first {
                        return out;
                    }
                }
            }
            return out;
        }

        let mut cursor = self.list_head;
        while cursor != NO_SLOT {
            if meta_match(query, &self.pool[cursor]) {
                out.push(cursor);
                if stop_at_first {
                    return out;
                }
            }
            cursor = self.pool[cursor].list_next;
        }
        out
    }

    /// Build a cooperative iterator task over the entry pool and register it
    /// with `scheduler` at `priority`, mirroring `ft_spawn_iter_task`'s call
    /// to `ind_soc_task_register`. The task itself does not touch the three
    /// indexes, so cursor resumption is O(1); it is the scheduler's job to
    /// pop the registered task back out and drive it forward with
    /// [`FlowTableEngine::drive_iter_task`].
    pub fn spawn_iter_task(
        &self,
        cookie: u64,
        filter: Option<MetaMatch>,
        priority: i32,
        scheduler: &mut impl IterScheduler,
    ) -> FtResult<()> {
        let task = IterTask::new(cookie, filter);
        scheduler.register(task, priority)
    }

    /// Drive one task's dispatch against this engine's pool.
    pub fn drive_iter_task(
        &self,
        task: &mut IterTask,
        should_yield: &dyn Fn() -> bool,
        callback: impl FnMut(u64, Option<&FlowEntry>),
    ) -> crate::scheduler::TaskStatus {
        task.dispatch(&self.pool, should_yield, callback)
    }

    fn link_all_entries(&mut self, slot: usize) {
        self.pool[slot].list_prev = NO_SLOT;
        self.pool[slot].list_next = self.list_head;
        if self.list_head != NO_SLOT {
            self.pool[self.list_head].list_prev = slot;
        }
        self.list_head = slot;
        if self.list_tail == NO_SLOT {
            self.list_tail = slot;
        }
    }

    fn unlink_all_entries(&mut self, slot: usize) {
        let prev = self.pool[slot].list_prev;
        let next = self.pool[slot].list_next;
        if prev != NO_SLOT {
            self.pool[prev].list_next = next;
        } else {
            self.list_head = next;
        }
        if next != NO_SLOT {
            self.pool[next].list_prev = prev;
        } else {
            self.list_tail = prev;
        }
        self.pool[slot].list_prev = NO_SLOT;
        self.pool[slot].list_next = NO_SLOT;
    }

    /// Iterate all live (non-FREE) entries, deleting each in turn, mirroring
    /// `ft_hash_delete`'s teardown walk. Rust's ownership model frees the
    /// pool and indexes automatically once `self` is dropped; this only
    /// runs the per-entry teardown the source performs eagerly.
    pub fn destroy(mut self) {
        while self.list_head != NO_SLOT {
            let slot = self.list_head;
            // Ignore the error: `list_head` always names a live slot here.
            let _ = self.delete(slot);
        }
        debug!("flow table engine destroyed");
    }
}
