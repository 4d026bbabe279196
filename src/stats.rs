//! Status counters exposed to observers. Named and shaped after
//! `ft_status_t` in `ft.h`, in the plain-struct style of
//! `sase-dataplane::stats::CoreStats` (there built from atomics for a
//! concurrent data plane; here plain fields since this engine is
//! single-threaded).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FtStatus {
    pub current_count: usize,
    pub pending_deletes: usize,
    pub adds: u64,
    pub deletes: u64,
    pub hard_expires: u64,
    pub idle_expires: u64,
    pub updates: u64,
    pub table_full_errors: u64,
    pub forwarding_add_errors: u64,
}

impl FtStatus {
    pub(crate) fn on_add(&mut self) {
        self.current_count += 1;
        self.adds += 1;
    }

    pub(crate) fn on_delete(&mut self, was_pending: bool) {
        self.current_count -= 1;
        if was_pending {
            self.pending_deletes -= 1;
        }
        self.deletes += 1;
    }

    pub(crate) fn on_mark_deleted(&mut self, reason: crate::entry::RemovedReason) {
        self.pending_deletes += 1;
        match reason {
            crate::entry::RemovedReason::HardTimeout => self.hard_expires += 1,
            crate::entry::RemovedReason::IdleTimeout => self.idle_expires += 1,
            _ => {}
        }
    }

    pub(crate) fn on_update(&mut self) {
        self.updates += 1;
    }

    pub(crate) fn on_table_full(&mut self) {
        self.table_full_errors += 1;
    }
}
