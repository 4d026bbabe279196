//! Flow entry record and lifecycle state, ported from `ft_instance_t` and
//! the entry fields in `ft.h`.

use bitflags::bitflags;

use crate::effects::{Effects, PortNo};
use crate::match_header::FlowMatch;

/// Sentinel used for both `id` on a FREE slot and for `prev`/`next` list
/// links that point at nothing, mirroring the source's `INVALID_ID`/NULL
/// pointer convention with a plain index.
pub const INVALID_ID: u64 = u64::MAX;

/// No slot, used for all-entries list links at the ends of the list and for
/// free-list links on the last free slot.
pub const NO_SLOT: usize = usize::MAX;

/// Table id wildcard, matching `query.table_id == ANY` in `ft_flow_meta_match`.
pub const TABLE_ID_ANY: u8 = u8::MAX;

bitflags! {
    /// Flow-mod flags copied from the add message. Bit meanings follow the
    /// OpenFlow 1.0 `ofp_flow_mod_flags` this design is distilled from.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FlowModFlags: u16 {
        /// Send a flow-removed message when this entry expires or is deleted.
        const SEND_FLOW_REM = 0x0001;
        /// Check for overlapping entries when adding (checked by the caller
        /// before `add`; the engine does not enforce it itself).
        const CHECK_OVERLAP = 0x0002;
        /// Reset packet/byte counters on `modify_effects`.
        const RESET_COUNTS = 0x0004;
    }
}

/// Lifecycle state of a flow entry slot, mirroring the FREE/New/DELETE_MARKED
/// states `ft_instance_t.state` cycles through in `ft.c`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    /// Not installed; reachable only from the free-list.
    Free,
    /// Installed and visible to lookup/query/iteration.
    New,
    /// Installed, still linked and indexed, invisible to match-based
    /// queries and the iterator task, matching `ft_flow_mark_deleted`.
    /// `lookup(id)` still reaches it — see [`crate::engine::FlowTableEngine::lookup`].
    DeleteMarked,
}

/// Why an entry transitioned to [`FlowState::DeleteMarked`], surfaced to an
/// upstream flow-removed notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovedReason {
    IdleTimeout,
    HardTimeout,
    Delete,
    GroupDelete,
}

/// Packet/byte counters, mutated externally by the forwarding layer and
/// exported/zeroed by `clear_counters`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub packets: u64,
    pub bytes: u64,
}

/// One installed rule, the field-for-field Rust counterpart of
/// `ft_instance_t` in `ft.h`; the engine in `src/engine.rs` is the only
/// code that mutates these fields.
#[derive(Debug, Clone)]
pub struct FlowEntry {
    pub id: u64,
    pub table_id: u8,
    pub flow_match: FlowMatch,
    pub priority: u16,
    pub cookie: u64,
    pub flags: FlowModFlags,
    pub idle_timeout: u16,
    pub hard_timeout: u16,
    pub effects: Effects,
    pub output_ports: Vec<PortNo>,
    pub counters: Counters,
    pub insert_time: u64,
    pub last_counter_change: u64,
    pub state: FlowState,
    pub removed_reason: Option<RemovedReason>,

    /// Opaque to the engine, same as `ft_instance_t`'s pending-request
    /// list. Modeled as a plain counter of outstanding requests since
    /// nothing in this core inspects its contents.
    pub queued_reqs: u32,

    /// Intrusive all-entries doubly-linked list, by slot index rather than
    /// pointer — see DESIGN.md's note on `ft_entry_link`/`ft_entry_unlink`.
    pub(crate) list_prev: usize,
    pub(crate) list_next: usize,
    /// Free-list singly-linked chain, by slot index.
    pub(crate) free_next: usize,
}

impl FlowEntry {
    /// A freed slot: zeroed per the invariant "If state=FREE then id=invalid
    /// and all owned payloads are released."
    pub(crate) fn free() -> Self {
        Self {
            id: INVALID_ID,
            table_id: TABLE_ID_ANY,
            flow_match: FlowMatch::any(),
            priority: 0,
            cookie: 0,
            flags: FlowModFlags::empty(),
            idle_timeout: 0,
            hard_timeout: 0,
            effects: Effects::Actions(Vec::new()),
            output_ports: Vec::new(),
            counters: Counters::default(),
            insert_time: 0,
            last_counter_change: 0,
            state: FlowState::Free,
            removed_reason: None,
            queued_reqs: 0,
            list_prev: NO_SLOT,
            list_next: NO_SLOT,
            free_next: NO_SLOT,
        }
    }

    /// Release owned payloads and reset to FREE. Does not touch list/index
    /// linkage; the engine unlinks before calling this, matching
    /// `ft_entry_clear`.
    pub(crate) fn clear(&mut self) {
        *self = Self::free();
    }
}

/// Parameters for installing a new entry, the engine's counterpart of an
/// `of_flow_add` message: a deep duplicate, owned by the new entry, same as
/// `ft_entry_setup` copies out of the incoming message rather than borrowing
/// it.
#[derive(Debug, Clone)]
pub struct AddMessage {
    pub table_id: u8,
    pub flow_match: FlowMatch,
    pub priority: u16,
    pub cookie: u64,
    pub flags: FlowModFlags,
    pub idle_timeout: u16,
    pub hard_timeout: u16,
    pub effects: Effects,
}
