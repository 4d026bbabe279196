//! In-memory flow table core for a single-threaded SDN control agent.
//!
//! Two pieces, specified and tested together:
//!
//! - [`hashindex`]: an open-addressed robin-hood hashtable, the generic
//!   structure behind the engine's three secondary indexes.
//! - [`engine`]: the flow-table engine proper — a fixed entry pool, a
//!   free-list, an all-entries list, and the three hash indexes, exposing
//!   add/delete/modify/lookup/query/first-match/mark-deleted plus an
//!   incremental iterator task that cooperates with a host scheduler.
//!
//! This crate has no network or on-disk I/O, no CLI, and assumes a single
//! thread owns the engine end to end — see `FlowTableEngine`'s docs for the
//! ownership and borrowing rules callers must follow.

pub mod config;
pub mod effects;
pub mod engine;
pub mod entry;
pub mod error;
pub mod hashindex;
pub mod hashing;
pub mod match_header;
pub mod meta_match;
pub mod scheduler;
pub mod stats;

pub use config::FtConfig;
pub use effects::{Action, Effects, Instruction, PortNo, PORT_WILDCARD};
pub use engine::{EntryHandle, FlowTableEngine};
pub use entry::{AddMessage, Counters, FlowEntry, FlowModFlags, FlowState, RemovedReason};
pub use error::{FtError, FtResult};
pub use match_header::{FlowMatch, MATCH_LEN};
pub use meta_match::{meta_match, MatchMode, MetaMatch};
pub use scheduler::{IterScheduler, IterTask, TaskStatus};
pub use stats::FtStatus;

/// Test-only logging setup, used by tests that want to see `tracing` output
/// on failure. No binary in this crate owns a subscriber, so tests install
/// their own rather than relying on one from `main`.
#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Once;

    static INIT: Once = Once::new();

    /// Install a `tracing-subscriber` `fmt` subscriber driven by `RUST_LOG`,
    /// once per test binary. Safe to call from every test that wants logs;
    /// later calls are no-ops.
    pub(crate) fn init_tracing() {
        INIT.call_once(|| {
            tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .with_test_writer()
                .init();
        });
    }
}
