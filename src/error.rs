//! Error types for the flow table core.

use thiserror::Error;

/// Flow table error type.
///
/// There is no `NONE` variant: success is `Ok(())` / `Ok(value)`. The variant
/// set mirrors the `ft_error_t` taxonomy in the Indigo `OFStateManager` flow
/// table this design is ported from (`EXISTS`, `NOT_FOUND`, `RESOURCE`,
/// `UNKNOWN`), in the flat `thiserror` enum style of `sase-common::error::SaseError`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FtError {
    /// Duplicate flow id on `add`.
    #[error("flow id already exists")]
    Exists,

    /// Id or matching rule absent (`delete_id`, `first_match`). An empty
    /// `query()` result is not an error.
    #[error("flow not found")]
    NotFound,

    /// No free slot, allocation failure, or protocol-object extraction failure.
    #[error("resource exhausted: {0}")]
    Resource(&'static str),

    /// Internal inconsistency that a well-behaved caller should treat as
    /// fatal to the current message (match extraction failed, double-delete).
    #[error("internal inconsistency: {0}")]
    Unknown(&'static str),
}

/// Result type for the flow table core.
pub type FtResult<T> = Result<T, FtError>;
