// CLASSIFICATION: COMMUNITY
// Filename: error.rs v0.4
// Author: Lukas Bower
// Date Modified: 2026-06-02

//! Error taxonomy shared by every mirror component.

use thiserror::Error;

/// Errors surfaced across the mirror's call boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MirrorError {
    /// Malformed caller input. Fatal to the current call, never retried.
    #[error("invalid parameters: {0}")]
    InvalidParams(&'static str),

    /// The requested entity, record, or log entry does not exist.
    #[error("requested item is not present")]
    NotPresent,

    /// Transport or hardware failure: timeout, malformed response,
    /// session rejection. Retried at the next poll cycle, never
    /// converted into a cache mutation.
    #[error("protocol failure: {0}")]
    Protocol(String),

    /// Hardware or local capacity exhausted. Aborts the remainder of the
    /// current multi-step operation.
    #[error("out of space")]
    OutOfSpace,

    /// Invariant violation inside the mirror itself.
    #[error("internal error: {0}")]
    Internal(String),

    /// A handle's state lock was poisoned by a panicking holder.
    #[error("handle state lock poisoned")]
    LockPoisoned,
}

impl MirrorError {
    /// Whether a per-item failure must abort the rest of a multi-item
    /// operation. Anything else is logged and skipped.
    pub fn aborts_batch(&self) -> bool {
        matches!(
            self,
            MirrorError::InvalidParams(_) | MirrorError::OutOfSpace
        )
    }
}

pub type MirrorResult<T> = Result<T, MirrorError>;
