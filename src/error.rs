//! Error taxonomy for the memory core.
//!
//! Every fallible operation in the crate returns [`CoreError`]. Callers can
//! distinguish "no data" (empty results, `Ok`) from "operation failed" (a typed
//! error) — an empty memory store is never reported as a failure.

use thiserror::Error;

/// Typed errors surfaced by the memory and context engine.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No live record with the given id.
    #[error("memory not found: {0}")]
    NotFound(u64),

    /// Insertion could not make room (e.g. configured capacity is zero).
    #[error("cannot make room for insertion: {0}")]
    Capacity(String),

    /// An embedding did not match the store's configured dimension.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// An external port call (embedding, generation) exceeded its timeout.
    #[error("external call timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Input validation failed (out-of-range importance, unknown memory type, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A port implementation reported a failure of its own.
    #[error("port error: {0}")]
    Port(#[from] anyhow::Error),
}

impl CoreError {
    /// True for timeout/connection-class failures that abort a reasoning run.
    pub fn is_fatal_for_reasoning(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
