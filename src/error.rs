//! Core error types.
//!
//! Errors that arise inside the transactional substrate itself (as opposed to
//! errors raised by a collaborator such as a processor or a store) are
//! represented by [`CoreError`]. Collaborator errors are carried as
//! `anyhow::Error` payloads on [`crate::core::response::Response`] and never
//! converted into `CoreError` variants, since the core has no business
//! knowing what kind of error a processor or a store produced.

use thiserror::Error;

/// Result alias for fallible core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised directly by the transactional substrate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// `start_receiving` was called a second time on the same stage.
    #[error("stage already started")]
    AlreadyStarted,

    /// `wait_for_close` expired before the stage's worker terminated.
    #[error("timed out waiting for close")]
    Timeout,

    /// A store operation was attempted after the store was closed.
    #[error("store is closed")]
    TypeClosed,

    /// A store rejected a push outright because its byte bound was
    /// exceeded. Part of the store contract for a store that bounds
    /// capacity by rejecting overflow; [`crate::buffer::MemoryStore`]
    /// instead blocks `push_message` until space frees up, so it never
    /// constructs this variant.
    #[error("buffer bound exceeded: requested {requested} bytes, {available} available")]
    BoundExceeded { requested: usize, available: usize },

    /// A configured processor, condition, or stage type is unknown.
    #[error("invalid type: {0}")]
    InvalidType(String),
}
