//! Typed errors surfaced by the collision engine.
//!
//! Kept separate from [`crate::known_names::CollaboratorError`] and
//! [`crate::address_dump::CollaboratorError`]: the engine never touches a
//! filesystem or a JSON document, so its error set is purely about campaign
//! configuration and runtime failure.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// `batch_size`/`lookup_size` above 2^32, or any other configuration the
    /// engine can reject before touching a worker thread.
    #[error("invalid campaign configuration: {reason}")]
    InvalidConfiguration { reason: String },

    #[error("{targets} targets exceed the configured lookup_size of {lookup_size}")]
    LookupCapacityExceeded { targets: u64, lookup_size: u64 },

    #[error("campaign was cancelled before completion")]
    Cancelled,

    #[error("a worker thread panicked; campaign results are discarded")]
    WorkerFault,
}
