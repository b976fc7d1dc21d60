use thiserror::Error;

use crate::{AggregateId, Version};

/// Errors raised by event store collaborators.
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// The staged events do not follow the committed history of an aggregate.
    #[error(
        "Concurrency conflict for aggregate {aggregate_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        aggregate_id: AggregateId,
        expected: Version,
        actual: Version,
    },

    /// `add` or `commit` was called outside of a transaction.
    #[error("No active transaction")]
    NoActiveTransaction,

    /// The staged batch is malformed.
    #[error("Invalid batch: {0}")]
    InvalidBatch(String),

    /// A lock guarding the store was poisoned by a panicking writer.
    #[error("Event store lock poisoned")]
    Poisoned,

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for event store operations.
pub type Result<T> = std::result::Result<T, EventStoreError>;
