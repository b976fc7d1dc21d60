//! Error types.

use event_store::{AggregateId, EventStoreError};
use thiserror::Error;

/// Errors raised while applying, replaying or draining events.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// The aggregate type registered no handler for this event kind.
    #[error("No handler for event {event_type} on aggregate {aggregate_type}")]
    HandlerNotFound {
        aggregate_type: &'static str,
        event_type: &'static str,
    },

    /// The handler registered for a kind could not read the event's payload.
    #[error("Handler for {event_type} on {aggregate_type} received a different payload")]
    PayloadMismatch {
        aggregate_type: &'static str,
        event_type: &'static str,
    },

    /// The aggregate has no identity yet, so it cannot be tracked or published.
    #[error("Aggregate {aggregate_type} has no identity")]
    MissingIdentity { aggregate_type: &'static str },

    /// The identity map already holds an instance with this identity.
    #[error("Aggregate {aggregate_type} {aggregate_id} is already tracked")]
    AlreadyTracked {
        aggregate_type: &'static str,
        aggregate_id: AggregateId,
    },

    /// A tracked entry is not of the requested aggregate type.
    #[error("Tracked aggregate is not a {aggregate_type}")]
    TypeMismatch { aggregate_type: &'static str },

    #[error("Failed to encode {event_type} for {aggregate_type}: {source}")]
    Encode {
        aggregate_type: &'static str,
        event_type: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to decode {event_type} for {aggregate_type}: {source}")]
    Decode {
        aggregate_type: &'static str,
        event_type: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors raised by the command bus itself.
///
/// Handler errors never pass through this type: the bus returns them as the
/// handler produced them. Resolver error types embed `BusError` through
/// `From` so infrastructure failures share the same return channel.
#[derive(Debug, Error)]
pub enum BusError {
    /// No handler is registered for the command kind.
    #[error("No handler registered for command {command_type}")]
    HandlerResolution { command_type: &'static str },

    /// A handler was registered twice for the same command kind.
    #[error("Handler already registered for command {command_type}")]
    DuplicateHandler { command_type: &'static str },

    /// A resolved handler was given a command of another kind.
    #[error("Handler for {expected} received a different command")]
    CommandMismatch { expected: &'static str },

    #[error(transparent)]
    Store(#[from] EventStoreError),

    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

/// Errors raised while loading aggregates from committed history.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Aggregate not found: {aggregate_type} with id {aggregate_id}")]
    NotFound {
        aggregate_type: &'static str,
        aggregate_id: AggregateId,
    },

    #[error(transparent)]
    Store(#[from] EventStoreError),

    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}
