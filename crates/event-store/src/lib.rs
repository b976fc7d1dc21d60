//! Transactional, append-only event storage.
//!
//! The command bus owns the transaction boundary; implementations of
//! [`EventStore`] own durability and ordering of what gets committed.

pub mod error;
pub mod event;
pub mod memory;
pub mod store;

pub use error::{EventStoreError, Result};
pub use event::{AggregateId, EventEnvelope, EventId, Version};
pub use memory::InMemoryEventStore;
pub use store::{EventHistory, EventStore, validate_batch};
