//! Event-sourcing coordination core.
//!
//! - [`AggregateRoot`]: state that changes only by applying domain events,
//!   with a buffer of events applied since the last drain
//! - [`EventHandlers`]: per-aggregate-type dispatch table from event kind to
//!   handler
//! - [`IdentityMap`] / [`AggregateMap`]: aggregates touched by one command
//! - [`CommandBus`]: resolves a handler, runs it inside a store transaction
//!   and publishes the drained events, or rolls everything back

pub mod aggregate;
pub mod bus;
pub mod command;
pub mod error;
pub mod handlers;
pub mod identity_map;
pub mod repository;
pub mod resolver;

pub use aggregate::{AggregateRoot, DomainEvent, EventPayload, PendingEvents};
pub use bus::{CommandBus, UnitOfWorkState};
pub use command::{Command, CommandType, handler_name};
pub use error::{AggregateError, BusError, RepositoryError};
pub use handlers::EventHandlers;
pub use identity_map::{AggregateMap, EventSource, IdentityMap};
pub use repository::Repository;
pub use resolver::{
    BoxedCommand, CommandHandler, DynCommandHandler, HandlerRegistry, HandlerResolver,
    SharedHandler,
};

pub use event_store::{AggregateId, EventEnvelope, EventStore, EventStoreError, Version};

#[cfg(test)]
pub(crate) mod testing;
