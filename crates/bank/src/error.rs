//! Bank error types.

use cqrs::{AggregateError, BusError, RepositoryError};
use event_store::EventStoreError;
use thiserror::Error;

use crate::account::AccountError;

/// Errors returned by bank command handlers and queries.
#[derive(Debug, Error)]
pub enum BankError {
    /// A business rule rejected the command.
    #[error("Account error: {0}")]
    Account(#[from] AccountError),

    #[error("Command bus error: {0}")]
    Bus(#[from] BusError),

    #[error("Aggregate error: {0}")]
    Aggregate(#[from] AggregateError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),
}

impl BankError {
    /// Returns true if the error is a rejected business rule rather than an
    /// infrastructure failure.
    pub fn is_rejection(&self) -> bool {
        matches!(self, BankError::Account(_))
    }
}
