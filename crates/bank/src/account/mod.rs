//! Account aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod money;

pub use aggregate::Account;
pub use commands::*;
pub use events::{
    AccountClosedData, AccountEvent, AccountOpenedData, MoneyDepositedData, MoneyWithdrawnData,
};
pub use money::Money;

use cqrs::AggregateId;
use thiserror::Error;

/// Business rule violations on an account.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Account already exists: {account_id}")]
    AlreadyExists { account_id: AggregateId },

    #[error("Account owner is required")]
    OwnerRequired,

    #[error("Invalid amount: {amount} (must be greater than zero)")]
    InvalidAmount { amount: Money },

    #[error("Insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: Money, requested: Money },

    #[error("Cannot close account with balance {balance}")]
    NonZeroBalance { balance: Money },

    #[error("Cannot {action}: account is closed")]
    Closed { action: &'static str },

    #[error("Cannot transfer to the same account")]
    SameAccount,
}
