//! Sample bank domain on top of the `cqrs` command bus.
//!
//! - [`Account`]: event-sourced account aggregate
//! - account commands, one handler each in [`AccountService`]
//! - [`command_bus`]: wires the service into a bus over any event store
//! - [`Config`]: demo settings from the environment

pub mod account;
pub mod config;
pub mod error;
pub mod service;

pub use account::{
    Account, AccountError, AccountEvent, CloseAccount, Deposit, Money, OpenAccountCommand,
    TransferFundsCommand, Withdraw,
};
pub use config::Config;
pub use error::BankError;
pub use service::{AccountService, BankBus, BankRegistry, command_bus};
