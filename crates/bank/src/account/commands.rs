//! Account commands.
//!
//! Type names follow the bus's operation naming: `OpenAccountCommand` is
//! the `openAccount` operation, `Withdraw` is `withdraw`.

use cqrs::{AggregateId, Command};

use super::Money;

/// Command to open a new account.
#[derive(Debug, Clone)]
pub struct OpenAccountCommand {
    pub account_id: AggregateId,
    pub owner: String,
    pub opening_balance: Money,
}

impl OpenAccountCommand {
    pub fn new(owner: impl Into<String>, opening_balance: Money) -> Self {
        Self {
            account_id: AggregateId::new(),
            owner: owner.into(),
            opening_balance,
        }
    }
}

impl Command for OpenAccountCommand {}

/// Command to pay money into an account.
#[derive(Debug, Clone)]
pub struct Deposit {
    pub account_id: AggregateId,
    pub amount: Money,
}

impl Deposit {
    pub fn new(account_id: AggregateId, amount: Money) -> Self {
        Self { account_id, amount }
    }
}

impl Command for Deposit {}

/// Command to take money out of an account.
#[derive(Debug, Clone)]
pub struct Withdraw {
    pub account_id: AggregateId,
    pub amount: Money,
}

impl Withdraw {
    pub fn new(account_id: AggregateId, amount: Money) -> Self {
        Self { account_id, amount }
    }
}

impl Command for Withdraw {}

/// Command to move money between two accounts in one unit of work.
#[derive(Debug, Clone)]
pub struct TransferFundsCommand {
    pub from: AggregateId,
    pub to: AggregateId,
    pub amount: Money,
}

impl TransferFundsCommand {
    pub fn new(from: AggregateId, to: AggregateId, amount: Money) -> Self {
        Self { from, to, amount }
    }
}

impl Command for TransferFundsCommand {}

/// Command to close an empty account.
#[derive(Debug, Clone)]
pub struct CloseAccount {
    pub account_id: AggregateId,
}

impl CloseAccount {
    pub fn new(account_id: AggregateId) -> Self {
        Self { account_id }
    }
}

impl Command for CloseAccount {}
