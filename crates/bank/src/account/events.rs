//! Account domain events.

use chrono::{DateTime, Utc};
use cqrs::{AggregateId, DomainEvent, EventPayload};
use serde::{Deserialize, Serialize};

use super::Money;

/// Events that can occur on an account aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum AccountEvent {
    /// Account was opened.
    AccountOpened(AccountOpenedData),

    /// Money was paid in.
    MoneyDeposited(MoneyDepositedData),

    /// Money was paid out.
    MoneyWithdrawn(MoneyWithdrawnData),

    /// Account was closed.
    AccountClosed(AccountClosedData),
}

impl DomainEvent for AccountEvent {
    const EVENT_TYPES: &'static [&'static str] = &[
        "AccountOpened",
        "MoneyDeposited",
        "MoneyWithdrawn",
        "AccountClosed",
    ];

    fn event_type(&self) -> &'static str {
        match self {
            AccountEvent::AccountOpened(_) => "AccountOpened",
            AccountEvent::MoneyDeposited(_) => "MoneyDeposited",
            AccountEvent::MoneyWithdrawn(_) => "MoneyWithdrawn",
            AccountEvent::AccountClosed(_) => "AccountClosed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountOpenedData {
    pub account_id: AggregateId,

    /// Name of the account holder.
    pub owner: String,

    pub opening_balance: Money,

    pub opened_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoneyDepositedData {
    pub amount: Money,

    /// Balance after the deposit.
    pub balance: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoneyWithdrawnData {
    pub amount: Money,

    /// Balance after the withdrawal.
    pub balance: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountClosedData {
    pub closed_at: DateTime<Utc>,
}

impl EventPayload<AccountEvent> for AccountOpenedData {
    const EVENT_TYPE: &'static str = "AccountOpened";

    fn extract(event: &AccountEvent) -> Option<&Self> {
        match event {
            AccountEvent::AccountOpened(data) => Some(data),
            _ => None,
        }
    }
}

impl EventPayload<AccountEvent> for MoneyDepositedData {
    const EVENT_TYPE: &'static str = "MoneyDeposited";

    fn extract(event: &AccountEvent) -> Option<&Self> {
        match event {
            AccountEvent::MoneyDeposited(data) => Some(data),
            _ => None,
        }
    }
}

impl EventPayload<AccountEvent> for MoneyWithdrawnData {
    const EVENT_TYPE: &'static str = "MoneyWithdrawn";

    fn extract(event: &AccountEvent) -> Option<&Self> {
        match event {
            AccountEvent::MoneyWithdrawn(data) => Some(data),
            _ => None,
        }
    }
}

impl EventPayload<AccountEvent> for AccountClosedData {
    const EVENT_TYPE: &'static str = "AccountClosed";

    fn extract(event: &AccountEvent) -> Option<&Self> {
        match event {
            AccountEvent::AccountClosed(data) => Some(data),
            _ => None,
        }
    }
}

// Event constructors
impl AccountEvent {
    pub fn account_opened(
        account_id: AggregateId,
        owner: impl Into<String>,
        opening_balance: Money,
    ) -> Self {
        AccountEvent::AccountOpened(AccountOpenedData {
            account_id,
            owner: owner.into(),
            opening_balance,
            opened_at: Utc::now(),
        })
    }

    pub fn money_deposited(amount: Money, balance: Money) -> Self {
        AccountEvent::MoneyDeposited(MoneyDepositedData { amount, balance })
    }

    pub fn money_withdrawn(amount: Money, balance: Money) -> Self {
        AccountEvent::MoneyWithdrawn(MoneyWithdrawnData { amount, balance })
    }

    pub fn account_closed() -> Self {
        AccountEvent::AccountClosed(AccountClosedData {
            closed_at: Utc::now(),
        })
    }
}
