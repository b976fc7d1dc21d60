//! Account aggregate implementation.

use std::sync::LazyLock;

use cqrs::{AggregateId, AggregateRoot, EventHandlers, PendingEvents};

use crate::error::BankError;

use super::{
    AccountError, AccountEvent, Money,
    events::{AccountClosedData, AccountOpenedData, MoneyDepositedData, MoneyWithdrawnData},
};

static HANDLERS: LazyLock<EventHandlers<Account>> = LazyLock::new(|| {
    EventHandlers::new()
        .on(Account::on_opened)
        .on(Account::on_deposited)
        .on(Account::on_withdrawn)
        .on(Account::on_closed)
});

/// Bank account aggregate root.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Account {
    id: Option<AggregateId>,
    owner: String,
    balance: Money,
    closed: bool,
    pending: PendingEvents<AccountEvent>,
}

impl AggregateRoot for Account {
    type Event = AccountEvent;

    fn aggregate_type() -> &'static str {
        "Account"
    }

    fn handlers() -> &'static EventHandlers<Self> {
        &HANDLERS
    }

    fn id(&self) -> Option<AggregateId> {
        self.id
    }

    fn pending(&self) -> &PendingEvents<AccountEvent> {
        &self.pending
    }

    fn pending_mut(&mut self) -> &mut PendingEvents<AccountEvent> {
        &mut self.pending
    }
}

// Query methods
impl Account {
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn balance(&self) -> Money {
        self.balance
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

// Command methods
impl Account {
    /// Opens a new account.
    pub fn open(
        account_id: AggregateId,
        owner: impl Into<String>,
        opening_balance: Money,
    ) -> Result<Self, BankError> {
        let owner = owner.into();
        if owner.trim().is_empty() {
            return Err(AccountError::OwnerRequired.into());
        }
        if opening_balance < Money::zero() {
            return Err(AccountError::InvalidAmount {
                amount: opening_balance,
            }
            .into());
        }

        let mut account = Self::default();
        account.apply(AccountEvent::account_opened(
            account_id,
            owner,
            opening_balance,
        ))?;
        Ok(account)
    }

    pub fn deposit(&mut self, amount: Money) -> Result<(), BankError> {
        self.ensure_open("deposit")?;
        ensure_positive(amount)?;

        let balance = self.balance + amount;
        self.apply(AccountEvent::money_deposited(amount, balance))?;
        Ok(())
    }

    /// Takes money out of the account; the balance never goes negative.
    pub fn withdraw(&mut self, amount: Money) -> Result<(), BankError> {
        self.ensure_open("withdraw")?;
        ensure_positive(amount)?;
        if amount > self.balance {
            return Err(AccountError::InsufficientFunds {
                balance: self.balance,
                requested: amount,
            }
            .into());
        }

        let balance = self.balance - amount;
        self.apply(AccountEvent::money_withdrawn(amount, balance))?;
        Ok(())
    }

    /// Closes an account whose balance is zero.
    pub fn close(&mut self) -> Result<(), BankError> {
        self.ensure_open("close")?;
        if !self.balance.is_zero() {
            return Err(AccountError::NonZeroBalance {
                balance: self.balance,
            }
            .into());
        }

        self.apply(AccountEvent::account_closed())?;
        Ok(())
    }

    fn ensure_open(&self, action: &'static str) -> Result<(), AccountError> {
        if self.closed {
            return Err(AccountError::Closed { action });
        }
        Ok(())
    }
}

fn ensure_positive(amount: Money) -> Result<(), AccountError> {
    if !amount.is_positive() {
        return Err(AccountError::InvalidAmount { amount });
    }
    Ok(())
}

// Event handlers
impl Account {
    fn on_opened(&mut self, data: &AccountOpenedData) {
        self.id = Some(data.account_id);
        self.owner = data.owner.clone();
        self.balance = data.opening_balance;
    }

    fn on_deposited(&mut self, data: &MoneyDepositedData) {
        self.balance += data.amount;
    }

    fn on_withdrawn(&mut self, data: &MoneyWithdrawnData) {
        self.balance -= data.amount;
    }

    fn on_closed(&mut self, _data: &AccountClosedData) {
        self.closed = true;
    }
}
