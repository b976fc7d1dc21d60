//! Account service: the command handlers behind the bank's bus.

use std::sync::Arc;

use cqrs::{
    AggregateId, AggregateMap, AggregateRoot, BusError, CommandBus, EventSource, HandlerRegistry,
    Repository, RepositoryError,
};
use event_store::{EventHistory, EventStore};

use crate::account::{
    Account, AccountError, CloseAccount, Deposit, OpenAccountCommand, TransferFundsCommand,
    Withdraw,
};
use crate::error::BankError;

/// Handler registry of the bank.
pub type BankRegistry = HandlerRegistry<AggregateMap, BankError>;

/// Command bus of the bank.
pub type BankBus<S> = CommandBus<S, BankRegistry>;

/// Handles account commands.
///
/// With an identity map every handler only touches tracked aggregates and
/// the bus publishes their events. Without one the service stages the
/// events itself inside the bus's transaction.
pub struct AccountService<S> {
    repository: Repository<S>,
}

impl<S> AccountService<S>
where
    S: EventStore + EventHistory + Send + Sync + 'static,
{
    pub fn new(store: S) -> Self {
        Self {
            repository: Repository::new(store),
        }
    }

    pub fn repository(&self) -> &Repository<S> {
        &self.repository
    }

    /// Registers one handler per account command.
    pub fn register(self: &Arc<Self>, registry: &mut BankRegistry) -> Result<(), BusError> {
        let service = Arc::clone(self);
        registry.register(
            move |command: OpenAccountCommand, map: Option<&mut AggregateMap>| {
                record("open_account", service.open_account(command, map))
            },
        )?;

        let service = Arc::clone(self);
        registry.register(move |command: Deposit, map: Option<&mut AggregateMap>| {
            record("deposit", service.deposit(command, map))
        })?;

        let service = Arc::clone(self);
        registry.register(move |command: Withdraw, map: Option<&mut AggregateMap>| {
            record("withdraw", service.withdraw(command, map))
        })?;

        let service = Arc::clone(self);
        registry.register(
            move |command: TransferFundsCommand, map: Option<&mut AggregateMap>| {
                record("transfer_funds", service.transfer_funds(command, map))
            },
        )?;

        let service = Arc::clone(self);
        registry.register(move |command: CloseAccount, map: Option<&mut AggregateMap>| {
            record("close_account", service.close_account(command, map))
        })?;

        Ok(())
    }

    #[tracing::instrument(skip(self, identity_map))]
    pub fn open_account(
        &self,
        command: OpenAccountCommand,
        identity_map: Option<&mut AggregateMap>,
    ) -> Result<(), BankError> {
        let account_id = command.account_id;
        if self.repository.history().aggregate_version(account_id)?.is_some() {
            return Err(AccountError::AlreadyExists { account_id }.into());
        }

        let account = Account::open(account_id, command.owner, command.opening_balance)?;
        match identity_map {
            Some(identity_map) => {
                self.repository.add(identity_map, account)?;
                Ok(())
            }
            None => self.stage(account),
        }
    }

    #[tracing::instrument(skip(self, identity_map))]
    pub fn deposit(
        &self,
        command: Deposit,
        identity_map: Option<&mut AggregateMap>,
    ) -> Result<(), BankError> {
        self.modify(identity_map, command.account_id, |account| {
            account.deposit(command.amount)
        })
    }

    #[tracing::instrument(skip(self, identity_map))]
    pub fn withdraw(
        &self,
        command: Withdraw,
        identity_map: Option<&mut AggregateMap>,
    ) -> Result<(), BankError> {
        self.modify(identity_map, command.account_id, |account| {
            account.withdraw(command.amount)
        })
    }

    /// Withdraws from one account and deposits into another.
    ///
    /// Both accounts change in the same unit of work, so either both events
    /// are committed or neither is.
    #[tracing::instrument(skip(self, identity_map))]
    pub fn transfer_funds(
        &self,
        command: TransferFundsCommand,
        identity_map: Option<&mut AggregateMap>,
    ) -> Result<(), BankError> {
        if command.from == command.to {
            return Err(AccountError::SameAccount.into());
        }

        match identity_map {
            Some(identity_map) => {
                self.repository
                    .get::<Account>(identity_map, command.from)?
                    .withdraw(command.amount)?;
                self.repository
                    .get::<Account>(identity_map, command.to)?
                    .deposit(command.amount)
            }
            None => {
                let mut from = self.load_existing(command.from)?;
                let mut to = self.load_existing(command.to)?;
                from.withdraw(command.amount)?;
                to.deposit(command.amount)?;
                self.stage(from)?;
                self.stage(to)
            }
        }
    }

    #[tracing::instrument(skip(self, identity_map))]
    pub fn close_account(
        &self,
        command: CloseAccount,
        identity_map: Option<&mut AggregateMap>,
    ) -> Result<(), BankError> {
        self.modify(identity_map, command.account_id, Account::close)
    }

    /// Loads an account by ID.
    ///
    /// Returns None if the account doesn't exist.
    #[tracing::instrument(skip(self))]
    pub fn account(&self, account_id: AggregateId) -> Result<Option<Account>, BankError> {
        Ok(self.repository.load(account_id)?)
    }

    fn load_existing(&self, account_id: AggregateId) -> Result<Account, BankError> {
        self.repository
            .load::<Account>(account_id)?
            .ok_or(BankError::from(RepositoryError::NotFound {
                aggregate_type: Account::aggregate_type(),
                aggregate_id: account_id,
            }))
    }

    fn modify<F>(
        &self,
        identity_map: Option<&mut AggregateMap>,
        account_id: AggregateId,
        change: F,
    ) -> Result<(), BankError>
    where
        F: FnOnce(&mut Account) -> Result<(), BankError>,
    {
        match identity_map {
            Some(identity_map) => {
                change(self.repository.get::<Account>(identity_map, account_id)?)
            }
            None => {
                let mut account = self.load_existing(account_id)?;
                change(&mut account)?;
                self.stage(account)
            }
        }
    }

    /// Stages the account's buffered events in the active transaction.
    fn stage(&self, mut account: Account) -> Result<(), BankError> {
        let store = self.repository.history();
        for envelope in account.drain_envelopes()? {
            store.add(envelope)?;
        }
        Ok(())
    }
}

/// Outcome label for `bank_operations_total`.
fn outcome(result: &Result<(), BankError>) -> &'static str {
    match result {
        Ok(()) => "accepted",
        Err(error) if error.is_rejection() => "rejected",
        Err(_) => "failed",
    }
}

fn record(operation: &'static str, result: Result<(), BankError>) -> Result<(), BankError> {
    metrics::counter!(
        "bank_operations_total",
        "operation" => operation,
        "outcome" => outcome(&result)
    )
    .increment(1);
    result
}

/// Builds the bank's bus over `store`.
///
/// With `track_aggregates` the bus creates an identity map per command and
/// publishes from it; otherwise handlers stage their own events.
pub fn command_bus<S>(store: S, track_aggregates: bool) -> Result<BankBus<S>, BusError>
where
    S: EventStore + EventHistory + Clone + Send + Sync + 'static,
{
    let service = Arc::new(AccountService::new(store.clone()));
    let mut registry = BankRegistry::new();
    service.register(&mut registry)?;

    tracing::info!(
        operations = ?registry.operations(),
        track_aggregates,
        "bank command bus ready"
    );

    Ok(if track_aggregates {
        CommandBus::with_identity_map(store, registry, AggregateMap::new)
    } else {
        CommandBus::new(store, registry)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::Money;
    use cqrs::AggregateError;
    use event_store::InMemoryEventStore;

    fn open(service: &AccountService<InMemoryEventStore>, map: &mut AggregateMap) -> AggregateId {
        let command = OpenAccountCommand::new("ada", Money::from_dollars(10));
        let id = command.account_id;
        service.open_account(command, Some(map)).unwrap();
        id
    }

    #[test]
    fn test_handlers_only_touch_the_identity_map() {
        let store = InMemoryEventStore::new();
        let service = AccountService::new(store.clone());
        let mut map = AggregateMap::new();

        let id = open(&service, &mut map);
        service
            .deposit(Deposit::new(id, Money::from_dollars(1)), Some(&mut map))
            .unwrap();

        assert_eq!(map.len(), 1);
        assert_eq!(map.pending_count(), 2);
        assert_eq!(
            map.get::<Account>(id).unwrap().balance(),
            Money::from_dollars(11)
        );
        assert_eq!(store.event_count().unwrap(), 0);
    }

    #[test]
    fn test_transfer_touches_both_accounts() {
        let service = AccountService::new(InMemoryEventStore::new());
        let mut map = AggregateMap::new();
        let from = open(&service, &mut map);
        let to = open(&service, &mut map);

        service
            .transfer_funds(
                TransferFundsCommand::new(from, to, Money::from_dollars(4)),
                Some(&mut map),
            )
            .unwrap();

        assert_eq!(map.get::<Account>(from).unwrap().balance(), Money::from_dollars(6));
        assert_eq!(map.get::<Account>(to).unwrap().balance(), Money::from_dollars(14));
    }

    #[test]
    fn test_transfer_to_same_account_is_rejected() {
        let service = AccountService::new(InMemoryEventStore::new());
        let mut map = AggregateMap::new();
        let id = open(&service, &mut map);

        let result = service.transfer_funds(
            TransferFundsCommand::new(id, id, Money::from_dollars(1)),
            Some(&mut map),
        );

        assert!(matches!(
            result,
            Err(BankError::Account(AccountError::SameAccount))
        ));
    }

    #[test]
    fn test_opening_twice_in_one_unit_of_work_is_rejected() {
        let service = AccountService::new(InMemoryEventStore::new());
        let mut map = AggregateMap::new();
        let command = OpenAccountCommand::new("ada", Money::zero());

        service.open_account(command.clone(), Some(&mut map)).unwrap();
        let result = service.open_account(command, Some(&mut map));

        assert!(matches!(
            result,
            Err(BankError::Repository(RepositoryError::Aggregate(
                AggregateError::AlreadyTracked { .. }
            )))
        ));
    }

    #[test]
    fn test_without_identity_map_events_are_staged_directly() {
        let store = InMemoryEventStore::new();
        let service = AccountService::new(store.clone());

        store.begin_transaction().unwrap();
        service
            .open_account(OpenAccountCommand::new("ada", Money::zero()), None)
            .unwrap();

        assert_eq!(store.staged_count().unwrap(), 1);
        assert_eq!(store.event_count().unwrap(), 0);
    }

    #[test]
    fn test_command_bus_registers_every_operation() {
        let bus = command_bus(InMemoryEventStore::new(), true).unwrap();
        let operations: Vec<_> = bus
            .resolver()
            .operations()
            .into_iter()
            .map(|(_, operation)| operation)
            .collect();

        assert_eq!(operations.len(), 5);
        assert!(operations.contains(&"transferFunds".to_string()));
        assert!(bus.tracks_aggregates());
    }

    #[test]
    fn test_operation_outcomes_separate_rejections_from_failures() {
        let rejected: Result<(), BankError> = Err(AccountError::SameAccount.into());
        let failed: Result<(), BankError> =
            Err(event_store::EventStoreError::NoActiveTransaction.into());

        assert_eq!(outcome(&Ok(())), "accepted");
        assert_eq!(outcome(&rejected), "rejected");
        assert_eq!(outcome(&failed), "failed");
        assert!(matches!(
            record("deposit", rejected),
            Err(BankError::Account(AccountError::SameAccount))
        ));
    }
}
