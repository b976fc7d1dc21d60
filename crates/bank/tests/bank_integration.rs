//! Integration tests for the bank running on the command bus.
//!
//! Every scenario runs twice: once with an identity map, where the bus
//! publishes the tracked accounts, and once without, where the handlers
//! stage their own events.

use bank::{
    AccountError, AccountService, BankBus, BankError, CloseAccount, Deposit, Money,
    OpenAccountCommand, TransferFundsCommand, Withdraw, command_bus,
};
use cqrs::{AggregateId, AggregateRoot, BusError, RepositoryError, Version};
use event_store::{EventHistory, EventStoreError, InMemoryEventStore};

struct Bank {
    store: InMemoryEventStore,
    bus: BankBus<InMemoryEventStore>,
    accounts: AccountService<InMemoryEventStore>,
}

impl Bank {
    fn new(track_aggregates: bool) -> Self {
        let store = InMemoryEventStore::new();
        Self {
            bus: command_bus(store.clone(), track_aggregates).unwrap(),
            accounts: AccountService::new(store.clone()),
            store,
        }
    }

    fn open(&self, owner: &str, cents: i64) -> AggregateId {
        let command = OpenAccountCommand::new(owner, Money::from_cents(cents));
        let id = command.account_id;
        self.bus.handle(command).unwrap();
        id
    }

    fn balance(&self, id: AggregateId) -> Money {
        self.accounts.account(id).unwrap().unwrap().balance()
    }
}

fn both_modes(scenario: impl Fn(Bank)) {
    scenario(Bank::new(true));
    scenario(Bank::new(false));
}

mod account_lifecycle {
    use super::*;

    #[test]
    fn test_open_deposit_withdraw_close() {
        both_modes(|bank| {
            let id = bank.open("ada", 1_000);

            bank.bus
                .handle(Deposit::new(id, Money::from_cents(500)))
                .unwrap();
            bank.bus
                .handle(Withdraw::new(id, Money::from_cents(1_500)))
                .unwrap();
            bank.bus.handle(CloseAccount::new(id)).unwrap();

            let account = bank.accounts.account(id).unwrap().unwrap();
            assert_eq!(account.owner(), "ada");
            assert_eq!(account.balance(), Money::zero());
            assert!(account.is_closed());
            assert_eq!(account.version(), Version::new(4));
            assert_eq!(bank.store.event_count().unwrap(), 4);
        });
    }

    #[test]
    fn test_committed_events_record_aggregate_and_command() {
        both_modes(|bank| {
            let id = bank.open("ada", 0);
            bank.bus
                .handle(Deposit::new(id, Money::from_cents(5)))
                .unwrap();

            let events = bank.store.events_for_aggregate(id).unwrap();
            let kinds: Vec<_> = events.iter().map(|e| e.event_type.as_str()).collect();

            assert_eq!(kinds, vec!["AccountOpened", "MoneyDeposited"]);
            assert!(events.iter().all(|e| e.aggregate_type == "Account"));
            assert_eq!(events[1].version, Version::new(2));
            assert_eq!(events[1].payload["data"]["balance"], 5);

            // Only the bus stamps the command; self-staging handlers don't
            if bank.bus.tracks_aggregates() {
                assert_eq!(events[0].metadata["operation"], "openAccount");
                assert_eq!(events[1].metadata["operation"], "deposit");
            } else {
                assert!(events.iter().all(|e| e.metadata.is_empty()));
            }
        });
    }

    #[test]
    fn test_unknown_account_is_reported() {
        both_modes(|bank| {
            let result = bank
                .bus
                .handle(Deposit::new(AggregateId::new(), Money::from_cents(1)));

            assert!(matches!(
                result,
                Err(BankError::Repository(RepositoryError::NotFound { .. }))
            ));
            assert_eq!(bank.store.event_count().unwrap(), 0);
        });
    }

    #[test]
    fn test_reopening_an_account_is_rejected() {
        both_modes(|bank| {
            let id = bank.open("ada", 0);
            let mut command = OpenAccountCommand::new("eve", Money::zero());
            command.account_id = id;

            let result = bank.bus.handle(command);

            assert!(matches!(
                result,
                Err(BankError::Account(AccountError::AlreadyExists { .. }))
            ));
            assert_eq!(bank.accounts.account(id).unwrap().unwrap().owner(), "ada");
        });
    }
}

mod transfers {
    use super::*;

    #[test]
    fn test_transfer_commits_both_sides() {
        both_modes(|bank| {
            let from = bank.open("ada", 1_000);
            let to = bank.open("bob", 100);

            bank.bus
                .handle(TransferFundsCommand::new(from, to, Money::from_cents(400)))
                .unwrap();

            assert_eq!(bank.balance(from), Money::from_cents(600));
            assert_eq!(bank.balance(to), Money::from_cents(500));
            assert_eq!(bank.store.event_count().unwrap(), 4);
        });
    }

    #[test]
    fn test_failed_transfer_publishes_nothing() {
        both_modes(|bank| {
            let from = bank.open("ada", 100);
            let to = bank.open("bob", 0);

            let result = bank
                .bus
                .handle(TransferFundsCommand::new(from, to, Money::from_cents(101)));

            assert!(matches!(
                result,
                Err(BankError::Account(AccountError::InsufficientFunds { .. }))
            ));
            assert_eq!(bank.balance(from), Money::from_cents(100));
            assert_eq!(bank.balance(to), Money::zero());
            assert_eq!(bank.store.event_count().unwrap(), 2);
            assert_eq!(bank.store.staged_count().unwrap(), 0);
        });
    }

    #[test]
    fn test_transfer_into_missing_account_rolls_back_the_withdrawal() {
        both_modes(|bank| {
            let from = bank.open("ada", 100);

            let result = bank.bus.handle(TransferFundsCommand::new(
                from,
                AggregateId::new(),
                Money::from_cents(50),
            ));

            assert!(matches!(
                result,
                Err(BankError::Repository(RepositoryError::NotFound { .. }))
            ));
            assert_eq!(bank.balance(from), Money::from_cents(100));
            assert_eq!(bank.store.event_count().unwrap(), 1);
        });
    }
}

mod shared_store {
    use super::*;

    #[test]
    fn test_buses_over_one_store_share_its_history() {
        let store = InMemoryEventStore::new();
        let first = command_bus(store.clone(), true).unwrap();
        let second = command_bus(store.clone(), true).unwrap();

        let command = OpenAccountCommand::new("ada", Money::from_cents(100));
        let id = command.account_id;
        first.handle(command).unwrap();

        // Each bus replays the committed history before applying
        first
            .handle(Deposit::new(id, Money::from_cents(1)))
            .unwrap();
        second
            .handle(Deposit::new(id, Money::from_cents(2)))
            .unwrap();

        let history = store.events_for_aggregate(id).unwrap();
        assert_eq!(history.len(), 3);
        let versions: Vec<_> = history.iter().map(|e| e.version.as_i64()).collect();
        assert_eq!(versions, vec![1, 2, 3]);
    }

    #[test]
    fn test_unregistered_command_fails_before_the_store_is_touched() {
        #[derive(Debug)]
        struct Audit;
        impl cqrs::Command for Audit {}

        let bank = Bank::new(true);
        let result = bank.bus.handle(Audit);

        assert!(matches!(
            result,
            Err(BankError::Bus(BusError::HandlerResolution { .. }))
        ));
        assert_eq!(bank.store.staged_count().unwrap(), 0);
    }

    #[test]
    fn test_store_errors_keep_their_identity() {
        let error: BankError = EventStoreError::NoActiveTransaction.into();
        assert!(!error.is_rejection());
        assert!(matches!(
            error,
            BankError::EventStore(EventStoreError::NoActiveTransaction)
        ));
    }
}
