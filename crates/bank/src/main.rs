//! Bank demo entry point.
//!
//! Runs a short scripted session through the command bus over an in-memory
//! store, then prints balances and the Prometheus metrics snapshot.

use bank::{
    AccountService, Config, Deposit, Money, OpenAccountCommand, TransferFundsCommand, Withdraw,
};
use cqrs::AggregateRoot;
use event_store::InMemoryEventStore;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = PrometheusBuilder::new().install_recorder()?;

    // 3. Create event store and command bus
    let store = InMemoryEventStore::new();
    let bus = bank::command_bus(store.clone(), config.track_aggregates)?;
    let accounts = AccountService::new(store.clone());
    tracing::info!(?config, "bank demo starting");

    // 4. Run the session
    let alice = OpenAccountCommand::new("alice", config.opening_balance);
    let bob = OpenAccountCommand::new("bob", config.opening_balance);
    let (alice_id, bob_id) = (alice.account_id, bob.account_id);

    bus.handle(alice)?;
    bus.handle(bob)?;
    bus.handle(Deposit::new(alice_id, Money::from_cents(250)))?;
    bus.handle(TransferFundsCommand::new(
        alice_id,
        bob_id,
        Money::from_cents(150),
    ))?;

    // The overdraft is rejected and none of its events reach the store
    match bus.handle(Withdraw::new(bob_id, Money::from_dollars(1_000))) {
        Err(error) if error.is_rejection() => tracing::warn!(%error, "withdrawal rejected"),
        other => other?,
    }

    // 5. Report
    for account_id in [alice_id, bob_id] {
        if let Some(account) = accounts.account(account_id)? {
            println!(
                "{:<6} {account_id}  balance {:>8}  version {}",
                account.owner(),
                account.balance().to_string(),
                account.version()
            );
        }
    }
    println!("{} events committed", store.event_count()?);
    println!();
    print!("{}", metrics_handle.render());

    Ok(())
}
