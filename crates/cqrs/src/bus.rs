//! Transactional command dispatch.

use std::time::Instant;

use event_store::EventStore;
use serde_json::json;

use crate::command::{Command, CommandType};
use crate::error::BusError;
use crate::identity_map::{AggregateMap, IdentityMap};
use crate::resolver::{DynCommandHandler, HandlerResolver};

/// Progress of one `handle` call.
///
/// ```text
/// Idle ──► TransactionBegun ──► EventsCollected ──► Committed
///                  │                   │
///                  └───────────────────┴──► RolledBack
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOfWorkState {
    /// Handler resolved, no transaction yet.
    Idle,
    TransactionBegun,
    /// Handler returned and every drained event was staged.
    EventsCollected,
    Committed,
    RolledBack,
}

/// Dispatches commands to handlers and publishes the events they applied.
///
/// Every `handle` call is one unit of work: a fresh identity map (if the bus
/// was built with one), one store transaction, and either a commit of every
/// drained event or a rollback. Calls are independent of each other and the
/// bus coordinates nothing between concurrent calls.
pub struct CommandBus<S, R, M = AggregateMap> {
    store: S,
    resolver: R,
    identity_map: Option<fn() -> M>,
}

impl<S, R, M> CommandBus<S, R, M>
where
    S: EventStore,
    R: HandlerResolver<M>,
    M: IdentityMap,
{
    /// Creates a bus without an identity map.
    ///
    /// Handlers receive `None` and persist their own changes; the bus never
    /// calls [`EventStore::add`].
    pub fn new(store: S, resolver: R) -> Self {
        Self {
            store,
            resolver,
            identity_map: None,
        }
    }

    /// Creates a bus that builds a fresh identity map with `factory` for
    /// every command and publishes what its aggregates applied.
    pub fn with_identity_map(store: S, resolver: R, factory: fn() -> M) -> Self {
        Self {
            store,
            resolver,
            identity_map: Some(factory),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn tracks_aggregates(&self) -> bool {
        self.identity_map.is_some()
    }

    /// Executes `command` as one unit of work.
    ///
    /// On failure after the transaction began, the transaction is rolled back
    /// and the original error is returned. A handler error comes back as the
    /// value the handler returned.
    #[tracing::instrument(skip_all, fields(command = %CommandType::of::<C>()))]
    pub fn handle<C: Command>(&self, command: C) -> Result<(), R::Error> {
        let command_type = CommandType::of::<C>();
        metrics::counter!("command_bus_commands_total").increment(1);

        let handler = self
            .resolver
            .resolve(command_type)
            .ok_or(BusError::HandlerResolution {
                command_type: command_type.name(),
            })?;
        let handler = self.resolver.proxy(handler, command_type);

        let started = Instant::now();
        self.store.begin_transaction().map_err(BusError::from)?;
        let mut state = UnitOfWorkState::TransactionBegun;
        tracing::debug!(?state, "transaction begun");

        let result = self.execute(handler.as_ref(), command, command_type, &mut state);
        let elapsed = started.elapsed().as_secs_f64();
        metrics::histogram!("command_bus_handle_duration_seconds").record(elapsed);

        match result {
            Ok(published) => {
                state = UnitOfWorkState::Committed;
                metrics::counter!("command_bus_commits_total").increment(1);
                metrics::counter!("command_bus_events_published_total")
                    .increment(published as u64);
                tracing::debug!(?state, published, "unit of work committed");
                Ok(())
            }
            Err(error) => {
                let reached = state;
                if let Err(rollback_error) = self.store.rollback() {
                    tracing::warn!(error = %rollback_error, "rollback failed");
                }
                state = UnitOfWorkState::RolledBack;
                metrics::counter!("command_bus_rollbacks_total").increment(1);
                tracing::debug!(?state, ?reached, "unit of work rolled back");
                Err(error)
            }
        }
    }

    fn execute<C: Command>(
        &self,
        handler: &dyn DynCommandHandler<M, R::Error>,
        command: C,
        command_type: CommandType,
        state: &mut UnitOfWorkState,
    ) -> Result<usize, R::Error> {
        let mut identity_map = self.identity_map.map(|factory| factory());

        handler.handle(Box::new(command), identity_map.as_mut())?;

        let published = match identity_map.as_mut() {
            Some(identity_map) => self.publish(identity_map, command_type)?,
            None => 0,
        };
        *state = UnitOfWorkState::EventsCollected;

        self.store.commit().map_err(BusError::from)?;
        Ok(published)
    }

    /// Drains every tracked aggregate into the active transaction.
    ///
    /// Each envelope records the command that produced it under the
    /// `command` and `operation` metadata keys.
    fn publish(&self, identity_map: &mut M, command_type: CommandType) -> Result<usize, BusError> {
        let operation = command_type.handler_name();
        let mut published = 0;
        for source in identity_map.all() {
            for envelope in source.drain_envelopes()? {
                let envelope = envelope
                    .with_metadata("command", json!(command_type.name()))
                    .with_metadata("operation", json!(operation));
                self.store.add(envelope)?;
                published += 1;
            }
        }
        Ok(published)
    }
}

impl<S, R, M> std::fmt::Debug for CommandBus<S, R, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandBus")
            .field("tracks_aggregates", &self.identity_map.is_some())
            .finish_non_exhaustive()
    }
}
