//! Per-aggregate-type dispatch from event kind to handler.

use std::collections::HashMap;

use crate::aggregate::{AggregateRoot, DomainEvent, EventPayload};
use crate::error::AggregateError;

type Handler<A> = Box<dyn Fn(&mut A, &<A as AggregateRoot>::Event) -> bool + Send + Sync>;

/// Dispatch table of one aggregate type.
///
/// Built once, usually in a `static LazyLock`, and returned from
/// [`AggregateRoot::handlers`]:
///
/// ```ignore
/// static HANDLERS: LazyLock<EventHandlers<Account>> = LazyLock::new(|| {
///     EventHandlers::new()
///         .on(Account::on_opened)
///         .on(Account::on_deposited)
/// });
/// ```
pub struct EventHandlers<A: AggregateRoot> {
    handlers: HashMap<&'static str, Handler<A>>,
}

impl<A: AggregateRoot> EventHandlers<A> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registers the handler for the kind carried by payload `P`.
    ///
    /// # Panics
    ///
    /// Panics if `P`'s kind is not one of the event type's `EVENT_TYPES`, or
    /// if a handler for that kind is already registered. Both are mistakes in
    /// the aggregate definition and surface the first time the table is
    /// built.
    pub fn on<P>(mut self, handler: fn(&mut A, &P)) -> Self
    where
        P: EventPayload<A::Event>,
    {
        let event_type = P::EVENT_TYPE;
        assert!(
            <A::Event as DomainEvent>::EVENT_TYPES.contains(&event_type),
            "{} cannot handle {event_type}: not an event kind of its event type",
            A::aggregate_type(),
        );

        let dispatch: Handler<A> = Box::new(move |aggregate: &mut A, event: &A::Event| {
            match P::extract(event) {
                Some(payload) => {
                    handler(aggregate, payload);
                    true
                }
                None => false,
            }
        });

        if self.handlers.insert(event_type, dispatch).is_some() {
            panic!(
                "{} registers more than one handler for {event_type}",
                A::aggregate_type()
            );
        }
        self
    }

    /// Returns true if a handler is registered for `event_type`.
    pub fn handles(&self, event_type: &str) -> bool {
        self.handlers.contains_key(event_type)
    }

    /// Event kinds of the aggregate's event type that have no handler.
    pub fn unhandled(&self) -> Vec<&'static str> {
        <A::Event as DomainEvent>::EVENT_TYPES
            .iter()
            .copied()
            .filter(|event_type| !self.handles(event_type))
            .collect()
    }

    pub(crate) fn dispatch(
        &self,
        aggregate: &mut A,
        event: &A::Event,
    ) -> Result<(), AggregateError> {
        let event_type = event.event_type();
        let handler = self
            .handlers
            .get(event_type)
            .ok_or(AggregateError::HandlerNotFound {
                aggregate_type: A::aggregate_type(),
                event_type,
            })?;

        if handler(aggregate, event) {
            Ok(())
        } else {
            Err(AggregateError::PayloadMismatch {
                aggregate_type: A::aggregate_type(),
                event_type,
            })
        }
    }
}

impl<A: AggregateRoot> Default for EventHandlers<A> {
    fn default() -> Self {
        Self::new()
    }
}
