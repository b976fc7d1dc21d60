//! Aggregate roots and the domain events they are built from.

use event_store::{AggregateId, Version};
use serde::{Serialize, de::DeserializeOwned};

use crate::error::AggregateError;
use crate::handlers::EventHandlers;

/// A fact that already happened to an aggregate.
///
/// Implemented by one enum per aggregate type. The set of kinds is closed:
/// `event_type` only ever returns a tag listed in `EVENT_TYPES`.
pub trait DomainEvent: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Every kind this event type can carry.
    const EVENT_TYPES: &'static [&'static str];

    /// Kind tag of this event, e.g. `"AccountOpened"`.
    fn event_type(&self) -> &'static str;
}

/// Typed payload of one event kind.
///
/// Lets handlers be registered against the payload they read instead of the
/// whole event enum.
pub trait EventPayload<E: DomainEvent>: 'static {
    /// Kind tag this payload is carried under.
    const EVENT_TYPE: &'static str;

    /// Borrows the payload if `event` is of this kind.
    fn extract(event: &E) -> Option<&Self>;
}

/// Events applied since the last drain, plus the aggregate's version.
///
/// Aggregates embed one of these and hand it out through
/// [`AggregateRoot::pending`]. It is bookkeeping, not domain state.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEvents<E> {
    events: Vec<E>,
    version: Version,
}

impl<E> PendingEvents<E> {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            version: Version::initial(),
        }
    }

    /// Number of events replayed or applied so far.
    pub fn version(&self) -> Version {
        self.version
    }

    pub fn as_slice(&self) -> &[E] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub(crate) fn record(&mut self, event: E) {
        self.events.push(event);
        self.version = self.version.next();
    }

    pub(crate) fn replayed(&mut self) {
        self.version = self.version.next();
    }

    pub(crate) fn take(&mut self) -> Vec<E> {
        std::mem::take(&mut self.events)
    }
}

impl<E> Default for PendingEvents<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// An aggregate whose state changes only through domain events.
///
/// Domain methods validate their input and then call [`apply`], which runs
/// the handler registered for the event's kind and buffers the event.
/// Replaying the same events through [`load_from_history`] from the empty
/// state must reproduce the same state, so handlers may only read the event
/// and the aggregate itself.
///
/// [`apply`]: AggregateRoot::apply
/// [`load_from_history`]: AggregateRoot::load_from_history
pub trait AggregateRoot: Sized + Send + 'static {
    type Event: DomainEvent;

    /// Aggregate kind tag, e.g. `"Account"`.
    fn aggregate_type() -> &'static str;

    /// Dispatch table of this aggregate type, built once.
    fn handlers() -> &'static EventHandlers<Self>;

    /// Identity of the aggregate, `None` until its creation event is applied.
    fn id(&self) -> Option<AggregateId>;

    fn pending(&self) -> &PendingEvents<Self::Event>;

    fn pending_mut(&mut self) -> &mut PendingEvents<Self::Event>;

    fn version(&self) -> Version {
        self.pending().version()
    }

    /// Applies a new event: mutates state and buffers the event.
    ///
    /// Fails with [`AggregateError::HandlerNotFound`] if this aggregate type
    /// registered no handler for the event's kind. Nothing is buffered then.
    fn apply(&mut self, event: Self::Event) -> Result<(), AggregateError> {
        Self::handlers().dispatch(self, &event)?;
        self.pending_mut().record(event);
        Ok(())
    }

    /// Replays committed events in order without buffering them.
    fn load_from_history<I>(&mut self, events: I) -> Result<(), AggregateError>
    where
        I: IntoIterator<Item = Self::Event>,
    {
        let handlers = Self::handlers();
        for event in events {
            handlers.dispatch(self, &event)?;
            self.pending_mut().replayed();
        }
        Ok(())
    }

    /// Rebuilds an aggregate from the empty state.
    fn from_history<I>(events: I) -> Result<Self, AggregateError>
    where
        Self: Default,
        I: IntoIterator<Item = Self::Event>,
    {
        let mut aggregate = Self::default();
        aggregate.load_from_history(events)?;
        Ok(aggregate)
    }

    /// Events applied since the last drain, oldest first.
    fn applied_events(&self) -> &[Self::Event] {
        self.pending().as_slice()
    }

    /// Takes the buffered events, leaving the buffer empty.
    fn pop_applied_events(&mut self) -> Vec<Self::Event> {
        self.pending_mut().take()
    }
}
