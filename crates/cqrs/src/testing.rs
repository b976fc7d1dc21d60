//! Small aggregate shared by the unit tests.

use std::sync::LazyLock;

use event_store::AggregateId;
use serde::{Deserialize, Serialize};

use crate::aggregate::{AggregateRoot, DomainEvent, EventPayload, PendingEvents};
use crate::error::AggregateError;
use crate::handlers::EventHandlers;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Started {
    pub id: AggregateId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incremented {
    pub by: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TallyEvent {
    Started(Started),
    Incremented(Incremented),
    Frozen,
}

impl TallyEvent {
    pub fn started(id: AggregateId) -> Self {
        TallyEvent::Started(Started { id })
    }

    pub fn incremented(by: i64) -> Self {
        TallyEvent::Incremented(Incremented { by })
    }
}

impl DomainEvent for TallyEvent {
    const EVENT_TYPES: &'static [&'static str] = &["Started", "Incremented", "Frozen"];

    fn event_type(&self) -> &'static str {
        match self {
            TallyEvent::Started(_) => "Started",
            TallyEvent::Incremented(_) => "Incremented",
            TallyEvent::Frozen => "Frozen",
        }
    }
}

impl EventPayload<TallyEvent> for Started {
    const EVENT_TYPE: &'static str = "Started";

    fn extract(event: &TallyEvent) -> Option<&Self> {
        match event {
            TallyEvent::Started(payload) => Some(payload),
            _ => None,
        }
    }
}

impl EventPayload<TallyEvent> for Incremented {
    const EVENT_TYPE: &'static str = "Incremented";

    fn extract(event: &TallyEvent) -> Option<&Self> {
        match event {
            TallyEvent::Incremented(payload) => Some(payload),
            _ => None,
        }
    }
}

static HANDLERS: LazyLock<EventHandlers<Tally>> = LazyLock::new(|| {
    EventHandlers::new()
        .on(Tally::on_started)
        .on(Tally::on_incremented)
});

/// Running total. `Frozen` is deliberately left without a handler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tally {
    id: Option<AggregateId>,
    total: i64,
    history: Vec<i64>,
    pending: PendingEvents<TallyEvent>,
}

impl AggregateRoot for Tally {
    type Event = TallyEvent;

    fn aggregate_type() -> &'static str {
        "Tally"
    }

    fn handlers() -> &'static EventHandlers<Self> {
        &HANDLERS
    }

    fn id(&self) -> Option<AggregateId> {
        self.id
    }

    fn pending(&self) -> &PendingEvents<TallyEvent> {
        &self.pending
    }

    fn pending_mut(&mut self) -> &mut PendingEvents<TallyEvent> {
        &mut self.pending
    }
}

impl Tally {
    pub fn start(id: AggregateId) -> Result<Self, AggregateError> {
        let mut tally = Self::default();
        tally.apply(TallyEvent::started(id))?;
        Ok(tally)
    }

    pub fn increment(&mut self, by: i64) -> Result<(), AggregateError> {
        self.apply(TallyEvent::incremented(by))
    }

    pub fn freeze(&mut self) -> Result<(), AggregateError> {
        self.apply(TallyEvent::Frozen)
    }

    pub fn total(&self) -> i64 {
        self.total
    }

    pub fn history(&self) -> &[i64] {
        &self.history
    }

    fn on_started(&mut self, event: &Started) {
        self.id = Some(event.id);
    }

    fn on_incremented(&mut self, event: &Incremented) {
        self.total += event.by;
        self.history.push(event.by);
    }
}
