//! Aggregates touched during one unit of work.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use event_store::{AggregateId, EventEnvelope, Version};

use crate::aggregate::{AggregateRoot, DomainEvent};
use crate::error::AggregateError;

/// Type-erased view of an aggregate that the command bus can drain.
pub trait EventSource: Any + Send {
    fn source_type(&self) -> &'static str;

    fn source_id(&self) -> Option<AggregateId>;

    /// Number of buffered events.
    fn pending_count(&self) -> usize;

    /// Encodes the buffered events as envelopes, then empties the buffer.
    ///
    /// Envelope versions continue the aggregate's history. If encoding fails
    /// the buffer is left as it was.
    fn drain_envelopes(&mut self) -> Result<Vec<EventEnvelope>, AggregateError>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<A: AggregateRoot> EventSource for A {
    fn source_type(&self) -> &'static str {
        A::aggregate_type()
    }

    fn source_id(&self) -> Option<AggregateId> {
        self.id()
    }

    fn pending_count(&self) -> usize {
        self.applied_events().len()
    }

    fn drain_envelopes(&mut self) -> Result<Vec<EventEnvelope>, AggregateError> {
        let pending = self.applied_events();
        if pending.is_empty() {
            return Ok(Vec::new());
        }

        let aggregate_type = A::aggregate_type();
        let aggregate_id = self.id().ok_or(AggregateError::MissingIdentity { aggregate_type })?;
        let base = self.version().as_i64() - pending.len() as i64;

        let envelopes = pending
            .iter()
            .zip(1..)
            .map(|(event, offset)| {
                let event_type = event.event_type();
                EventEnvelope::encode(
                    aggregate_id,
                    aggregate_type,
                    Version::new(base + offset),
                    event_type,
                    event,
                )
                .map_err(|source| AggregateError::Encode {
                    aggregate_type,
                    event_type,
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.pop_applied_events();
        Ok(envelopes)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Registry of the aggregates touched by one command.
pub trait IdentityMap: Send {
    /// Every tracked aggregate, in the order the bus drains them.
    ///
    /// The order must not change between two calls within one unit of work.
    fn all(&mut self) -> Vec<&mut dyn EventSource>;
}

/// Default [`IdentityMap`]: one instance per (aggregate type, id), drained
/// in the order aggregates were first tracked.
#[derive(Default)]
pub struct AggregateMap {
    entries: Vec<Box<dyn EventSource>>,
    index: HashMap<(TypeId, AggregateId), usize>,
}

impl AggregateMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking `aggregate` and hands back the tracked instance.
    pub fn track<A: AggregateRoot>(&mut self, aggregate: A) -> Result<&mut A, AggregateError> {
        let aggregate_type = A::aggregate_type();
        let aggregate_id = aggregate
            .id()
            .ok_or(AggregateError::MissingIdentity { aggregate_type })?;

        let key = (TypeId::of::<A>(), aggregate_id);
        if self.index.contains_key(&key) {
            return Err(AggregateError::AlreadyTracked {
                aggregate_type,
                aggregate_id,
            });
        }

        self.index.insert(key, self.entries.len());
        self.entries.push(Box::new(aggregate));

        self.entries
            .last_mut()
            .and_then(|entry| entry.as_any_mut().downcast_mut::<A>())
            .ok_or(AggregateError::TypeMismatch { aggregate_type })
    }

    pub fn get<A: AggregateRoot>(&self, aggregate_id: AggregateId) -> Option<&A> {
        let position = self.index.get(&(TypeId::of::<A>(), aggregate_id))?;
        self.entries[*position].as_any().downcast_ref::<A>()
    }

    pub fn get_mut<A: AggregateRoot>(&mut self, aggregate_id: AggregateId) -> Option<&mut A> {
        let position = *self.index.get(&(TypeId::of::<A>(), aggregate_id))?;
        self.entries[position].as_any_mut().downcast_mut::<A>()
    }

    pub fn contains<A: AggregateRoot>(&self, aggregate_id: AggregateId) -> bool {
        self.index.contains_key(&(TypeId::of::<A>(), aggregate_id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of buffered events across tracked aggregates.
    pub fn pending_count(&self) -> usize {
        self.entries.iter().map(|entry| entry.pending_count()).sum()
    }
}

impl IdentityMap for AggregateMap {
    fn all(&mut self) -> Vec<&mut dyn EventSource> {
        let mut sources: Vec<&mut dyn EventSource> = Vec::with_capacity(self.entries.len());
        for entry in &mut self.entries {
            sources.push(entry.as_mut());
        }
        sources
    }
}

impl std::fmt::Debug for AggregateMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(
                self.entries
                    .iter()
                    .map(|entry| (entry.source_type(), entry.source_id())),
            )
            .finish()
    }
}
