use std::collections::HashMap;
use std::sync::Arc;

use crate::{AggregateId, EventEnvelope, EventStoreError, Result, Version};

/// Transactional, append-only sink for events.
///
/// The caller drives the transaction: `begin_transaction`, any number of
/// `add` calls, then exactly one of `commit` or `rollback`. Nothing staged
/// is visible to readers until `commit` succeeds.
pub trait EventStore: Send + Sync {
    /// Starts a fresh transaction.
    ///
    /// Anything left staged by an earlier attempt that never reached
    /// `commit` or `rollback` is discarded.
    fn begin_transaction(&self) -> Result<()>;

    /// Stages one event in the active transaction.
    fn add(&self, event: EventEnvelope) -> Result<()>;

    /// Durably persists every staged event, in staging order.
    fn commit(&self) -> Result<()>;

    /// Discards every staged event. Committed history is left untouched.
    fn rollback(&self) -> Result<()>;
}

/// Read access to committed history.
pub trait EventHistory: Send + Sync {
    /// Committed events of one aggregate, oldest first.
    fn events_for_aggregate(&self, aggregate_id: AggregateId) -> Result<Vec<EventEnvelope>>;

    /// Current version of an aggregate, `None` if it has no history.
    fn aggregate_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>> {
        Ok(self
            .events_for_aggregate(aggregate_id)?
            .last()
            .map(|event| event.version))
    }
}

impl<T: EventStore + ?Sized> EventStore for Arc<T> {
    fn begin_transaction(&self) -> Result<()> {
        (**self).begin_transaction()
    }

    fn add(&self, event: EventEnvelope) -> Result<()> {
        (**self).add(event)
    }

    fn commit(&self) -> Result<()> {
        (**self).commit()
    }

    fn rollback(&self) -> Result<()> {
        (**self).rollback()
    }
}

impl<T: EventHistory + ?Sized> EventHistory for Arc<T> {
    fn events_for_aggregate(&self, aggregate_id: AggregateId) -> Result<Vec<EventEnvelope>> {
        (**self).events_for_aggregate(aggregate_id)
    }
}

/// Checks that a staged batch is internally consistent.
///
/// Events of the same aggregate must share one aggregate type and carry
/// consecutive versions in staging order. Events of different aggregates may
/// interleave.
pub fn validate_batch(events: &[EventEnvelope]) -> Result<()> {
    let mut last_seen: HashMap<AggregateId, (&str, Version)> = HashMap::new();

    for event in events {
        if let Some((aggregate_type, version)) = last_seen.get(&event.aggregate_id) {
            if *aggregate_type != event.aggregate_type {
                return Err(EventStoreError::InvalidBatch(format!(
                    "aggregate {} staged as both {} and {}",
                    event.aggregate_id, aggregate_type, event.aggregate_type
                )));
            }
            if event.version != version.next() {
                return Err(EventStoreError::InvalidBatch(format!(
                    "aggregate {}: expected version {}, got {}",
                    event.aggregate_id,
                    version.next(),
                    event.version
                )));
            }
        }
        last_seen.insert(
            event.aggregate_id,
            (event.aggregate_type.as_str(), event.version),
        );
    }

    Ok(())
}
