use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread::{self, ThreadId};

use crate::{
    AggregateId, EventEnvelope, EventStoreError, Result, Version,
    store::{EventHistory, EventStore, validate_batch},
};

#[derive(Default)]
struct Inner {
    committed: Vec<EventEnvelope>,
    versions: HashMap<AggregateId, Version>,
    /// Open transactions, one per thread.
    staged: HashMap<ThreadId, Vec<EventEnvelope>>,
}

/// In-memory event store.
///
/// Clones share the same log. Transactions belong to the thread that began
/// them: each thread stages into its own buffer, so units of work running
/// on different threads never see or commit each other's events. Writers
/// racing on the same aggregate are told apart by the version check at
/// commit, the later one fails with
/// [`EventStoreError::ConcurrencyConflict`].
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed events.
    pub fn event_count(&self) -> Result<usize> {
        Ok(self.read()?.committed.len())
    }

    /// Number of events staged in the calling thread's transaction.
    pub fn staged_count(&self) -> Result<usize> {
        Ok(self
            .read()?
            .staged
            .get(&thread::current().id())
            .map_or(0, Vec::len))
    }

    /// Number of transactions currently open, across all threads.
    pub fn open_transactions(&self) -> Result<usize> {
        Ok(self.read()?.staged.len())
    }

    /// Every committed event, in commit order.
    pub fn all_events(&self) -> Result<Vec<EventEnvelope>> {
        Ok(self.read()?.committed.clone())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>> {
        self.inner.read().map_err(|_| EventStoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>> {
        self.inner.write().map_err(|_| EventStoreError::Poisoned)
    }
}

impl EventStore for InMemoryEventStore {
    fn begin_transaction(&self) -> Result<()> {
        let mut inner = self.write()?;
        if let Some(stale) = inner.staged.insert(thread::current().id(), Vec::new())
            && !stale.is_empty()
        {
            tracing::debug!(discarded = stale.len(), "discarded stale staged events");
        }
        Ok(())
    }

    fn add(&self, event: EventEnvelope) -> Result<()> {
        let mut inner = self.write()?;
        let staged = inner
            .staged
            .get_mut(&thread::current().id())
            .ok_or(EventStoreError::NoActiveTransaction)?;
        staged.push(event);
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    fn commit(&self) -> Result<()> {
        let mut inner = self.write()?;
        let staged = inner
            .staged
            .remove(&thread::current().id())
            .ok_or(EventStoreError::NoActiveTransaction)?;

        validate_batch(&staged)?;

        // Each aggregate's first staged event must continue its committed history
        let mut checked = HashSet::new();
        for event in &staged {
            if !checked.insert(event.aggregate_id) {
                continue;
            }
            let current = inner
                .versions
                .get(&event.aggregate_id)
                .copied()
                .unwrap_or(Version::initial());
            if event.version != current.next() {
                return Err(EventStoreError::ConcurrencyConflict {
                    aggregate_id: event.aggregate_id,
                    expected: Version::new(event.version.as_i64() - 1),
                    actual: current,
                });
            }
        }

        let count = staged.len();
        for event in staged {
            inner.versions.insert(event.aggregate_id, event.version);
            inner.committed.push(event);
        }

        metrics::counter!("event_store_events_committed_total").increment(count as u64);
        tracing::debug!(events = count, "transaction committed");
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        let mut inner = self.write()?;
        if let Some(staged) = inner.staged.remove(&thread::current().id()) {
            tracing::debug!(discarded = staged.len(), "transaction rolled back");
        }
        Ok(())
    }
}

impl EventHistory for InMemoryEventStore {
    fn events_for_aggregate(&self, aggregate_id: AggregateId) -> Result<Vec<EventEnvelope>> {
        let inner = self.read()?;
        let mut events: Vec<_> = inner
            .committed
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.version);
        Ok(events)
    }

    fn aggregate_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>> {
        Ok(self.read()?.versions.get(&aggregate_id).copied())
    }
}
