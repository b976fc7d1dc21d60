//! Loading aggregates from committed history into a unit of work.

use event_store::{AggregateId, EventHistory};

use crate::aggregate::AggregateRoot;
use crate::error::{AggregateError, RepositoryError};
use crate::identity_map::AggregateMap;

/// Rebuilds aggregates by replaying committed events.
#[derive(Debug, Clone)]
pub struct Repository<S> {
    history: S,
}

impl<S: EventHistory> Repository<S> {
    pub fn new(history: S) -> Self {
        Self { history }
    }

    pub fn history(&self) -> &S {
        &self.history
    }

    /// Replays the aggregate's committed history.
    ///
    /// Returns `None` if the aggregate has no history.
    #[tracing::instrument(skip(self), fields(aggregate_type = A::aggregate_type()))]
    pub fn load<A>(&self, aggregate_id: AggregateId) -> Result<Option<A>, RepositoryError>
    where
        A: AggregateRoot + Default,
    {
        let envelopes = self.history.events_for_aggregate(aggregate_id)?;
        if envelopes.is_empty() {
            return Ok(None);
        }

        let events = envelopes
            .iter()
            .map(|envelope| {
                envelope
                    .decode::<A::Event>()
                    .map_err(|source| AggregateError::Decode {
                        aggregate_type: A::aggregate_type(),
                        event_type: envelope.event_type.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let aggregate = A::from_history(events)?;
        tracing::debug!(version = %aggregate.version(), "aggregate loaded");
        Ok(Some(aggregate))
    }

    /// Returns the instance tracked by `identity_map`, loading and tracking
    /// it first if this unit of work has not touched it yet.
    pub fn get<'m, A>(
        &self,
        identity_map: &'m mut AggregateMap,
        aggregate_id: AggregateId,
    ) -> Result<&'m mut A, RepositoryError>
    where
        A: AggregateRoot + Default,
    {
        if !identity_map.contains::<A>(aggregate_id) {
            let aggregate = self.load::<A>(aggregate_id)?.ok_or(RepositoryError::NotFound {
                aggregate_type: A::aggregate_type(),
                aggregate_id,
            })?;
            return Ok(identity_map.track(aggregate)?);
        }

        identity_map
            .get_mut::<A>(aggregate_id)
            .ok_or(RepositoryError::Aggregate(AggregateError::TypeMismatch {
                aggregate_type: A::aggregate_type(),
            }))
    }

    /// Tracks a newly created aggregate so the bus publishes its events.
    pub fn add<'m, A>(
        &self,
        identity_map: &'m mut AggregateMap,
        aggregate: A,
    ) -> Result<&'m mut A, RepositoryError>
    where
        A: AggregateRoot,
    {
        Ok(identity_map.track(aggregate)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::AggregateRoot;
    use crate::identity_map::EventSource;
    use crate::testing::Tally;
    use event_store::{EventEnvelope, EventStore, InMemoryEventStore, Version};

    fn seed(store: &InMemoryEventStore, tally: &mut Tally) {
        store.begin_transaction().unwrap();
        for envelope in tally.drain_envelopes().unwrap() {
            store.add(envelope).unwrap();
        }
        store.commit().unwrap();
    }

    #[test]
    fn test_load_replays_committed_history() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();
        let mut tally = Tally::start(id).unwrap();
        tally.increment(4).unwrap();
        tally.increment(6).unwrap();
        seed(&store, &mut tally);

        let repository = Repository::new(store);
        let loaded: Tally = repository.load(id).unwrap().unwrap();

        assert_eq!(loaded.total(), 10);
        assert_eq!(loaded.version(), Version::new(3));
        assert!(loaded.applied_events().is_empty());
    }

    #[test]
    fn test_load_returns_none_without_history() {
        let repository = Repository::new(InMemoryEventStore::new());
        let loaded: Option<Tally> = repository.load(AggregateId::new()).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_load_reports_undecodable_events() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();
        store.begin_transaction().unwrap();
        store
            .add(EventEnvelope::new(
                id,
                "Tally",
                Version::new(1),
                "Started",
                serde_json::json!({ "garbage": 1 }),
            ))
            .unwrap();
        store.commit().unwrap();

        let repository = Repository::new(store);
        let result = repository.load::<Tally>(id);

        assert!(matches!(
            result,
            Err(RepositoryError::Aggregate(AggregateError::Decode { .. }))
        ));
    }

    #[test]
    fn test_get_reuses_the_tracked_instance() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();
        seed(&store, &mut Tally::start(id).unwrap());

        let repository = Repository::new(store);
        let mut map = AggregateMap::new();

        repository
            .get::<Tally>(&mut map, id)
            .unwrap()
            .increment(1)
            .unwrap();
        let again = repository.get::<Tally>(&mut map, id).unwrap();

        assert_eq!(again.total(), 1);
        assert_eq!(again.applied_events().len(), 1);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_add_tracks_new_aggregate_for_later_gets() {
        let repository = Repository::new(InMemoryEventStore::new());
        let mut map = AggregateMap::new();
        let id = AggregateId::new();

        repository.add(&mut map, Tally::start(id).unwrap()).unwrap();
        let tracked = repository.get::<Tally>(&mut map, id).unwrap();

        assert_eq!(tracked.applied_events().len(), 1);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_get_fails_for_unknown_aggregate() {
        let repository = Repository::new(InMemoryEventStore::new());
        let mut map = AggregateMap::new();

        let result = repository.get::<Tally>(&mut map, AggregateId::new());

        assert!(matches!(result, Err(RepositoryError::NotFound { .. })));
        assert!(map.is_empty());
    }
}
