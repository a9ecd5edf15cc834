use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    AggregateId, EventEnvelope, EventStoreError, Result, Snapshot, Version,
    store::{AppendOptions, EventStore, validate_events_for_append},
};

type Stream = Arc<RwLock<Vec<EventEnvelope>>>;

/// In-memory event store.
///
/// Each aggregate has its own lock-protected stream. The outer map is only
/// write-locked to register a new stream, so appends to different showings
/// proceed in parallel while appends to the same showing serialize on that
/// showing's stream lock. Readers take the stream's read lock and see a
/// batch either entirely or not at all.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    streams: Arc<RwLock<HashMap<AggregateId, Stream>>>,
    snapshots: Arc<RwLock<HashMap<AggregateId, Snapshot>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of events across all streams.
    pub async fn event_count(&self) -> usize {
        let streams: Vec<Stream> = self.streams.read().await.values().cloned().collect();
        let mut count = 0;
        for stream in streams {
            count += stream.read().await.len();
        }
        count
    }

    async fn stream(&self, aggregate_id: AggregateId) -> Option<Stream> {
        self.streams.read().await.get(&aggregate_id).cloned()
    }

    async fn stream_or_create(&self, aggregate_id: AggregateId) -> Stream {
        if let Some(stream) = self.stream(aggregate_id).await {
            return stream;
        }
        self.streams
            .write()
            .await
            .entry(aggregate_id)
            .or_default()
            .clone()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, events: Vec<EventEnvelope>, options: AppendOptions) -> Result<Version> {
        validate_events_for_append(&events)?;

        let aggregate_id = events[0].aggregate_id;
        let first_version = events[0].version;
        let stream = self.stream_or_create(aggregate_id).await;

        // Held across check and write: this is the compare-and-swap.
        let mut stored = stream.write().await;
        let current = stored
            .last()
            .map(|e| e.version)
            .unwrap_or(Version::initial());

        if let Some(expected) = options.expected_version
            && current != expected
        {
            tracing::debug!(%aggregate_id, %expected, %current, "append rejected: stale version");
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected,
                actual: current,
            });
        }

        if first_version != current.next() {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected: options.expected_version.unwrap_or(current),
                actual: current,
            });
        }

        let last_version = events.last().map(|e| e.version).unwrap_or(current);
        stored.extend(events);
        Ok(last_version)
    }

    async fn get_events_for_aggregate(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<Vec<EventEnvelope>> {
        match self.stream(aggregate_id).await {
            Some(stream) => Ok(stream.read().await.clone()),
            None => Ok(Vec::new()),
        }
    }

    async fn get_events_for_aggregate_from_version(
        &self,
        aggregate_id: AggregateId,
        from_version: Version,
    ) -> Result<Vec<EventEnvelope>> {
        let Some(stream) = self.stream(aggregate_id).await else {
            return Ok(Vec::new());
        };
        let stored = stream.read().await;
        Ok(stored
            .iter()
            .filter(|e| e.version >= from_version)
            .cloned()
            .collect())
    }

    async fn get_aggregate_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>> {
        let Some(stream) = self.stream(aggregate_id).await else {
            return Ok(None);
        };
        Ok(stream.read().await.last().map(|e| e.version))
    }

    async fn aggregate_ids(&self, aggregate_type: &str) -> Result<Vec<AggregateId>> {
        let streams: Vec<(AggregateId, Stream)> = self
            .streams
            .read()
            .await
            .iter()
            .map(|(id, stream)| (*id, stream.clone()))
            .collect();

        let mut found = Vec::new();
        for (id, stream) in streams {
            let stored = stream.read().await;
            if let Some(first) = stored.first()
                && first.aggregate_type == aggregate_type
            {
                found.push((first.timestamp, id));
            }
        }
        found.sort();
        Ok(found.into_iter().map(|(_, id)| id).collect())
    }

    async fn save_snapshot(&self, snapshot: Snapshot) -> Result<()> {
        let mut snapshots = self.snapshots.write().await;
        match snapshots.get(&snapshot.aggregate_id) {
            Some(existing) if existing.version >= snapshot.version => {}
            _ => {
                snapshots.insert(snapshot.aggregate_id, snapshot);
            }
        }
        Ok(())
    }

    async fn get_snapshot(&self, aggregate_id: AggregateId) -> Result<Option<Snapshot>> {
        Ok(self.snapshots.read().await.get(&aggregate_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(aggregate_id: AggregateId, aggregate_type: &str, version: i64) -> EventEnvelope {
        EventEnvelope::builder()
            .aggregate_id(aggregate_id)
            .aggregate_type(aggregate_type)
            .event_type("TestEvent")
            .version(Version::new(version))
            .payload_raw(serde_json::json!({"test": true}))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn append_to_new_stream() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();

        let version = store
            .append(vec![event(id, "Showing", 1)], AppendOptions::expect_new())
            .await
            .unwrap();

        assert_eq!(version, Version::first());
        assert_eq!(store.get_events_for_aggregate(id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn append_batch_returns_last_version() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();
        let batch = vec![
            event(id, "Showing", 1),
            event(id, "Showing", 2),
            event(id, "Showing", 3),
        ];

        let version = store.append(batch, AppendOptions::expect_new()).await.unwrap();
        assert_eq!(version, Version::new(3));
    }

    #[tokio::test]
    async fn stale_expected_version_is_rejected() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();
        store
            .append(vec![event(id, "Showing", 1)], AppendOptions::expect_new())
            .await
            .unwrap();

        let result = store
            .append(
                vec![event(id, "Showing", 2)],
                AppendOptions::expect_version(Version::initial()),
            )
            .await;

        assert!(matches!(
            result,
            Err(EventStoreError::ConcurrencyConflict { actual, .. }) if actual == Version::first()
        ));
        assert_eq!(store.event_count().await, 1);
    }

    #[tokio::test]
    async fn unchecked_append_still_requires_next_version() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();
        store
            .append(vec![event(id, "Showing", 1)], AppendOptions::new())
            .await
            .unwrap();

        let duplicate = store
            .append(vec![event(id, "Showing", 1)], AppendOptions::new())
            .await;
        assert!(duplicate.unwrap_err().is_concurrency_conflict());
    }

    #[tokio::test]
    async fn racing_appends_at_same_version_admit_one() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();
        store
            .append(vec![event(id, "Showing", 1)], AppendOptions::expect_new())
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .append(
                        vec![event(id, "Showing", 2)],
                        AppendOptions::expect_version(Version::first()),
                    )
                    .await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(
            store.get_aggregate_version(id).await.unwrap(),
            Some(Version::new(2))
        );
    }

    #[tokio::test]
    async fn events_from_version() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();
        let batch = vec![
            event(id, "Showing", 1),
            event(id, "Showing", 2),
            event(id, "Showing", 3),
        ];
        store.append(batch, AppendOptions::new()).await.unwrap();

        let tail = store
            .get_events_for_aggregate_from_version(id, Version::new(2))
            .await
            .unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].version, Version::new(2));
    }

    #[tokio::test]
    async fn aggregate_ids_filters_by_type_in_creation_order() {
        let store = InMemoryEventStore::new();
        let first = AggregateId::new();
        let movie = AggregateId::new();
        let second = AggregateId::new();

        for (id, kind) in [(first, "Showing"), (movie, "Movie"), (second, "Showing")] {
            store
                .append(vec![event(id, kind, 1)], AppendOptions::expect_new())
                .await
                .unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        let showings = store.aggregate_ids("Showing").await.unwrap();
        assert_eq!(showings, vec![first, second]);
        assert_eq!(store.aggregate_ids("Movie").await.unwrap(), vec![movie]);
    }

    #[tokio::test]
    async fn failed_append_leaves_no_visible_aggregate() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();

        let result = store
            .append(
                vec![event(id, "Showing", 1)],
                AppendOptions::expect_version(Version::new(3)),
            )
            .await;

        assert!(result.is_err());
        assert!(store.get_aggregate_version(id).await.unwrap().is_none());
        assert!(store.aggregate_ids("Showing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn newer_snapshot_wins() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();

        for version in [10, 30, 20] {
            let snapshot =
                Snapshot::from_state(id, "Showing", Version::new(version), &version).unwrap();
            store.save_snapshot(snapshot).await.unwrap();
        }

        let latest = store.get_snapshot(id).await.unwrap().unwrap();
        assert_eq!(latest.version, Version::new(30));
        assert!(store.get_snapshot(AggregateId::new()).await.unwrap().is_none());
    }
}
