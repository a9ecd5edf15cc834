//! Command handling infrastructure.

use std::marker::PhantomData;

use common::AggregateId;
use event_store::{AppendOptions, EventEnvelope, EventStore, EventStoreExt, Snapshot, Version};
use serde::{Serialize, de::DeserializeOwned};

use crate::aggregate::{Aggregate, DomainEvent, SnapshotCapable};
use crate::error::DomainError;

/// Default number of load-decide-append rounds before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 16;

/// Outcome of a successfully executed command.
#[derive(Debug)]
pub struct CommandResult<A: Aggregate> {
    /// State after the new events were applied.
    pub aggregate: A,

    /// Events that were persisted. Empty when the command was a no-op.
    pub events: Vec<A::Event>,

    pub new_version: Version,
}

/// An intention to change one aggregate.
pub trait Command: Send + Sync {
    type Aggregate: Aggregate;

    fn aggregate_id(&self) -> AggregateId;
}

/// Runs commands against aggregates stored in an [`EventStore`].
///
/// Each attempt loads the aggregate, asks the command to decide on events
/// from that state, and appends them with the loaded version as the
/// expected version. If another writer got there first the append fails
/// with a concurrency conflict and the whole round is repeated against
/// fresh state, up to `max_attempts` times. Business errors returned by the
/// command are never retried.
pub struct CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    store: S,
    max_attempts: u32,
    _phantom: PhantomData<A>,
}

impl<S, A> CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate + DeserializeOwned,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            _phantom: PhantomData,
        }
    }

    /// Overrides the retry bound. Values below 1 are treated as 1.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Rebuilds an aggregate from its snapshot and events.
    ///
    /// Returns a default (uncreated) instance when the stream is empty or
    /// belongs to another aggregate type.
    pub async fn load(&self, aggregate_id: AggregateId) -> Result<A, DomainError> {
        let (snapshot, events) = self.store.load_aggregate(aggregate_id).await?;

        let stream_type = match &snapshot {
            Some(snapshot) => Some(snapshot.aggregate_type.as_str()),
            None => events.first().map(|event| event.aggregate_type.as_str()),
        };
        if stream_type.is_some_and(|t| t != A::aggregate_type()) {
            tracing::debug!(%aggregate_id, expected = A::aggregate_type(), "stream has another aggregate type");
            return Ok(A::default());
        }

        let mut aggregate = match snapshot {
            Some(snapshot) => snapshot.into_state()?,
            None => A::default(),
        };

        for envelope in events {
            let event: A::Event = serde_json::from_value(envelope.payload)?;
            aggregate.apply(event);
            aggregate.set_version(envelope.version);
        }

        Ok(aggregate)
    }

    pub async fn load_existing(&self, aggregate_id: AggregateId) -> Result<Option<A>, DomainError> {
        let aggregate = self.load(aggregate_id).await?;
        Ok(aggregate.id().is_some().then_some(aggregate))
    }

    /// Executes a command that may create the aggregate.
    pub async fn execute<F>(
        &self,
        aggregate_id: AggregateId,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: Fn(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        self.run(aggregate_id, false, command_fn).await
    }

    /// Executes a command against an aggregate that must already exist.
    ///
    /// Fails with [`DomainError::AggregateNotFound`] before the command
    /// runs if the stream is empty.
    pub async fn execute_existing<F>(
        &self,
        aggregate_id: AggregateId,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: Fn(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        self.run(aggregate_id, true, command_fn).await
    }

    async fn run<F>(
        &self,
        aggregate_id: AggregateId,
        require_existing: bool,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: Fn(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;

            let aggregate = self.load(aggregate_id).await?;
            if require_existing && aggregate.id().is_none() {
                return Err(DomainError::AggregateNotFound {
                    aggregate_type: A::aggregate_type(),
                    aggregate_id,
                });
            }

            match self.commit(aggregate_id, aggregate, attempt, &command_fn).await {
                Err(DomainError::EventStore(e)) if e.is_concurrency_conflict() => {
                    metrics::counter!("cas_retries_total", "aggregate" => A::aggregate_type())
                        .increment(1);
                    if attempt >= self.max_attempts {
                        tracing::warn!(%aggregate_id, attempt, "giving up after repeated version conflicts");
                        return Err(DomainError::Contention {
                            aggregate_id,
                            attempts: attempt,
                        });
                    }
                    tracing::debug!(%aggregate_id, attempt, "lost version race, reloading");
                }
                outcome => return outcome,
            }
        }
    }

    async fn commit<F>(
        &self,
        aggregate_id: AggregateId,
        mut aggregate: A,
        attempt: u32,
        command_fn: &F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: Fn(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let current_version = aggregate.version();
        let events = command_fn(&aggregate)?;

        if events.is_empty() {
            return Ok(CommandResult {
                aggregate,
                events,
                new_version: current_version,
            });
        }

        let envelopes = build_envelopes::<A>(aggregate_id, current_version, attempt, &events)?;
        let new_version = self
            .store
            .append(envelopes, AppendOptions::expect_version(current_version))
            .await?;

        for event in &events {
            aggregate.apply(event.clone());
        }
        aggregate.set_version(new_version);

        Ok(CommandResult {
            aggregate,
            events,
            new_version,
        })
    }
}

impl<S, A> CommandHandler<S, A>
where
    S: EventStore,
    A: SnapshotCapable,
{
    /// Like [`execute_existing`](Self::execute_existing), then stores a
    /// snapshot when the new version lands on the snapshot interval.
    ///
    /// The events are already committed at that point, so a failed snapshot
    /// write is logged and does not fail the command.
    pub async fn execute_existing_with_snapshot<F>(
        &self,
        aggregate_id: AggregateId,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: Fn(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let result = self.execute_existing(aggregate_id, command_fn).await?;

        if !result.events.is_empty() && result.aggregate.should_snapshot() {
            let saved = match Snapshot::from_state(
                aggregate_id,
                A::aggregate_type(),
                result.new_version,
                &result.aggregate,
            ) {
                Ok(snapshot) => self
                    .store
                    .save_snapshot(snapshot)
                    .await
                    .map_err(DomainError::EventStore),
                Err(e) => Err(DomainError::Serialization(e)),
            };
            if let Err(e) = saved {
                tracing::warn!(%aggregate_id, error = %e, "failed to save snapshot");
            }
        }

        Ok(result)
    }
}

fn build_envelopes<A: Aggregate>(
    aggregate_id: AggregateId,
    current_version: Version,
    attempt: u32,
    events: &[A::Event],
) -> Result<Vec<EventEnvelope>, DomainError>
where
    A::Event: Serialize,
{
    let mut envelopes = Vec::with_capacity(events.len());
    let mut version = current_version;

    for event in events {
        version = version.next();
        let envelope = EventEnvelope::builder()
            .aggregate_id(aggregate_id)
            .aggregate_type(A::aggregate_type())
            .event_type(event.event_type())
            .version(version)
            .metadata("attempt", serde_json::json!(attempt))
            .payload(event)?
            .build()?;
        envelopes.push(envelope);
    }

    Ok(envelopes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::showing::ShowingError;
    use event_store::{EventStoreError, InMemoryEventStore};
    use serde::Deserialize;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    enum TallyEvent {
        Opened { id: AggregateId },
        Added { amount: u32 },
    }

    impl DomainEvent for TallyEvent {
        fn event_type(&self) -> &'static str {
            match self {
                TallyEvent::Opened { .. } => "TallyOpened",
                TallyEvent::Added { .. } => "TallyAdded",
            }
        }
    }

    #[derive(Debug, Default, Clone, Serialize, Deserialize)]
    struct Tally {
        id: Option<AggregateId>,
        total: u32,
        #[serde(default)]
        version: Version,
    }

    impl Aggregate for Tally {
        type Event = TallyEvent;
        type Error = ShowingError;

        fn aggregate_type() -> &'static str {
            "Tally"
        }

        fn id(&self) -> Option<AggregateId> {
            self.id
        }

        fn version(&self) -> Version {
            self.version
        }

        fn set_version(&mut self, version: Version) {
            self.version = version;
        }

        fn apply(&mut self, event: Self::Event) {
            match event {
                TallyEvent::Opened { id } => self.id = Some(id),
                TallyEvent::Added { amount } => self.total += amount,
            }
        }
    }

    impl SnapshotCapable for Tally {
        fn snapshot_interval() -> usize {
            3
        }
    }

    fn add(amount: u32) -> impl Fn(&Tally) -> Result<Vec<TallyEvent>, ShowingError> {
        move |_| {
            if amount == 0 {
                Err(ShowingError::SeatsRequired)
            } else {
                Ok(vec![TallyEvent::Added { amount }])
            }
        }
    }

    /// Store that reports a version conflict on the first `n` appends.
    #[derive(Clone)]
    struct FlakyStore {
        inner: InMemoryEventStore,
        conflicts_left: Arc<AtomicU32>,
    }

    #[async_trait::async_trait]
    impl EventStore for FlakyStore {
        async fn append(
            &self,
            events: Vec<EventEnvelope>,
            options: AppendOptions,
        ) -> event_store::Result<Version> {
            if self
                .conflicts_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(EventStoreError::ConcurrencyConflict {
                    aggregate_id: events[0].aggregate_id,
                    expected: options.expected_version.unwrap_or_default(),
                    actual: options.expected_version.unwrap_or_default().next(),
                });
            }
            self.inner.append(events, options).await
        }

        async fn get_events_for_aggregate(
            &self,
            aggregate_id: AggregateId,
        ) -> event_store::Result<Vec<EventEnvelope>> {
            self.inner.get_events_for_aggregate(aggregate_id).await
        }

        async fn get_events_for_aggregate_from_version(
            &self,
            aggregate_id: AggregateId,
            from_version: Version,
        ) -> event_store::Result<Vec<EventEnvelope>> {
            self.inner
                .get_events_for_aggregate_from_version(aggregate_id, from_version)
                .await
        }

        async fn get_aggregate_version(
            &self,
            aggregate_id: AggregateId,
        ) -> event_store::Result<Option<Version>> {
            self.inner.get_aggregate_version(aggregate_id).await
        }

        async fn aggregate_ids(&self, aggregate_type: &str) -> event_store::Result<Vec<AggregateId>> {
            self.inner.aggregate_ids(aggregate_type).await
        }

        async fn save_snapshot(&self, snapshot: Snapshot) -> event_store::Result<()> {
            self.inner.save_snapshot(snapshot).await
        }

        async fn get_snapshot(
            &self,
            aggregate_id: AggregateId,
        ) -> event_store::Result<Option<Snapshot>> {
            self.inner.get_snapshot(aggregate_id).await
        }
    }

    async fn opened(handler: &CommandHandler<impl EventStore, Tally>) -> AggregateId {
        let id = AggregateId::new();
        handler
            .execute(id, |_| Ok(vec![TallyEvent::Opened { id }]))
            .await
            .unwrap();
        id
    }

    #[tokio::test]
    async fn execute_creates_and_updates() {
        let handler: CommandHandler<_, Tally> = CommandHandler::new(InMemoryEventStore::new());
        let id = opened(&handler).await;

        let result = handler.execute_existing(id, add(5)).await.unwrap();
        assert_eq!(result.aggregate.total, 5);
        assert_eq!(result.new_version, Version::new(2));

        let reloaded = handler.load(id).await.unwrap();
        assert_eq!(reloaded.total, 5);
        assert_eq!(reloaded.version(), Version::new(2));
    }

    #[tokio::test]
    async fn execute_existing_rejects_missing_aggregate() {
        let store = InMemoryEventStore::new();
        let handler: CommandHandler<_, Tally> = CommandHandler::new(store.clone());

        let err = handler
            .execute_existing(AggregateId::new(), add(1))
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(store.event_count().await, 0);
    }

    #[tokio::test]
    async fn command_error_writes_nothing() {
        let store = InMemoryEventStore::new();
        let handler: CommandHandler<_, Tally> = CommandHandler::new(store.clone());
        let id = opened(&handler).await;

        assert!(handler.execute_existing(id, add(0)).await.is_err());
        assert_eq!(store.event_count().await, 1);
    }

    #[tokio::test]
    async fn empty_decision_is_not_persisted() {
        let store = InMemoryEventStore::new();
        let handler: CommandHandler<_, Tally> = CommandHandler::new(store.clone());
        let id = opened(&handler).await;

        let result = handler.execute_existing(id, |_| Ok(vec![])).await.unwrap();
        assert!(result.events.is_empty());
        assert_eq!(result.new_version, Version::first());
        assert_eq!(store.event_count().await, 1);
    }

    #[tokio::test]
    async fn version_conflicts_are_retried() {
        let store = FlakyStore {
            inner: InMemoryEventStore::new(),
            conflicts_left: Arc::new(AtomicU32::new(0)),
        };
        let handler: CommandHandler<_, Tally> = CommandHandler::new(store.clone());
        let id = opened(&handler).await;

        store.conflicts_left.store(3, Ordering::SeqCst);
        let result = handler.execute_existing(id, add(2)).await.unwrap();

        assert_eq!(result.aggregate.total, 2);
        assert_eq!(store.conflicts_left.load(Ordering::SeqCst), 0);

        let events = store.get_events_for_aggregate(id).await.unwrap();
        assert_eq!(events[0].metadata["attempt"], serde_json::json!(1));
        assert_eq!(events[1].metadata["attempt"], serde_json::json!(4));
    }

    #[tokio::test]
    async fn stream_of_another_type_loads_as_missing() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();
        let foreign = EventEnvelope::builder()
            .aggregate_id(id)
            .aggregate_type("Movie")
            .event_type("MovieAdded")
            .version(Version::first())
            .payload_raw(serde_json::json!({"type": "MovieAdded", "data": {}}))
            .build()
            .unwrap();
        store
            .append(vec![foreign], AppendOptions::expect_new())
            .await
            .unwrap();

        let handler: CommandHandler<_, Tally> = CommandHandler::new(store.clone());
        assert!(handler.load_existing(id).await.unwrap().is_none());

        let err = handler.execute_existing(id, add(1)).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.event_count().await, 1);
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let store = FlakyStore {
            inner: InMemoryEventStore::new(),
            conflicts_left: Arc::new(AtomicU32::new(0)),
        };
        let handler: CommandHandler<_, Tally> =
            CommandHandler::new(store.clone()).with_max_attempts(2);
        let id = opened(&handler).await;

        store.conflicts_left.store(5, Ordering::SeqCst);
        let err = handler.execute_existing(id, add(2)).await.unwrap_err();

        assert!(matches!(err, DomainError::Contention { attempts: 2, .. }));
        assert_eq!(handler.load(id).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn snapshot_taken_on_interval_and_used_on_load() {
        let store = InMemoryEventStore::new();
        let handler: CommandHandler<_, Tally> = CommandHandler::new(store.clone());
        let id = opened(&handler).await;

        handler.execute_existing_with_snapshot(id, add(1)).await.unwrap();
        assert!(store.get_snapshot(id).await.unwrap().is_none());

        handler.execute_existing_with_snapshot(id, add(1)).await.unwrap();
        let snapshot = store.get_snapshot(id).await.unwrap().unwrap();
        assert_eq!(snapshot.version, Version::new(3));

        handler.execute_existing_with_snapshot(id, add(10)).await.unwrap();
        let reloaded = handler.load(id).await.unwrap();
        assert_eq!(reloaded.total, 12);
        assert_eq!(reloaded.version(), Version::new(4));
    }
}
