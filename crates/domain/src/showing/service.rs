//! Showing service: the seat ledger's public operations.

use common::AggregateId;
use event_store::{EventEnvelope, EventStore};

use crate::aggregate::Aggregate;
use crate::command::{Command, CommandHandler};
use crate::error::DomainError;
use crate::movie::MovieCatalog;

use super::{CreateShowing, SeatTransition, Showing, TransitionSeats};

/// Creates showings and moves their seats between pools.
///
/// Each transition is evaluated against the showing's latest state and
/// committed with an expected-version append, so concurrent requests for
/// the same seat can't both succeed. A losing writer is re-evaluated against
/// the winner's state and typically ends in a seat conflict.
pub struct ShowingService<S: EventStore, C: MovieCatalog> {
    handler: CommandHandler<S, Showing>,
    catalog: C,
}

impl<S: EventStore, C: MovieCatalog> ShowingService<S, C> {
    pub fn new(store: S, catalog: C) -> Self {
        Self {
            handler: CommandHandler::new(store),
            catalog,
        }
    }

    /// Bounds how many times a transition is re-evaluated after losing a
    /// version race.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.handler = self.handler.with_max_attempts(max_attempts);
        self
    }

    /// Schedules a showing for an existing movie with all seats available.
    #[tracing::instrument(skip(self, cmd), fields(showing_id = %cmd.showing_id, movie_id = %cmd.movie_id))]
    pub async fn create_showing(&self, cmd: CreateShowing) -> Result<Showing, DomainError> {
        if !self.catalog.movie_exists(cmd.movie_id).await? {
            tracing::info!("rejected showing for unknown movie");
            return Err(DomainError::UnknownMovie(cmd.movie_id));
        }

        let showing_id = cmd.aggregate_id();
        let result = self
            .handler
            .execute(showing_id, |showing| {
                showing.schedule(
                    showing_id,
                    cmd.movie_id,
                    cmd.start_time,
                    cmd.auditorium.clone(),
                    cmd.seats.clone(),
                )
            })
            .await?;

        metrics::counter!("showings_created_total").increment(1);
        tracing::info!(seats = cmd.seats.len(), "showing scheduled");
        Ok(result.aggregate)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_showing(&self, showing_id: AggregateId) -> Result<Showing, DomainError> {
        self.handler
            .load_existing(showing_id)
            .await?
            .ok_or(DomainError::AggregateNotFound {
                aggregate_type: Showing::aggregate_type(),
                aggregate_id: showing_id,
            })
    }

    /// All showings, optionally for one movie, ordered by start time.
    #[tracing::instrument(skip(self))]
    pub async fn list_showings(
        &self,
        movie_id: Option<AggregateId>,
    ) -> Result<Vec<Showing>, DomainError> {
        let ids = self.handler.store().aggregate_ids(Showing::aggregate_type()).await?;

        let mut showings = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(showing) = self.handler.load_existing(id).await?
                && movie_id.is_none_or(|movie_id| showing.movie_id() == Some(movie_id))
            {
                showings.push(showing);
            }
        }

        showings.sort_by_key(|showing| showing.start_time());
        Ok(showings)
    }

    /// Recorded events of a showing, oldest first.
    ///
    /// Empty when no showing has this id, including when the id belongs to
    /// another aggregate such as a movie.
    #[tracing::instrument(skip(self))]
    pub async fn showing_events(
        &self,
        showing_id: AggregateId,
    ) -> Result<Vec<EventEnvelope>, DomainError> {
        let events = self
            .handler
            .store()
            .get_events_for_aggregate(showing_id)
            .await?;
        if events
            .first()
            .is_some_and(|event| event.aggregate_type != Showing::aggregate_type())
        {
            return Ok(Vec::new());
        }
        Ok(events)
    }

    /// Applies a validated seat transition.
    #[tracing::instrument(
        skip(self, cmd),
        fields(showing_id = %cmd.showing_id, transition = %cmd.transition, seats = cmd.seats.len())
    )]
    pub async fn transition_seats(&self, cmd: TransitionSeats) -> Result<Showing, DomainError> {
        let transition = cmd.transition;
        let result = self
            .handler
            .execute_existing_with_snapshot(cmd.aggregate_id(), |showing| {
                showing.transition(transition, &cmd.seats)
            })
            .await;

        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) if e.is_conflict() => "conflict",
            Err(e) if e.is_validation() => "invalid",
            Err(e) if e.is_not_found() => "not_found",
            Err(e) if e.is_contention() => "contention",
            Err(_) => "error",
        };
        metrics::counter!(
            "seat_transitions_total",
            "transition" => transition.as_str(),
            "outcome" => outcome
        )
        .increment(1);

        match result {
            Ok(result) => {
                tracing::info!(version = %result.new_version, "seats moved");
                Ok(result.aggregate)
            }
            Err(e) => {
                tracing::info!(error = %e, outcome, "seat transition rejected");
                Err(e)
            }
        }
    }

    /// Moves `seats` from available to reserved, all or nothing.
    pub async fn lock_seats<I, L>(&self, showing_id: AggregateId, seats: I) -> Result<Showing, DomainError>
    where
        I: IntoIterator<Item = L>,
        L: Into<String>,
    {
        self.run_transition(showing_id, SeatTransition::Lock, seats).await
    }

    /// Moves `seats` from reserved to booked, all or nothing.
    pub async fn confirm_seats<I, L>(
        &self,
        showing_id: AggregateId,
        seats: I,
    ) -> Result<Showing, DomainError>
    where
        I: IntoIterator<Item = L>,
        L: Into<String>,
    {
        self.run_transition(showing_id, SeatTransition::Confirm, seats)
            .await
    }

    /// Moves `seats` from reserved back to available, all or nothing.
    pub async fn release_seats<I, L>(
        &self,
        showing_id: AggregateId,
        seats: I,
    ) -> Result<Showing, DomainError>
    where
        I: IntoIterator<Item = L>,
        L: Into<String>,
    {
        self.run_transition(showing_id, SeatTransition::Release, seats)
            .await
    }

    async fn run_transition<I, L>(
        &self,
        showing_id: AggregateId,
        transition: SeatTransition,
        seats: I,
    ) -> Result<Showing, DomainError>
    where
        I: IntoIterator<Item = L>,
        L: Into<String>,
    {
        let cmd = TransitionSeats::new(showing_id, transition, seats)?;
        self.transition_seats(cmd).await
    }
}
