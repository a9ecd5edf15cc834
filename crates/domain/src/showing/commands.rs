//! Showing commands.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use common::{AggregateId, SeatLabel};

use crate::command::Command;

use super::{SeatTransition, Showing, ShowingError};

/// Auditorium used when a showing is created without one.
pub const DEFAULT_AUDITORIUM: &str = "Main Hall";

/// Parses raw labels into a seat set, dropping duplicates.
///
/// Any blank label rejects the whole request. An empty input yields an
/// empty set; callers decide whether that is allowed.
pub fn parse_seats<I, S>(labels: I) -> Result<BTreeSet<SeatLabel>, ShowingError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    labels
        .into_iter()
        .map(|label| SeatLabel::new(label).map_err(|_| ShowingError::BlankSeatLabel))
        .collect()
}

/// Command to schedule a new showing.
#[derive(Debug, Clone)]
pub struct CreateShowing {
    pub showing_id: AggregateId,
    pub movie_id: AggregateId,
    pub start_time: DateTime<Utc>,
    pub auditorium: String,

    /// Full seat inventory. May be empty.
    pub seats: BTreeSet<SeatLabel>,
}

impl CreateShowing {
    /// Creates the command with a generated showing ID and the default auditorium.
    pub fn new(
        movie_id: AggregateId,
        start_time: DateTime<Utc>,
        seats: BTreeSet<SeatLabel>,
    ) -> Self {
        Self {
            showing_id: AggregateId::new(),
            movie_id,
            start_time,
            auditorium: DEFAULT_AUDITORIUM.to_string(),
            seats,
        }
    }

    /// Blank names fall back to the default auditorium.
    pub fn with_auditorium(mut self, auditorium: impl Into<String>) -> Self {
        let auditorium = auditorium.into();
        let trimmed = auditorium.trim();
        if !trimmed.is_empty() {
            self.auditorium = trimmed.to_string();
        }
        self
    }
}

impl Command for CreateShowing {
    type Aggregate = Showing;

    fn aggregate_id(&self) -> AggregateId {
        self.showing_id
    }
}

/// Command to lock, confirm or release a set of seats.
#[derive(Debug, Clone)]
pub struct TransitionSeats {
    pub showing_id: AggregateId,
    pub transition: SeatTransition,
    pub seats: BTreeSet<SeatLabel>,
}

impl TransitionSeats {
    /// Validates the requested labels. The set must be non-empty.
    pub fn new<I, S>(
        showing_id: AggregateId,
        transition: SeatTransition,
        labels: I,
    ) -> Result<Self, ShowingError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let seats = parse_seats(labels)?;
        if seats.is_empty() {
            return Err(ShowingError::SeatsRequired);
        }
        Ok(Self {
            showing_id,
            transition,
            seats,
        })
    }
}

impl Command for TransitionSeats {
    type Aggregate = Showing;

    fn aggregate_id(&self) -> AggregateId {
        self.showing_id
    }
}
