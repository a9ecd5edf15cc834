//! Showing domain events.

use chrono::{DateTime, Utc};
use common::{AggregateId, SeatLabel};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

use super::SeatTransition;

/// Events recorded on a showing's stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ShowingEvent {
    /// Showing was created with its full seat inventory available.
    ShowingScheduled(ShowingScheduledData),

    /// Seats moved from available to reserved.
    SeatsLocked(SeatsMovedData),

    /// Seats moved from reserved to booked.
    SeatsConfirmed(SeatsMovedData),

    /// Seats moved from reserved back to available.
    SeatsReleased(SeatsMovedData),
}

impl ShowingEvent {
    pub fn seats_moved(transition: SeatTransition, seats: Vec<SeatLabel>) -> Self {
        let data = SeatsMovedData {
            seats,
            moved_at: Utc::now(),
        };
        match transition {
            SeatTransition::Lock => ShowingEvent::SeatsLocked(data),
            SeatTransition::Confirm => ShowingEvent::SeatsConfirmed(data),
            SeatTransition::Release => ShowingEvent::SeatsReleased(data),
        }
    }
}

impl DomainEvent for ShowingEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ShowingEvent::ShowingScheduled(_) => "ShowingScheduled",
            ShowingEvent::SeatsLocked(_) => "SeatsLocked",
            ShowingEvent::SeatsConfirmed(_) => "SeatsConfirmed",
            ShowingEvent::SeatsReleased(_) => "SeatsReleased",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShowingScheduledData {
    pub showing_id: AggregateId,
    pub movie_id: AggregateId,
    pub start_time: DateTime<Utc>,
    pub auditorium: String,
    pub seats: Vec<SeatLabel>,
    pub scheduled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatsMovedData {
    pub seats: Vec<SeatLabel>,
    pub moved_at: DateTime<Utc>,
}
