//! Showing aggregate: per-screening seat ledger.

mod aggregate;
mod commands;
mod events;
mod pool;
mod service;

pub use aggregate::Showing;
pub use commands::{CreateShowing, DEFAULT_AUDITORIUM, TransitionSeats, parse_seats};
pub use events::{SeatsMovedData, ShowingEvent, ShowingScheduledData};
pub use pool::{SeatPool, SeatTransition};
pub use service::ShowingService;

use common::SeatLabel;
use thiserror::Error;

/// Errors raised by showing commands.
#[derive(Debug, Error)]
pub enum ShowingError {
    #[error("seats required")]
    SeatsRequired,

    #[error("seat labels must not be blank")]
    BlankSeatLabel,

    /// Some requested seats were not in the transition's source pool.
    /// Nothing was moved.
    #[error("cannot {transition} seats {}: not {}", join_labels(.seats), .transition.source())]
    SeatsUnavailable {
        transition: SeatTransition,
        seats: Vec<SeatLabel>,
    },

    #[error("showing already scheduled")]
    AlreadyScheduled,

    #[error("showing not scheduled")]
    NotScheduled,
}

impl ShowingError {
    pub fn is_validation(&self) -> bool {
        matches!(self, ShowingError::SeatsRequired | ShowingError::BlankSeatLabel)
    }

    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            ShowingError::SeatsUnavailable { .. } | ShowingError::AlreadyScheduled
        )
    }
}

fn join_labels(seats: &[SeatLabel]) -> String {
    seats
        .iter()
        .map(SeatLabel::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
