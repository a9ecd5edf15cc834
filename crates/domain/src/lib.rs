//! Domain layer for the showtime seat ledger.
//!
//! - [`Aggregate`]/[`DomainEvent`] traits for event-sourced entities
//! - [`CommandHandler`], which commits commands with an expected-version
//!   append and retries lost version races
//! - [`Showing`], the per-screening seat ledger with lock/confirm/release
//! - [`Movie`] and the [`MovieCatalog`] lookup showings are validated against

pub mod aggregate;
pub mod command;
pub mod error;
pub mod movie;
pub mod showing;

pub use aggregate::{Aggregate, DomainEvent, SnapshotCapable};
pub use command::{Command, CommandHandler, CommandResult, DEFAULT_MAX_ATTEMPTS};
pub use error::DomainError;
pub use movie::{AddMovie, Movie, MovieCatalog, MovieError, MovieEvent, MovieService};
pub use showing::{
    CreateShowing, DEFAULT_AUDITORIUM, SeatPool, SeatTransition, Showing, ShowingError,
    ShowingEvent, ShowingService, TransitionSeats, parse_seats,
};
