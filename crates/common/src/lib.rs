//! Shared types for the showtime workspace.
//!
//! - [`AggregateId`] identifies showings and movies in the event store
//! - [`SeatLabel`] is the opaque seat identifier moved between seat pools

mod id;
mod seat;

pub use id::{AggregateId, ParseIdError};
pub use seat::{InvalidSeatLabel, SeatLabel};
