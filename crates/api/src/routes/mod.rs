//! HTTP route handlers.

pub mod health;
pub mod metrics;
pub mod movies;
pub mod showtimes;

use std::sync::Arc;

use common::AggregateId;
use domain::{MovieService, ShowingService};
use event_store::EventStore;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: EventStore> {
    pub movies: Arc<MovieService<S>>,
    pub showings: ShowingService<S, Arc<MovieService<S>>>,
}

/// Parses an id taken from a path or body field named `field`.
fn parse_id(field: &str, raw: &str) -> Result<AggregateId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid {field}")))
}
