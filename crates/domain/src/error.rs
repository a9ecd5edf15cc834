//! Domain error types.

use common::AggregateId;
use event_store::EventStoreError;
use thiserror::Error;

use crate::movie::MovieError;
use crate::showing::ShowingError;

/// Errors surfaced by the domain services.
///
/// Callers branch on the category helpers rather than on variants:
/// [`is_validation`](Self::is_validation), [`is_not_found`](Self::is_not_found)
/// and [`is_conflict`](Self::is_conflict). Anything else is an internal failure.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    #[error("{0}")]
    Showing(#[from] ShowingError),

    #[error("{0}")]
    Movie(#[from] MovieError),

    #[error("{aggregate_type} {aggregate_id} not found")]
    AggregateNotFound {
        aggregate_type: &'static str,
        aggregate_id: AggregateId,
    },

    /// A showing referenced a movie that isn't in the catalog.
    #[error("invalid movieId: no movie with id {0}")]
    UnknownMovie(AggregateId),

    /// Every attempt lost the version race to another writer.
    #[error("{aggregate_id} kept changing; gave up after {attempts} attempts")]
    Contention {
        aggregate_id: AggregateId,
        attempts: u32,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    pub fn is_validation(&self) -> bool {
        match self {
            DomainError::Showing(e) => e.is_validation(),
            DomainError::Movie(e) => e.is_validation(),
            DomainError::UnknownMovie(_) => true,
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DomainError::AggregateNotFound { .. })
    }

    /// A precondition on current state failed; nothing was written.
    pub fn is_conflict(&self) -> bool {
        match self {
            DomainError::Showing(e) => e.is_conflict(),
            DomainError::Movie(MovieError::AlreadyAdded) => true,
            _ => false,
        }
    }

    /// Retrying the same request later may succeed.
    pub fn is_contention(&self) -> bool {
        matches!(self, DomainError::Contention { .. })
    }
}
