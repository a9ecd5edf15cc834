//! Movie aggregate: the catalog showings are scheduled against.

mod aggregate;
mod events;
mod service;

pub use aggregate::{AddMovie, DEFAULT_DURATION_MINUTES, Movie};
pub use events::{MovieAddedData, MovieEvent};
pub use service::{MovieCatalog, MovieService};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MovieError {
    #[error("title required")]
    TitleRequired,

    #[error("invalid duration: {0} minutes")]
    InvalidDuration(u32),

    #[error("movie already added")]
    AlreadyAdded,
}

impl MovieError {
    pub fn is_validation(&self) -> bool {
        matches!(self, MovieError::TitleRequired | MovieError::InvalidDuration(_))
    }
}
