use std::sync::Arc;

use async_trait::async_trait;
use common::AggregateId;
use event_store::EventStore;

use crate::aggregate::Aggregate;
use crate::command::{Command, CommandHandler};
use crate::error::DomainError;

use super::{AddMovie, Movie};

/// Lookup used when scheduling a showing.
#[async_trait]
pub trait MovieCatalog: Send + Sync {
    async fn movie_exists(&self, movie_id: AggregateId) -> Result<bool, DomainError>;
}

#[async_trait]
impl<T: MovieCatalog + ?Sized> MovieCatalog for Arc<T> {
    async fn movie_exists(&self, movie_id: AggregateId) -> Result<bool, DomainError> {
        (**self).movie_exists(movie_id).await
    }
}

pub struct MovieService<S: EventStore> {
    handler: CommandHandler<S, Movie>,
}

impl<S: EventStore> MovieService<S> {
    pub fn new(store: S) -> Self {
        Self {
            handler: CommandHandler::new(store),
        }
    }

    #[tracing::instrument(skip(self, cmd), fields(movie_id = %cmd.movie_id))]
    pub async fn create_movie(&self, cmd: AddMovie) -> Result<Movie, DomainError> {
        let result = self
            .handler
            .execute(cmd.aggregate_id(), |movie| movie.add(&cmd))
            .await?;

        tracing::info!(title = result.aggregate.title(), "movie added");
        Ok(result.aggregate)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_movie(&self, movie_id: AggregateId) -> Result<Movie, DomainError> {
        self.handler
            .load_existing(movie_id)
            .await?
            .ok_or(DomainError::AggregateNotFound {
                aggregate_type: Movie::aggregate_type(),
                aggregate_id: movie_id,
            })
    }

    /// Every movie, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_movies(&self) -> Result<Vec<Movie>, DomainError> {
        let ids = self.handler.store().aggregate_ids(Movie::aggregate_type()).await?;

        let mut movies = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(movie) = self.handler.load_existing(id).await? {
                movies.push(movie);
            }
        }

        movies.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(movies)
    }
}

#[async_trait]
impl<S: EventStore> MovieCatalog for MovieService<S> {
    async fn movie_exists(&self, movie_id: AggregateId) -> Result<bool, DomainError> {
        Ok(self.handler.load_existing(movie_id).await?.is_some())
    }
}
