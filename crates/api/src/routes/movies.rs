//! Movie catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use domain::{AddMovie, Aggregate, Movie};
use event_store::EventStore;
use serde::{Deserialize, Serialize};

use super::{AppState, parse_id};
use crate::error::ApiError;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMovieRequest {
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    pub duration_minutes: Option<u32>,
    pub poster_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub duration_minutes: u32,
    pub poster_url: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<&Movie> for MovieResponse {
    fn from(movie: &Movie) -> Self {
        Self {
            id: movie.id().map(|id| id.to_string()).unwrap_or_default(),
            title: movie.title().to_string(),
            description: movie.description().to_string(),
            duration_minutes: movie.duration_minutes(),
            poster_url: movie.poster_url().to_string(),
            created_at: movie.created_at(),
        }
    }
}

/// POST /movies: add a movie to the catalog.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateMovieRequest>,
) -> Result<(StatusCode, Json<MovieResponse>), ApiError> {
    let mut cmd = AddMovie::new(req.title);
    cmd.description = req.description;
    cmd.duration_minutes = req.duration_minutes;
    cmd.poster_url = req.poster_url;

    let movie = state.movies.create_movie(cmd).await?;
    Ok((StatusCode::CREATED, Json(MovieResponse::from(&movie))))
}

/// GET /movies: all movies, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<MovieResponse>>, ApiError> {
    let movies = state.movies.list_movies().await?;
    Ok(Json(movies.iter().map(MovieResponse::from).collect()))
}

/// GET /movies/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<MovieResponse>, ApiError> {
    let movie_id = parse_id("movie id", &id)?;
    let movie = state.movies.get_movie(movie_id).await?;
    Ok(Json(MovieResponse::from(&movie)))
}
