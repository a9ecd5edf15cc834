//! Showtime endpoints: scheduling, queries and seat transitions.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{AggregateId, SeatLabel};
use domain::{Aggregate, CreateShowing, SeatTransition, Showing, TransitionSeats, parse_seats};
use event_store::{EventEnvelope, EventStore};
use serde::{Deserialize, Serialize};

use super::movies::MovieResponse;
use super::{AppState, parse_id};
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateShowtimeRequest {
    pub movie_id: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub auditorium: Option<String>,

    /// Full seat inventory; every seat starts available.
    #[serde(default, alias = "seats")]
    pub available_seats: Vec<String>,
}

#[derive(Deserialize)]
pub struct SeatsRequest {
    pub seats: Option<serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub movie_id: Option<String>,
}

// -- Response types --

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowtimeResponse {
    pub id: String,
    pub movie_id: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub movie: Option<MovieResponse>,
    pub start_time: Option<DateTime<Utc>>,
    pub auditorium: String,
    pub available_seats: Vec<String>,
    pub reserved_seats: Vec<String>,
    pub booked_seats: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl ShowtimeResponse {
    fn new(showing: &Showing, movie: Option<MovieResponse>) -> Self {
        let labels = |pool: &BTreeSet<SeatLabel>| -> Vec<String> {
            pool.iter().map(SeatLabel::to_string).collect()
        };
        Self {
            id: showing.id().map(|id| id.to_string()).unwrap_or_default(),
            movie_id: showing
                .movie_id()
                .map(|id| id.to_string())
                .unwrap_or_default(),
            movie,
            start_time: showing.start_time(),
            auditorium: showing.auditorium().to_string(),
            available_seats: labels(showing.available_seats()),
            reserved_seats: labels(showing.reserved_seats()),
            booked_seats: labels(showing.booked_seats()),
            created_at: showing.created_at(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransitionResponse {
    pub success: bool,
    pub showtime: ShowtimeResponse,
}

// -- Handlers --

/// POST /showtimes: schedule a showing for an existing movie.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateShowtimeRequest>,
) -> Result<(StatusCode, Json<ShowtimeResponse>), ApiError> {
    let movie_id = req
        .movie_id
        .as_deref()
        .map(|raw| parse_id("movieId", raw))
        .transpose()?
        .ok_or_else(|| ApiError::BadRequest("invalid movieId".to_string()))?;
    let start_time = req
        .start_time
        .ok_or_else(|| ApiError::BadRequest("startTime required".to_string()))?;
    let seats = parse_seats(req.available_seats).map_err(domain::DomainError::from)?;

    let mut cmd = CreateShowing::new(movie_id, start_time, seats);
    if let Some(auditorium) = req.auditorium {
        cmd = cmd.with_auditorium(auditorium);
    }

    let showing = state.showings.create_showing(cmd).await?;
    Ok((
        StatusCode::CREATED,
        Json(ShowtimeResponse::new(&showing, None)),
    ))
}

/// GET /showtimes: all showings by start time, optionally for one movie.
#[tracing::instrument(skip(state, query))]
pub async fn list<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ShowtimeResponse>>, ApiError> {
    let movie_id = query
        .movie_id
        .as_deref()
        .filter(|raw| !raw.is_empty())
        .map(|raw| parse_id("movieId", raw))
        .transpose()?;

    let showings = state.showings.list_showings(movie_id).await?;

    let mut movies: HashMap<AggregateId, Option<MovieResponse>> = HashMap::new();
    let mut response = Vec::with_capacity(showings.len());
    for showing in &showings {
        let movie = match showing.movie_id() {
            Some(movie_id) => {
                if !movies.contains_key(&movie_id) {
                    let found = lookup_movie(&state, movie_id).await?;
                    movies.insert(movie_id, found);
                }
                movies.get(&movie_id).cloned().flatten()
            }
            None => None,
        };
        response.push(ShowtimeResponse::new(showing, movie));
    }

    Ok(Json(response))
}

/// GET /showtimes/{id}: one showing with its movie embedded.
#[tracing::instrument(skip(state))]
pub async fn get<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ShowtimeResponse>, ApiError> {
    let showing_id = parse_id("showtime id", &id)?;
    let showing = state.showings.get_showing(showing_id).await?;

    let movie = match showing.movie_id() {
        Some(movie_id) => lookup_movie(&state, movie_id).await?,
        None => None,
    };
    Ok(Json(ShowtimeResponse::new(&showing, movie)))
}

/// PATCH /showtimes/{id}/lock
pub async fn lock<S: EventStore + Clone + 'static>(
    state: State<Arc<AppState<S>>>,
    id: Path<String>,
    req: Json<SeatsRequest>,
) -> Result<Json<TransitionResponse>, ApiError> {
    transition(state, id, req, SeatTransition::Lock).await
}

/// PATCH /showtimes/{id}/confirm
pub async fn confirm<S: EventStore + Clone + 'static>(
    state: State<Arc<AppState<S>>>,
    id: Path<String>,
    req: Json<SeatsRequest>,
) -> Result<Json<TransitionResponse>, ApiError> {
    transition(state, id, req, SeatTransition::Confirm).await
}

/// PATCH /showtimes/{id}/release
pub async fn release<S: EventStore + Clone + 'static>(
    state: State<Arc<AppState<S>>>,
    id: Path<String>,
    req: Json<SeatsRequest>,
) -> Result<Json<TransitionResponse>, ApiError> {
    transition(state, id, req, SeatTransition::Release).await
}

#[tracing::instrument(skip(state, req))]
async fn transition<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<SeatsRequest>,
    transition: SeatTransition,
) -> Result<Json<TransitionResponse>, ApiError> {
    let showing_id = parse_id("showtime id", &id)?;
    let labels = seat_labels(req.seats)?;
    let cmd = TransitionSeats::new(showing_id, transition, labels)
        .map_err(domain::DomainError::from)?;

    let showing = state.showings.transition_seats(cmd).await?;
    Ok(Json(TransitionResponse {
        success: true,
        showtime: ShowtimeResponse::new(&showing, None),
    }))
}

/// GET /showtimes/{id}/events: the showing's recorded history.
#[tracing::instrument(skip(state))]
pub async fn events<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<EventEnvelope>>, ApiError> {
    let showing_id = parse_id("showtime id", &id)?;
    let events = state.showings.showing_events(showing_id).await?;
    if events.is_empty() {
        return Err(ApiError::NotFound(format!("Showing {showing_id} not found")));
    }
    Ok(Json(events))
}

/// Accepts only a non-empty JSON array of strings.
fn seat_labels(seats: Option<serde_json::Value>) -> Result<Vec<String>, ApiError> {
    let required = || ApiError::BadRequest("seats required".to_string());
    let Some(serde_json::Value::Array(items)) = seats else {
        return Err(required());
    };
    if items.is_empty() {
        return Err(required());
    }
    items
        .into_iter()
        .map(|item| match item {
            serde_json::Value::String(label) => Ok(label),
            _ => Err(ApiError::BadRequest("seat labels must be strings".to_string())),
        })
        .collect()
}

async fn lookup_movie<S: EventStore + Clone + 'static>(
    state: &AppState<S>,
    movie_id: AggregateId,
) -> Result<Option<MovieResponse>, ApiError> {
    match state.movies.get_movie(movie_id).await {
        Ok(movie) => Ok(Some(MovieResponse::from(&movie))),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e.into()),
    }
}
