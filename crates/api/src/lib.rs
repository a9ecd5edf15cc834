//! HTTP API for the showtime seat ledger.
//!
//! Exposes the movie catalog and showtime routes over axum, with structured
//! logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch};
use domain::{MovieService, ShowingService};
use event_store::EventStore;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: EventStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/", get(routes::health::root))
        .route("/health", get(routes::health::check))
        .route(
            "/movies",
            get(routes::movies::list::<S>).post(routes::movies::create::<S>),
        )
        .route("/movies/{id}", get(routes::movies::get::<S>))
        .route(
            "/showtimes",
            get(routes::showtimes::list::<S>).post(routes::showtimes::create::<S>),
        )
        .route("/showtimes/{id}", get(routes::showtimes::get::<S>))
        .route("/showtimes/{id}/lock", patch(routes::showtimes::lock::<S>))
        .route(
            "/showtimes/{id}/confirm",
            patch(routes::showtimes::confirm::<S>),
        )
        .route(
            "/showtimes/{id}/release",
            patch(routes::showtimes::release::<S>),
        )
        .route("/showtimes/{id}/events", get(routes::showtimes::events::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires the movie and showing services over one event store.
pub fn create_state<S: EventStore + Clone + 'static>(
    event_store: S,
    max_attempts: u32,
) -> Arc<AppState<S>> {
    let movies = Arc::new(MovieService::new(event_store.clone()));
    let showings =
        ShowingService::new(event_store, movies.clone()).with_max_attempts(max_attempts);

    Arc::new(AppState { movies, showings })
}
