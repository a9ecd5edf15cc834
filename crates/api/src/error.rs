//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::DomainError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Domain(DomainError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Domain(err) => domain_error_to_response(err),
        };

        metrics::counter!("api_errors_total", "status" => status.as_u16().to_string()).increment(1);

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    let status = if err.is_validation() {
        StatusCode::BAD_REQUEST
    } else if err.is_not_found() {
        StatusCode::NOT_FOUND
    } else if err.is_conflict() {
        StatusCode::CONFLICT
    } else if err.is_contention() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        tracing::error!(error = %err, "domain operation failed");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal server error".to_string(),
        );
    };
    (status, err.to_string())
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{AggregateId, SeatLabel};
    use domain::{SeatTransition, ShowingError};
    use event_store::EventStoreError;

    fn status_of(err: DomainError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn maps_domain_categories() {
        assert_eq!(
            status_of(ShowingError::SeatsRequired.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(DomainError::UnknownMovie(AggregateId::new())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(DomainError::AggregateNotFound {
                aggregate_type: "Showing",
                aggregate_id: AggregateId::new(),
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(
                ShowingError::SeatsUnavailable {
                    transition: SeatTransition::Lock,
                    seats: vec![SeatLabel::new("A1").unwrap()],
                }
                .into()
            ),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(DomainError::Contention {
                aggregate_id: AggregateId::new(),
                attempts: 16,
            }),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn store_failures_are_internal() {
        let err = DomainError::EventStore(EventStoreError::InvalidAppend("boom".to_string()));
        assert_eq!(status_of(err), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
