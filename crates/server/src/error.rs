use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use domain::DomainError;
use repository::RepositoryError;
use serde::Serialize;
use service::ServiceError;
use tracing::{error, warn};

/// Body of every error response.
///
/// ```json
/// { "code": "invalid_transition", "message": "invalid status transition from pending to delivered" }
/// ```
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

/// Error returned by the HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// The request could not be understood, e.g. a malformed query value.
    #[error("{0}")]
    BadRequest(String),
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Service(err.into())
    }
}

impl ApiError {
    fn classify(&self) -> (StatusCode, &'static str) {
        let domain = match self {
            ApiError::BadRequest(_) => return (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Service(ServiceError::Domain(err)) => err,
            ApiError::Service(ServiceError::Repository(RepositoryError::Conflict(_))) => {
                return (StatusCode::CONFLICT, "conflict");
            }
            ApiError::Service(ServiceError::Repository(_)) => {
                return (StatusCode::INTERNAL_SERVER_ERROR, "internal");
            }
        };

        match domain {
            DomainError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            DomainError::InvalidTransition { .. } => (StatusCode::CONFLICT, "invalid_transition"),
            DomainError::OrderTerminal { .. } => (StatusCode::CONFLICT, "order_terminal"),
            DomainError::InvalidStatus(_) => (StatusCode::BAD_REQUEST, "invalid_status"),
            DomainError::InvalidQuantity(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "invalid_quantity")
            }
            DomainError::InvalidAmount(_) => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_amount"),
            DomainError::InvalidPrice(_) => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_price"),
            DomainError::AmountOverflow => (StatusCode::UNPROCESSABLE_ENTITY, "amount_overflow"),
            DomainError::DishUnavailable(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "dish_unavailable")
            }
            DomainError::InsufficientPoints { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "insufficient_points")
            }
            DomainError::InvalidPointsDelta { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "invalid_points_delta")
            }
            DomainError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.classify();

        let message = if status.is_server_error() {
            error!(error = %self, "Request failed");
            "internal server error".to_string()
        } else {
            warn!(code, error = %self, "Request rejected");
            self.to_string()
        };

        (status, Json(ErrorBody { code, message })).into_response()
    }
}
