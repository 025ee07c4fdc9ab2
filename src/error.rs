use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;
use validator::ValidationErrors;

use crate::{dao::storage::StorageError, state::DuelError};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Concurrent writers kept winning until the retry budget ran out.
    #[error("{0}")]
    Conflict(String),
    /// A duel rule rejected the request.
    #[error(transparent)]
    Duel(#[from] DuelError),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Unexpected failure that the client cannot act on.
    #[error("{0}")]
    Internal(String),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict(_) => {
                ServiceError::Conflict("Conflict while updating room".into())
            }
            StorageError::DuplicateCode(_) | StorageError::DuplicateSeriesMatch { .. } => {
                ServiceError::Conflict(err.to_string())
            }
            StorageError::Unavailable { .. } => ServiceError::Unavailable(err),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Caller is known but not allowed to do this.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn message(&self) -> &str {
        match self {
            AppError::BadRequest(message)
            | AppError::Forbidden(message)
            | AppError::NotFound(message)
            | AppError::Conflict(message)
            | AppError::ServiceUnavailable(message)
            | AppError::Internal(message) => message,
        }
    }
}

impl From<DuelError> for AppError {
    fn from(err: DuelError) -> Self {
        let message = err.to_string();
        match err {
            DuelError::RoomNotFound | DuelError::QuestionNotFound => AppError::NotFound(message),
            DuelError::HostOnly | DuelError::ParticipantsOnly | DuelError::PlayerNotInRoom => {
                AppError::Forbidden(message)
            }
            DuelError::ContinentRequired | DuelError::ContinentCountriesRequired => {
                AppError::BadRequest(message)
            }
            DuelError::RoomFull
            | DuelError::TwoPlayersRequired
            | DuelError::PlayersNotReady
            | DuelError::AlreadyStarted
            | DuelError::NotActive
            | DuelError::MatchNotFinished
            | DuelError::SeriesDecided
            | DuelError::SeriesExhausted => AppError::Conflict(message),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::Conflict(message) => AppError::Conflict(message),
            ServiceError::Duel(duel) => duel.into(),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::Internal(message) => AppError::Internal(message),
        }
    }
}

/// JSON body returned for every failed request.
#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    /// Human readable reason.
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!(status = %status, error = %self, "request failed");
        }

        let payload = Json(ErrorBody {
            message: self.message().to_owned(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: impl Into<AppError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn duel_errors_map_to_distinct_statuses() {
        assert_eq!(status_of(DuelError::RoomNotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_of(DuelError::HostOnly), StatusCode::FORBIDDEN);
        assert_eq!(status_of(DuelError::ParticipantsOnly), StatusCode::FORBIDDEN);
        assert_eq!(status_of(DuelError::RoomFull), StatusCode::CONFLICT);
        assert_eq!(status_of(DuelError::SeriesExhausted), StatusCode::CONFLICT);
        assert_eq!(
            status_of(DuelError::ContinentRequired),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn service_errors_keep_duel_mapping() {
        assert_eq!(
            status_of(ServiceError::Duel(DuelError::NotActive)),
            StatusCode::CONFLICT
        );
        assert_eq!(status_of(ServiceError::Degraded), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn storage_conflict_becomes_generic_conflict() {
        let err = ServiceError::from(StorageError::Conflict("room".into()));
        assert_eq!(err.to_string(), "Conflict while updating room");
    }

    #[test]
    fn body_carries_bare_message() {
        let err = AppError::from(DuelError::RoomNotFound);
        assert_eq!(err.message(), "Room not found");
    }
}
