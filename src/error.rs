use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{
    dao::storage::StorageError,
    state::{cache::CacheError, session::SessionError, state_machine::GateError},
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A store call failed.
    #[error("storage failure")]
    Storage(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// The caller's session could not be resolved.
    #[error(transparent)]
    Session(#[from] SessionError),
    /// Caller is not allowed to do this.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation conflicts with existing data.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Game has not started yet.
    #[error("{0}")]
    TooEarly(String),
    /// Game is over.
    #[error("game over")]
    GameOver,
    /// Recognised but unimplemented feature.
    #[error("{0}")]
    NotImplemented(String),
    /// Action not supported in the current phase.
    #[error("{0}")]
    Unsupported(String),
    /// Unexpected failure while assembling a response.
    #[error("internal error: {0}")]
    Internal(String),
    /// Operation exceeded its timeout limit.
    #[error("operation timed out")]
    Timeout,
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Storage(err)
    }
}

impl From<CacheError> for ServiceError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::NoSuchGame(_) => ServiceError::NotFound(err.to_string()),
            CacheError::PlayerFetchFailed { .. } | CacheError::CardFetchFailed { .. } => {
                ServiceError::Internal(err.to_string())
            }
        }
    }
}

impl From<GateError> for ServiceError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::TooEarly { .. } => ServiceError::TooEarly(err.to_string()),
            GateError::GameOver => ServiceError::GameOver,
            GateError::NotImplemented(_) => ServiceError::NotImplemented(err.to_string()),
            GateError::Unsupported { .. } => ServiceError::Unsupported(err.to_string()),
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
    /// Missing credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Credentials present but insufficient.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Resource is permanently finished.
    #[error("gone: {0}")]
    Gone(String),
    /// Request arrived before the resource is ready.
    #[error("too early: {0}")]
    TooEarly(String),
    /// Feature recognised but not available.
    #[error("not implemented: {0}")]
    NotImplemented(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::CookieMissing => AppError::Unauthorized(err.to_string()),
            SessionError::CookieInvalid => AppError::Forbidden(err.to_string()),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Storage(source) => AppError::Internal(source.to_string()),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::Session(session) => session.into(),
            ServiceError::Forbidden(message) => AppError::Forbidden(message),
            ServiceError::InvalidInput(message) | ServiceError::Unsupported(message) => {
                AppError::BadRequest(message)
            }
            ServiceError::Conflict(message) => AppError::Conflict(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::TooEarly(message) => AppError::TooEarly(message),
            ServiceError::GameOver => AppError::Gone("game over".into()),
            ServiceError::NotImplemented(message) => AppError::NotImplemented(message),
            ServiceError::Internal(message) => AppError::Internal(message),
            ServiceError::Timeout => AppError::ServiceUnavailable("operation timed out".into()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl AppError {
    /// HTTP status the error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Gone(_) => StatusCode::GONE,
            AppError::TooEarly(_) => StatusCode::from_u16(425).unwrap_or(StatusCode::BAD_REQUEST),
            AppError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{
        game::GamePhase,
        state_machine::{GameAction, Mechanic},
    };

    fn status_of(err: ServiceError) -> u16 {
        AppError::from(err).status().as_u16()
    }

    #[test]
    fn session_errors_keep_distinct_statuses() {
        assert_eq!(status_of(SessionError::CookieMissing.into()), 401);
        assert_eq!(status_of(SessionError::CookieInvalid.into()), 403);
    }

    #[test]
    fn gate_errors_map_to_their_statuses() {
        let too_early = GateError::TooEarly {
            action: GameAction::Points,
        };
        assert_eq!(status_of(too_early.into()), 425);
        assert_eq!(status_of(GateError::GameOver.into()), 410);
        assert_eq!(
            status_of(GateError::NotImplemented(Mechanic::Spin).into()),
            501
        );
        let unsupported = GateError::Unsupported {
            from: GamePhase::InProgressA,
            action: GameAction::Start,
        };
        assert_eq!(status_of(unsupported.into()), 400);
    }

    #[test]
    fn cache_errors_split_between_missing_and_internal() {
        assert_eq!(status_of(CacheError::NoSuchGame("abc".into()).into()), 404);
        let failed = CacheError::PlayerFetchFailed {
            game_id: "abc".into(),
            source: StorageError::NotFound("players".into()),
        };
        assert_eq!(status_of(failed.into()), 500);
    }

    #[test]
    fn store_failures_are_internal_and_outages_unavailable() {
        assert_eq!(status_of(StorageError::Conflict("x".into()).into()), 500);
        assert_eq!(status_of(ServiceError::Degraded), 503);
        assert_eq!(status_of(ServiceError::Timeout), 503);
    }
}
