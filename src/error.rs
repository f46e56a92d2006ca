use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Every way a request can fail. Handlers return `Result<T, AppError>` and the
/// variant alone decides the HTTP status.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Unknown username and wrong password share this variant and message.
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("username is already taken")]
    DuplicateUsername,

    #[error("malformed token")]
    MalformedToken,

    #[error("invalid or expired token")]
    InvalidToken,

    #[error("session is expired or invalid")]
    SessionExpiredOrInvalid,

    #[error("missing credentials")]
    Unauthorized,

    /// Also returned for resources owned by someone else.
    #[error("resource not found")]
    NotFound,

    #[error("storage unavailable")]
    StoreUnavailable(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("internal error")]
    Internal(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidCredentials
            | AppError::MalformedToken
            | AppError::InvalidToken
            | AppError::SessionExpiredOrInvalid
            | AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::DuplicateUsername => StatusCode::CONFLICT,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::DuplicateUsername => "duplicate_username",
            AppError::MalformedToken => "malformed_token",
            AppError::InvalidToken => "invalid_token",
            AppError::SessionExpiredOrInvalid => "session_expired_or_invalid",
            AppError::Unauthorized => "unauthorized",
            AppError::NotFound => "not_found",
            AppError::StoreUnavailable(_) => "store_unavailable",
            AppError::BadRequest(_) => "bad_request",
            AppError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // store and signing details stay in the logs
        match &self {
            AppError::StoreUnavailable(detail) => {
                tracing::error!(error = %detail, "store unavailable");
            }
            AppError::Internal(detail) => {
                tracing::error!(error = %detail, "internal error");
            }
            _ => {}
        }

        let body = Json(ErrorResponse {
            error: self.code(),
            message: self.to_string(),
        });
        (self.status(), body).into_response()
    }
}

/// Failure reported by a store implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("database error: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StoreError::UniqueViolation(
                    db_err.constraint().unwrap_or("unknown").to_string(),
                )
            }
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            // only users carry a unique constraint
            StoreError::UniqueViolation(_) => AppError::DuplicateUsername,
            StoreError::Unavailable(detail) => AppError::StoreUnavailable(detail),
        }
    }
}
