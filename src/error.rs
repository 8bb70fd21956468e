use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Validation error: {0}")]
    Payload(#[from] validator::ValidationErrors),

    #[error("Ownership conflict: {0}")]
    OwnershipConflict(String),

    #[error("Threshold not met: score {score}% is below the required {threshold}%")]
    ThresholdNotMet { score: i32, threshold: i32 },

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Identity mismatch: {0}")]
    IdentityMismatch(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid access key")]
    InvalidKey,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable machine-readable code rendered next to the message.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Validation(_) | Error::Payload(_) | Error::Json(_) => "validation_error",
            Error::OwnershipConflict(_) => "ownership_conflict",
            Error::ThresholdNotMet { .. } => "threshold_not_met",
            Error::PreconditionFailed(_) => "precondition_failed",
            Error::IdentityMismatch(_) => "identity_mismatch",
            Error::ExternalService(_) | Error::Reqwest(_) => "external_service_error",
            Error::NotFound(_) => "not_found",
            Error::InvalidKey => "invalid_key",
            Error::InvalidCredentials => "invalid_credentials",
            Error::Unauthorized(_) => "unauthorized",
            Error::Forbidden(_) => "forbidden",
            _ => "internal_error",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let code = self.code();
        let (status, error_message) = match self {
            Error::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            Error::Payload(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Error::Json(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Error::OwnershipConflict(msg) => (StatusCode::CONFLICT, msg),
            err @ Error::ThresholdNotMet { .. } => (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
            Error::PreconditionFailed(msg) => (StatusCode::PRECONDITION_FAILED, msg),
            Error::IdentityMismatch(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            Error::ExternalService(msg) => (StatusCode::BAD_GATEWAY, msg),
            Error::Reqwest(err) => (StatusCode::BAD_GATEWAY, format!("External service error: {}", err)),
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            err @ (Error::InvalidKey | Error::InvalidCredentials) => (StatusCode::UNAUTHORIZED, err.to_string()),
            Error::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            Error::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            Error::Database(err) => {
                tracing::error!(error = ?err, "database failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "Database unavailable".to_string())
            }
            Error::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An unexpected error occurred".to_string(),
            ),
        };

        let body = Json(json!({ "error": error_message, "code": code }));
        (status, body).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::NotFound("Resource not found".to_string()),
            other => Error::Database(other),
        }
    }
}
