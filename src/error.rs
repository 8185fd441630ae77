use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, info};

/// Request-boundary error. Every handler failure is one of these; the
/// `IntoResponse` impl converts it to a status plus a JSON body so nothing
/// reaches the client as a raw fault.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Input rejected before any state change.
    #[error("{0}")]
    Validation(String),

    /// Login failure. The message never says which of identifier or
    /// password was wrong.
    #[error("identifier or password incorrect")]
    BadCredentials,

    /// Guarded route reached without a usable session.
    #[error("authentication required")]
    Unauthenticated,

    /// Authenticated but lacking the required role. The session survives.
    #[error("insufficient permissions")]
    Forbidden,

    /// Missing, expired or already-consumed reset token. The message does
    /// not distinguish the three causes.
    #[error("invalid or expired reset link")]
    InvalidResetToken,

    #[error("{0} not found")]
    NotFound(&'static str),

    /// Persistence failure. Details go to the log, not the client.
    #[error(transparent)]
    Store(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::InvalidResetToken => StatusCode::BAD_REQUEST,
            ApiError::BadCredentials | ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Store(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn user_message(&self) -> String {
        match self {
            ApiError::Store(_) | ApiError::Internal(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Store(e) => error!(error = %e, "store error at request boundary"),
            ApiError::Internal(e) => error!(error = %e, "internal error at request boundary"),
            ApiError::Unauthenticated | ApiError::Forbidden => info!("{self}"),
            _ => {}
        }
        (
            self.status_code(),
            Json(json!({ "error": self.user_message() })),
        )
            .into_response()
    }
}
