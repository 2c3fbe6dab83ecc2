use attest_sdk::SdkError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Sdk(#[from] SdkError),

    #[error("authentication required: {0}")]
    Unauthenticated(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Sdk(err) => match err {
                SdkError::NotFound(_) => StatusCode::NOT_FOUND,
                SdkError::AlreadyCommitted(_) => StatusCode::CONFLICT,
                SdkError::ContentTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                SdkError::LedgerUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
                SdkError::LedgerRejected(_) => StatusCode::BAD_GATEWAY,
                SdkError::Store(_)
                | SdkError::Config(_)
                | SdkError::Io(_)
                | SdkError::LedgerJournal(_)
                | SdkError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Sdk(err) => match err {
                SdkError::NotFound(_) => "not_found",
                SdkError::AlreadyCommitted(_) => "already_committed",
                SdkError::ContentTooLarge { .. } => "content_too_large",
                SdkError::LedgerUnavailable { .. } => "ledger_unavailable",
                SdkError::LedgerRejected(_) => "ledger_rejected",
                _ => "internal",
            },
            Self::Unauthenticated(_) => "unauthenticated",
            Self::BadRequest(_) => "bad_request",
            _ => "internal",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %self, "request failed");
        }
        let body = json!({
            "error": self.code(),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
