//! Centralized error types for Passgate.
//!
//! Every per-request failure is a [`PassgateError`]. At the pipeline boundary it is
//! flattened into a [`PipelineError`] (`{ code, message }`), which is the only error
//! shape callers ever see. The messages are part of the API contract: they name every
//! location the caller could have supplied the missing value in.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::auth::TokenKind;

/// Per-request error raised by the password and token middleware.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PassgateError {
    // === Input errors ===
    #[error("Missing password in the request. Should be in {locations}")]
    MissingPassword { locations: String },

    #[error("Missing hash from the database. Should be in {locations}")]
    MissingHash { locations: String },

    #[error("Missing resources. Should be in body.rows")]
    MissingResources,

    #[error("Invalid resource at body.rows[{index}]")]
    InvalidResource { index: usize },

    #[error("Missing iss")]
    MissingIss,

    #[error("Invalid input - caused by: {detail}")]
    InvalidInput { detail: String },

    #[error("Invalid password policy: {detail}")]
    InvalidPolicy { detail: String },

    #[error("Unable to sign {kind} token: {detail}")]
    Signing { kind: TokenKind, detail: String },

    // === Auth errors ===
    #[error("Wrong password")]
    WrongPassword,

    #[error("Missing authorization header")]
    MissingAuthorization,

    #[error("Authorization header must use the Bearer scheme")]
    InvalidBearer,

    #[error("Invalid {kind} token")]
    InvalidToken { kind: TokenKind },

    #[error("Invalid {kind} token: {detail}")]
    TokenRejected { kind: TokenKind, detail: String },
}

impl PassgateError {
    /// Map error to HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingPassword { .. }
            | Self::MissingHash { .. }
            | Self::MissingResources
            | Self::InvalidResource { .. }
            | Self::MissingIss
            | Self::InvalidInput { .. }
            | Self::InvalidPolicy { .. }
            | Self::Signing { .. } => StatusCode::BAD_REQUEST,
            Self::WrongPassword
            | Self::MissingAuthorization
            | Self::InvalidBearer
            | Self::InvalidToken { .. }
            | Self::TokenRejected { .. } => StatusCode::UNAUTHORIZED,
        }
    }

    /// Flatten into the `{ code, message }` shape handed to the continuation.
    pub fn to_pipeline_error(&self) -> PipelineError {
        PipelineError {
            code: self.status_code().as_u16(),
            message: self.to_string(),
        }
    }
}

/// The sole error shape surfaced to the pipeline continuation and to HTTP clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineError {
    pub code: u16,
    pub message: String,
}

impl From<PassgateError> for PipelineError {
    fn from(err: PassgateError) -> Self {
        err.to_pipeline_error()
    }
}

impl IntoResponse for PassgateError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::debug!(code = status.as_u16(), "Request rejected: {self}");
        (status, axum::Json(self.to_pipeline_error())).into_response()
    }
}

/// Convenience type alias for Results using PassgateError.
pub type PassgateResult<T> = Result<T, PassgateError>;

/// Translate a middleware result into the continuation convention used by
/// callback-style pipelines: `next(None)` on success, `next(Some(error))` on failure.
pub fn dispatch<T, F>(result: PassgateResult<T>, next: F)
where
    F: FnOnce(Option<PipelineError>),
{
    match result {
        Ok(_) => next(None),
        Err(e) => next(Some(e.into())),
    }
}
