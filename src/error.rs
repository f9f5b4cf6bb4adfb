//! Authorization error taxonomy

use http::StatusCode;
use thiserror::Error;

/// Terminal request errors produced by the authorization pipeline.
///
/// Both variants are surfaced to the HTTP layer as-is; neither is transient.
/// Internal policy failures never reach here, they are logged and downgraded
/// to a plain denial.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Identity could not be established or the credential is invalid.
    #[error("{0}")]
    Unauthorized(String),
    /// Identity established but insufficient privilege, CORS or verification.
    #[error("{0}")]
    Forbidden(String),
    /// Credential store failure during a lookup.
    #[error("{0}")]
    Internal(String),
}

impl AuthError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// HTTP status the caller should answer with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
