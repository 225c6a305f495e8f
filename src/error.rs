//! Client-core error types.
//!
//! ERROR HANDLING
//! ==============
//! Only refresh failures are handled centrally (session teardown + login
//! redirect). Everything else propagates to the caller untouched, so the UI
//! layer can show the server's message inline.

use reqwest::StatusCode;

use crate::types::ErrorEnvelope;

/// Why a token refresh could not produce a new credential pair.
///
/// `Clone` because the same failure is delivered to every request that was
/// waiting on the refresh.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshError {
    #[error("no refresh token stored")]
    MissingRefreshToken,
    #[error("refresh request failed: {0}")]
    Transport(String),
    #[error("refresh rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("refresh response malformed: {0}")]
    InvalidResponse(String),
    #[error("refresh abandoned before it settled")]
    Abandoned,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Transport-level failure (connect, timeout, body read).
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response that was not recovered by the refresh protocol.
    #[error("request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    /// 2xx response whose envelope reported `success: false`.
    #[error("request rejected: {message}")]
    Rejected { message: String },

    /// Response body did not match the expected envelope.
    #[error("response decode failed: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("session expired: {0}")]
    Refresh(#[from] RefreshError),

    #[error("invalid authorization header value")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl ApiError {
    /// Build a status error from a response body, preferring the envelope's
    /// `error`, then `detail`, then the canonical reason phrase.
    pub(crate) fn from_status(status: StatusCode, body: &str) -> Self {
        Self::Status { status: status.as_u16(), message: status_message(status, body) }
    }

    /// HTTP status carried by the error, when there is one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Whether the session was torn down while handling this error.
    #[must_use]
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::Refresh(_))
    }

    /// Message suitable for inline display, falling back to `default` for
    /// failures that carry nothing user-facing.
    #[must_use]
    pub fn user_message(&self, default: &str) -> String {
        match self {
            Self::Status { message, .. } | Self::Rejected { message } => message.clone(),
            _ => default.to_owned(),
        }
    }
}

/// Human-readable message for an error response body.
pub(crate) fn status_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(ErrorEnvelope::message)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown status").to_owned())
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
