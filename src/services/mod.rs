//! Typed endpoint wrappers used by the CLI.
//!
//! ARCHITECTURE
//! ============
//! Services own form validation and envelope typing so the CLI can stay
//! focused on argument parsing and output. All network traffic goes through
//! the shared [`crate::client::ApiClient`], so every call inherits the
//! refresh protocol.

pub mod auth;
pub mod notification;
pub mod petshop;

use reqwest::Url;

use crate::error::ApiError;

/// Stands in for the API origin while a relative path is encoded.
const PATH_ORIGIN: &str = "http://localhost";

/// Input rejected before any network call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("Password must be at least {min} characters")]
    PasswordTooShort { min: usize },
    #[error("{field} is required")]
    MissingField { field: &'static str },
    #[error("Select at least one service")]
    NoServices,
    #[error("invalid email")]
    InvalidEmail,
    #[error("invalid id for {base}")]
    InvalidPath { base: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl ServiceError {
    /// Message suitable for inline display.
    #[must_use]
    pub fn user_message(&self, default: &str) -> String {
        match self {
            Self::Validation(e) => e.to_string(),
            Self::Api(e) => e.user_message(default),
        }
    }
}

fn require(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField { field });
    }
    Ok(())
}

/// Accepts `local@domain` with both halves non-empty.
fn check_email(email: &str) -> Result<(), ValidationError> {
    require(email, "email")?;
    match email.trim().split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => Ok(()),
        _ => Err(ValidationError::InvalidEmail),
    }
}

/// `base` followed by `segments`, each percent-encoded as exactly one path
/// segment. A `/`, `?` or `#` inside an id stays part of that id; empty,
/// `.` and `..` segments are rejected.
fn resource_path(base: &str, segments: &[&str]) -> Result<String, ValidationError> {
    let invalid = || ValidationError::InvalidPath { base: base.to_owned() };
    if segments.iter().any(|s| matches!(*s, "" | "." | "..")) {
        return Err(invalid());
    }
    let mut url = Url::parse(PATH_ORIGIN).and_then(|origin| origin.join(base)).map_err(|_| invalid())?;
    url.path_segments_mut().map_err(|()| invalid())?.pop_if_empty().extend(segments);
    Ok(url.path().to_owned())
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
