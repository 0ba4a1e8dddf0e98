//! Error types for market data operations.
//!
//! This module defines [`QuoteError`], the closed taxonomy every caller-facing
//! operation fails with, and [`UpstreamFailure`], the raw failure signal raised
//! by upstream clients before translation.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors surfaced to callers of the market data service.
///
/// Each variant maps to a fixed HTTP status via [`QuoteError::status_code`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuoteError {
    /// Malformed symbol, keyword or window. Raised before any cache or network access.
    #[error("Invalid parameter: {0}")]
    Validation(String),

    /// The upstream provider rejected the credentials.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The upstream provider does not know the requested symbol.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The upstream provider is throttling requests.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Transport failure, timeout or 5xx from the upstream provider.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Anything not classified above, including unexpected payload shapes.
    #[error("{0}")]
    Unknown(String),
}

impl QuoteError {
    /// Returns the kind of this error without its message.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Auth(_) => ErrorKind::Auth,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::RateLimited(_) => ErrorKind::RateLimited,
            Self::UpstreamUnavailable(_) => ErrorKind::UpstreamUnavailable,
            Self::Unknown(_) => ErrorKind::Unknown,
        }
    }

    /// Returns the HTTP status the routing layer should respond with.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        self.kind().status_code()
    }
}

/// Message-free classification of a [`QuoteError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// See [`QuoteError::Validation`].
    Validation,
    /// See [`QuoteError::Auth`].
    Auth,
    /// See [`QuoteError::NotFound`].
    NotFound,
    /// See [`QuoteError::RateLimited`].
    RateLimited,
    /// See [`QuoteError::UpstreamUnavailable`].
    UpstreamUnavailable,
    /// See [`QuoteError::Unknown`].
    Unknown,
}

impl ErrorKind {
    /// Returns the externally visible HTTP status for this kind.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::Auth => 401,
            Self::NotFound => 404,
            Self::RateLimited => 429,
            Self::UpstreamUnavailable => 503,
            Self::Unknown => 500,
        }
    }

    /// Returns a short lowercase label, suitable for log fields.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Auth => "auth",
            Self::NotFound => "not_found",
            Self::RateLimited => "rate_limited",
            Self::UpstreamUnavailable => "upstream_unavailable",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification attached to an [`UpstreamFailure`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureClass {
    /// Credentials rejected.
    Auth,
    /// Unknown symbol or invalid call.
    NotFound,
    /// Throttled, by status code or by an embedded note.
    RateLimited,
    /// Transport failure, timeout or server error.
    ServiceUnavailable,
    /// Empty payload, missing data key or undecodable body.
    Malformed,
    /// Anything else.
    Unknown,
}

/// Failure raised by an upstream client.
///
/// Carries the HTTP status when the failure came from the transport, and
/// `None` when the transport succeeded but the payload signalled an error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{class:?} (status {status:?}): {message}")]
pub struct UpstreamFailure {
    /// HTTP status code, if a response was received.
    pub status: Option<u16>,
    /// Failure classification.
    pub class: FailureClass,
    /// Human readable detail from the transport or the payload.
    pub message: String,
}

impl UpstreamFailure {
    /// Creates a failure with the given classification and no status.
    #[must_use]
    pub fn new(class: FailureClass, message: impl Into<String>) -> Self {
        Self {
            status: None,
            class,
            message: message.into(),
        }
    }

    /// Sets the HTTP status code.
    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

/// Result type alias using [`QuoteError`].
pub type Result<T> = std::result::Result<T, QuoteError>;
