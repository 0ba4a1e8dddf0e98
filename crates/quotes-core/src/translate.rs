//! Translation of upstream failure signals into the [`QuoteError`] taxonomy.
//!
//! Upstream clients classify what they see (a status code, an embedded notice,
//! a payload that does not decode) into a [`FailureClass`]. The functions here
//! are pure so that a 429 response and a 200 response carrying a throttling
//! note end up as the same [`QuoteError::RateLimited`].

use crate::error::{FailureClass, QuoteError, UpstreamFailure};

/// Lowercase fragments that mark a provider notice as throttling.
const RATE_LIMIT_MARKERS: &[&str] = &[
    "rate limit",
    "call frequency",
    "too many requests",
    "requests per",
    "premium endpoint",
    "thank you for using alpha vantage",
];

/// Lowercase fragments that mark an error message as a credential rejection.
const API_KEY_MARKERS: &[&str] = &["apikey", "api key"];

/// Classifies a non-success HTTP status code.
#[must_use]
pub const fn classify_status(status: u16) -> FailureClass {
    match status {
        401 | 403 => FailureClass::Auth,
        404 => FailureClass::NotFound,
        429 => FailureClass::RateLimited,
        408 | 500..=599 => FailureClass::ServiceUnavailable,
        _ => FailureClass::Unknown,
    }
}

/// Classifies an informational notice embedded in a successful response.
///
/// Only throttling-shaped text is treated as a rate limit; anything else is
/// unknown.
#[must_use]
pub fn classify_notice(text: &str) -> FailureClass {
    let lower = text.to_lowercase();
    if RATE_LIMIT_MARKERS.iter().any(|m| lower.contains(m)) {
        FailureClass::RateLimited
    } else {
        FailureClass::Unknown
    }
}

/// Classifies an error message embedded in a successful response.
///
/// The provider rejects a missing or invalid key with a 200 response, so a
/// message about the key is an auth failure. Any other message means the
/// requested resource does not exist.
#[must_use]
pub fn classify_error_message(text: &str) -> FailureClass {
    let lower = text.to_lowercase();
    if API_KEY_MARKERS.iter().any(|m| lower.contains(m)) {
        FailureClass::Auth
    } else {
        FailureClass::NotFound
    }
}

/// Maps an upstream failure onto the caller-facing taxonomy.
#[must_use]
pub fn translate(failure: &UpstreamFailure) -> QuoteError {
    let message = failure.message.clone();
    match failure.class {
        FailureClass::Auth => QuoteError::Auth(message),
        FailureClass::NotFound => QuoteError::NotFound(message),
        FailureClass::RateLimited => QuoteError::RateLimited(message),
        FailureClass::ServiceUnavailable => QuoteError::UpstreamUnavailable(message),
        FailureClass::Malformed => {
            QuoteError::Unknown(format!("Malformed upstream payload: {message}"))
        }
        FailureClass::Unknown => QuoteError::Unknown(message),
    }
}

impl From<UpstreamFailure> for QuoteError {
    fn from(failure: UpstreamFailure) -> Self {
        translate(&failure)
    }
}
