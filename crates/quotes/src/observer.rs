//! Observability hooks for fetch orchestration.
//!
//! [`MarketDataService`](crate::MarketDataService) reports every call to a
//! [`FetchObserver`] at fixed points: when the attempt starts, when it is
//! served from cache, and when the upstream call succeeds or fails. Events are
//! informational only; observers cannot influence control flow.

use quotes_core::{CacheKey, ErrorKind, Operation};
use std::fmt::Debug;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, warn};

/// A point in the life of one `get_or_fetch` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchEvent {
    /// The call started.
    Attempt {
        /// Logical operation.
        operation: Operation,
        /// Cache key of the request.
        key: CacheKey,
    },
    /// A fresh cached value was returned; no upstream call was made.
    CacheHit {
        /// Logical operation.
        operation: Operation,
        /// Cache key of the request.
        key: CacheKey,
    },
    /// The upstream call succeeded and the result was cached.
    Success {
        /// Logical operation.
        operation: Operation,
        /// Cache key of the request.
        key: CacheKey,
    },
    /// The upstream call failed.
    Failure {
        /// Logical operation.
        operation: Operation,
        /// Cache key of the request.
        key: CacheKey,
        /// Translated error kind.
        kind: ErrorKind,
        /// Error message.
        message: String,
    },
}

impl FetchEvent {
    /// Returns the cache key the event refers to.
    #[must_use]
    pub const fn key(&self) -> &CacheKey {
        match self {
            Self::Attempt { key, .. }
            | Self::CacheHit { key, .. }
            | Self::Success { key, .. }
            | Self::Failure { key, .. } => key,
        }
    }
}

/// Sink for [`FetchEvent`]s.
pub trait FetchObserver: Send + Sync + Debug {
    /// Records one event. Must not block for long.
    fn on_event(&self, event: &FetchEvent);
}

/// Default observer writing events to `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl FetchObserver for TracingObserver {
    fn on_event(&self, event: &FetchEvent) {
        match event {
            FetchEvent::Attempt { operation, key } => {
                debug!(operation = %operation, key = %key, "Fetch attempt");
            }
            FetchEvent::CacheHit { operation, key } => {
                info!(operation = %operation, key = %key, origin = "cache", "Fetch served");
            }
            FetchEvent::Success { operation, key } => {
                info!(operation = %operation, key = %key, origin = "upstream", "Fetch served");
            }
            FetchEvent::Failure {
                operation,
                key,
                kind,
                message,
            } => {
                warn!(
                    operation = %operation,
                    key = %key,
                    kind = %kind,
                    status = kind.status_code(),
                    error = %message,
                    "Fetch failed"
                );
            }
        }
    }
}

/// Observer that keeps every event in memory, for tests and diagnostics.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<FetchEvent>>,
}

impl RecordingObserver {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded events, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<FetchEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl FetchObserver for RecordingObserver {
    fn on_event(&self, event: &FetchEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}
