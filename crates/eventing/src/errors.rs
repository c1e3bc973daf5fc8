//! Error and retry-policy types for event dispatch.
//!
//! [`DispatchError`] covers the conditions under which an inbound envelope
//! could not be handled. An envelope whose type has no registration is
//! **not** an error; see [`crate::DispatchOutcome::Unhandled`].
//!
//! [`RetryPolicy`] is a cross-cutting concern: the transport delivering
//! envelopes (or publishing them) asks each error whether redelivery can
//! help. Publish-side errors live in [`crate::publisher`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
///
/// Returned by error types so the transport layer can decide between
/// redelivery and dead-lettering without inspecting error details.
///
/// ## Rules
///
/// - `Retryable` errors: transport timeouts, throttling, downstream outages
///   reported by a handler.
/// - `NonRetryable` errors: malformed envelopes, payloads that do not match
///   the registered schema, rejected credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried.
    ///
    /// `after` optionally specifies the minimum delay before retrying (e.g.
    /// derived from a `Retry-After` response header).
    Retryable {
        /// Minimum back-off before the next attempt. `None` means retry
        /// immediately or apply the caller's own back-off schedule.
        after: Option<Duration>,
    },
    /// Redelivering the same input will fail the same way.
    NonRetryable,
}

impl RetryPolicy {
    /// Returns `true` for [`RetryPolicy::Retryable`].
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable { .. })
    }
}

// ---------------------------------------------------------------------------
// Dispatch errors
// ---------------------------------------------------------------------------

/// Errors produced while dispatching one envelope.
///
/// None of these variants is produced after a handler has been given a
/// partially decoded value: decoding finishes (or fails) before the handler
/// is called.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum DispatchError {
    /// The raw input could not be parsed into the envelope shape.
    ///
    /// No handler was invoked.
    #[error("Malformed envelope: {reason}")]
    MalformedEnvelope {
        /// Parser diagnostic describing what was wrong.
        reason: String,
    },

    /// The envelope's type matched a registration but its `data` did not
    /// decode into that registration's schema (typically schema drift
    /// between producer and consumer).
    ///
    /// No handler was invoked.
    #[error("Failed to decode payload for event type '{event_type}': {reason}")]
    DecodeFailure {
        /// The registered type name that matched.
        event_type: String,
        /// Decoder diagnostic.
        reason: String,
    },

    /// The handler received the decoded value and reported a failure.
    #[error("Handler for event type '{event_type}' failed: {message}")]
    HandlerFailure {
        /// The registered type name that matched.
        event_type: String,
        /// Handler-supplied description of the failure.
        message: String,
        /// Whether the handler expects redelivery to succeed.
        retry: RetryPolicy,
    },
}

impl DispatchError {
    /// Builds a [`DispatchError::MalformedEnvelope`] from any displayable cause.
    pub fn malformed(reason: impl std::fmt::Display) -> Self {
        Self::MalformedEnvelope {
            reason: reason.to_string(),
        }
    }

    /// Whether redelivering the same envelope could succeed.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::MalformedEnvelope { .. } | Self::DecodeFailure { .. } => {
                RetryPolicy::NonRetryable
            }
            Self::HandlerFailure { retry, .. } => retry.clone(),
        }
    }

    /// The registered type name involved, if the envelope got that far.
    pub fn event_type(&self) -> Option<&str> {
        match self {
            Self::MalformedEnvelope { .. } => None,
            Self::DecodeFailure { event_type, .. } | Self::HandlerFailure { event_type, .. } => {
                Some(event_type)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Handler and decoder errors
// ---------------------------------------------------------------------------

/// Failure reported by an [`crate::EventHandler`].
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
    retry: RetryPolicy,
}

impl HandlerError {
    /// A failure that may succeed on redelivery (e.g. a downstream outage).
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retry: RetryPolicy::Retryable { after: None },
        }
    }

    /// A failure that will recur for the same event.
    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retry: RetryPolicy::NonRetryable,
        }
    }

    /// Returns the failure description.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the retry policy chosen by the handler.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }
}

/// Failure reported by a [`crate::PayloadDecoder`].
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{0}")]
pub struct DecodeError(String);

impl DecodeError {
    /// Creates a decode error from any displayable cause.
    pub fn new(reason: impl std::fmt::Display) -> Self {
        Self(reason.to_string())
    }
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        Self(err.to_string())
    }
}
