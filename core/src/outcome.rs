//! The terminal result of one request lifecycle.
//!
//! # Design
//! `Outcome` is the only thing `execute` ever produces. Every transport or
//! decoding failure is folded into `Failure`, so callers pattern-match on the
//! tag instead of handling errors. Shape-specific decoding stays with the
//! caller: `Outcome::decode` is a convenience, not a requirement.
//!
//! `CallState` tracks one call from `Idle` to one of four absorbing terminal
//! states. Settling a call that is already terminal changes nothing.

use std::fmt;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::ApiError;

/// Failure categories, rendered as `timeout`, `network` and `http-error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureReason {
    Timeout,
    Network,
    HttpError,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::Timeout => "timeout",
            FailureReason::Network => "network",
            FailureReason::HttpError => "http-error",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A call that did not produce a 2xx JSON response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum Failure {
    /// The server answered with a non-2xx status and a JSON body.
    HttpError { status: u16, body: Value },

    /// No response arrived within the timeout; the transport was dropped.
    Timeout {
        #[serde(rename = "after_ms", serialize_with = "duration_as_millis")]
        after: Duration,
    },

    /// The transport failed before a response, or the body was not JSON.
    Network { detail: String },
}

impl Failure {
    pub fn reason(&self) -> FailureReason {
        match self {
            Failure::HttpError { .. } => FailureReason::HttpError,
            Failure::Timeout { .. } => FailureReason::Timeout,
            Failure::Network { .. } => FailureReason::Network,
        }
    }
}

/// Exactly-once result of `RequestLifecycleController::execute`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Success { status: u16, body: Value },
    Failure(Failure),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn reason(&self) -> Option<FailureReason> {
        match self {
            Outcome::Success { .. } => None,
            Outcome::Failure(failure) => Some(failure.reason()),
        }
    }

    /// Status code, present whenever a response was received and decoded.
    pub fn status(&self) -> Option<u16> {
        match self {
            Outcome::Success { status, .. }
            | Outcome::Failure(Failure::HttpError { status, .. }) => Some(*status),
            Outcome::Failure(_) => None,
        }
    }

    /// Decoded body, present for `Success` and `http-error`.
    pub fn body(&self) -> Option<&Value> {
        match self {
            Outcome::Success { body, .. } | Outcome::Failure(Failure::HttpError { body, .. }) => {
                Some(body)
            }
            Outcome::Failure(_) => None,
        }
    }

    /// The server-supplied `error` string of an `http-error` body, verbatim.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Outcome::Failure(Failure::HttpError { body, .. }) => {
                body.get("error").and_then(Value::as_str)
            }
            _ => None,
        }
    }

    /// Human-readable summary of a failure, suitable for display.
    pub fn describe_failure(&self) -> Option<String> {
        match self {
            Outcome::Success { .. } => None,
            Outcome::Failure(Failure::HttpError { status, .. }) => Some(
                self.error_message()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("server responded with HTTP {status}")),
            ),
            Outcome::Failure(Failure::Timeout { after }) => {
                Some(format!("no response within {} ms", after.as_millis()))
            }
            Outcome::Failure(Failure::Network { detail }) => Some(detail.clone()),
        }
    }

    pub fn terminal_state(&self) -> CallState {
        match self {
            Outcome::Success { .. } => CallState::Succeeded,
            Outcome::Failure(Failure::HttpError { .. }) => CallState::HttpError,
            Outcome::Failure(Failure::Timeout { .. }) => CallState::TimedOut,
            Outcome::Failure(Failure::Network { .. }) => CallState::NetworkFailed,
        }
    }

    /// Deserialize a `Success` body into `T`; map every failure to `ApiError`.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        match self {
            Outcome::Success { body, .. } => serde_json::from_value(body)
                .map_err(|e| ApiError::DeserializationError(e.to_string())),
            Outcome::Failure(Failure::HttpError { status: 404, body }) => {
                Err(ApiError::NotFound {
                    message: error_field(&body).unwrap_or_else(|| "not found".to_string()),
                })
            }
            failure @ Outcome::Failure(_) => {
                let message = failure.describe_failure().unwrap_or_default();
                Err(ApiError::RequestFailed {
                    reason: failure.reason().unwrap_or(FailureReason::Network),
                    status: failure.status(),
                    message,
                })
            }
        }
    }
}

fn error_field(body: &Value) -> Option<String> {
    body.get("error").and_then(Value::as_str).map(str::to_string)
}

fn duration_as_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}

/// Per-call lifecycle: `Idle -> InFlight -> terminal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallState {
    #[default]
    Idle,
    InFlight,
    Succeeded,
    TimedOut,
    NetworkFailed,
    HttpError,
}

impl CallState {
    /// `Idle -> InFlight`. Any other state is returned unchanged.
    pub fn begin(self) -> Self {
        match self {
            CallState::Idle => CallState::InFlight,
            other => other,
        }
    }

    /// `InFlight -> terminal`. Terminal states absorb; `Idle` cannot settle.
    pub fn settle(self, outcome: &Outcome) -> Self {
        match self {
            CallState::InFlight => outcome.terminal_state(),
            other => other,
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, CallState::Idle | CallState::InFlight)
    }
}
