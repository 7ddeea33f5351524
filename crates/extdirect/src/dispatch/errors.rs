//! Error types for request dispatch failures.
//!
//! Every variant is converted into an `exception` envelope by the router; none
//! of them escape to the transport. The wire text follows the Ext.Direct
//! conventions clients already display: a short `message` and a `where` field
//! locating the failure.

use std::any::Any;
use std::error::Error as StdError;

use serde::Serialize;
use thiserror::Error;

use crate::registry::LookupError;

/// Failure category reported in the envelope's `kind` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The namespace or method is not registered.
    UnknownAction,
    /// Argument count disagrees with the declared arity.
    ArityMismatch,
    /// The handler returned an error or panicked.
    HandlerError,
    /// The request body or entry could not be decoded.
    MalformedRequest,
}

/// Errors surfaced while dispatching a single call.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No action is registered under the namespace.
    #[error("no such action: {action}")]
    UnknownAction {
        /// Requested namespace.
        action: String,
    },

    /// The namespace exists but lacks the method.
    #[error("no such method '{method}' in action '{action}'")]
    UnknownMethod {
        /// Requested namespace.
        action: String,
        /// Requested method.
        method: String,
    },

    /// The call supplied the wrong number of arguments.
    #[error("invalid arguments: expected {expected}, got {actual}")]
    ArityMismatch {
        /// Declared arity.
        expected: usize,
        /// Arguments supplied.
        actual: usize,
    },

    /// The handler failed; `detail` carries diagnostics when enabled.
    #[error("{message}")]
    Handler {
        /// Display text of the handler error.
        message: String,
        /// Source chain or panic payload, empty outside debug mode.
        detail: String,
    },

    /// The request could not be decoded.
    #[error("malformed request: {message}")]
    MalformedRequest {
        /// Decoder diagnostic.
        message: String,
        /// Underlying JSON error, when there is one.
        #[source]
        source: Option<serde_json::Error>,
    },

    /// The request body exceeds the configured limit.
    #[error("request too large: {size} bytes exceeds {max_size} byte limit")]
    RequestTooLarge {
        /// Observed size in bytes.
        size: usize,
        /// Configured limit in bytes.
        max_size: usize,
    },
}

impl DispatchError {
    /// Failure category for the envelope.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownAction { .. } | Self::UnknownMethod { .. } => ErrorKind::UnknownAction,
            Self::ArityMismatch { .. } => ErrorKind::ArityMismatch,
            Self::Handler { .. } => ErrorKind::HandlerError,
            Self::MalformedRequest { .. } | Self::RequestTooLarge { .. } => {
                ErrorKind::MalformedRequest
            }
        }
    }

    /// Text for the envelope's `message` field.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::UnknownAction { .. } => "no such action".to_owned(),
            Self::UnknownMethod { .. } => "no such method".to_owned(),
            Self::ArityMismatch { .. } => "invalid arguments".to_owned(),
            Self::Handler { message, .. } => message.clone(),
            Self::MalformedRequest { .. } | Self::RequestTooLarge { .. } => {
                "malformed request".to_owned()
            }
        }
    }

    /// Text for the envelope's `where` field.
    #[must_use]
    pub fn location(&self) -> String {
        match self {
            Self::UnknownAction { action } => action.clone(),
            Self::UnknownMethod { method, .. } => method.clone(),
            Self::ArityMismatch { expected, actual } => {
                format!("Expected {expected}, got {actual}")
            }
            Self::Handler { detail, .. } => detail.clone(),
            Self::MalformedRequest { message, .. } => message.clone(),
            Self::RequestTooLarge { size, max_size } => {
                format!("{size} bytes exceeds {max_size} byte limit")
            }
        }
    }

    /// Creates a malformed request error from a serde error.
    pub fn from_json_error(source: serde_json::Error) -> Self {
        Self::MalformedRequest {
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Creates a malformed request error with a custom message.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedRequest {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an arity mismatch error.
    pub const fn arity_mismatch(expected: usize, actual: usize) -> Self {
        Self::ArityMismatch { expected, actual }
    }

    /// Creates a request too large error.
    pub const fn request_too_large(size: usize, max_size: usize) -> Self {
        Self::RequestTooLarge { size, max_size }
    }

    /// Creates a handler error from the error the handler returned.
    ///
    /// With `debug` set, `detail` lists the error followed by its sources.
    pub fn handler(error: &(dyn StdError + 'static), debug: bool) -> Self {
        let detail = if debug {
            error_chain(error)
        } else {
            String::new()
        };
        Self::Handler {
            message: error.to_string(),
            detail,
        }
    }

    /// Creates a handler error from a caught panic payload.
    pub fn handler_panic(payload: &(dyn Any + Send), debug: bool) -> Self {
        let text = payload
            .downcast_ref::<&str>()
            .map(|text| (*text).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_owned());
        let detail = if debug {
            format!("panic: {text}")
        } else {
            String::new()
        };
        Self::Handler {
            message: format!("handler panicked: {text}"),
            detail,
        }
    }
}

impl From<LookupError> for DispatchError {
    fn from(error: LookupError) -> Self {
        match error {
            LookupError::UnknownNamespace { namespace } => {
                Self::UnknownAction { action: namespace }
            }
            LookupError::UnknownMethod { namespace, method } => Self::UnknownMethod {
                action: namespace,
                method,
            },
        }
    }
}

fn error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut lines = vec![error.to_string()];
    let mut source = error.source();
    while let Some(cause) = source {
        lines.push(format!("caused by: {cause}"));
        source = cause.source();
    }
    lines.join("\n")
}
