//! Positional arguments handed to action handlers.

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Decoded argument list for a single call.
///
/// The list never includes the leading context argument; its length always
/// equals the arity of the invoked action for RPC calls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments(Vec<Value>);

impl Arguments {
    /// Wraps an already decoded argument list.
    #[must_use]
    pub const fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    /// Number of arguments supplied.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when no arguments were supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Raw JSON value at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    /// Iterates over the raw argument values.
    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.0.iter()
    }

    /// Decodes the argument at `index` into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ArgumentError::Missing`] when fewer arguments were supplied
    /// and [`ArgumentError::Decode`] when the value does not match `T`.
    pub fn parse<T: DeserializeOwned>(&self, index: usize) -> Result<T, ArgumentError> {
        let value = self.get(index).ok_or(ArgumentError::Missing { index })?;
        T::deserialize(value).map_err(|source| ArgumentError::Decode { index, source })
    }

    /// Consumes the wrapper and returns the raw values.
    #[must_use]
    pub fn into_inner(self) -> Vec<Value> {
        self.0
    }
}

impl From<Vec<Value>> for Arguments {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}

/// Errors raised while decoding handler arguments.
#[derive(Debug, Error)]
pub enum ArgumentError {
    /// Fewer arguments were supplied than the handler reads.
    #[error("missing argument at position {index}")]
    Missing {
        /// Zero-based position requested.
        index: usize,
    },
    /// The argument could not be decoded into the requested type.
    #[error("argument {index} has an unexpected shape: {source}")]
    Decode {
        /// Zero-based position of the argument.
        index: usize,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },
}
