//! Request decoding for the router endpoint.
//!
//! Clients post either a single call object or a batch array:
//!
//! ```json
//! {"action":"myclass","method":"myview","data":[1,2,3,4],"type":"rpc","tid":1}
//! ```
//!
//! Batch entries are decoded one by one so a malformed entry only fails
//! itself.

use serde::Deserialize;
use serde_json::Value;

use super::errors::DispatchError;

/// A single decoded Ext.Direct call.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RpcRequest {
    /// Namespace (Ext.Direct "action").
    pub action: String,
    /// Method within the namespace.
    pub method: String,
    /// Positional arguments; absent or `null` means none.
    #[serde(default)]
    pub data: Option<Vec<Value>>,
    /// Correlation token echoed verbatim.
    #[serde(default)]
    pub tid: Value,
    /// Call type sent by the client (normally `rpc`); not interpreted.
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl RpcRequest {
    /// Builds a request for in-process callers.
    pub fn new(
        action: impl Into<String>,
        method: impl Into<String>,
        data: Vec<Value>,
        tid: impl Into<Value>,
    ) -> Self {
        Self {
            action: action.into(),
            method: method.into(),
            data: Some(data),
            tid: tid.into(),
            kind: Some("rpc".to_owned()),
        }
    }

    /// Decodes one request object.
    ///
    /// On failure the best-effort `tid` is returned alongside the error so
    /// the failure envelope can still be correlated.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::MalformedRequest` when the value is not an
    /// object matching the request schema.
    pub fn from_value(value: Value) -> Result<Self, (Value, DispatchError)> {
        let tid = value.get("tid").cloned().unwrap_or(Value::Null);
        if !value.is_object() {
            return Err((tid, DispatchError::malformed("request entry is not an object")));
        }
        serde_json::from_value(value).map_err(|error| (tid, DispatchError::from_json_error(error)))
    }

    /// Number of positional arguments supplied.
    #[must_use]
    pub fn argument_count(&self) -> usize {
        self.data.as_ref().map_or(0, Vec::len)
    }
}

/// Router body shape: one call or a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum RouterPayload {
    /// A single call object.
    Single(Value),
    /// A batch of call objects, answered in the same order.
    Batch(Vec<Value>),
}

impl RouterPayload {
    /// Parses a router body.
    ///
    /// Surrounding whitespace (including a line delimiter) is ignored.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::MalformedRequest` if the body is empty or is
    /// not valid JSON.
    pub fn parse(body: &[u8]) -> Result<Self, DispatchError> {
        let trimmed = body.trim_ascii();
        if trimmed.is_empty() {
            return Err(DispatchError::malformed("empty request body"));
        }

        let value: Value = serde_json::from_slice(trimmed).map_err(DispatchError::from_json_error)?;
        Ok(match value {
            Value::Array(entries) => Self::Batch(entries),
            other => Self::Single(other),
        })
    }
}
