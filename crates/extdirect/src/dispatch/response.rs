//! Response envelopes returned by the router.
//!
//! Successful calls produce
//! `{"type":"rpc","tid":1,"action":"myclass","method":"myview","result":13.37}`;
//! failures produce an `exception` envelope with `kind`, `message` and
//! `where`. Both always echo the request's `tid`.

use serde::Serialize;
use serde_json::Value;
use serde_json::value::RawValue;

use super::errors::{DispatchError, ErrorKind};
use super::request::RpcRequest;

/// Response envelope for a single call.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RpcResponse {
    /// The handler returned normally.
    Rpc {
        /// Echoed transaction id.
        tid: Value,
        /// Namespace that handled the call.
        action: String,
        /// Method that handled the call.
        method: String,
        /// Encoded handler output.
        result: Box<RawValue>,
    },
    /// The call failed before or during invocation.
    Exception {
        /// Echoed transaction id.
        tid: Value,
        /// Requested namespace, when known.
        #[serde(skip_serializing_if = "Option::is_none")]
        action: Option<String>,
        /// Requested method, when known.
        #[serde(skip_serializing_if = "Option::is_none")]
        method: Option<String>,
        /// Failure category.
        kind: ErrorKind,
        /// Short description shown to users.
        message: String,
        /// Location or diagnostic detail.
        #[serde(rename = "where")]
        location: String,
    },
}

impl RpcResponse {
    /// Wraps a handler result for `request`.
    #[must_use]
    pub fn success(request: &RpcRequest, result: Box<RawValue>) -> Self {
        Self::Rpc {
            tid: request.tid.clone(),
            action: request.action.clone(),
            method: request.method.clone(),
            result,
        }
    }

    /// Builds the failure envelope for a call that named an action.
    #[must_use]
    pub fn failure(request: &RpcRequest, error: &DispatchError) -> Self {
        Self::Exception {
            tid: request.tid.clone(),
            action: Some(request.action.clone()),
            method: Some(request.method.clone()),
            kind: error.kind(),
            message: error.message(),
            location: error.location(),
        }
    }

    /// Builds the failure envelope for input that could not be decoded.
    #[must_use]
    pub fn malformed(tid: Value, error: &DispatchError) -> Self {
        Self::Exception {
            tid,
            action: None,
            method: None,
            kind: error.kind(),
            message: error.message(),
            location: error.location(),
        }
    }

    /// Echoed transaction id.
    #[must_use]
    pub const fn tid(&self) -> &Value {
        match self {
            Self::Rpc { tid, .. } | Self::Exception { tid, .. } => tid,
        }
    }

    /// Returns `true` for `rpc` envelopes.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Rpc { .. })
    }

    /// Failure category, or `None` for successful calls.
    #[must_use]
    pub const fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Rpc { .. } => None,
            Self::Exception { kind, .. } => Some(*kind),
        }
    }

    /// Encoded result of a successful call.
    #[must_use]
    pub fn result(&self) -> Option<&RawValue> {
        match self {
            Self::Rpc { result, .. } => Some(result),
            Self::Exception { .. } => None,
        }
    }

    /// Failure message, or `None` for successful calls.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Rpc { .. } => None,
            Self::Exception { message, .. } => Some(message),
        }
    }
}

/// Router response mirroring the shape of the request body.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RouterResponse {
    /// Answer to a single call object.
    Single(RpcResponse),
    /// Answers to a batch, in request order.
    Batch(Vec<RpcResponse>),
}

impl RouterResponse {
    /// Encodes the response as JSON.
    ///
    /// # Errors
    ///
    /// Returns the serde error if encoding fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Responses in request order.
    #[must_use]
    pub fn responses(&self) -> &[RpcResponse] {
        match self {
            Self::Single(response) => std::slice::from_ref(response),
            Self::Batch(responses) => responses,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn request() -> RpcRequest {
        RpcRequest::new("myclass", "myview", vec![json!(1)], 7)
    }

    fn encode(response: &RpcResponse) -> Value {
        let text = serde_json::to_string(response).expect("encode");
        serde_json::from_str(&text).expect("decode")
    }

    #[test]
    fn success_envelope_shape() {
        let result = serde_json::value::to_raw_value(&13.37).expect("raw");
        let response = RpcResponse::success(&request(), result);
        assert!(response.is_success());
        assert_eq!(
            encode(&response),
            json!({
                "type": "rpc",
                "tid": 7,
                "action": "myclass",
                "method": "myview",
                "result": 13.37
            })
        );
    }

    #[test]
    fn failure_envelope_shape() {
        let response = RpcResponse::failure(&request(), &DispatchError::arity_mismatch(4, 1));
        assert_eq!(response.error_kind(), Some(ErrorKind::ArityMismatch));
        assert_eq!(
            encode(&response),
            json!({
                "type": "exception",
                "tid": 7,
                "action": "myclass",
                "method": "myview",
                "kind": "arity_mismatch",
                "message": "invalid arguments",
                "where": "Expected 4, got 1"
            })
        );
    }

    #[test]
    fn malformed_envelope_omits_names() {
        let response = RpcResponse::malformed(Value::Null, &DispatchError::malformed("bad"));
        let value = encode(&response);
        assert_eq!(value["type"], json!("exception"));
        assert_eq!(value["tid"], Value::Null);
        assert_eq!(value["message"], json!("malformed request"));
        assert!(value.get("action").is_none());
    }

    #[test]
    fn batch_encodes_as_array() {
        let single = RpcResponse::malformed(json!(1), &DispatchError::malformed("bad"));
        let batch = RouterResponse::Batch(vec![single.clone(), single]);
        let value: Value =
            serde_json::from_str(&batch.to_json().expect("encode")).expect("decode");
        assert_eq!(value.as_array().map(Vec::len), Some(2));
        assert_eq!(batch.responses().len(), 2);
    }
}
