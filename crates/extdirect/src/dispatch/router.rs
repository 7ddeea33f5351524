//! Action routing and invocation.
//!
//! The [`Dispatcher`] resolves each call against the current registry
//! snapshot, binds its arguments, invokes the handler and wraps the outcome in
//! an envelope. Every failure (unknown action, arity mismatch, handler error
//! or panic, malformed input) becomes an `exception` envelope; nothing is
//! propagated to the caller.

use std::panic::{self, AssertUnwindSafe};

use extdirect_config::{Config, DEFAULT_MAX_REQUEST_BYTES};
use serde_json::value::RawValue;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::registry::{Action, Arguments, Registry, SharedRegistry};

use super::errors::DispatchError;
use super::form::FormRequest;
use super::request::{RouterPayload, RpcRequest};
use super::response::{RouterResponse, RpcResponse};

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Behavioural switches for the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Include error source chains in the `where` field.
    pub debug: bool,
    /// Largest router body accepted, in bytes.
    pub max_request_bytes: usize,
}

impl DispatchOptions {
    /// Reads the dispatch switches from the provider configuration.
    #[must_use]
    pub const fn from_config(config: &Config) -> Self {
        Self {
            debug: config.debug(),
            max_request_bytes: config.max_request_bytes(),
        }
    }
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            debug: false,
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
        }
    }
}

/// Routes decoded calls to registered handlers.
pub struct Dispatcher<C> {
    registry: SharedRegistry<C>,
    options: DispatchOptions,
}

impl<C> Dispatcher<C> {
    /// Creates a dispatcher reading from `registry`.
    #[must_use]
    pub const fn new(registry: SharedRegistry<C>, options: DispatchOptions) -> Self {
        Self { registry, options }
    }

    /// Options in effect.
    #[must_use]
    pub const fn options(&self) -> DispatchOptions {
        self.options
    }

    /// Handles a single call.
    ///
    /// The response always echoes `request.tid`.
    pub fn handle(&self, request: &RpcRequest, context: &C) -> RpcResponse {
        let registry = self.registry.snapshot();
        match self.call(&registry, request, context) {
            Ok(result) => RpcResponse::success(request, result),
            Err(error) => {
                warn!(
                    target: DISPATCH_TARGET,
                    action = %request.action,
                    method = %request.method,
                    kind = ?error.kind(),
                    %error,
                    "call failed"
                );
                RpcResponse::failure(request, &error)
            }
        }
    }

    /// Handles calls in order; each entry fails independently.
    pub fn handle_batch(&self, requests: &[RpcRequest], context: &C) -> Vec<RpcResponse> {
        requests
            .iter()
            .map(|request| self.handle(request, context))
            .collect()
    }

    /// Handles a form submission.
    ///
    /// Form calls bypass the arity check: the handler receives a single
    /// argument holding the submitted fields as a JSON object.
    pub fn handle_form(&self, form: &FormRequest, context: &C) -> RpcResponse {
        let request = form.to_request();
        let registry = self.registry.snapshot();
        let outcome = registry
            .lookup(&request.action, &request.method)
            .map_err(DispatchError::from)
            .and_then(|action| {
                let fields = Value::Object(form.fields_object());
                self.invoke(action, context, Arguments::new(vec![fields]))
            });
        match outcome {
            Ok(result) => RpcResponse::success(&request, result),
            Err(error) => {
                warn!(
                    target: DISPATCH_TARGET,
                    action = %request.action,
                    method = %request.method,
                    kind = ?error.kind(),
                    %error,
                    "form call failed"
                );
                RpcResponse::failure(&request, &error)
            }
        }
    }

    /// Decodes and handles a router body.
    ///
    /// A JSON object yields a single response, an array yields one response
    /// per entry in the same order. Bodies that cannot be decoded, or exceed
    /// the size limit, yield a single malformed envelope with a `null` tid.
    pub fn route(&self, body: &[u8], context: &C) -> RouterResponse {
        if body.len() > self.options.max_request_bytes {
            let error =
                DispatchError::request_too_large(body.len(), self.options.max_request_bytes);
            warn!(target: DISPATCH_TARGET, %error, "rejecting router body");
            return RouterResponse::Single(RpcResponse::malformed(Value::Null, &error));
        }

        let payload = match RouterPayload::parse(body) {
            Ok(payload) => payload,
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %error, "malformed router body");
                return RouterResponse::Single(RpcResponse::malformed(Value::Null, &error));
            }
        };

        match payload {
            RouterPayload::Single(entry) => {
                RouterResponse::Single(self.handle_entry(entry, context))
            }
            RouterPayload::Batch(entries) => {
                debug!(target: DISPATCH_TARGET, size = entries.len(), "dispatching batch");
                RouterResponse::Batch(
                    entries
                        .into_iter()
                        .map(|entry| self.handle_entry(entry, context))
                        .collect(),
                )
            }
        }
    }

    fn handle_entry(&self, entry: Value, context: &C) -> RpcResponse {
        match RpcRequest::from_value(entry) {
            Ok(request) => self.handle(&request, context),
            Err((tid, error)) => {
                warn!(target: DISPATCH_TARGET, %error, "malformed request entry");
                RpcResponse::malformed(tid, &error)
            }
        }
    }

    fn call(
        &self,
        registry: &Registry<C>,
        request: &RpcRequest,
        context: &C,
    ) -> Result<Box<RawValue>, DispatchError> {
        let action = registry.lookup(&request.action, &request.method)?;
        let arguments = bind_arguments(action, request.data.clone().unwrap_or_default());
        if arguments.len() != action.arity() {
            return Err(DispatchError::arity_mismatch(action.arity(), arguments.len()));
        }

        debug!(
            target: DISPATCH_TARGET,
            action = %request.action,
            method = %request.method,
            arity = action.arity(),
            "invoking action"
        );
        self.invoke(action, context, arguments)
    }

    fn invoke(
        &self,
        action: &Action<C>,
        context: &C,
        arguments: Arguments,
    ) -> Result<Box<RawValue>, DispatchError> {
        match panic::catch_unwind(AssertUnwindSafe(|| action.invoke(context, arguments))) {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(error)) => Err(DispatchError::handler(&*error, self.options.debug)),
            Err(payload) => Err(DispatchError::handler_panic(&*payload, self.options.debug)),
        }
    }
}

impl<C> Clone for Dispatcher<C> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            options: self.options,
        }
    }
}

impl<C> std::fmt::Debug for Dispatcher<C> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("options", &self.options)
            .finish()
    }
}

/// Converts a named-argument object into positional arguments.
///
/// Applies only when the action declares parameter names, takes at least one
/// argument, and `data` is a single object containing every name. Anything
/// else is passed through unchanged.
fn bind_arguments<C>(action: &Action<C>, data: Vec<Value>) -> Arguments {
    let Some(params) = action.params().filter(|params| !params.is_empty()) else {
        return Arguments::new(data);
    };
    match data.as_slice() {
        [Value::Object(named)] => match positional_from_named(params, named) {
            Some(positional) => Arguments::new(positional),
            None => Arguments::new(data),
        },
        _ => Arguments::new(data),
    }
}

fn positional_from_named(params: &[String], named: &Map<String, Value>) -> Option<Vec<Value>> {
    params
        .iter()
        .map(|param| named.get(param).cloned())
        .collect()
}
