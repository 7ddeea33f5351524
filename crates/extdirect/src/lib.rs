//! Ext.Direct remoting for Rust services.
//!
//! ExtJS clients call server functions through Ext.Direct: they fetch an API
//! descriptor listing the callable actions, then post calls (singly or in
//! batches) to a router endpoint. This crate provides the pieces behind both
//! endpoints:
//!
//! - [`Registry`] and [`SharedRegistry`] hold the callable actions, keyed by
//!   `(namespace, method)` and kept in registration order.
//! - [`ApiDocument`] renders the descriptor as `api.json` or `api.js`.
//! - [`Dispatcher`] decodes router bodies, invokes handlers and builds the
//!   `rpc` or `exception` envelopes.
//! - [`Provider`] combines the above with an [`extdirect_config::Config`] and
//!   is what a web layer normally holds on to.
//! - [`transport::serve_lines`] drives a provider over newline-delimited
//!   streams.
//!
//! Handlers receive a caller-chosen context `C` (for example the incoming
//! HTTP request) followed by their positional [`Arguments`], and return any
//! `Serialize` value.

mod descriptor;
pub mod dispatch;
mod provider;
mod registry;
pub mod telemetry;
pub mod transport;

pub use descriptor::{ActionInfo, ApiDescriptor, ApiDocument, DescriptorError, PROVIDER_TYPE};
pub use dispatch::{
    DispatchError, DispatchOptions, Dispatcher, ErrorKind, FormRequest, RouterResponse,
    RpcRequest, RpcResponse,
};
pub use provider::{
    HTML_CONTENT_TYPE, JSON_CONTENT_TYPE, Provider, RouterReply, SCRIPT_CONTENT_TYPE,
};
pub use registry::{
    Action, ActionError, ActionResult, ActionSpec, ArgumentError, Arguments, LookupError,
    RegistrationError, Registry, SharedRegistry,
};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::{TransportError, serve_lines};

#[cfg(test)]
mod tests;
