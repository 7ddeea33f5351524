//! Provider facade tying configuration, registry and dispatcher together.
//!
//! A web layer typically needs three endpoints: `api.js` (or `api.json`) to
//! publish the descriptor, and the router to execute calls. [`Provider`]
//! renders the first two and answers the third with a [`RouterReply`] the
//! layer can copy into its HTTP response.

use extdirect_config::Config;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::descriptor::{ApiDescriptor, ApiDocument, DescriptorError, RESERVED_SETTINGS};
use crate::dispatch::{
    DISPATCH_TARGET, DispatchOptions, Dispatcher, FormRequest, RouterResponse,
};
use crate::registry::{ActionError, ActionSpec, Arguments, RegistrationError, SharedRegistry};

/// Content type of router replies and `api.json`.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Content type of `api.js`.
pub const SCRIPT_CONTENT_TYPE: &str = "text/javascript";

/// Content type of iframe upload replies.
pub const HTML_CONTENT_TYPE: &str = "text/html";

/// Envelope sent when a reply cannot be encoded.
const ENCODE_FAILURE_ENVELOPE: &str = concat!(
    r#"{"type":"exception","tid":null,"kind":"handler_error","#,
    r#""message":"failed to encode response","where":""}"#
);

/// Encoded reply to a router request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterReply {
    /// MIME type of `body`.
    pub content_type: &'static str,
    /// Response body.
    pub body: String,
}

/// An Ext.Direct remoting provider.
///
/// `C` is the per-call context handed to every handler (a request, a session
/// or `()`).
///
/// ```rust
/// use extdirect::Provider;
/// use extdirect_config::Config;
///
/// let provider = Provider::<()>::new(Config::default());
/// provider.register("myclass", "myview", 4, |_, _| Ok::<_, String>(13.37));
///
/// let reply = provider.route(
///     br#"{"action":"myclass","method":"myview","data":[1,2,3,4],"type":"rpc","tid":1}"#,
///     &(),
/// );
/// assert!(reply.body.contains("13.37"));
/// ```
pub struct Provider<C> {
    config: Config,
    registry: SharedRegistry<C>,
    dispatcher: Dispatcher<C>,
    settings: Map<String, Value>,
}

impl<C> Provider<C> {
    /// Creates a provider with an empty registry.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self::with_registry(config, SharedRegistry::default())
    }

    /// Creates a provider serving an existing registry.
    #[must_use]
    pub fn with_registry(config: Config, registry: SharedRegistry<C>) -> Self {
        let dispatcher = Dispatcher::new(registry.clone(), DispatchOptions::from_config(&config));
        debug!(
            target: DISPATCH_TARGET,
            provider = %config.provider_name(),
            router_url = %config.router_url(),
            debug = config.debug(),
            "provider created"
        );
        Self {
            config,
            registry,
            dispatcher,
            settings: Map::new(),
        }
    }

    /// Adds an extra top-level key to the descriptor, e.g. `namespace`.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::ReservedSetting`] for `url`, `type`,
    /// `actions` and `timeout`.
    pub fn with_setting(
        mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<Self, DescriptorError> {
        let key = key.into();
        if RESERVED_SETTINGS.contains(&key.as_str()) {
            return Err(DescriptorError::ReservedSetting { key });
        }
        self.settings.insert(key, value.into());
        Ok(self)
    }

    /// Configuration the provider was built from.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Registry backing the provider.
    #[must_use]
    pub const fn registry(&self) -> &SharedRegistry<C> {
        &self.registry
    }

    /// Dispatcher answering router calls.
    #[must_use]
    pub const fn dispatcher(&self) -> &Dispatcher<C> {
        &self.dispatcher
    }

    /// Registers or replaces `namespace.name`.
    pub fn register<F, R, E>(
        &self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        arity: usize,
        handler: F,
    ) where
        F: Fn(&C, Arguments) -> Result<R, E> + Send + Sync + 'static,
        R: Serialize,
        E: Into<ActionError>,
    {
        self.registry.register(namespace, name, arity, handler);
    }

    /// Registers or replaces an action declared through an [`ActionSpec`].
    pub fn register_action<F, R, E>(&self, spec: ActionSpec, handler: F)
    where
        F: Fn(&C, Arguments) -> Result<R, E> + Send + Sync + 'static,
        R: Serialize,
        E: Into<ActionError>,
    {
        self.registry.register_action(spec, handler);
    }

    /// Registers an action, rejecting pairs that are already present.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::Duplicate`] when the pair exists.
    pub fn try_register<F, R, E>(
        &self,
        spec: ActionSpec,
        handler: F,
    ) -> Result<(), RegistrationError>
    where
        F: Fn(&C, Arguments) -> Result<R, E> + Send + Sync + 'static,
        R: Serialize,
        E: Into<ActionError>,
    {
        self.registry.try_register(spec, handler)
    }

    /// Descriptor of the currently registered actions.
    #[must_use]
    pub fn descriptor(&self) -> ApiDescriptor {
        self.registry.describe()
    }

    /// Renders `api.json`.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::Encode`] when serialisation fails.
    pub fn api_json(&self) -> Result<String, DescriptorError> {
        let actions = self.descriptor();
        self.document(&actions).to_json()
    }

    /// Renders `api.js`.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::Encode`] when serialisation fails.
    pub fn api_script(&self) -> Result<String, DescriptorError> {
        let actions = self.descriptor();
        self.document(&actions)
            .to_script(self.config.provider_name(), self.config.autoadd())
    }

    /// Executes a router body and encodes the reply.
    pub fn route(&self, body: &[u8], context: &C) -> RouterReply {
        let response = self.dispatcher.route(body, context);
        let batch = matches!(response, RouterResponse::Batch(_));
        RouterReply {
            content_type: JSON_CONTENT_TYPE,
            body: encode_or_fallback(&response, batch),
        }
    }

    /// Executes a form submission and encodes the reply.
    ///
    /// Upload replies are wrapped in a `<textarea>` document because ExtJS
    /// reads them from a hidden iframe.
    pub fn route_form(&self, form: &FormRequest, context: &C) -> RouterReply {
        let response = self.dispatcher.handle_form(form, context);
        let json = encode_or_fallback(&response, false);
        if form.upload {
            RouterReply {
                content_type: HTML_CONTENT_TYPE,
                body: format!("<html><body><textarea>{json}</textarea></body></html>"),
            }
        } else {
            RouterReply {
                content_type: JSON_CONTENT_TYPE,
                body: json,
            }
        }
    }

    fn document<'a>(&'a self, actions: &'a ApiDescriptor) -> ApiDocument<'a> {
        ApiDocument::new(
            &self.settings,
            self.config.router_url(),
            actions,
            self.config.timeout_millis(),
        )
    }
}

impl<C> std::fmt::Debug for Provider<C> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Provider")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Encodes `response`, substituting an exception envelope on failure.
///
/// A batch reply falls back to a one-element array so clients expecting an
/// array still receive one.
fn encode_or_fallback<T: Serialize>(response: &T, batch: bool) -> String {
    serde_json::to_string(response).unwrap_or_else(|err| {
        error!(target: DISPATCH_TARGET, error = %err, batch, "failed to encode router response");
        if batch {
            format!("[{ENCODE_FAILURE_ENVELOPE}]")
        } else {
            ENCODE_FAILURE_ENVELOPE.to_owned()
        }
    })
}
