//! Registered actions and the builder used to declare them.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::value::RawValue;
use serde_json::{Map, Value};
use tracing::warn;

use super::REGISTRY_TARGET;
use super::arguments::Arguments;

/// Error type returned by action handlers.
///
/// Any `std::error::Error + Send + Sync`, `String` or `&str` converts into it.
pub type ActionError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Encoded handler output or the failure it raised.
pub type ActionResult = Result<Box<RawValue>, ActionError>;

pub(crate) type Handler<C> = Arc<dyn Fn(&C, Arguments) -> ActionResult + Send + Sync>;

/// Descriptor keys owned by the registry; flags cannot replace them.
const RESERVED_FLAGS: &[&str] = &["name", "len"];

/// Declaration of an action prior to registration.
///
/// ```rust
/// use extdirect::ActionSpec;
///
/// let spec = ActionSpec::new("profile", "update")
///     .params(["first_name", "last_name"])
///     .flag("formHandler", true);
/// assert_eq!(spec.arity(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ActionSpec {
    namespace: String,
    name: String,
    arity: usize,
    params: Option<Vec<String>>,
    flags: Map<String, Value>,
}

impl ActionSpec {
    /// Declares an action taking no arguments.
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            arity: 0,
            params: None,
            flags: Map::new(),
        }
    }

    /// Sets the positional argument count, discarding any parameter names.
    #[must_use]
    pub fn with_arity(mut self, arity: usize) -> Self {
        self.arity = arity;
        self.params = None;
        self
    }

    /// Names the positional parameters; the arity becomes their count.
    ///
    /// Named parameters let clients send a single object keyed by parameter
    /// name instead of a positional array.
    #[must_use]
    pub fn params<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        self.arity = names.len();
        self.params = Some(names);
        self
    }

    /// Adds a flag merged into the descriptor entry (e.g. `formHandler`).
    ///
    /// The keys `name` and `len` are reserved and ignored.
    #[must_use]
    pub fn flag(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if RESERVED_FLAGS.contains(&key.as_str()) {
            warn!(
                target: REGISTRY_TARGET,
                namespace = %self.namespace,
                method = %self.name,
                flag = %key,
                "ignoring reserved descriptor flag"
            );
            return self;
        }
        self.flags.insert(key, value.into());
        self
    }

    /// Marks the action as a form handler in the descriptor.
    #[must_use]
    pub fn form_handler(self) -> Self {
        self.flag("formHandler", true)
    }

    /// Namespace (Ext.Direct action) the method belongs to.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Method name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared positional argument count.
    #[must_use]
    pub const fn arity(&self) -> usize {
        self.arity
    }
}

/// A registered, immutable remote-callable unit.
pub struct Action<C> {
    namespace: String,
    name: String,
    arity: usize,
    params: Option<Vec<String>>,
    flags: Map<String, Value>,
    handler: Handler<C>,
}

impl<C> Action<C> {
    pub(crate) fn new(spec: ActionSpec, handler: Handler<C>) -> Self {
        let ActionSpec {
            namespace,
            name,
            arity,
            params,
            flags,
        } = spec;
        Self {
            namespace,
            name,
            arity,
            params,
            flags,
            handler,
        }
    }

    /// Namespace the action is registered under.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Method name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of positional arguments, excluding the context.
    #[must_use]
    pub const fn arity(&self) -> usize {
        self.arity
    }

    /// Parameter names, when the action was declared with them.
    #[must_use]
    pub fn params(&self) -> Option<&[String]> {
        self.params.as_deref()
    }

    /// Flags merged into the descriptor entry.
    #[must_use]
    pub const fn flags(&self) -> &Map<String, Value> {
        &self.flags
    }

    /// Runs the handler. Panics raised by the handler are not caught here.
    ///
    /// # Errors
    ///
    /// Returns whatever error the handler raised, or the encoding error when
    /// its result could not be serialised.
    pub fn invoke(&self, context: &C, arguments: Arguments) -> ActionResult {
        (self.handler)(context, arguments)
    }
}

impl<C> Clone for Action<C> {
    fn clone(&self) -> Self {
        Self {
            namespace: self.namespace.clone(),
            name: self.name.clone(),
            arity: self.arity,
            params: self.params.clone(),
            flags: self.flags.clone(),
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<C> fmt::Debug for Action<C> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Action")
            .field("namespace", &self.namespace)
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("params", &self.params)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

/// Erases a typed handler into the shape stored by the registry.
///
/// The result is encoded immediately so serialisation failures surface as
/// handler errors. Returning a `Box<RawValue>` embeds pre-encoded JSON
/// verbatim.
pub(crate) fn into_handler<C, F, R, E>(handler: F) -> Handler<C>
where
    F: Fn(&C, Arguments) -> Result<R, E> + Send + Sync + 'static,
    R: Serialize,
    E: Into<ActionError>,
{
    Arc::new(move |context: &C, arguments: Arguments| -> ActionResult {
        let output = handler(context, arguments).map_err(Into::into)?;
        serde_json::value::to_raw_value(&output).map_err(ActionError::from)
    })
}
