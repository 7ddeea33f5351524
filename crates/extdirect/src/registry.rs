//! Action registry mapping `(namespace, method)` pairs to handlers.
//!
//! The registry preserves registration order: namespaces appear in the order
//! they were first registered and methods in the order they were added to
//! their namespace. Re-registering an existing pair replaces the action in
//! place, so descriptor order stays stable across overwrites.
//!
//! A [`Registry`] is a plain value populated during start-up. Once serving
//! begins it is published through a [`SharedRegistry`], which hands out
//! immutable snapshots to dispatchers and serialises any later writers.

mod action;
mod arguments;
mod shared;

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::descriptor::{ActionInfo, ApiDescriptor};

pub use self::action::{Action, ActionError, ActionResult, ActionSpec};
pub use self::arguments::{ArgumentError, Arguments};
pub use self::shared::SharedRegistry;

use self::action::into_handler;

/// Tracing target for registry operations.
pub(crate) const REGISTRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::registry");

/// Failed lookup of a `(namespace, method)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// No action was ever registered under the namespace.
    #[error("no such action: {namespace}")]
    UnknownNamespace {
        /// Requested namespace.
        namespace: String,
    },
    /// The namespace exists but does not contain the method.
    #[error("no such method '{method}' in action '{namespace}'")]
    UnknownMethod {
        /// Namespace that was found.
        namespace: String,
        /// Method missing from it.
        method: String,
    },
}

/// Errors raised by strict registration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// The `(namespace, method)` pair is already registered.
    #[error("action '{namespace}.{method}' is already registered")]
    Duplicate {
        /// Namespace of the existing action.
        namespace: String,
        /// Method name of the existing action.
        method: String,
    },
}

struct Namespace<C> {
    name: String,
    actions: Vec<Arc<Action<C>>>,
    positions: HashMap<String, usize>,
}

impl<C> Namespace<C> {
    fn new(name: String) -> Self {
        Self {
            name,
            actions: Vec::new(),
            positions: HashMap::new(),
        }
    }

    fn get(&self, method: &str) -> Option<&Arc<Action<C>>> {
        self.positions
            .get(method)
            .and_then(|position| self.actions.get(*position))
    }

    /// Inserts or replaces an action, returning `true` on replacement.
    fn upsert(&mut self, action: Action<C>) -> bool {
        let action = Arc::new(action);
        if let Some(slot) = self
            .positions
            .get(action.name())
            .and_then(|position| self.actions.get_mut(*position))
        {
            *slot = action;
            return true;
        }
        self.positions
            .insert(action.name().to_owned(), self.actions.len());
        self.actions.push(action);
        false
    }
}

impl<C> Clone for Namespace<C> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            actions: self.actions.clone(),
            positions: self.positions.clone(),
        }
    }
}

/// Ordered mapping from `(namespace, method)` to registered actions.
pub struct Registry<C> {
    namespaces: Vec<Namespace<C>>,
    positions: HashMap<String, usize>,
}

impl<C> Registry<C> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            namespaces: Vec::new(),
            positions: HashMap::new(),
        }
    }

    /// Registers `handler` as `namespace.name` taking `arity` positional
    /// arguments after the context.
    ///
    /// An existing registration for the same pair is replaced.
    ///
    /// ```rust
    /// use extdirect::Registry;
    ///
    /// let mut registry = Registry::<()>::new();
    /// registry.register("myclass", "myview", 4, |_, _| Ok::<_, String>(13.37));
    /// assert_eq!(registry.lookup("myclass", "myview").map(|a| a.arity()), Ok(4));
    /// ```
    pub fn register<F, R, E>(
        &mut self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        arity: usize,
        handler: F,
    ) where
        F: Fn(&C, Arguments) -> Result<R, E> + Send + Sync + 'static,
        R: Serialize,
        E: Into<ActionError>,
    {
        self.register_action(ActionSpec::new(namespace, name).with_arity(arity), handler);
    }

    /// Registers an action declared through an [`ActionSpec`].
    ///
    /// An existing registration for the same pair is replaced in place.
    pub fn register_action<F, R, E>(&mut self, spec: ActionSpec, handler: F)
    where
        F: Fn(&C, Arguments) -> Result<R, E> + Send + Sync + 'static,
        R: Serialize,
        E: Into<ActionError>,
    {
        self.insert(Action::new(spec, into_handler(handler)));
    }

    /// Registers an action, rejecting pairs that are already present.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::Duplicate`] when the pair exists.
    pub fn try_register<F, R, E>(
        &mut self,
        spec: ActionSpec,
        handler: F,
    ) -> Result<(), RegistrationError>
    where
        F: Fn(&C, Arguments) -> Result<R, E> + Send + Sync + 'static,
        R: Serialize,
        E: Into<ActionError>,
    {
        if self.contains(spec.namespace(), spec.name()) {
            return Err(RegistrationError::Duplicate {
                namespace: spec.namespace().to_owned(),
                method: spec.name().to_owned(),
            });
        }
        self.register_action(spec, handler);
        Ok(())
    }

    fn insert(&mut self, action: Action<C>) {
        let namespace = action.namespace().to_owned();
        let method = action.name().to_owned();
        let arity = action.arity();

        let position = match self.positions.get(&namespace) {
            Some(position) => *position,
            None => {
                self.positions
                    .insert(namespace.clone(), self.namespaces.len());
                self.namespaces.push(Namespace::new(namespace.clone()));
                self.namespaces.len() - 1
            }
        };

        let Some(entry) = self.namespaces.get_mut(position) else {
            return;
        };
        if entry.upsert(action) {
            warn!(
                target: REGISTRY_TARGET,
                namespace = %namespace,
                method = %method,
                arity,
                "replaced existing action registration"
            );
        } else {
            debug!(
                target: REGISTRY_TARGET,
                namespace = %namespace,
                method = %method,
                arity,
                "registered action"
            );
        }
    }

    /// Looks up the action registered as `namespace.method`.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError`] naming the missing namespace or method.
    pub fn lookup(&self, namespace: &str, method: &str) -> Result<&Action<C>, LookupError> {
        let entry = self
            .namespace(namespace)
            .ok_or_else(|| LookupError::UnknownNamespace {
                namespace: namespace.to_owned(),
            })?;
        entry
            .get(method)
            .map(|action| &**action)
            .ok_or_else(|| LookupError::UnknownMethod {
                namespace: namespace.to_owned(),
                method: method.to_owned(),
            })
    }

    /// Returns `true` when `namespace.method` is registered.
    #[must_use]
    pub fn contains(&self, namespace: &str, method: &str) -> bool {
        self.lookup(namespace, method).is_ok()
    }

    /// Total number of registered actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.namespaces
            .iter()
            .map(|entry| entry.actions.len())
            .sum()
    }

    /// Returns `true` when nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }

    /// Namespaces in first-registration order.
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.namespaces.iter().map(|entry| entry.name.as_str())
    }

    /// Builds the ordered API descriptor snapshot.
    #[must_use]
    pub fn describe(&self) -> ApiDescriptor {
        let mut descriptor = ApiDescriptor::default();
        for entry in &self.namespaces {
            let actions = entry
                .actions
                .iter()
                .map(|action| ActionInfo::from_action(action))
                .collect();
            descriptor.push_namespace(entry.name.clone(), actions);
        }
        descriptor
    }

    fn namespace(&self, name: &str) -> Option<&Namespace<C>> {
        self.positions
            .get(name)
            .and_then(|position| self.namespaces.get(*position))
    }
}

impl<C> Default for Registry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Clone for Registry<C> {
    fn clone(&self) -> Self {
        Self {
            namespaces: self.namespaces.clone(),
            positions: self.positions.clone(),
        }
    }
}

impl<C> std::fmt::Debug for Registry<C> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Registry")
            .field("namespaces", &self.namespaces().collect::<Vec<_>>())
            .field("actions", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};
    use serde_json::json;

    use super::*;

    fn constant(value: f64) -> impl Fn(&(), Arguments) -> Result<f64, String> + Send + Sync {
        move |_, _| Ok(value)
    }

    #[fixture]
    fn registry() -> Registry<()> {
        let mut registry = Registry::new();
        registry.register("myclass", "myview", 4, constant(13.37));
        registry.register("myclass", "other", 0, constant(1.0));
        registry.register("second", "first", 2, constant(2.0));
        registry
    }

    #[rstest]
    fn lookup_returns_registered_action(registry: Registry<()>) {
        let action = registry.lookup("myclass", "myview").expect("registered");
        assert_eq!(action.namespace(), "myclass");
        assert_eq!(action.name(), "myview");
        assert_eq!(action.arity(), 4);
    }

    #[rstest]
    #[case::namespace(
        "nope",
        "myview",
        LookupError::UnknownNamespace { namespace: "nope".to_owned() }
    )]
    #[case::method("myclass", "nope", LookupError::UnknownMethod {
        namespace: "myclass".to_owned(),
        method: "nope".to_owned(),
    })]
    fn lookup_reports_missing_pairs(
        registry: Registry<()>,
        #[case] namespace: &str,
        #[case] method: &str,
        #[case] expected: LookupError,
    ) {
        let error = registry
            .lookup(namespace, method)
            .expect_err("lookup should fail");
        assert_eq!(error, expected);
    }

    #[rstest]
    fn describe_preserves_registration_order(registry: Registry<()>) {
        let descriptor = registry.describe();
        let namespaces: Vec<&str> = descriptor.namespaces().map(|(name, _)| name).collect();
        assert_eq!(namespaces, vec!["myclass", "second"]);

        let methods: Vec<(&str, usize)> = descriptor
            .actions("myclass")
            .expect("myclass described")
            .iter()
            .map(|info| (info.name.as_str(), info.len))
            .collect();
        assert_eq!(methods, vec![("myview", 4), ("other", 0)]);
    }

    #[rstest]
    fn overwrite_keeps_position_and_replaces_handler(mut registry: Registry<()>) {
        registry.register("myclass", "myview", 1, constant(99.0));

        assert_eq!(registry.len(), 3);
        let descriptor = registry.describe();
        let first = descriptor
            .actions("myclass")
            .and_then(|actions| actions.first())
            .expect("first action");
        assert_eq!((first.name.as_str(), first.len), ("myview", 1));

        let action = registry.lookup("myclass", "myview").expect("registered");
        let output = action
            .invoke(&(), Arguments::new(vec![json!(0)]))
            .expect("handler");
        assert_eq!(output.get(), "99.0");
    }

    #[rstest]
    fn strict_registration_rejects_duplicates(mut registry: Registry<()>) {
        let error = registry
            .try_register(ActionSpec::new("myclass", "myview"), constant(0.0))
            .expect_err("duplicate should be rejected");
        assert_eq!(
            error,
            RegistrationError::Duplicate {
                namespace: "myclass".to_owned(),
                method: "myview".to_owned(),
            }
        );
        assert_eq!(
            registry.lookup("myclass", "myview").map(Action::arity),
            Ok(4)
        );

        registry
            .try_register(ActionSpec::new("myclass", "fresh"), constant(0.0))
            .expect("new pair registers");
        assert!(registry.contains("myclass", "fresh"));
    }

    #[test]
    fn empty_registry_describes_nothing() {
        let registry = Registry::<()>::default();
        assert!(registry.is_empty());
        assert!(registry.describe().is_empty());
    }
}
