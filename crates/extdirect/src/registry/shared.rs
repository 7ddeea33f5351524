//! Registry handle shared between dispatchers and late registrations.

use std::convert::Infallible;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;
use serde::Serialize;

use crate::descriptor::ApiDescriptor;

use super::{ActionError, ActionSpec, Arguments, RegistrationError, Registry};

/// Swappable registry snapshot.
///
/// Readers call [`SharedRegistry::snapshot`] and work against an immutable
/// `Arc<Registry>` without taking a lock. Writers serialise on a mutex, clone
/// the current snapshot, apply their change to the clone and publish it. A
/// dispatch that already holds a snapshot finishes against it.
pub struct SharedRegistry<C> {
    current: Arc<ArcSwap<Registry<C>>>,
    writer: Arc<Mutex<()>>,
}

impl<C> SharedRegistry<C> {
    /// Publishes `registry` as the initial snapshot.
    #[must_use]
    pub fn new(registry: Registry<C>) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(registry)),
            writer: Arc::new(Mutex::new(())),
        }
    }

    /// Current registry snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Registry<C>> {
        self.current.load_full()
    }

    /// Applies `change` to a copy of the registry and publishes the copy when
    /// `change` succeeds.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `change`; the published snapshot is
    /// left untouched in that case.
    pub fn update<T, E>(
        &self,
        change: impl FnOnce(&mut Registry<C>) -> Result<T, E>,
    ) -> Result<T, E> {
        // The guard only orders writers; a poisoned lock holds no state.
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = Registry::clone(&self.current.load());
        let output = change(&mut next)?;
        self.current.store(Arc::new(next));
        Ok(output)
    }

    /// Registers or replaces `namespace.name`. See [`Registry::register`].
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
        self.register_action(ActionSpec::new(namespace, name).with_arity(arity), handler);
    }

    /// Registers or replaces an action declared through an [`ActionSpec`].
    pub fn register_action<F, R, E>(&self, spec: ActionSpec, handler: F)
    where
        F: Fn(&C, Arguments) -> Result<R, E> + Send + Sync + 'static,
        R: Serialize,
        E: Into<ActionError>,
    {
        let outcome: Result<(), Infallible> = self.update(|registry| {
            registry.register_action(spec, handler);
            Ok(())
        });
        let Ok(()) = outcome;
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
        self.update(|registry| registry.try_register(spec, handler))
    }

    /// Descriptor of the current snapshot.
    #[must_use]
    pub fn describe(&self) -> ApiDescriptor {
        self.current.load().describe()
    }
}

impl<C> Default for SharedRegistry<C> {
    fn default() -> Self {
        Self::new(Registry::new())
    }
}

impl<C> Clone for SharedRegistry<C> {
    fn clone(&self) -> Self {
        Self {
            current: Arc::clone(&self.current),
            writer: Arc::clone(&self.writer),
        }
    }
}

impl<C> From<Registry<C>> for SharedRegistry<C> {
    fn from(registry: Registry<C>) -> Self {
        Self::new(registry)
    }
}

impl<C> fmt::Debug for SharedRegistry<C> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SharedRegistry")
            .field("current", &*self.current.load())
            .finish_non_exhaustive()
    }
}
