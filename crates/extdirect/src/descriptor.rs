//! API descriptor rendering.
//!
//! The descriptor tells ExtJS clients where the router lives and which
//! actions it exposes:
//!
//! ```json
//! {"url": "/api/router", "type": "remoting",
//!  "actions": {"myclass": [{"name": "myview", "len": 4}]}, "timeout": 30000}
//! ```
//!
//! It is served either as plain JSON (`api.json`) or as a script assigning the
//! document to a global variable (`api.js`), optionally followed by the
//! `Ext.Direct.addProvider` call.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::registry::Action;

/// Remoting provider type advertised to clients.
pub const PROVIDER_TYPE: &str = "remoting";

/// Top-level keys produced by the provider itself.
pub(crate) const RESERVED_SETTINGS: &[&str] = &["url", "type", "actions", "timeout"];

/// Errors raised while rendering the descriptor.
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// A provider setting tried to replace a key the provider renders.
    #[error("descriptor setting '{key}' is reserved")]
    ReservedSetting {
        /// Rejected key.
        key: String,
    },
    /// The descriptor could not be encoded.
    #[error("failed to encode API descriptor: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Descriptor entry for a single method.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionInfo {
    /// Method name.
    pub name: String,
    /// Positional argument count.
    pub len: usize,
    /// Extra flags such as `formHandler`.
    #[serde(flatten)]
    pub flags: Map<String, Value>,
}

impl ActionInfo {
    pub(crate) fn from_action<C>(action: &Action<C>) -> Self {
        Self {
            name: action.name().to_owned(),
            len: action.arity(),
            flags: action.flags().clone(),
        }
    }
}

/// Ordered snapshot of registered actions grouped by namespace.
///
/// Serialises as a JSON object whose keys keep registration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiDescriptor {
    namespaces: Vec<(String, Vec<ActionInfo>)>,
}

impl ApiDescriptor {
    pub(crate) fn push_namespace(&mut self, namespace: String, actions: Vec<ActionInfo>) {
        self.namespaces.push((namespace, actions));
    }

    /// Namespaces and their methods in registration order.
    pub fn namespaces(&self) -> impl Iterator<Item = (&str, &[ActionInfo])> {
        self.namespaces
            .iter()
            .map(|(name, actions)| (name.as_str(), actions.as_slice()))
    }

    /// Methods described for `namespace`.
    #[must_use]
    pub fn actions(&self, namespace: &str) -> Option<&[ActionInfo]> {
        self.namespaces
            .iter()
            .find(|(name, _)| name == namespace)
            .map(|(_, actions)| actions.as_slice())
    }

    /// Returns `true` when no actions are described.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }
}

impl Serialize for ApiDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.namespaces.len()))?;
        for (name, actions) in &self.namespaces {
            map.serialize_entry(name, actions)?;
        }
        map.end()
    }
}

/// Complete descriptor document as served to clients.
#[derive(Debug, Serialize)]
pub struct ApiDocument<'a> {
    #[serde(flatten)]
    settings: &'a Map<String, Value>,
    url: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    actions: &'a ApiDescriptor,
    timeout: u64,
}

impl<'a> ApiDocument<'a> {
    /// Assembles the document. `timeout_millis` of zero defers to ExtJS.
    #[must_use]
    pub const fn new(
        settings: &'a Map<String, Value>,
        url: &'a str,
        actions: &'a ApiDescriptor,
        timeout_millis: u64,
    ) -> Self {
        Self {
            settings,
            url,
            kind: PROVIDER_TYPE,
            actions,
            timeout: timeout_millis,
        }
    }

    /// Encodes the document as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::Encode`] when serialisation fails.
    pub fn to_json(&self) -> Result<String, DescriptorError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Renders the `api.js` script assigning the document to `variable`.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::Encode`] when serialisation fails.
    pub fn to_script(&self, variable: &str, autoadd: bool) -> Result<String, DescriptorError> {
        let mut lines = vec![format!("{variable} = {};", self.to_json()?)];
        if autoadd {
            lines.push(format!("Ext.Direct.addProvider( {variable} );"));
        }
        Ok(lines.join("\n"))
    }
}
