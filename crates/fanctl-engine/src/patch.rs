//! Client patch documents.
//!
//! A patch names controllers per collection. Each entry carries either the
//! fields to write or `null` to delete the controller. Entries keep the
//! order the client wrote them in; collections are always processed in
//! [`ControllerKind`] order.

use std::collections::BTreeMap;

use fanctl_types::ControllerKind;
use serde_json::{Map, Value};

use crate::error::{EngineError, Result};

/// Top-level key carrying the requested profile.
pub const PROFILE_KEY: &str = "Profile";

/// A parsed client patch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientPatch {
    collections: BTreeMap<ControllerKind, Map<String, Value>>,
    profile: Option<String>,
}

impl ClientPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a client document.
    ///
    /// Recognized keys are the four collection names and `Profile`. Read-only
    /// annotations (`@odata.*`, `Profile@Redfish.AllowableValues`) are
    /// ignored; anything else is [`EngineError::PropertyUnknown`].
    pub fn from_json(document: &Value) -> Result<Self> {
        let root = document
            .as_object()
            .ok_or_else(|| EngineError::value_type("Fan", document))?;

        let mut patch = ClientPatch::new();
        for (key, value) in root {
            if key == PROFILE_KEY {
                let profile = value
                    .as_str()
                    .ok_or_else(|| EngineError::value_type(PROFILE_KEY, value))?;
                patch.profile = Some(profile.to_string());
                continue;
            }
            if key.contains('@') {
                continue;
            }

            let kind = ControllerKind::from_collection(key)
                .map_err(|_| EngineError::PropertyUnknown(key.clone()))?;
            let entries = value
                .as_object()
                .ok_or_else(|| EngineError::value_type(key, value))?;

            let collection = patch.collections.entry(kind).or_default();
            for (name, body) in entries {
                if name.starts_with('@') {
                    continue;
                }
                collection.insert(name.clone(), body.clone());
            }
        }
        Ok(patch)
    }

    /// Builder-style profile request.
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Add or replace the fields for one controller.
    pub fn set(&mut self, kind: ControllerKind, name: impl Into<String>, fields: Value) {
        self.collections
            .entry(kind)
            .or_default()
            .insert(name.into(), fields);
    }

    /// Request deletion of one controller.
    pub fn delete(&mut self, kind: ControllerKind, name: impl Into<String>) {
        self.set(kind, name, Value::Null);
    }

    pub fn profile(&self) -> Option<&str> {
        self.profile.as_deref()
    }

    /// Entries in processing order.
    pub fn entries(&self) -> impl Iterator<Item = (ControllerKind, &str, &Value)> {
        self.collections.iter().flat_map(|(kind, entries)| {
            entries
                .iter()
                .map(move |(name, value)| (*kind, name.as_str(), value))
        })
    }

    pub fn len(&self) -> usize {
        self.collections.values().map(Map::len).sum()
    }

    /// Returns true if the patch names no controller and no profile.
    pub fn is_empty(&self) -> bool {
        self.len() == 0 && self.profile.is_none()
    }

    /// Serialize back to a client document.
    pub fn to_json(&self) -> Value {
        let mut root = Map::new();
        for (kind, entries) in &self.collections {
            root.insert(kind.collection().to_string(), Value::Object(entries.clone()));
        }
        if let Some(profile) = &self.profile {
            root.insert(PROFILE_KEY.to_string(), Value::String(profile.clone()));
        }
        Value::Object(root)
    }
}
