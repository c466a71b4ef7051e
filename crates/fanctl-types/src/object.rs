//! Backend object snapshots
//!
//! The engine never holds live references to backend objects. Everything it
//! knows about them arrives as one of the point-in-time copies defined here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::interfaces;
use crate::value::PropertyMap;

/// Interface name to property bag.
pub type InterfaceMap = BTreeMap<String, PropertyMap>;

/// Ordered snapshot of every object a service manages.
pub type ManagedObjects = Vec<ManagedObject>;

/// Slash-separated backend object path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectPath(String);

impl ObjectPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment.
    pub fn basename(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or_default()
    }

    /// Zero-based segment after the leading slash.
    pub fn segment(&self, index: usize) -> Option<&str> {
        path_segment(&self.0, index)
    }

    /// Returns true if the path ends with `/<name>`.
    pub fn ends_with_segment(&self, name: &str) -> bool {
        self.0
            .strip_suffix(name)
            .map(|head| head.ends_with('/'))
            .unwrap_or(false)
    }

    /// Child path `<self>/<name>`.
    pub fn join(&self, name: &str) -> ObjectPath {
        if self.0.ends_with('/') {
            ObjectPath(format!("{}{}", self.0, name))
        } else {
            ObjectPath(format!("{}/{}", self.0, name))
        }
    }

    /// Returns true if `self` equals `root` or lies below it.
    pub fn is_under(&self, root: &str) -> bool {
        if root == "/" || self.0 == root {
            return true;
        }
        self.0
            .strip_prefix(root)
            .map(|rest| rest.starts_with('/') || root.ends_with('/'))
            .unwrap_or(false)
    }
}

impl std::fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ObjectPath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

/// Zero-based segment of a slash-separated path, ignoring the leading slash.
///
/// `/xyz/openbmc_project/inventory` has `xyz` at index 0. Empty segments
/// yield `None`.
pub fn path_segment(path: &str, index: usize) -> Option<&str> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    trimmed.split('/').nth(index).filter(|s| !s.is_empty())
}

/// One backend object and the interfaces it exposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagedObject {
    pub path: ObjectPath,
    #[serde(default)]
    pub interfaces: InterfaceMap,
}

impl ManagedObject {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: ObjectPath::new(path),
            interfaces: InterfaceMap::new(),
        }
    }

    /// Builder-style interface insertion.
    pub fn with_interface(mut self, interface: &str, properties: PropertyMap) -> Self {
        self.interfaces.insert(interface.to_string(), properties);
        self
    }

    pub fn has_interface(&self, interface: &str) -> bool {
        self.interfaces.contains_key(interface)
    }

    pub fn interface(&self, interface: &str) -> Option<&PropertyMap> {
        self.interfaces.get(interface)
    }

    /// Returns true if the object exposes any controller configuration interface.
    pub fn is_configuration(&self) -> bool {
        self.interfaces
            .keys()
            .any(|iface| interfaces::is_configuration(iface))
    }
}

/// One entry of a subtree enumeration: a path and the services exposing it,
/// each with the matching interfaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtreeEntry {
    pub path: ObjectPath,
    pub services: Vec<(String, Vec<String>)>,
}
