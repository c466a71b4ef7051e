//! Backend trait definition.
//!
//! Defines the asynchronous call contract the engine relies on. Each method is
//! one request with exactly one result.

use async_trait::async_trait;
use fanctl_types::{ManagedObjects, PropertyMap, PropertyValue, SubtreeEntry};

use crate::error::BackendError;

/// Result type for backend calls.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Trait for configuration backends.
#[async_trait]
pub trait ConfigBackend: Send + Sync {
    /// Enumerate objects below `root` exposing any of `interfaces`.
    ///
    /// `depth == 0` means unbounded. Entries are ordered by path.
    async fn get_subtree(
        &self,
        root: &str,
        depth: u32,
        interfaces: &[&str],
    ) -> BackendResult<Vec<SubtreeEntry>>;

    /// Full snapshot of the objects `service` manages below `path`.
    async fn get_managed_objects(&self, service: &str, path: &str)
        -> BackendResult<ManagedObjects>;

    /// All properties of one interface.
    async fn get_all_properties(
        &self,
        service: &str,
        path: &str,
        interface: &str,
    ) -> BackendResult<PropertyMap>;

    /// Set one property.
    async fn set_property(
        &self,
        service: &str,
        path: &str,
        interface: &str,
        property: &str,
        value: PropertyValue,
    ) -> BackendResult<()>;

    /// Delete one interface of an object.
    async fn delete(&self, service: &str, path: &str, interface: &str) -> BackendResult<()>;

    /// Create a configuration record below a chassis.
    async fn add_object(
        &self,
        service: &str,
        chassis_path: &str,
        properties: PropertyMap,
    ) -> BackendResult<()>;
}
