//! In-memory configuration backend for development and testing.
//!
//! Holds a set of services, each owning an ordered collection of objects.
//! Every call is recorded so tests can assert on the exact calls the engine
//! issued. Failures and latency can be injected per method.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use fanctl_types::{
    interfaces, to_identifier, InterfaceMap, ManagedObject, ManagedObjects, ObjectPath,
    PropertyMap, PropertyValue, SubtreeEntry,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use super::traits::{BackendResult, ConfigBackend};
use crate::error::BackendError;

/// Backend call kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcMethod {
    GetSubTree,
    GetManagedObjects,
    GetAll,
    Set,
    Delete,
    AddObject,
}

impl std::fmt::Display for RpcMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RpcMethod::GetSubTree => "GetSubTree",
            RpcMethod::GetManagedObjects => "GetManagedObjects",
            RpcMethod::GetAll => "GetAll",
            RpcMethod::Set => "Set",
            RpcMethod::Delete => "Delete",
            RpcMethod::AddObject => "AddObject",
        };
        write!(f, "{}", name)
    }
}

/// A recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcCall {
    GetSubTree {
        root: String,
        interfaces: Vec<String>,
    },
    GetManagedObjects {
        service: String,
        path: String,
    },
    GetAll {
        service: String,
        path: String,
        interface: String,
    },
    Set {
        service: String,
        path: String,
        interface: String,
        property: String,
        value: PropertyValue,
    },
    Delete {
        service: String,
        path: String,
        interface: String,
    },
    AddObject {
        service: String,
        chassis_path: String,
        properties: PropertyMap,
    },
}

impl RpcCall {
    pub fn method(&self) -> RpcMethod {
        match self {
            RpcCall::GetSubTree { .. } => RpcMethod::GetSubTree,
            RpcCall::GetManagedObjects { .. } => RpcMethod::GetManagedObjects,
            RpcCall::GetAll { .. } => RpcMethod::GetAll,
            RpcCall::Set { .. } => RpcMethod::Set,
            RpcCall::Delete { .. } => RpcMethod::Delete,
            RpcCall::AddObject { .. } => RpcMethod::AddObject,
        }
    }

    /// Returns true for calls that change backend state.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            RpcCall::Set { .. } | RpcCall::Delete { .. } | RpcCall::AddObject { .. }
        )
    }
}

/// Serializable backend contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendState {
    #[serde(default)]
    pub services: Vec<ServiceState>,
}

/// Objects owned by one service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceState {
    pub name: String,
    #[serde(default)]
    pub objects: Vec<ManagedObject>,
}

impl ServiceState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            objects: Vec::new(),
        }
    }

    /// Add an object that enumerates the objects below it.
    pub fn with_object_manager(mut self, path: &str) -> Self {
        self.objects.push(
            ManagedObject::new(path).with_interface(interfaces::OBJECT_MANAGER, PropertyMap::new()),
        );
        self
    }

    pub fn with_object(mut self, object: ManagedObject) -> Self {
        self.objects.push(object);
        self
    }
}

type ServiceObjects = BTreeMap<ObjectPath, InterfaceMap>;

/// In-memory backend implementation.
pub struct InMemoryBackend {
    /// Objects indexed by service, then path.
    services: RwLock<BTreeMap<String, ServiceObjects>>,

    /// Every call in issue order.
    calls: Mutex<Vec<RpcCall>>,

    /// Injected failures.
    failures: Mutex<HashMap<RpcMethod, String>>,

    /// Injected latency.
    latency: Mutex<HashMap<RpcMethod, Duration>>,
}

impl InMemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::from_state(BackendState::default())
    }

    /// Create a backend holding `state`.
    pub fn from_state(state: BackendState) -> Self {
        let services = state
            .services
            .into_iter()
            .map(|service| {
                let objects = service
                    .objects
                    .into_iter()
                    .map(|object| (object.path, object.interfaces))
                    .collect();
                (service.name, objects)
            })
            .collect();

        Self {
            services: RwLock::new(services),
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            latency: Mutex::new(HashMap::new()),
        }
    }

    /// Current contents.
    pub async fn state(&self) -> BackendState {
        let services = self.services.read().await;
        BackendState {
            services: services
                .iter()
                .map(|(name, objects)| ServiceState {
                    name: name.clone(),
                    objects: objects
                        .iter()
                        .map(|(path, interfaces)| ManagedObject {
                            path: path.clone(),
                            interfaces: interfaces.clone(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    /// Properties of one interface, if present.
    pub async fn properties(&self, path: &str, interface: &str) -> Option<PropertyMap> {
        let services = self.services.read().await;
        let path = ObjectPath::new(path);
        services
            .values()
            .find_map(|objects| objects.get(&path))
            .and_then(|interfaces| interfaces.get(interface))
            .cloned()
    }

    /// Make every call of `method` fail with `reason`.
    pub fn fail_on(&self, method: RpcMethod, reason: impl Into<String>) {
        lock(&self.failures).insert(method, reason.into());
    }

    /// Delay every call of `method`.
    pub fn set_latency(&self, method: RpcMethod, delay: Duration) {
        lock(&self.latency).insert(method, delay);
    }

    /// Recorded calls in issue order.
    pub fn calls(&self) -> Vec<RpcCall> {
        lock(&self.calls).clone()
    }

    /// Recorded state-changing calls in issue order.
    pub fn mutations(&self) -> Vec<RpcCall> {
        lock(&self.calls)
            .iter()
            .filter(|call| call.is_mutation())
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    async fn enter(&self, call: RpcCall) -> BackendResult<()> {
        let method = call.method();
        debug!(method = %method, "In-memory backend call");
        lock(&self.calls).push(call);

        let delay = lock(&self.latency).get(&method).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let failure = lock(&self.failures).get(&method).cloned();
        match failure {
            Some(reason) => Err(BackendError::call_failed(&method.to_string(), reason)),
            None => Ok(()),
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn depth_below(path: &ObjectPath, root: &str) -> usize {
    let rest = path.as_str().strip_prefix(root).unwrap_or(path.as_str());
    rest.split('/').filter(|s| !s.is_empty()).count()
}

fn interface_for_type(type_name: &str) -> Option<&'static str> {
    match type_name {
        "Pid" => Some(interfaces::PID),
        "Pid.Zone" => Some(interfaces::PID_ZONE),
        "Stepwise" => Some(interfaces::STEPWISE),
        _ => None,
    }
}

#[async_trait]
impl ConfigBackend for InMemoryBackend {
    async fn get_subtree(
        &self,
        root: &str,
        depth: u32,
        interfaces: &[&str],
    ) -> BackendResult<Vec<SubtreeEntry>> {
        self.enter(RpcCall::GetSubTree {
            root: root.to_string(),
            interfaces: interfaces.iter().map(|s| s.to_string()).collect(),
        })
        .await?;

        let services = self.services.read().await;
        let mut by_path: BTreeMap<ObjectPath, Vec<(String, Vec<String>)>> = BTreeMap::new();

        for (service, objects) in services.iter() {
            for (path, object_interfaces) in objects {
                if !path.is_under(root) {
                    continue;
                }
                if depth > 0 && depth_below(path, root) > depth as usize {
                    continue;
                }
                let matching: Vec<String> = object_interfaces
                    .keys()
                    .filter(|iface| interfaces.is_empty() || interfaces.contains(&iface.as_str()))
                    .cloned()
                    .collect();
                if !matching.is_empty() {
                    by_path
                        .entry(path.clone())
                        .or_default()
                        .push((service.clone(), matching));
                }
            }
        }

        Ok(by_path
            .into_iter()
            .map(|(path, services)| SubtreeEntry { path, services })
            .collect())
    }

    async fn get_managed_objects(
        &self,
        service: &str,
        path: &str,
    ) -> BackendResult<ManagedObjects> {
        self.enter(RpcCall::GetManagedObjects {
            service: service.to_string(),
            path: path.to_string(),
        })
        .await?;

        let services = self.services.read().await;
        let objects = services.get(service).ok_or_else(|| {
            BackendError::call_failed("GetManagedObjects", format!("unknown service {}", service))
        })?;

        Ok(objects
            .iter()
            .filter(|(object_path, _)| object_path.is_under(path) && object_path.as_str() != path)
            .map(|(object_path, interfaces)| ManagedObject {
                path: object_path.clone(),
                interfaces: interfaces.clone(),
            })
            .collect())
    }

    async fn get_all_properties(
        &self,
        service: &str,
        path: &str,
        interface: &str,
    ) -> BackendResult<PropertyMap> {
        self.enter(RpcCall::GetAll {
            service: service.to_string(),
            path: path.to_string(),
            interface: interface.to_string(),
        })
        .await?;

        let services = self.services.read().await;
        let object = services
            .get(service)
            .and_then(|objects| objects.get(&ObjectPath::new(path)))
            .ok_or_else(|| BackendError::ObjectNotFound(path.to_string()))?;

        object
            .get(interface)
            .cloned()
            .ok_or_else(|| BackendError::InterfaceNotFound {
                path: path.to_string(),
                interface: interface.to_string(),
            })
    }

    async fn set_property(
        &self,
        service: &str,
        path: &str,
        interface: &str,
        property: &str,
        value: PropertyValue,
    ) -> BackendResult<()> {
        self.enter(RpcCall::Set {
            service: service.to_string(),
            path: path.to_string(),
            interface: interface.to_string(),
            property: property.to_string(),
            value: value.clone(),
        })
        .await?;

        let mut services = self.services.write().await;
        let object = services
            .get_mut(service)
            .and_then(|objects| objects.get_mut(&ObjectPath::new(path)))
            .ok_or_else(|| BackendError::ObjectNotFound(path.to_string()))?;

        let properties =
            object
                .get_mut(interface)
                .ok_or_else(|| BackendError::InterfaceNotFound {
                    path: path.to_string(),
                    interface: interface.to_string(),
                })?;
        properties.insert(property.to_string(), value);
        Ok(())
    }

    async fn delete(&self, service: &str, path: &str, interface: &str) -> BackendResult<()> {
        self.enter(RpcCall::Delete {
            service: service.to_string(),
            path: path.to_string(),
            interface: interface.to_string(),
        })
        .await?;

        let mut services = self.services.write().await;
        let objects = services
            .get_mut(service)
            .ok_or_else(|| BackendError::ObjectNotFound(path.to_string()))?;
        let key = ObjectPath::new(path);
        let object = objects
            .get_mut(&key)
            .ok_or_else(|| BackendError::ObjectNotFound(path.to_string()))?;

        if object.remove(interface).is_none() {
            return Err(BackendError::InterfaceNotFound {
                path: path.to_string(),
                interface: interface.to_string(),
            });
        }
        if object.is_empty() {
            objects.remove(&key);
        }
        Ok(())
    }

    async fn add_object(
        &self,
        service: &str,
        chassis_path: &str,
        properties: PropertyMap,
    ) -> BackendResult<()> {
        self.enter(RpcCall::AddObject {
            service: service.to_string(),
            chassis_path: chassis_path.to_string(),
            properties: properties.clone(),
        })
        .await?;

        let name = properties
            .get("Name")
            .and_then(PropertyValue::as_str)
            .ok_or_else(|| BackendError::call_failed("AddObject", "missing Name"))?;
        let type_name = properties
            .get("Type")
            .and_then(PropertyValue::as_str)
            .ok_or_else(|| BackendError::call_failed("AddObject", "missing Type"))?;
        let interface = interface_for_type(type_name).ok_or_else(|| {
            BackendError::call_failed("AddObject", format!("unsupported Type {}", type_name))
        })?;

        let mut services = self.services.write().await;
        let objects = services
            .get_mut(service)
            .ok_or_else(|| BackendError::ObjectNotFound(chassis_path.to_string()))?;

        let chassis = ObjectPath::new(chassis_path);
        if !objects.contains_key(&chassis) {
            return Err(BackendError::ObjectNotFound(chassis_path.to_string()));
        }

        let object = objects.entry(chassis.join(&to_identifier(name))).or_default();
        if object.contains_key(interface) {
            return Err(BackendError::call_failed(
                "AddObject",
                format!("{} already has {}", name, interface),
            ));
        }
        object.insert(interface.to_string(), properties);
        Ok(())
    }
}
