//! Per-call timeout decorator.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fanctl_types::{ManagedObjects, PropertyMap, PropertyValue, SubtreeEntry};
use tracing::warn;

use super::traits::{BackendResult, ConfigBackend};
use crate::error::BackendError;

/// Wraps a backend so every call fails with [`BackendError::Timeout`] after
/// a fixed duration.
pub struct TimedBackend {
    inner: Arc<dyn ConfigBackend>,
    timeout: Duration,
}

impl TimedBackend {
    pub fn new(inner: Arc<dyn ConfigBackend>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn bounded<T: Send>(
        &self,
        method: &str,
        call: impl Future<Output = BackendResult<T>> + Send,
    ) -> BackendResult<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(method, timeout_ms = self.timeout.as_millis() as u64, "Backend call timed out");
                Err(BackendError::Timeout {
                    method: method.to_string(),
                })
            }
        }
    }
}

#[async_trait]
impl ConfigBackend for TimedBackend {
    async fn get_subtree(
        &self,
        root: &str,
        depth: u32,
        interfaces: &[&str],
    ) -> BackendResult<Vec<SubtreeEntry>> {
        self.bounded("GetSubTree", self.inner.get_subtree(root, depth, interfaces))
            .await
    }

    async fn get_managed_objects(
        &self,
        service: &str,
        path: &str,
    ) -> BackendResult<ManagedObjects> {
        self.bounded(
            "GetManagedObjects",
            self.inner.get_managed_objects(service, path),
        )
        .await
    }

    async fn get_all_properties(
        &self,
        service: &str,
        path: &str,
        interface: &str,
    ) -> BackendResult<PropertyMap> {
        self.bounded(
            "GetAll",
            self.inner.get_all_properties(service, path, interface),
        )
        .await
    }

    async fn set_property(
        &self,
        service: &str,
        path: &str,
        interface: &str,
        property: &str,
        value: PropertyValue,
    ) -> BackendResult<()> {
        self.bounded(
            "Set",
            self.inner
                .set_property(service, path, interface, property, value),
        )
        .await
    }

    async fn delete(&self, service: &str, path: &str, interface: &str) -> BackendResult<()> {
        self.bounded("Delete", self.inner.delete(service, path, interface))
            .await
    }

    async fn add_object(
        &self,
        service: &str,
        chassis_path: &str,
        properties: PropertyMap,
    ) -> BackendResult<()> {
        self.bounded(
            "AddObject",
            self.inner.add_object(service, chassis_path, properties),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{InMemoryBackend, RpcMethod};

    #[tokio::test(start_paused = true)]
    async fn test_slow_call_times_out() {
        let inner = Arc::new(InMemoryBackend::new());
        inner.set_latency(RpcMethod::GetSubTree, Duration::from_secs(5));

        let backend = TimedBackend::new(inner, Duration::from_millis(100));
        let err = backend.get_subtree("/", 0, &[]).await.unwrap_err();
        assert_eq!(
            err,
            BackendError::Timeout {
                method: "GetSubTree".into()
            }
        );
    }

    #[tokio::test]
    async fn test_fast_call_passes_through() {
        let inner = Arc::new(InMemoryBackend::new());
        let backend = TimedBackend::new(inner, Duration::from_secs(1));
        assert!(backend.get_subtree("/", 0, &[]).await.unwrap().is_empty());
    }
}
