//! Read path: gather configuration from every owning service and render it.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use fanctl_types::{interfaces, ManagedObjects, SubtreeEntry};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::backend::ConfigBackend;
use crate::error::{EngineError, Result};
use crate::join::JoinBarrier;
use crate::profile::{read_profile, ProfileObject};
use crate::render::populate_view;
use crate::view::RenderedView;

const SUBTREE_BRANCH: usize = 0;

/// Interfaces that locate configuration and the managers that own it.
const CONFIGURATION_LOOKUP: [&str; 4] = [
    interfaces::PID,
    interfaces::PID_ZONE,
    interfaces::OBJECT_MANAGER,
    interfaces::STEPWISE,
];

#[derive(Default)]
struct ReadState {
    subtree: Vec<SubtreeEntry>,
    profile: Option<ProfileObject>,
    error: Option<EngineError>,
}

/// A service whose managed objects will be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub service: String,
    pub manager_path: String,
}

/// Pick the services to snapshot, in subtree order.
///
/// A service is dispatched at its first configuration interface, provided its
/// object manager path has been seen earlier in the scan. Configuration seen
/// before that is skipped.
pub fn plan_dispatch(subtree: &[SubtreeEntry]) -> Vec<Dispatch> {
    let mut managers: HashMap<&str, &str> = HashMap::new();
    let mut dispatched: BTreeSet<&str> = BTreeSet::new();
    let mut plan = Vec::new();

    for entry in subtree {
        for (service, service_interfaces) in &entry.services {
            if dispatched.contains(service.as_str()) {
                continue;
            }
            for interface in service_interfaces {
                if interface == interfaces::OBJECT_MANAGER {
                    managers.insert(service.as_str(), entry.path.as_str());
                } else if interfaces::is_configuration(interface) {
                    match managers.get(service.as_str()) {
                        Some(manager_path) => {
                            plan.push(Dispatch {
                                service: service.clone(),
                                manager_path: manager_path.to_string(),
                            });
                            dispatched.insert(service.as_str());
                            break;
                        }
                        None => {
                            debug!(service = %service, path = %entry.path, "No object manager yet, skipping");
                        }
                    }
                }
            }
        }
    }
    plan
}

/// Collect and render the full configuration view.
///
/// Returns either the complete view or a single error.
pub async fn collect_configuration(backend: Arc<dyn ConfigBackend>) -> Result<RenderedView> {
    let state = Arc::new(Mutex::new(ReadState::default()));
    let (branches, completion) = JoinBarrier::new(2);

    for branch in branches {
        let backend = backend.clone();
        let state = state.clone();
        tokio::spawn(async move {
            if branch.index() == SUBTREE_BRANCH {
                match backend.get_subtree("/", 0, &CONFIGURATION_LOOKUP).await {
                    Ok(subtree) => {
                        state.lock().await.subtree = subtree;
                        branch.finish();
                    }
                    Err(err) => {
                        error!(error = %err, "Configuration lookup failed");
                        state.lock().await.error =
                            Some(EngineError::internal(format!("configuration lookup: {}", err)));
                        branch.fail(err.to_string());
                    }
                }
            } else {
                match read_profile(backend.as_ref()).await {
                    Ok(profile) => {
                        state.lock().await.profile = profile;
                        branch.finish();
                    }
                    Err(err) => {
                        let reason = err.to_string();
                        state.lock().await.error.get_or_insert(err);
                        branch.fail(reason);
                    }
                }
            }
        });
    }

    let outcome = completion.wait().await;
    let mut state = state.lock().await;
    if let Some(err) = state.error.take() {
        return Err(err);
    }
    if outcome.failed() {
        return Err(EngineError::internal(outcome.failures.join("; ")));
    }

    let profile = state.profile.take();
    let plan = plan_dispatch(&state.subtree);
    drop(state);

    let snapshots = snapshot_services(backend, &plan).await?;

    let profiles = profile.as_ref().map(|p| &p.profiles);
    let mut view = RenderedView::new(profiles);
    let active = view.profile.clone();
    for objects in &snapshots {
        populate_view(&mut view, objects, &active)?;
    }

    info!(
        services = plan.len(),
        controllers = view.len(),
        profile = %active,
        "Collected fan configuration"
    );
    Ok(view)
}

/// Fetch every planned service's managed objects concurrently.
async fn snapshot_services(
    backend: Arc<dyn ConfigBackend>,
    plan: &[Dispatch],
) -> Result<Vec<ManagedObjects>> {
    let results: Arc<Mutex<Vec<Option<ManagedObjects>>>> =
        Arc::new(Mutex::new(vec![None; plan.len()]));
    let (branches, completion) = JoinBarrier::new(plan.len());

    for (branch, dispatch) in branches.into_iter().zip(plan.iter().cloned()) {
        let backend = backend.clone();
        let results = results.clone();
        tokio::spawn(async move {
            debug!(service = %dispatch.service, path = %dispatch.manager_path, "Fetching managed objects");
            match backend
                .get_managed_objects(&dispatch.service, &dispatch.manager_path)
                .await
            {
                Ok(objects) => {
                    results.lock().await[branch.index()] = Some(objects);
                    branch.finish();
                }
                Err(err) => {
                    error!(service = %dispatch.service, error = %err, "GetManagedObjects failed");
                    branch.fail(format!("{}: {}", dispatch.service, err));
                }
            }
        });
    }

    let outcome = completion.wait().await;
    if outcome.failed() {
        return Err(EngineError::internal(outcome.failures.join("; ")));
    }

    let mut results = results.lock().await;
    results
        .drain(..)
        .map(|objects| objects.ok_or_else(|| EngineError::internal("missing service snapshot")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fanctl_types::ObjectPath;

    fn entry(path: &str, services: &[(&str, &[&str])]) -> SubtreeEntry {
        SubtreeEntry {
            path: ObjectPath::new(path),
            services: services
                .iter()
                .map(|(s, ifaces)| (s.to_string(), ifaces.iter().map(|i| i.to_string()).collect()))
                .collect(),
        }
    }

    #[test]
    fn test_dispatch_once_per_service() {
        let subtree = vec![
            entry("/inventory", &[("em", &[interfaces::OBJECT_MANAGER])]),
            entry("/inventory/a", &[("em", &[interfaces::PID])]),
            entry("/inventory/b", &[("em", &[interfaces::PID_ZONE])]),
        ];
        assert_eq!(
            plan_dispatch(&subtree),
            vec![Dispatch {
                service: "em".into(),
                manager_path: "/inventory".into()
            }]
        );
    }

    #[test]
    fn test_configuration_before_manager_is_skipped() {
        let subtree = vec![
            entry("/a", &[("late", &[interfaces::STEPWISE])]),
            entry("/b", &[("other", &[interfaces::OBJECT_MANAGER, interfaces::PID])]),
        ];
        let plan = plan_dispatch(&subtree);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].service, "other");
        assert_eq!(plan[0].manager_path, "/b");
    }

    #[test]
    fn test_manager_without_configuration_not_dispatched() {
        let subtree = vec![entry("/x", &[("idle", &[interfaces::OBJECT_MANAGER])])];
        assert!(plan_dispatch(&subtree).is_empty());
    }
}
