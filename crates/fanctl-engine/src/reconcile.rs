//! Write path: reconcile a client patch against the backend.
//!
//! A pass takes one snapshot of the configuration service and the profile
//! object, then walks the patch entries in order. Each entry becomes a
//! delete, a set of property writes, or one object creation. Calls are
//! issued as soon as an entry is validated and all of them are awaited
//! before the report is returned. Nothing is rolled back.

use std::sync::Arc;

use fanctl_types::{
    interfaces, to_identifier, ControllerKind, ManagedObject, ManagedObjects, PropertyValue,
};
use futures::future::join_all;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::backend::{BackendResult, ConfigBackend};
use crate::builder::{build_properties, BuildOutcome, BuildRequest};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::events::{publish, EngineEvent, EventSender};
use crate::join::JoinBarrier;
use crate::patch::ClientPatch;
use crate::profile::{read_profile, ProfileObject};

const SNAPSHOT_BRANCH: usize = 0;

/// What a pass did with one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryAction {
    Create,
    Update,
    Delete,
    /// Rejected before any call was issued.
    Skipped,
}

impl std::fmt::Display for EntryAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EntryAction::Create => "create",
            EntryAction::Update => "update",
            EntryAction::Delete => "delete",
            EntryAction::Skipped => "skipped",
        };
        write!(f, "{}", s)
    }
}

/// Outcome of one patch entry.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryReport {
    pub kind: ControllerKind,
    pub name: String,
    pub action: EntryAction,
    /// Object path written to: the controller for updates and deletes, the
    /// chassis for creation.
    pub target: Option<String>,
    /// Properties written.
    pub properties: Vec<String>,
    pub errors: Vec<EngineError>,
}

impl EntryReport {
    fn new(kind: ControllerKind, name: &str) -> Self {
        Self {
            kind,
            name: name.to_string(),
            action: EntryAction::Skipped,
            target: None,
            properties: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn rejected(kind: ControllerKind, name: &str, error: EngineError) -> Self {
        let mut report = Self::new(kind, name);
        report.errors.push(error);
        report
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty() && self.action != EntryAction::Skipped
    }
}

/// Outcome of a reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyReport {
    /// Profile switch issued by this pass, as `(from, to)`.
    pub profile_change: Option<(String, String)>,
    pub entries: Vec<EntryReport>,
    /// Errors not tied to an entry.
    pub errors: Vec<EngineError>,
    /// True if an invalid entry stopped the pass.
    pub aborted: bool,
}

impl ApplyReport {
    /// Returns true if every entry succeeded and nothing was aborted.
    pub fn is_success(&self) -> bool {
        !self.aborted && self.errors.is_empty() && self.entries.iter().all(|e| e.errors.is_empty())
    }

    /// Every error in the report, request level first.
    pub fn all_errors(&self) -> impl Iterator<Item = &EngineError> {
        self.errors
            .iter()
            .chain(self.entries.iter().flat_map(|e| e.errors.iter()))
    }

    pub fn has_client_error(&self) -> bool {
        self.all_errors().any(EngineError::is_client_error)
    }

    pub fn has_internal_error(&self) -> bool {
        self.all_errors().any(EngineError::is_internal)
    }

    pub fn entry(&self, kind: ControllerKind, name: &str) -> Option<&EntryReport> {
        self.entries.iter().find(|e| e.kind == kind && e.name == name)
    }
}

#[derive(Default)]
struct PassState {
    snapshot: Option<ManagedObjects>,
    profile: Option<ProfileObject>,
    error: Option<EngineError>,
}

/// Where an issued call's result belongs.
enum Owner {
    Profile,
    Entry(usize),
}

struct Pending {
    owner: Owner,
    call: String,
    handle: JoinHandle<BackendResult<()>>,
}

/// Read the snapshot and profile object under one join.
async fn prepare(
    backend: &Arc<dyn ConfigBackend>,
    config: &EngineConfig,
) -> Result<(ManagedObjects, Option<ProfileObject>)> {
    let state = Arc::new(Mutex::new(PassState::default()));
    let (branches, completion) = JoinBarrier::new(2);

    for branch in branches {
        let backend = backend.clone();
        let state = state.clone();
        let service = config.entity_manager_service.clone();
        let root = config.config_root.clone();
        tokio::spawn(async move {
            if branch.index() == SNAPSHOT_BRANCH {
                match backend.get_managed_objects(&service, &root).await {
                    Ok(objects) => {
                        state.lock().await.snapshot = Some(objects);
                        branch.finish();
                    }
                    Err(err) => {
                        error!(service = %service, error = %err, "Can't snapshot configuration");
                        state.lock().await.error =
                            Some(EngineError::internal(format!("snapshot of {}: {}", service, err)));
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
    let snapshot = state
        .snapshot
        .take()
        .ok_or_else(|| EngineError::internal("snapshot missing after join"))?;
    Ok((snapshot, state.profile.take()))
}

/// Apply `patch` and report per-entry results.
pub async fn apply_configuration(
    backend: Arc<dyn ConfigBackend>,
    config: &EngineConfig,
    patch: &ClientPatch,
    events: &EventSender,
) -> ApplyReport {
    let mut report = ApplyReport::default();

    let (snapshot, profile_object) = match prepare(&backend, config).await {
        Ok(prepared) => prepared,
        Err(err) => {
            warn!(error = %err, "Reconciliation not started");
            report.errors.push(err);
            return report;
        }
    };
    let snapshot: Arc<ManagedObjects> = Arc::new(snapshot);
    let object_count = snapshot.iter().filter(|o| o.is_configuration()).count();
    debug!(objects = snapshot.len(), configuration = object_count, "Captured snapshot");

    let mut pass = Pass {
        backend,
        config,
        snapshot: snapshot.clone(),
        object_count,
        pending: Vec::new(),
    };

    let mut active = profile_object
        .as_ref()
        .map(|p| p.profiles.current.clone())
        .unwrap_or_default();

    if let Some(requested) = patch.profile() {
        let supported = profile_object
            .as_ref()
            .is_some_and(|p| p.profiles.is_supported(requested));
        match profile_object.as_ref() {
            Some(object) if supported => {
                pass.set_profile(object, requested);
                report.profile_change = Some((active.clone(), requested.to_string()));
                active = requested.to_string();
            }
            _ => {
                warn!(profile = requested, "Unsupported profile requested");
                report.errors.push(EngineError::ActionParameterUnknown {
                    parameter: "Profile".into(),
                    value: requested.to_string(),
                });
                return report;
            }
        }
    }

    for (kind, name, value) in patch.entries() {
        let index = report.entries.len();
        match pass.entry(index, kind, name, value, &active) {
            Ok(entry) => report.entries.push(entry),
            Err(entry) => {
                warn!(kind = %kind, name, "Invalid entry, stopping pass");
                report.entries.push(entry);
                report.aborted = true;
                break;
            }
        }
    }

    pass.finish(&mut report).await;

    if report.aborted {
        let reason = report
            .entries
            .last()
            .and_then(|e| e.errors.first())
            .map(ToString::to_string)
            .unwrap_or_default();
        publish(events, EngineEvent::ReconciliationAborted { reason });
    }
    announce(&report, events);

    info!(
        entries = report.entries.len(),
        succeeded = report.entries.iter().filter(|e| e.is_success()).count(),
        aborted = report.aborted,
        "Reconciliation finished"
    );
    report
}

fn announce(report: &ApplyReport, events: &EventSender) {
    if let Some((from, to)) = &report.profile_change {
        if report.errors.is_empty() {
            publish(
                events,
                EngineEvent::ProfileChanged {
                    from: from.clone(),
                    to: to.clone(),
                },
            );
        }
    }

    for entry in report.entries.iter().filter(|e| e.is_success()) {
        let event = match entry.action {
            EntryAction::Create => EngineEvent::ControllerCreated {
                kind: entry.kind,
                name: entry.name.clone(),
                chassis_path: entry.target.clone().unwrap_or_default(),
            },
            EntryAction::Update => EngineEvent::ControllerUpdated {
                kind: entry.kind,
                name: entry.name.clone(),
                properties: entry.properties.clone(),
            },
            EntryAction::Delete => EngineEvent::ControllerDeleted {
                kind: entry.kind,
                name: entry.name.clone(),
            },
            EntryAction::Skipped => continue,
        };
        publish(events, event);
    }
}

struct Pass<'c> {
    backend: Arc<dyn ConfigBackend>,
    config: &'c EngineConfig,
    snapshot: Arc<ManagedObjects>,
    object_count: usize,
    pending: Vec<Pending>,
}

impl Pass<'_> {
    fn set_profile(&mut self, object: &ProfileObject, profile: &str) {
        let backend = self.backend.clone();
        let service = object.service.clone();
        let path = object.path.clone();
        let value = PropertyValue::from(profile);
        let handle = tokio::spawn(async move {
            backend
                .set_property(&service, &path, interfaces::THERMAL_MODE, "Current", value)
                .await
        });
        self.pending.push(Pending {
            owner: Owner::Profile,
            call: format!("Set Current on {}", object.path),
            handle,
        });
    }

    /// Process one entry. `Err` carries the entry that stops the pass.
    fn entry(
        &mut self,
        index: usize,
        kind: ControllerKind,
        name: &str,
        value: &serde_json::Value,
        profile: &str,
    ) -> std::result::Result<EntryReport, EntryReport> {
        let snapshot = self.snapshot.clone();
        let identifier = to_identifier(name);
        let matched = snapshot
            .iter()
            .find(|o| o.path.ends_with_segment(&identifier));
        let create = matched.map_or(true, |o| !o.has_interface(kind.interface()));
        debug!(kind = %kind, name, found = matched.is_some(), create, "Reconciling entry");

        if value.is_null() {
            if matched.is_none() {
                return Ok(EntryReport::rejected(
                    kind,
                    name,
                    EngineError::InvalidObject(name.to_string()),
                ));
            }
        } else if create && self.object_count >= self.config.controller_limit {
            return Ok(EntryReport::rejected(
                kind,
                name,
                EngineError::ResourceExhaustion {
                    kind,
                    limit: self.config.controller_limit,
                },
            ));
        }

        let outcome = build_properties(&BuildRequest {
            kind,
            name,
            value,
            matched,
            snapshot: snapshot.as_slice(),
            create,
            profile,
        });

        let mut entry = EntryReport::new(kind, name);
        match outcome {
            BuildOutcome::Fail(err) => {
                entry.errors.push(err);
                Err(entry)
            }
            BuildOutcome::Delete { interface } => {
                let Some(object) = matched else {
                    entry.errors.push(EngineError::InvalidObject(name.to_string()));
                    return Ok(entry);
                };
                self.delete(index, object, interface);
                entry.action = EntryAction::Delete;
                entry.target = Some(object.path.to_string());
                Ok(entry)
            }
            BuildOutcome::Patch {
                properties,
                chassis,
            } => {
                entry.properties = properties.keys().cloned().collect();
                match matched.filter(|_| !create) {
                    Some(object) => {
                        for (property, value) in properties {
                            self.set(index, object, kind.interface(), property, value);
                        }
                        entry.action = EntryAction::Update;
                        entry.target = Some(object.path.to_string());
                    }
                    None => {
                        let chassis_path = match self.resolve_chassis(name, chassis.as_deref()) {
                            Ok(path) => path,
                            Err(err) => {
                                entry.properties.clear();
                                entry.errors.push(err);
                                return Ok(entry);
                            }
                        };
                        self.add_object(index, &chassis_path, properties);
                        entry.action = EntryAction::Create;
                        entry.target = Some(chassis_path);
                    }
                }
                Ok(entry)
            }
        }
    }

    fn resolve_chassis(&self, name: &str, chassis: Option<&str>) -> Result<String> {
        let chassis = chassis.ok_or_else(|| {
            error!(name, "No chassis for new controller");
            EngineError::InvalidObject(name.to_string())
        })?;
        self.snapshot
            .iter()
            .find(|o| o.path.ends_with_segment(chassis))
            .map(|o| o.path.to_string())
            .ok_or_else(|| {
                error!(chassis, "Chassis not in configuration snapshot");
                EngineError::ResourceMissingAtUri(format!("/redfish/v1/Chassis/{}", chassis))
            })
    }

    fn delete(&mut self, index: usize, object: &ManagedObject, interface: &'static str) {
        let backend = self.backend.clone();
        let service = self.config.entity_manager_service.clone();
        let path = object.path.to_string();
        self.pending.push(Pending {
            owner: Owner::Entry(index),
            call: format!("Delete {} on {}", interface, path),
            handle: tokio::spawn(async move { backend.delete(&service, &path, interface).await }),
        });
    }

    fn set(
        &mut self,
        index: usize,
        object: &ManagedObject,
        interface: &'static str,
        property: String,
        value: PropertyValue,
    ) {
        let backend = self.backend.clone();
        let service = self.config.entity_manager_service.clone();
        let path = object.path.to_string();
        let call = format!("Set {} on {}", property, path);
        self.pending.push(Pending {
            owner: Owner::Entry(index),
            call,
            handle: tokio::spawn(async move {
                backend
                    .set_property(&service, &path, interface, &property, value)
                    .await
            }),
        });
    }

    fn add_object(&mut self, index: usize, chassis_path: &str, properties: fanctl_types::PropertyMap) {
        let backend = self.backend.clone();
        let service = self.config.entity_manager_service.clone();
        let path = chassis_path.to_string();
        self.pending.push(Pending {
            owner: Owner::Entry(index),
            call: format!("AddObject on {}", chassis_path),
            handle: tokio::spawn(async move { backend.add_object(&service, &path, properties).await }),
        });
    }

    /// Await every issued call and attach failures to their owners.
    async fn finish(self, report: &mut ApplyReport) {
        let (owners, handles): (Vec<_>, Vec<_>) = self
            .pending
            .into_iter()
            .map(|p| ((p.owner, p.call), p.handle))
            .unzip();

        for ((owner, call), joined) in owners.into_iter().zip(join_all(handles).await) {
            let err = match joined {
                Ok(Ok(())) => continue,
                Ok(Err(err)) => EngineError::Backend(err),
                Err(join) => EngineError::internal(format!("{} did not complete: {}", call, join)),
            };
            error!(call = %call, error = %err, "Backend call failed");
            match owner {
                Owner::Profile => report.errors.push(err),
                Owner::Entry(index) => {
                    if let Some(entry) = report.entries.get_mut(index) {
                        entry.errors.push(err);
                    }
                }
            }
        }
    }
}
