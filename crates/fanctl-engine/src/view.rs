//! Client-facing configuration view.

use std::collections::BTreeMap;

use fanctl_types::{ControllerKind, ProfileSet};
use serde_json::{json, Map, Value};

use crate::config::EngineConfig;
use crate::patch::{ClientPatch, PROFILE_KEY};

/// One rendered controller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedController {
    /// Backend name with its original spacing.
    pub name: String,
    /// Client fields other than links.
    pub fields: Map<String, Value>,
    /// Referenced zone identifiers.
    pub zones: Option<Vec<String>>,
    /// Owning chassis name (zones only).
    pub chassis: Option<String>,
}

impl RenderedController {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Client-writable fields, with links in their client shape.
    fn writable(&self, zone_root: &str) -> Map<String, Value> {
        let mut body = self.fields.clone();
        if let Some(chassis) = &self.chassis {
            body.insert("Chassis".into(), chassis_link(chassis));
        }
        if let Some(zones) = &self.zones {
            let links = zones
                .iter()
                .map(|zone| json!({ "@odata.id": format!("{}/{}", zone_root, zone) }))
                .collect();
            body.insert("Zones".into(), Value::Array(links));
        }
        body
    }
}

fn chassis_link(chassis: &str) -> Value {
    json!({ "@odata.id": format!("/redfish/v1/Chassis/{}", chassis) })
}

/// Rendered fan configuration, rebuilt from scratch on every read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedView {
    /// Active profile, empty when none is set.
    pub profile: String,
    pub supported_profiles: Vec<String>,
    /// Kind to controller identifier to controller.
    pub controllers: BTreeMap<ControllerKind, BTreeMap<String, RenderedController>>,
}

impl RenderedView {
    pub fn new(profiles: Option<&ProfileSet>) -> Self {
        let (profile, supported_profiles) = profiles
            .map(|p| (p.current.clone(), p.supported.clone()))
            .unwrap_or_default();
        Self {
            profile,
            supported_profiles,
            controllers: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, kind: ControllerKind, id: impl Into<String>, controller: RenderedController) {
        self.controllers
            .entry(kind)
            .or_default()
            .insert(id.into(), controller);
    }

    pub fn controller(&self, kind: ControllerKind, id: &str) -> Option<&RenderedController> {
        self.controllers.get(&kind).and_then(|c| c.get(id))
    }

    /// Controllers of one kind, ordered by identifier.
    pub fn controllers_of(
        &self,
        kind: ControllerKind,
    ) -> impl Iterator<Item = (&str, &RenderedController)> {
        self.controllers
            .get(&kind)
            .into_iter()
            .flat_map(|c| c.iter().map(|(id, controller)| (id.as_str(), controller)))
    }

    pub fn len(&self) -> usize {
        self.controllers.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render the client document.
    pub fn to_json(&self, config: &EngineConfig) -> Value {
        let root_uri = config.fan_root_uri();
        let zone_root = format!("{}/{}", root_uri, ControllerKind::Zone.collection());

        let mut root = Map::new();
        root.insert("@odata.id".into(), Value::String(root_uri.clone()));
        root.insert("@odata.type".into(), Value::String("#OemManager.Fan".into()));

        for kind in ControllerKind::ALL {
            let collection_uri = format!("{}/{}", root_uri, kind.collection());
            let mut collection = Map::new();
            collection.insert("@odata.id".into(), Value::String(collection_uri.clone()));
            collection.insert("@odata.type".into(), Value::String(kind.collection_type().into()));

            for (id, controller) in self.controllers_of(kind) {
                let mut entry = controller.writable(&zone_root);
                entry.insert("Name".into(), Value::String(controller.name.clone()));
                entry.insert(
                    "@odata.id".into(),
                    Value::String(format!("{}/{}", collection_uri, id)),
                );
                entry.insert("@odata.type".into(), Value::String(kind.entry_type().into()));
                collection.insert(id.to_string(), Value::Object(entry));
            }
            root.insert(kind.collection().into(), Value::Object(collection));
        }

        root.insert(
            format!("{}@Redfish.AllowableValues", PROFILE_KEY),
            json!(self.supported_profiles),
        );
        if !self.profile.is_empty() {
            root.insert(PROFILE_KEY.into(), Value::String(self.profile.clone()));
        }
        Value::Object(root)
    }

    /// A patch that writes every controller back as rendered.
    pub fn to_patch(&self, config: &EngineConfig) -> ClientPatch {
        let zone_root = format!(
            "{}/{}",
            config.fan_root_uri(),
            ControllerKind::Zone.collection()
        );
        let mut patch = ClientPatch::new();
        for (kind, controllers) in &self.controllers {
            for (id, controller) in controllers {
                patch.set(*kind, id.clone(), Value::Object(controller.writable(&zone_root)));
            }
        }
        patch
    }
}
