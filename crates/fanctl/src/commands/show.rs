//! Show the rendered fan configuration

use fanctl_engine::RenderedView;
use fanctl_types::ControllerKind;
use serde::Serialize;
use tabled::Tabled;

use super::Session;
use crate::error::CliResult;
use crate::output::{self, OutputFormat};

/// One controller row
#[derive(Debug, Serialize, Tabled)]
pub struct ControllerRow {
    #[tabled(rename = "Collection")]
    pub collection: String,
    #[tabled(rename = "Id")]
    pub id: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Zones")]
    pub zones: String,
    #[tabled(rename = "Fields")]
    pub fields: usize,
}

/// Flatten the view into rows, ordered by collection then identifier
pub fn rows(view: &RenderedView) -> Vec<ControllerRow> {
    ControllerKind::ALL
        .into_iter()
        .flat_map(|kind| {
            view.controllers_of(kind).map(move |(id, controller)| ControllerRow {
                collection: kind.collection().to_string(),
                id: id.to_string(),
                name: controller.name.clone(),
                zones: controller
                    .zones
                    .as_ref()
                    .map(|zones| zones.join(", "))
                    .or_else(|| controller.chassis.clone())
                    .unwrap_or_default(),
                fields: controller.fields.len(),
            })
        })
        .collect()
}

pub async fn execute(session: &Session, format: OutputFormat) -> CliResult<()> {
    let view = session.engine.collect().await?;

    if !format.is_table() {
        return output::print_document(&view.to_json(session.engine.config()), format);
    }
    output::print_profile(&view.profile, &view.supported_profiles);
    output::print_rows(rows(&view), format, "No controllers configured")
}
