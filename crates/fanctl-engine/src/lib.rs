//! fanctl Engine - Configuration reconciliation for fan and thermal controllers
//!
//! Controller configuration lives in a backend that is reachable only through
//! asynchronous calls. This crate reads that configuration into a
//! client-facing view and reconciles client patches back into backend calls.
//!
//! ## Key Components
//!
//! - [`JoinBarrier`]: counted fan-in that fires once after the last branch
//! - [`collect_configuration`]: read path, one snapshot per owning service
//! - [`populate_view`]: renders a service snapshot into the client view
//! - [`build_properties`]: translates client fields into a backend property bag
//! - [`apply_configuration`]: write path, matching patch entries to objects
//! - [`FanConfigEngine`]: facade tying the above to one backend
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use fanctl_engine::{backend::InMemoryBackend, ClientPatch, EngineConfig, FanConfigEngine};
//!
//! # async fn example() -> fanctl_engine::Result<()> {
//! let engine = FanConfigEngine::new(EngineConfig::default(), Arc::new(InMemoryBackend::new()));
//!
//! let view = engine.collect().await?;
//! println!("{}", view.to_json(engine.config()));
//!
//! let patch = ClientPatch::from_json(&serde_json::json!({"FanZones": {"Left": null}}))?;
//! let report = engine.apply(&patch).await;
//! println!("success: {}", report.is_success());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod backend;
pub mod builder;
pub mod collect;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod join;
pub mod patch;
pub mod profile;
pub mod reconcile;
pub mod render;
pub mod view;

pub use builder::{build_properties, BuildOutcome, BuildRequest, Step};
pub use collect::collect_configuration;
pub use config::EngineConfig;
pub use engine::FanConfigEngine;
pub use error::{BackendError, EngineError, ErrorClass, Result};
pub use events::EngineEvent;
pub use join::{Branch, JoinBarrier, JoinCompletion, JoinOutcome};
pub use patch::ClientPatch;
pub use reconcile::{apply_configuration, ApplyReport, EntryAction, EntryReport};
pub use render::populate_view;
pub use view::{RenderedController, RenderedView};
