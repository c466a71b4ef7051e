//! fanctl Types - Core types for fan and thermal controller configuration
//!
//! Controller configuration lives in an out-of-process configuration backend
//! that is reached only through asynchronous calls. This crate holds the
//! shared vocabulary used on both sides of that boundary.
//!
//! ## Key Concepts
//!
//! - **ControllerKind**: PID temperature loop, PID fan loop, fan zone, or
//!   stepwise curve
//! - **PropertyValue**: scalar or vector value stored in a backend property bag
//! - **ManagedObject**: point-in-time copy of one backend object and its
//!   interfaces
//! - **ProfileSet**: the active thermal profile and the supported profile list
//! - **Naming**: conversion between backend names (spaces) and client
//!   identifiers (underscores)

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod interfaces;
pub mod kind;
pub mod naming;
pub mod object;
pub mod profile;
pub mod value;

// Re-export main types
pub use kind::{ControllerKind, UnknownControllerKind};
pub use naming::{to_display_name, to_identifier};
pub use object::{InterfaceMap, ManagedObject, ManagedObjects, ObjectPath, SubtreeEntry};
pub use profile::ProfileSet;
pub use value::{PropertyMap, PropertyValue};
