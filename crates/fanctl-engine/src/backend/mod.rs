//! Configuration backend abstraction.
//!
//! The engine reaches controller configuration only through the
//! [`ConfigBackend`] trait. [`InMemoryBackend`] serves tests and the CLI;
//! [`TimedBackend`] bounds every call of another backend.

mod memory;
mod timed;
mod traits;

pub use memory::{BackendState, InMemoryBackend, RpcCall, RpcMethod, ServiceState};
pub use timed::TimedBackend;
pub use traits::{BackendResult, ConfigBackend};
