//! Error types for fanctl-engine.
//!
//! Backend call failures are reported as [`BackendError`]. Everything the
//! engine reports to its caller is an [`EngineError`], classified into client,
//! internal, and referential errors.

use fanctl_types::ControllerKind;
use thiserror::Error;

/// Errors returned by a configuration backend call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    /// No object at the path.
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    /// The object does not expose the interface.
    #[error("interface {interface} not found on {path}")]
    InterfaceNotFound { path: String, interface: String },

    /// The call reached the backend and failed.
    #[error("{method} failed: {reason}")]
    CallFailed { method: String, reason: String },

    /// The call did not complete in time.
    #[error("{method} timed out")]
    Timeout { method: String },
}

impl BackendError {
    pub fn call_failed(method: &str, reason: impl Into<String>) -> Self {
        Self::CallFailed {
            method: method.to_string(),
            reason: reason.into(),
        }
    }
}

/// Coarse classification of engine errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The request was malformed or not allowed.
    Client,
    /// The backend failed or returned data the engine cannot use.
    Internal,
    /// A referenced zone or chassis could not be resolved.
    Referential,
}

/// Errors reported by the engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Field or collection the schema does not define.
    #[error("property unknown: {0}")]
    PropertyUnknown(String),

    /// Field present with the wrong type or a disallowed value.
    #[error("property {property} has invalid value {value}")]
    PropertyValueType { property: String, value: String },

    /// Field value in the wrong format.
    #[error("property {property} has malformed value {value}")]
    PropertyValueFormat { property: String, value: String },

    /// Action parameter outside its allowable values.
    #[error("parameter {parameter} value {value} is not supported")]
    ActionParameterUnknown { parameter: String, value: String },

    /// Object cannot be used for the request.
    #[error("invalid object: {0}")]
    InvalidObject(String),

    /// Creation refused because the controller limit is reached.
    #[error("resource exhaustion: {kind} has reached {limit} configuration objects")]
    ResourceExhaustion { kind: ControllerKind, limit: usize },

    /// Referenced resource does not exist.
    #[error("resource missing at {0}")]
    ResourceMissingAtUri(String),

    /// Backend call failed.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// Backend data is inconsistent.
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal(reason.into())
    }

    pub fn value_type(property: &str, value: impl ToString) -> Self {
        Self::PropertyValueType {
            property: property.to_string(),
            value: value.to_string(),
        }
    }

    pub fn value_format(property: &str, value: impl ToString) -> Self {
        Self::PropertyValueFormat {
            property: property.to_string(),
            value: value.to_string(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            EngineError::PropertyUnknown(_)
            | EngineError::PropertyValueType { .. }
            | EngineError::PropertyValueFormat { .. }
            | EngineError::ActionParameterUnknown { .. }
            | EngineError::InvalidObject(_)
            | EngineError::ResourceExhaustion { .. } => ErrorClass::Client,
            EngineError::ResourceMissingAtUri(_) => ErrorClass::Referential,
            EngineError::Backend(_) | EngineError::Internal(_) => ErrorClass::Internal,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.class() == ErrorClass::Client
    }

    pub fn is_internal(&self) -> bool {
        self.class() == ErrorClass::Internal
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(
            EngineError::PropertyUnknown("Foo".into()).class(),
            ErrorClass::Client
        );
        assert_eq!(
            EngineError::ResourceExhaustion {
                kind: ControllerKind::PidFan,
                limit: 500
            }
            .class(),
            ErrorClass::Client
        );
        assert_eq!(
            EngineError::ResourceMissingAtUri("/redfish/v1/Chassis/x".into()).class(),
            ErrorClass::Referential
        );
        assert!(EngineError::from(BackendError::call_failed("Set", "denied")).is_internal());
    }

    #[test]
    fn test_display() {
        let err = EngineError::value_type("Direction", "Sideways");
        assert_eq!(err.to_string(), "property Direction has invalid value Sideways");

        let err = BackendError::Timeout {
            method: "GetManagedObjects".into(),
        };
        assert_eq!(err.to_string(), "GetManagedObjects timed out");
    }
}
