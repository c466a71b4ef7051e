//! Name normalization
//!
//! The backend stores human-readable names with spaces (`"Fan 1"`). Object
//! paths and client identifiers cannot carry spaces, so they use underscores
//! (`"Fan_1"`). The mapping is lossy: a backend name that already contains an
//! underscore cannot be told apart from one that contained a space.

/// Backend name to client identifier (space to underscore).
pub fn to_identifier(name: &str) -> String {
    name.replace(' ', "_")
}

/// Client identifier to backend name (underscore to space).
pub fn to_display_name(identifier: &str) -> String {
    identifier.replace('_', " ")
}
