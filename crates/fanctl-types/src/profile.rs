//! Thermal profiles
//!
//! A profile is a named operating mode. Controllers that list profiles are
//! only active, and only rendered, while one of their profiles is current.

use serde::{Deserialize, Serialize};

/// The active profile and the profiles the backend supports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSet {
    /// Active profile. Empty when none is selected.
    pub current: String,

    /// Supported profiles in backend order.
    pub supported: Vec<String>,
}

impl ProfileSet {
    pub fn new(current: impl Into<String>, supported: Vec<String>) -> Self {
        Self {
            current: current.into(),
            supported,
        }
    }

    pub fn is_supported(&self, profile: &str) -> bool {
        self.supported.iter().any(|p| p == profile)
    }

    /// Active profile, if one is selected.
    pub fn active(&self) -> Option<&str> {
        if self.current.is_empty() {
            None
        } else {
            Some(&self.current)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership() {
        let profiles = ProfileSet::new("Default", vec!["Default".into(), "Performance".into()]);
        assert!(profiles.is_supported("Performance"));
        assert!(!profiles.is_supported("Quiet"));
        assert_eq!(profiles.active(), Some("Default"));
    }

    #[test]
    fn test_empty_current_is_inactive() {
        assert_eq!(ProfileSet::default().active(), None);
    }
}
