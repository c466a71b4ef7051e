//! Backend property values
//!
//! Backend property bags hold a small closed set of value shapes. They are
//! represented untagged so that state files and fixtures read naturally:
//! `SetPoint: 40.0`, `Inputs: ["CPU Temp"]`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Property name to value.
pub type PropertyMap = BTreeMap<String, PropertyValue>;

/// A single backend property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Double(f64),
    Str(String),
    StrList(Vec<String>),
    DoubleList(Vec<f64>),
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// String list view. An empty list of any element type qualifies.
    pub fn as_str_list(&self) -> Option<&[String]> {
        match self {
            PropertyValue::StrList(v) => Some(v),
            PropertyValue::DoubleList(v) if v.is_empty() => Some(&[]),
            _ => None,
        }
    }

    /// Number list view. An empty list of any element type qualifies.
    pub fn as_f64_list(&self) -> Option<&[f64]> {
        match self {
            PropertyValue::DoubleList(v) => Some(v),
            PropertyValue::StrList(v) if v.is_empty() => Some(&[]),
            _ => None,
        }
    }

    /// Short name of the value shape, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::Bool(_) => "bool",
            PropertyValue::Double(_) => "double",
            PropertyValue::Str(_) => "string",
            PropertyValue::StrList(_) => "string array",
            PropertyValue::DoubleList(_) => "double array",
        }
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Double(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Str(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Str(value)
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(value: Vec<String>) -> Self {
        PropertyValue::StrList(value)
    }
}

impl From<Vec<f64>> for PropertyValue {
    fn from(value: Vec<f64>) -> Self {
        PropertyValue::DoubleList(value)
    }
}

impl std::fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyValue::Bool(v) => write!(f, "{}", v),
            PropertyValue::Double(v) => write!(f, "{}", v),
            PropertyValue::Str(v) => write!(f, "\"{}\"", v),
            PropertyValue::StrList(v) => write!(f, "{:?}", v),
            PropertyValue::DoubleList(v) => write!(f, "{:?}", v),
        }
    }
}
