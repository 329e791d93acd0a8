//! Property values stored on nodes and edges.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A node or edge property: string, boolean, or list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Str(String),
    List(Vec<String>),
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

/// Ordered property map, so serialized nodes are stable across runs.
pub type PropertyMap = BTreeMap<String, PropertyValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_serialization() {
        let mut props = PropertyMap::new();
        props.insert("Name".to_string(), "A".into());
        props.insert("IsStatic".to_string(), false.into());
        props.insert("FileLocation".to_string(), vec!["a.cs".to_string()].into());
        let json = serde_json::to_string(&props).unwrap();
        assert_eq!(json, r#"{"FileLocation":["a.cs"],"IsStatic":false,"Name":"A"}"#);

        let back: PropertyMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, props);
    }
}
