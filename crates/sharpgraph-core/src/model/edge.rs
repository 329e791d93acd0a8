//! Relationship kinds and the edge descriptors elements carry until persistence.
//!
//! - **Type hierarchy**: INHERITS, IMPLEMENTS, EXTENDS, OVERRIDES
//! - **Containment**: NESTED_IN, DECLARES_DELEGATE, HAS_FIELD, HAS_PROPERTY, HAS_METHOD,
//!   HAS_ABSTRACT_METHOD, HAS_EVENT
//! - **Behavior**: INSTANTIATES, INVOKES, ACCESS

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{ElementKind, PropertyMap};

/// Kind of a relationship between two elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeKind {
    // === Type hierarchy ===
    /// Class inherits its base class.
    Inherits,
    /// Class implements interface, or method implements interface method.
    Implements,
    /// Interface extends base interface.
    Extends,
    /// Method overrides base method.
    Overrides,

    // === Containment ===
    /// Nested type is declared inside a class or struct.
    NestedIn,
    /// Type declares a delegate.
    DeclaresDelegate,
    HasField,
    HasProperty,
    HasMethod,
    /// Type declares an abstract method.
    HasAbstractMethod,
    HasEvent,

    // === Behavior ===
    /// Class creates an instance of a generic class.
    Instantiates,
    /// Method calls method.
    Invokes,
    /// Method reads or writes a field or property.
    Access,
}

impl EdgeKind {
    pub const ALL: [EdgeKind; 14] = [
        EdgeKind::Inherits,
        EdgeKind::Implements,
        EdgeKind::Extends,
        EdgeKind::Overrides,
        EdgeKind::NestedIn,
        EdgeKind::DeclaresDelegate,
        EdgeKind::HasField,
        EdgeKind::HasProperty,
        EdgeKind::HasMethod,
        EdgeKind::HasAbstractMethod,
        EdgeKind::HasEvent,
        EdgeKind::Instantiates,
        EdgeKind::Invokes,
        EdgeKind::Access,
    ];

    /// Relationship name as stored in the graph.
    pub fn relation_name(&self) -> &'static str {
        match self {
            Self::Inherits => "INHERITS",
            Self::Implements => "IMPLEMENTS",
            Self::Extends => "EXTENDS",
            Self::Overrides => "OVERRIDES",
            Self::NestedIn => "NESTED_IN",
            Self::DeclaresDelegate => "DECLARES_DELEGATE",
            Self::HasField => "HAS_FIELD",
            Self::HasProperty => "HAS_PROPERTY",
            Self::HasMethod => "HAS_METHOD",
            Self::HasAbstractMethod => "HAS_ABSTRACT_METHOD",
            Self::HasEvent => "HAS_EVENT",
            Self::Instantiates => "INSTANTIATES",
            Self::Invokes => "INVOKES",
            Self::Access => "ACCESS",
        }
    }

    /// Edge table name in the store.
    pub fn table_name(&self) -> &'static str {
        match self {
            Self::Inherits => "inherits",
            Self::Implements => "implements",
            Self::Extends => "extends",
            Self::Overrides => "overrides",
            Self::NestedIn => "nested_in",
            Self::DeclaresDelegate => "declares_delegate",
            Self::HasField => "has_field",
            Self::HasProperty => "has_property",
            Self::HasMethod => "has_method",
            Self::HasAbstractMethod => "has_abstract_method",
            Self::HasEvent => "has_event",
            Self::Instantiates => "instantiates",
            Self::Invokes => "invokes",
            Self::Access => "access",
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.relation_name())
    }
}

/// One side of an edge: an identity key, optionally restricted to some element kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub key: String,
    /// Accepted kinds for the stored node; empty accepts any kind.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<ElementKind>,
}

impl Endpoint {
    pub fn any(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            labels: Vec::new(),
        }
    }

    pub fn labeled(key: impl Into<String>, labels: &[ElementKind]) -> Self {
        Self {
            key: key.into(),
            labels: labels.to_vec(),
        }
    }

    /// Whether a node of `kind` may sit on this side of the edge.
    pub fn accepts(&self, kind: ElementKind) -> bool {
        self.labels.is_empty() || self.labels.contains(&kind)
    }
}

/// A pending edge write, owned by the element that discovered it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub kind: EdgeKind,
    pub from: Endpoint,
    pub to: Endpoint,
    #[serde(default, skip_serializing_if = "PropertyMap::is_empty")]
    pub properties: PropertyMap,
}

impl Relationship {
    pub fn new(kind: EdgeKind, from: Endpoint, to: Endpoint) -> Self {
        Self {
            kind,
            from,
            to,
            properties: PropertyMap::new(),
        }
    }

    /// Same kind and endpoint keys: the merge identity of an edge in the store.
    pub fn same_edge(&self, other: &Relationship) -> bool {
        self.kind == other.kind && self.from.key == other.from.key && self.to.key == other.to.key
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -{}-> {}", self.from.key, self.kind, self.to.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relation_and_table_names_agree() {
        for kind in EdgeKind::ALL {
            assert_eq!(kind.table_name().to_uppercase(), kind.relation_name());
        }
    }

    #[test]
    fn test_endpoint_labels() {
        let access = Endpoint::labeled("A.x", &[ElementKind::Field, ElementKind::Property]);
        assert!(access.accepts(ElementKind::Field));
        assert!(access.accepts(ElementKind::Property));
        assert!(!access.accepts(ElementKind::Method));
        assert!(Endpoint::any("A").accepts(ElementKind::Enum));
    }

    #[test]
    fn test_display() {
        let rel = Relationship::new(EdgeKind::Inherits, Endpoint::any("B"), Endpoint::any("A"));
        assert_eq!(rel.to_string(), "B -INHERITS-> A");
    }
}
