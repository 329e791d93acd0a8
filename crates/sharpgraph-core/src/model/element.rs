//! Code elements: the nodes of the graph.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{PropertyMap, PropertyValue, Relationship};
use crate::symbols::Accessibility;

/// Kind of a code element; also its node label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    Class,
    Struct,
    Interface,
    Enum,
    Delegate,
    Method,
    Field,
    Property,
    Event,
}

impl ElementKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Class => "Class",
            Self::Struct => "Struct",
            Self::Interface => "Interface",
            Self::Enum => "Enum",
            Self::Delegate => "Delegate",
            Self::Method => "Method",
            Self::Field => "Field",
            Self::Property => "Property",
            Self::Event => "Event",
        }
    }

    /// Class, struct and interface declarations may be split across `partial` fragments.
    pub fn can_be_partial(&self) -> bool {
        matches!(self, Self::Class | Self::Struct | Self::Interface)
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Some(match label {
            "Class" => Self::Class,
            "Struct" => Self::Struct,
            "Interface" => Self::Interface,
            "Enum" => Self::Enum,
            "Delegate" => Self::Delegate,
            "Method" => Self::Method,
            "Field" => Self::Field,
            "Property" => Self::Property,
            "Event" => Self::Event,
            _ => return None,
        })
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A variable, parameter, field or property referenced from a method body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VariableContext {
    pub name: String,
    /// Declared type display string.
    #[serde(rename = "Type")]
    pub type_name: String,
    /// `false` for fields and properties.
    pub is_local: bool,
}

/// A call site inside a method body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InvokedMethodContext {
    /// Source text of the invocation.
    pub invocation: String,
    /// Graph key of the callee.
    pub fully_qualified_signature: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MethodDetails {
    pub return_type: String,
    pub is_constructor: bool,
    pub is_destructor: bool,
    pub is_abstract: bool,
    pub is_virtual: bool,
    pub code_snippet: String,
    pub variable_contexts: Vec<VariableContext>,
    pub invoked_contexts: Vec<InvokedMethodContext>,
}

/// Kind-specific attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "Kind")]
pub enum ElementDetails {
    Class {
        #[serde(rename = "IsAbstract")]
        is_abstract: bool,
        #[serde(rename = "IsSealed")]
        is_sealed: bool,
        #[serde(rename = "IsStatic")]
        is_static: bool,
    },
    Struct,
    Interface,
    Enum,
    Delegate,
    Method(MethodDetails),
    Field {
        #[serde(rename = "Type")]
        type_name: String,
    },
    Property {
        #[serde(rename = "Type")]
        type_name: String,
    },
    Event {
        #[serde(rename = "EventHandlerType")]
        handler_type: String,
    },
}

/// One extracted code element with the edges it discovered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CodeElement {
    pub name: String,
    pub namespace: String,
    #[serde(rename = "FullyQualifiedName")]
    pub fqn: String,
    /// Declaration text, comments stripped. For enums, the raw definition.
    pub declaration: String,
    pub accessibility: Accessibility,
    /// Source files, `/`-separated. More than one only for partial types.
    pub file_locations: Vec<String>,
    pub details: ElementDetails,
    pub relationships: Vec<Relationship>,
}

impl CodeElement {
    pub fn kind(&self) -> ElementKind {
        match &self.details {
            ElementDetails::Class { .. } => ElementKind::Class,
            ElementDetails::Struct => ElementKind::Struct,
            ElementDetails::Interface => ElementKind::Interface,
            ElementDetails::Enum => ElementKind::Enum,
            ElementDetails::Delegate => ElementKind::Delegate,
            ElementDetails::Method(_) => ElementKind::Method,
            ElementDetails::Field { .. } => ElementKind::Field,
            ElementDetails::Property { .. } => ElementKind::Property,
            ElementDetails::Event { .. } => ElementKind::Event,
        }
    }

    pub fn method(&self) -> Option<&MethodDetails> {
        match &self.details {
            ElementDetails::Method(m) => Some(m),
            _ => None,
        }
    }

    /// Append an edge unless an identical one is already held.
    pub fn add_relationship(&mut self, relationship: Relationship) {
        if !self.relationships.contains(&relationship) {
            self.relationships.push(relationship);
        }
    }

    /// Fold a fragment with the same key into this element.
    ///
    /// File locations are unioned, the longer declaration wins and edges are appended
    /// without duplicates.
    pub fn merge(&mut self, other: CodeElement) {
        for location in other.file_locations {
            if !self.file_locations.contains(&location) {
                self.file_locations.push(location);
            }
        }
        if other.declaration.len() > self.declaration.len() {
            self.declaration = other.declaration;
        }
        for relationship in other.relationships {
            self.add_relationship(relationship);
        }
    }

    /// Properties written on the node.
    pub fn node_properties(&self) -> PropertyMap {
        let mut props = PropertyMap::new();
        let mut set = |name: &str, value: PropertyValue| {
            props.insert(name.to_string(), value);
        };

        let kind = self.kind();
        set("Name", self.name.as_str().into());
        set("Label", kind.label().into());
        set("Namespace", self.namespace.as_str().into());
        set("FullyQualifiedName", self.fqn.as_str().into());
        set("Accessibility", self.accessibility.as_str().into());

        if kind == ElementKind::Enum {
            set("RawDefinition", self.declaration.as_str().into());
        } else {
            set("RawDeclaration", self.declaration.as_str().into());
        }

        if kind == ElementKind::Class {
            set("FileLocation", self.file_locations.clone().into());
        } else {
            let first = self.file_locations.first().cloned().unwrap_or_default();
            set("FileLocation", first.into());
        }

        match &self.details {
            ElementDetails::Class {
                is_abstract,
                is_sealed,
                is_static,
            } => {
                set("IsAbstract", (*is_abstract).into());
                set("IsSealed", (*is_sealed).into());
                set("IsStatic", (*is_static).into());
            }
            ElementDetails::Method(m) => {
                set("ReturnType", m.return_type.as_str().into());
                set("CodeSnippet", m.code_snippet.as_str().into());
                set("IsConstruct", m.is_constructor.into());
                set("IsDestructor", m.is_destructor.into());
                set("IsAbstract", m.is_abstract.into());
            }
            ElementDetails::Field { type_name } | ElementDetails::Property { type_name } => {
                set("Type", type_name.as_str().into());
            }
            ElementDetails::Event { handler_type } => {
                set("EventHandlerType", handler_type.as_str().into());
            }
            ElementDetails::Struct
            | ElementDetails::Interface
            | ElementDetails::Enum
            | ElementDetails::Delegate => {}
        }
        props
    }
}
