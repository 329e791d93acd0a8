//! Symbol facts for C# sources.
//!
//! Classifiers never look at raw syntax alone: they ask a [`SymbolFacts`] implementation
//! what a declaration or reference means. [`Compilation`] is the implementation used by the
//! pipeline; it declares every namespace, type and member across all trees, resolves
//! signatures, and binds names inside method bodies on a best-effort basis.
//!
//! # Display formats
//!
//! Graph identity keys come from the display helpers on [`SymbolFacts`]:
//!
//! | Symbol | Display |
//! |---|---|
//! | type | `Ns.Outer.Inner<T>` |
//! | method | `Ns.Type.Name(int, Ns.Widget)` |
//! | field / property / event | `Ns.Type.Name` |
//! | namespace | `Ns.Sub`, or `<global namespace>` |

mod bind;
mod compilation;
mod declare;
mod types;

pub use compilation::{Compilation, CompilationBuilder};
pub(crate) use types::base_list_entries;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::syntax::{NodeRef, SyntaxRef, SyntaxTree, TreeId};

/// Display name of the global namespace.
pub const GLOBAL_NAMESPACE: &str = "<global namespace>";

/// Index of a symbol inside a compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub u32);

/// Kind of a named type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    Class,
    Struct,
    Interface,
    Enum,
    Delegate,
}

/// Kind of a method symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MethodKind {
    Ordinary,
    Constructor,
    Destructor,
}

/// Declared accessibility, named the way the graph stores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Accessibility {
    NotApplicable,
    Private,
    ProtectedAndInternal,
    Protected,
    Internal,
    ProtectedOrInternal,
    Public,
}

impl Accessibility {
    /// Accessibility from modifier keywords, or `default` when none is written.
    pub fn from_modifiers(modifiers: &[&str], default: Accessibility) -> Self {
        let has = |m: &str| modifiers.contains(&m);
        if has("public") {
            Self::Public
        } else if has("private") && has("protected") {
            Self::ProtectedAndInternal
        } else if has("protected") && has("internal") {
            Self::ProtectedOrInternal
        } else if has("protected") {
            Self::Protected
        } else if has("internal") {
            Self::Internal
        } else if has("private") {
            Self::Private
        } else {
            default
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotApplicable => "NotApplicable",
            Self::Private => "Private",
            Self::ProtectedAndInternal => "ProtectedAndInternal",
            Self::Protected => "Protected",
            Self::Internal => "Internal",
            Self::ProtectedOrInternal => "ProtectedOrInternal",
            Self::Public => "Public",
        }
    }
}

impl fmt::Display for Accessibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Modifier flags relevant to classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub is_abstract: bool,
    pub is_virtual: bool,
    pub is_override: bool,
    pub is_static: bool,
    pub is_sealed: bool,
    pub is_partial: bool,
}

impl Modifiers {
    pub fn from_keywords(keywords: &[&str]) -> Self {
        let has = |m: &str| keywords.contains(&m);
        Self {
            is_abstract: has("abstract"),
            is_virtual: has("virtual"),
            is_override: has("override"),
            is_static: has("static"),
            is_sealed: has("sealed"),
            is_partial: has("partial"),
        }
    }

    /// Union of two fragments' flags (partial declarations).
    pub fn union(self, other: Modifiers) -> Self {
        Self {
            is_abstract: self.is_abstract || other.is_abstract,
            is_virtual: self.is_virtual || other.is_virtual,
            is_override: self.is_override || other.is_override,
            is_static: self.is_static || other.is_static,
            is_sealed: self.is_sealed || other.is_sealed,
            is_partial: self.is_partial || other.is_partial,
        }
    }
}

/// A reference to a type as written in a signature or inferred for an expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// A type declared in the compilation, possibly constructed with arguments.
    Named { symbol: SymbolId, args: Vec<TypeRef> },
    /// Keyword types: `int`, `string`, `void`...
    Special(String),
    TypeParameter(String),
    Array { element: Box<TypeRef>, rank: String },
    Nullable(Box<TypeRef>),
    /// Anything that did not resolve, displayed as written.
    Unresolved(String),
}

impl TypeRef {
    pub fn named(symbol: SymbolId) -> Self {
        TypeRef::Named {
            symbol,
            args: Vec::new(),
        }
    }

    /// The declared type symbol, looking through `T?`.
    pub fn symbol(&self) -> Option<SymbolId> {
        match self {
            TypeRef::Named { symbol, .. } => Some(*symbol),
            TypeRef::Nullable(inner) => inner.symbol(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NamedType {
    pub type_kind: TypeKind,
    pub type_parameters: Vec<String>,
    pub base_type: Option<TypeRef>,
    pub interfaces: Vec<TypeRef>,
    /// Member symbols in declaration order.
    pub members: Vec<SymbolId>,
}

#[derive(Debug, Clone)]
pub struct MethodSymbol {
    pub method_kind: MethodKind,
    pub type_parameters: Vec<String>,
    pub parameters: Vec<SymbolId>,
    pub return_type: Option<TypeRef>,
    pub overridden: Option<SymbolId>,
}

#[derive(Debug, Clone)]
pub struct ParameterSymbol {
    pub ty: Option<TypeRef>,
    /// `ref`, `out`, `in` or `params`.
    pub ref_kind: Option<String>,
    pub has_default: bool,
}

#[derive(Debug, Clone)]
pub enum SymbolKind {
    Namespace,
    Type(NamedType),
    Method(MethodSymbol),
    Field(TypeRef),
    Property(TypeRef),
    Event(TypeRef),
    Parameter(ParameterSymbol),
    /// Locals whose type could not be inferred carry `None`.
    Local(Option<TypeRef>),
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    /// Containing type, namespace or (for parameters and locals) method.
    pub container: Option<SymbolId>,
    pub accessibility: Accessibility,
    pub modifiers: Modifiers,
    /// Every syntax fragment declaring this symbol; more than one for partial types.
    pub declarations: Vec<SyntaxRef>,
    pub kind: SymbolKind,
}

impl Symbol {
    pub fn as_type(&self) -> Option<&NamedType> {
        match &self.kind {
            SymbolKind::Type(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_method(&self) -> Option<&MethodSymbol> {
        match &self.kind {
            SymbolKind::Method(m) => Some(m),
            _ => None,
        }
    }

    pub fn type_kind(&self) -> Option<TypeKind> {
        self.as_type().map(|t| t.type_kind)
    }

    pub fn is_namespace(&self) -> bool {
        matches!(self.kind, SymbolKind::Namespace)
    }

    /// Type of a field, property, event, parameter or local.
    pub fn value_type(&self) -> Option<&TypeRef> {
        match &self.kind {
            SymbolKind::Field(t) | SymbolKind::Property(t) | SymbolKind::Event(t) => Some(t),
            SymbolKind::Parameter(p) => p.ty.as_ref(),
            SymbolKind::Local(t) => t.as_ref(),
            _ => None,
        }
    }

    pub fn is_field_or_property(&self) -> bool {
        matches!(self.kind, SymbolKind::Field(_) | SymbolKind::Property(_))
    }

    pub fn is_local_or_parameter(&self) -> bool {
        matches!(self.kind, SymbolKind::Parameter(_) | SymbolKind::Local(_))
    }
}

/// Semantic questions classifiers ask about syntax.
///
/// The required methods answer per-node queries; the provided methods build the display
/// strings used as graph keys on top of them.
pub trait SymbolFacts {
    /// Tree by id, if it belongs to this compilation.
    fn tree(&self, id: TreeId) -> Option<&SyntaxTree>;

    /// Symbol by id. Ids are only ever handed out by the same facts instance.
    fn symbol(&self, id: SymbolId) -> &Symbol;

    /// Symbol declared by a declaration node.
    fn declared_symbol(&self, node: SyntaxRef) -> Option<SymbolId>;

    /// Symbol a reference (name, invocation, object creation) binds to.
    fn symbol_info(&self, node: SyntaxRef) -> Option<SymbolId>;

    /// Type of an expression, where known.
    fn type_info(&self, node: SyntaxRef) -> Option<&TypeRef>;

    fn node(&self, r: SyntaxRef) -> Option<NodeRef<'_>> {
        self.tree(r.tree).and_then(|t| t.get(r))
    }

    /// Nearest containing type.
    fn containing_type(&self, id: SymbolId) -> Option<SymbolId> {
        let container = self.symbol(id).container?;
        if self.symbol(container).as_type().is_some() {
            Some(container)
        } else if self.symbol(container).as_method().is_some() {
            self.containing_type(container)
        } else {
            None
        }
    }

    /// Nearest containing namespace.
    fn containing_namespace(&self, id: SymbolId) -> Option<SymbolId> {
        let mut current = self.symbol(id).container;
        while let Some(c) = current {
            if self.symbol(c).is_namespace() {
                return Some(c);
            }
            current = self.symbol(c).container;
        }
        None
    }

    /// Dotted name of a namespace; empty for the global namespace.
    fn namespace_path(&self, ns: SymbolId) -> String {
        let mut parts = Vec::new();
        let mut current = Some(ns);
        while let Some(id) = current {
            let symbol = self.symbol(id);
            if symbol.container.is_none() {
                break;
            }
            parts.push(symbol.name.as_str());
            current = symbol.container;
        }
        parts.reverse();
        parts.join(".")
    }

    /// Namespace display for a symbol's `Namespace` property.
    fn namespace_display(&self, id: SymbolId) -> String {
        let path = self
            .containing_namespace(id)
            .map(|ns| self.namespace_path(ns))
            .unwrap_or_default();
        if path.is_empty() {
            GLOBAL_NAMESPACE.to_string()
        } else {
            path
        }
    }

    /// Prefix `Ns.Outer.` for a member or nested type; empty in the global namespace.
    fn qualifier(&self, id: SymbolId) -> String {
        let Some(container) = self.symbol(id).container else {
            return String::new();
        };
        let prefix = if self.symbol(container).as_type().is_some() {
            self.type_fqn(container)
        } else if self.symbol(container).is_namespace() {
            self.namespace_path(container)
        } else {
            return self.qualifier(container);
        };
        if prefix.is_empty() {
            prefix
        } else {
            format!("{}.", prefix)
        }
    }

    /// Definition display of a type: `Ns.Outer.List<T>`.
    fn type_fqn(&self, id: SymbolId) -> String {
        let symbol = self.symbol(id);
        let mut out = format!("{}{}", self.qualifier(id), symbol.name);
        if let Some(t) = symbol.as_type() {
            push_type_parameters(&mut out, &t.type_parameters);
        }
        out
    }

    /// Short type name with type parameters: `List<T>`.
    fn type_short_name(&self, id: SymbolId) -> String {
        let symbol = self.symbol(id);
        let mut out = symbol.name.clone();
        if let Some(t) = symbol.as_type() {
            push_type_parameters(&mut out, &t.type_parameters);
        }
        out
    }

    fn display_type(&self, ty: &TypeRef) -> String {
        match ty {
            TypeRef::Named { symbol, args } if args.is_empty() => self.type_fqn(*symbol),
            TypeRef::Named { symbol, args } => {
                let args: Vec<String> = args.iter().map(|a| self.display_type(a)).collect();
                format!(
                    "{}{}<{}>",
                    self.qualifier(*symbol),
                    self.symbol(*symbol).name,
                    args.join(", ")
                )
            }
            TypeRef::Special(name) | TypeRef::TypeParameter(name) | TypeRef::Unresolved(name) => {
                name.clone()
            }
            TypeRef::Array { element, rank } => format!("{}{}", self.display_type(element), rank),
            TypeRef::Nullable(inner) => format!("{}?", self.display_type(inner)),
        }
    }

    /// Simple name of a method; constructors and destructors use the type name.
    fn method_simple_name(&self, id: SymbolId) -> String {
        let symbol = self.symbol(id);
        let type_name = || {
            self.containing_type(id)
                .map(|t| self.symbol(t).name.clone())
                .unwrap_or_else(|| symbol.name.clone())
        };
        match symbol.as_method().map(|m| m.method_kind) {
            Some(MethodKind::Constructor) => type_name(),
            Some(MethodKind::Destructor) => format!("~{}", type_name()),
            _ => symbol.name.clone(),
        }
    }

    /// Ordered parameter types of a method.
    fn parameter_types(&self, id: SymbolId) -> Vec<Option<&TypeRef>> {
        self.symbol(id)
            .as_method()
            .map(|m| {
                m.parameters
                    .iter()
                    .map(|p| self.symbol(*p).value_type())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// `Name(int, Ns.Widget)`: the graph's display name of a method.
    fn method_name(&self, id: SymbolId) -> String {
        let params: Vec<String> = self
            .parameter_types(id)
            .into_iter()
            .map(|t| t.map(|t| self.display_type(t)).unwrap_or_else(|| "?".to_string()))
            .collect();
        format!("{}({})", self.method_simple_name(id), params.join(", "))
    }

    /// `Ns.Type.Name<U>(ref int, Ns.Widget)`: the graph key of a method.
    fn method_fqn(&self, id: SymbolId) -> String {
        let symbol = self.symbol(id);
        let mut out = format!("{}{}", self.qualifier(id), self.method_simple_name(id));
        let Some(method) = symbol.as_method() else {
            return out;
        };
        push_type_parameters(&mut out, &method.type_parameters);
        let params: Vec<String> = method
            .parameters
            .iter()
            .map(|p| {
                let param = self.symbol(*p);
                let ty = param
                    .value_type()
                    .map(|t| self.display_type(t))
                    .unwrap_or_else(|| "?".to_string());
                match &param.kind {
                    SymbolKind::Parameter(ParameterSymbol {
                        ref_kind: Some(kind),
                        ..
                    }) => format!("{} {}", kind, ty),
                    _ => ty,
                }
            })
            .collect();
        out.push('(');
        out.push_str(&params.join(", "));
        out.push(')');
        out
    }

    /// `Ns.Type.Name` for fields, properties and events.
    fn member_fqn(&self, id: SymbolId) -> String {
        format!("{}{}", self.qualifier(id), self.symbol(id).name)
    }

    /// Graph key of any symbol that can become an element.
    fn fqn(&self, id: SymbolId) -> String {
        match &self.symbol(id).kind {
            SymbolKind::Type(_) => self.type_fqn(id),
            SymbolKind::Method(_) => self.method_fqn(id),
            SymbolKind::Namespace => self.namespace_path(id),
            _ => self.member_fqn(id),
        }
    }

    /// Resolved base type symbol.
    fn base_type(&self, id: SymbolId) -> Option<SymbolId> {
        self.symbol(id)
            .as_type()
            .and_then(|t| t.base_type.as_ref())
            .and_then(TypeRef::symbol)
    }

    /// Every interface a type implements, directly or through bases and base interfaces.
    ///
    /// Order: each directly declared interface followed by its own bases, in declaration
    /// order; interfaces reached through the base class come first.
    fn all_interfaces(&self, id: SymbolId) -> Vec<SymbolId> {
        let mut result = Vec::new();
        let mut visited = HashSet::new();
        let mut seen_bases = HashSet::new();
        let mut current = Some(id);
        while let Some(t) = current {
            if !seen_bases.insert(t) {
                break;
            }
            let Some(named) = self.symbol(t).as_type() else {
                break;
            };
            for iface in named.interfaces.iter().rev() {
                if let Some(iface) = iface.symbol() {
                    add_interface(self, iface, &mut visited, &mut result);
                }
            }
            current = named.base_type.as_ref().and_then(TypeRef::symbol);
        }
        result.reverse();
        result
    }
}

fn add_interface<F: SymbolFacts + ?Sized>(
    facts: &F,
    iface: SymbolId,
    visited: &mut HashSet<SymbolId>,
    result: &mut Vec<SymbolId>,
) {
    if !visited.insert(iface) {
        return;
    }
    if let Some(named) = facts.symbol(iface).as_type() {
        for base in named.interfaces.iter().rev() {
            if let Some(base) = base.symbol() {
                add_interface(facts, base, visited, result);
            }
        }
    }
    result.push(iface);
}

fn push_type_parameters(out: &mut String, params: &[String]) {
    if !params.is_empty() {
        out.push('<');
        out.push_str(&params.join(", "));
        out.push('>');
    }
}
