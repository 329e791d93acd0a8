//! Type resolution: base lists, member signatures, overrides.

use std::collections::HashSet;

use super::compilation::Compilation;
use super::{
    Accessibility, Modifiers, ParameterSymbol, Symbol, SymbolFacts, SymbolId, SymbolKind,
    TypeKind, TypeRef,
};
use crate::syntax::{NodeRef, SyntaxKind};

/// Where a type name is being looked up from.
#[derive(Debug, Clone)]
pub(super) struct Scope {
    pub tree: usize,
    pub namespace: SymbolId,
    pub current_type: Option<SymbolId>,
    pub method_type_parameters: Vec<String>,
}

impl Compilation {
    pub(super) fn resolve_signatures(&mut self) {
        let type_ids: Vec<SymbolId> = self
            .symbols()
            .filter(|(_, s)| s.as_type().is_some())
            .map(|(id, _)| id)
            .collect();

        for &ty in &type_ids {
            self.resolve_base_list(ty);
        }
        for &ty in &type_ids {
            let members = self
                .symbol(ty)
                .as_type()
                .map(|t| t.members.clone())
                .unwrap_or_default();
            for member in members {
                self.resolve_member_signature(member);
            }
        }
    }

    /// Scope of a symbol's declaration in its first tree.
    pub(super) fn scope_for(&self, id: SymbolId) -> Option<Scope> {
        let symbol = self.symbol(id);
        let decl = *symbol.declarations.first()?;
        let (current_type, method_type_parameters) = match &symbol.kind {
            SymbolKind::Type(_) => (Some(id), Vec::new()),
            SymbolKind::Method(m) => (self.containing_type(id), m.type_parameters.clone()),
            _ => (self.containing_type(id), Vec::new()),
        };
        Some(Scope {
            tree: decl.tree.0 as usize,
            namespace: self.containing_namespace(id).unwrap_or(self.global),
            current_type,
            method_type_parameters,
        })
    }

    fn resolve_base_list(&mut self, ty: SymbolId) {
        let symbol = self.symbol(ty);
        let Some(type_kind) = symbol.type_kind() else {
            return;
        };
        if matches!(type_kind, TypeKind::Enum | TypeKind::Delegate) {
            return;
        }
        let Some(scope) = self.scope_for(ty) else {
            return;
        };

        let mut entries = Vec::new();
        for decl in &symbol.declarations {
            let Some(node) = self.node(*decl) else {
                continue;
            };
            let scope = Scope {
                tree: decl.tree.0 as usize,
                ..scope.clone()
            };
            if let Some(list) = node.first_child_of_kind(SyntaxKind::BaseList) {
                for entry in base_list_entries(list) {
                    entries.push(self.resolve_type(entry, &scope));
                }
            }
        }

        let mut base_type = None;
        let mut interfaces: Vec<TypeRef> = Vec::new();
        for (i, entry) in entries.into_iter().enumerate() {
            // Only a class may have a base class, and only in first position.
            if i == 0 && type_kind == TypeKind::Class {
                let entry_kind = entry.symbol().and_then(|s| self.symbol(s).type_kind());
                match entry_kind {
                    Some(TypeKind::Class) => {
                        base_type = Some(entry);
                        continue;
                    }
                    None if matches!(entry, TypeRef::Unresolved(_)) => {
                        log::debug!(
                            "{}: treating unresolved {:?} as the base class",
                            self.symbol(ty).name,
                            entry
                        );
                        base_type = Some(entry);
                        continue;
                    }
                    _ => {}
                }
            }
            if !interfaces.contains(&entry) {
                interfaces.push(entry);
            }
        }

        if let SymbolKind::Type(named) = &mut self.symbol_mut(ty).kind {
            named.base_type = base_type;
            named.interfaces = interfaces;
        }
    }

    fn resolve_member_signature(&mut self, member: SymbolId) {
        let Some(scope) = self.scope_for(member) else {
            return;
        };
        let Some(decl) = self.symbol(member).declarations.first().copied() else {
            return;
        };
        let Some(node) = self.node(decl) else {
            return;
        };

        let is_method = self.symbol(member).as_method().is_some();
        let is_value = matches!(
            self.symbol(member).kind,
            SymbolKind::Field(_) | SymbolKind::Event(_) | SymbolKind::Property(_)
        );
        if is_method {
            let return_type = node
                .child_by_field("returns")
                .or_else(|| node.child_by_field("type"))
                .map(|t| self.resolve_type(t, &scope));

            let mut parameters = Vec::new();
            let list = node
                .child_by_field("parameters")
                .or_else(|| node.first_child_of_kind(SyntaxKind::ParameterList));
            if let Some(list) = list {
                for param in list.children_of_kind(SyntaxKind::Parameter) {
                    let symbol = ParameterSymbol {
                        ty: param.child_by_field("type").map(|t| self.resolve_type(t, &scope)),
                        ref_kind: parameter_ref_kind(param),
                        has_default: param.text().contains('='),
                    };
                    let name = param.name().unwrap_or_default().to_string();
                    parameters.push((param.syntax_ref(), name, symbol));
                }
            }

            let mut ids = Vec::new();
            for (decl, name, param) in parameters {
                let id = self.add_symbol(Symbol {
                    name,
                    container: Some(member),
                    accessibility: Accessibility::NotApplicable,
                    modifiers: Modifiers::default(),
                    declarations: vec![decl],
                    kind: SymbolKind::Parameter(param),
                });
                self.declared.insert(decl, id);
                ids.push(id);
            }
            if let SymbolKind::Method(method) = &mut self.symbol_mut(member).kind {
                method.return_type = return_type;
                method.parameters = ids;
            }
        } else if is_value {
            // Declarators hold no type; it sits on the enclosing variable declaration.
            let type_node = if node.kind() == SyntaxKind::VariableDeclarator {
                node.parent().and_then(|d| d.child_by_field("type"))
            } else {
                node.child_by_field("type")
            };
            let Some(type_node) = type_node else {
                return;
            };
            let ty = self.resolve_type(type_node, &scope);
            match &mut self.symbol_mut(member).kind {
                SymbolKind::Field(t) | SymbolKind::Event(t) | SymbolKind::Property(t) => *t = ty,
                _ => {}
            }
        }
    }

    pub(super) fn resolve_overrides(&mut self) {
        let overrides: Vec<SymbolId> = self
            .symbols()
            .filter(|(_, s)| s.modifiers.is_override && s.as_method().is_some())
            .map(|(id, _)| id)
            .collect();

        for method in overrides {
            let Some(owner) = self.containing_type(method) else {
                continue;
            };
            let name = self.symbol(method).name.clone();
            let params = self.parameter_types(method);
            let params: Vec<Option<TypeRef>> = params.into_iter().map(|t| t.cloned()).collect();

            let mut found = None;
            let mut seen = HashSet::new();
            let mut current = self.base_type(owner);
            while let Some(base) = current {
                if !seen.insert(base) {
                    break;
                }
                let members = self.symbol(base).as_type().map(|t| t.members.as_slice()).unwrap_or(&[]);
                found = members.iter().copied().find(|&m| {
                    self.symbol(m).as_method().is_some()
                        && self.symbol(m).name == name
                        && self
                            .parameter_types(m)
                            .into_iter()
                            .map(|t| t.cloned())
                            .eq(params.iter().cloned())
                });
                if found.is_some() {
                    break;
                }
                current = self.base_type(base);
            }

            if let SymbolKind::Method(m) = &mut self.symbol_mut(method).kind {
                m.overridden = found;
            }
        }
    }

    /// Resolve a type syntax node. Anything unknown becomes [`TypeRef::Unresolved`].
    pub(super) fn resolve_type(&self, node: NodeRef<'_>, scope: &Scope) -> TypeRef {
        match node.kind() {
            SyntaxKind::PredefinedType => TypeRef::Special(node.text().trim().to_string()),
            SyntaxKind::IdentifierName | SyntaxKind::Identifier => {
                let name = node.text().trim();
                self.resolve_simple(name, Vec::new(), scope)
                    .unwrap_or_else(|| TypeRef::Unresolved(name.to_string()))
            }
            SyntaxKind::GenericName => {
                let (name, args) = self.generic_parts(node, scope);
                self.resolve_simple(name, args, scope)
                    .unwrap_or_else(|| TypeRef::Unresolved(normalize_type_text(node.text())))
            }
            SyntaxKind::QualifiedName => self
                .resolve_qualified(node, scope)
                .unwrap_or_else(|| TypeRef::Unresolved(normalize_type_text(node.text()))),
            SyntaxKind::NullableType => match node.child_by_field("type").or_else(|| node.children().next()) {
                Some(inner) => TypeRef::Nullable(Box::new(self.resolve_type(inner, scope))),
                None => TypeRef::Unresolved(normalize_type_text(node.text())),
            },
            SyntaxKind::ArrayType => {
                let element = node.child_by_field("type").or_else(|| node.children().next());
                let rank = node
                    .child_by_field("rank")
                    .map(|r| normalize_type_text(r.text()))
                    .unwrap_or_else(|| "[]".to_string());
                match element {
                    Some(element) => TypeRef::Array {
                        element: Box::new(self.resolve_type(element, scope)),
                        rank,
                    },
                    None => TypeRef::Unresolved(normalize_type_text(node.text())),
                }
            }
            _ if node.grammar_kind() == "alias_qualified_name" => {
                let text = normalize_type_text(node.text());
                let path = text.trim_start_matches("global::");
                self.resolve_dotted(path).unwrap_or(TypeRef::Unresolved(text))
            }
            _ => TypeRef::Unresolved(normalize_type_text(node.text())),
        }
    }

    fn generic_parts<'n>(&self, node: NodeRef<'n>, scope: &Scope) -> (&'n str, Vec<TypeRef>) {
        let name = node
            .first_child_of_kind(SyntaxKind::Identifier)
            .map(|n| n.text().trim())
            .unwrap_or_default();
        let args = node
            .children()
            .find(|c| c.grammar_kind() == "type_argument_list")
            .map(|list| list.children().map(|a| self.resolve_type(a, scope)).collect())
            .unwrap_or_default();
        (name, args)
    }

    /// Simple name lookup: type parameters, nested types, enclosing namespaces, usings.
    pub(super) fn resolve_simple(&self, name: &str, args: Vec<TypeRef>, scope: &Scope) -> Option<TypeRef> {
        let arity = args.len();
        if arity == 0 {
            if scope.method_type_parameters.iter().any(|p| p == name) {
                return Some(TypeRef::TypeParameter(name.to_string()));
            }
            let mut t = scope.current_type;
            while let Some(id) = t {
                if let Some(named) = self.symbol(id).as_type() {
                    if named.type_parameters.iter().any(|p| p == name) {
                        return Some(TypeRef::TypeParameter(name.to_string()));
                    }
                }
                t = self.containing_type(id);
            }
        }

        let mut t = scope.current_type;
        while let Some(id) = t {
            if let Some(found) = self.find_nested_type(id, name, arity) {
                return Some(TypeRef::Named { symbol: found, args });
            }
            t = self.containing_type(id);
        }

        let mut ns = Some(scope.namespace);
        while let Some(id) = ns {
            if let Some(&found) = self.types.get(&(id, name.to_string(), arity)) {
                return Some(TypeRef::Named { symbol: found, args });
            }
            ns = self.symbol(id).container;
        }

        let usings = self.usings.get(scope.tree).map(Vec::as_slice).unwrap_or(&[]);
        for using in usings {
            if let Some(ns) = self.lookup_namespace(using) {
                if let Some(&found) = self.types.get(&(ns, name.to_string(), arity)) {
                    return Some(TypeRef::Named { symbol: found, args });
                }
            }
        }
        None
    }

    /// Nested type declared in `ty` or inherited from its base classes.
    pub(super) fn find_nested_type(&self, ty: SymbolId, name: &str, arity: usize) -> Option<SymbolId> {
        let mut seen = HashSet::new();
        let mut current = Some(ty);
        while let Some(id) = current {
            if !seen.insert(id) {
                break;
            }
            if let Some(&found) = self.types.get(&(id, name.to_string(), arity)) {
                return Some(found);
            }
            current = self.base_type(id);
        }
        None
    }

    fn resolve_qualified(&self, node: NodeRef<'_>, scope: &Scope) -> Option<TypeRef> {
        let mut children = node.children();
        let qualifier = node.child_by_field("qualifier").or_else(|| children.next())?;
        let name = node.child_by_field("name").or_else(|| node.children().last())?;
        let (simple, args) = match name.kind() {
            SyntaxKind::GenericName => self.generic_parts(name, scope),
            _ => (name.text().trim(), Vec::new()),
        };
        let container = self.resolve_container(qualifier, scope)?;
        let found = if self.symbol(container).is_namespace() {
            self.types.get(&(container, simple.to_string(), args.len())).copied()
        } else {
            self.find_nested_type(container, simple, args.len())
        }?;
        Some(TypeRef::Named { symbol: found, args })
    }

    /// Namespace or type named by the left side of a qualified name.
    pub(super) fn resolve_container(&self, node: NodeRef<'_>, scope: &Scope) -> Option<SymbolId> {
        match node.kind() {
            SyntaxKind::IdentifierName | SyntaxKind::Identifier => {
                let name = node.text().trim();
                if let Some(TypeRef::Named { symbol, .. }) = self.resolve_simple(name, Vec::new(), scope) {
                    return Some(symbol);
                }
                self.resolve_namespace_name(name, scope)
            }
            SyntaxKind::GenericName => self.resolve_type(node, scope).symbol(),
            SyntaxKind::QualifiedName => {
                let qualifier = node.child_by_field("qualifier").or_else(|| node.children().next())?;
                let name = node.child_by_field("name").or_else(|| node.children().last())?;
                let outer = self.resolve_container(qualifier, scope)?;
                let simple = name.text().trim();
                if self.symbol(outer).is_namespace() {
                    self.namespaces
                        .get(&(outer, simple.to_string()))
                        .or_else(|| self.types.get(&(outer, simple.to_string(), 0)))
                        .copied()
                } else {
                    self.find_nested_type(outer, simple, 0)
                }
            }
            _ if node.grammar_kind() == "alias_qualified_name" => {
                let text = normalize_type_text(node.text());
                self.lookup_namespace(text.trim_start_matches("global::"))
            }
            _ => None,
        }
    }

    /// A namespace visible by simple name: nested in an enclosing namespace, or top level.
    pub(super) fn resolve_namespace_name(&self, name: &str, scope: &Scope) -> Option<SymbolId> {
        let mut ns = Some(scope.namespace);
        while let Some(id) = ns {
            if let Some(&found) = self.namespaces.get(&(id, name.to_string())) {
                return Some(found);
            }
            ns = self.symbol(id).container;
        }
        None
    }

    /// Resolve a dotted path from the global namespace.
    fn resolve_dotted(&self, path: &str) -> Option<TypeRef> {
        let (ns_path, name) = match path.rsplit_once('.') {
            Some((ns, name)) => (Some(ns), name),
            None => (None, path),
        };
        let ns = match ns_path {
            Some(p) => self.lookup_namespace(p)?,
            None => self.global,
        };
        self.types
            .get(&(ns, name.to_string(), 0))
            .map(|&symbol| TypeRef::named(symbol))
    }
}

/// Type entries of a base list, skipping primary-constructor arguments.
pub(crate) fn base_list_entries<'t>(list: NodeRef<'t>) -> Vec<NodeRef<'t>> {
    list.children()
        .filter_map(|entry| match entry.kind() {
            SyntaxKind::ArgumentList => None,
            _ if entry.grammar_kind() == "primary_constructor_base_type" => entry
                .child_by_field("type")
                .or_else(|| entry.children().next()),
            _ => Some(entry),
        })
        .collect()
}

fn parameter_ref_kind(param: NodeRef<'_>) -> Option<String> {
    let type_start = param.child_by_field("type").map(|t| t.span().start);
    let name_start = param.child_by_field("name").map(|n| n.span().start);
    let end = type_start.or(name_start)?;
    let prefix = &param.tree().source()[param.span().start..end];
    ["ref", "out", "in", "params"]
        .iter()
        .find(|kw| prefix.split_whitespace().any(|w| w == **kw))
        .map(|kw| kw.to_string())
}

/// Collapse whitespace in a written type and space out generic argument commas.
pub(super) fn normalize_type_text(text: &str) -> String {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    compact.replace(',', ", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_type_text() {
        assert_eq!(normalize_type_text("Dictionary< string ,int >"), "Dictionary<string, int>");
        assert_eq!(normalize_type_text("List<int>"), "List<int>");
    }

    #[test]
    fn test_base_list_resolution() {
        let c = Compilation::from_sources(&[(
            "T.cs",
            "namespace Ns {
               interface IA { }
               interface IB : IA { }
               class Base { }
               class Derived : Base, IB { }
               class Orphan : Missing, IA { }
             }",
        )])
        .unwrap();
        let derived = c.find_type("Ns.Derived").unwrap();
        let base = c.find_type("Ns.Base").unwrap();
        assert_eq!(c.base_type(derived), Some(base));

        let all: Vec<String> = c.all_interfaces(derived).into_iter().map(|i| c.type_fqn(i)).collect();
        assert_eq!(all, vec!["Ns.IB", "Ns.IA"]);

        let orphan = c.find_type("Ns.Orphan").unwrap();
        assert_eq!(c.base_type(orphan), None);
        let named = c.symbol(orphan).as_type().unwrap();
        assert_eq!(named.base_type, Some(TypeRef::Unresolved("Missing".to_string())));
        assert_eq!(named.interfaces.len(), 1);
    }

    #[test]
    fn test_unresolved_first_entry_becomes_base() {
        let c = Compilation::from_sources(&[(
            "T.cs",
            "interface IKnown { }
             class Handler : IDisposable, IKnown { }
             struct Point : IEquatable<Point> { }",
        )])
        .unwrap();
        let handler = c.find_type("Handler").unwrap();
        let named = c.symbol(handler).as_type().unwrap();
        assert_eq!(named.base_type, Some(TypeRef::Unresolved("IDisposable".to_string())));
        let known = c.find_type("IKnown").unwrap();
        assert_eq!(named.interfaces, vec![TypeRef::named(known)]);

        // Structs never take a base class from their list.
        let point = c.find_type("Point").unwrap();
        let named = c.symbol(point).as_type().unwrap();
        assert_eq!(named.base_type, None);
        assert_eq!(named.interfaces.len(), 1);
    }

    #[test]
    fn test_usings_and_qualified_names() {
        let c = Compilation::from_sources(&[
            ("Lib.cs", "namespace Lib.Models { public class Widget { } }"),
            (
                "App.cs",
                "using Lib.Models;
                 namespace App {
                   class A { Widget w; Lib.Models.Widget q; System.String s; }
                 }",
            ),
        ])
        .unwrap();
        let a = c.find_type("App.A").unwrap();
        let fields: Vec<String> = c
            .symbol(a)
            .as_type()
            .unwrap()
            .members
            .iter()
            .map(|&m| c.display_type(c.symbol(m).value_type().unwrap()))
            .collect();
        assert_eq!(fields, vec!["Lib.Models.Widget", "Lib.Models.Widget", "System.String"]);
    }

    #[test]
    fn test_override_resolution() {
        let c = Compilation::from_sources(&[(
            "T.cs",
            "class A { public virtual void M(int x) { } public virtual void M() { } }
             class B : A { public override void M(int x) { } }",
        )])
        .unwrap();
        let overriding = c.find_method("B.M(int)").unwrap();
        let overridden = c.find_method("A.M(int)").unwrap();
        assert_eq!(
            c.symbol(overriding).as_method().unwrap().overridden,
            Some(overridden)
        );
    }
}
