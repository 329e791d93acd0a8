//! Binding pass: names, invocations and object creations inside method bodies.
//!
//! Binding is best effort. A name binds only when its receiver's type is declared in the
//! compilation; anything reached through an external or unknown type stays unbound.

use std::collections::{HashMap, HashSet};

use super::compilation::Compilation;
use super::types::Scope;
use super::{
    Accessibility, MethodKind, Modifiers, ParameterSymbol, Symbol, SymbolFacts, SymbolId,
    SymbolKind, TypeKind, TypeRef,
};
use crate::syntax::{NodeRef, SyntaxKind, SyntaxRef};

#[derive(Default)]
struct BindOutput {
    symbols: Vec<Symbol>,
    declared: HashMap<SyntaxRef, SymbolId>,
    bound: HashMap<SyntaxRef, SymbolId>,
    typed: HashMap<SyntaxRef, TypeRef>,
}

impl Compilation {
    pub(super) fn bind_bodies(&mut self) {
        let methods: Vec<SymbolId> = self
            .symbols()
            .filter(|(_, s)| s.as_method().is_some())
            .map(|(id, _)| id)
            .collect();

        let mut output = BindOutput::default();
        for method in methods {
            let Some(scope) = self.scope_for(method) else {
                continue;
            };
            let Some(node) = self
                .symbol(method)
                .declarations
                .first()
                .and_then(|d| self.node(*d))
            else {
                continue;
            };
            let mut binder = MethodBinder {
                comp: self,
                out: &mut output,
                method,
                scope,
                locals: HashMap::new(),
                names: HashMap::new(),
            };
            binder.bind(node);
        }

        self.symbols.extend(output.symbols);
        self.declared.extend(output.declared);
        self.bound.extend(output.bound);
        self.typed.extend(output.typed);
    }
}

/// What the left side of a member access denotes.
enum Receiver {
    Value(TypeRef),
    Type(SymbolId),
    Namespace(SymbolId),
}

struct MethodBinder<'a> {
    comp: &'a Compilation,
    out: &'a mut BindOutput,
    method: SymbolId,
    scope: Scope,
    locals: HashMap<String, SymbolId>,
    /// Memoized results for names and invocations, including failures.
    names: HashMap<SyntaxRef, Option<SymbolId>>,
}

impl<'a> MethodBinder<'a> {
    fn bind(&mut self, method: NodeRef<'a>) {
        for node in method.descendants() {
            match node.kind() {
                SyntaxKind::VariableDeclarator => self.declare_declarator(node),
                SyntaxKind::ForEachStatement => self.declare_foreach(node),
                SyntaxKind::CatchDeclaration | SyntaxKind::DeclarationExpression => {
                    self.declare_typed_name(node)
                }
                SyntaxKind::DeclarationPattern => self.declare_pattern(node),
                SyntaxKind::Parameter => {
                    // The method's own parameters were declared with its signature.
                    if !self.comp.declared.contains_key(&node.syntax_ref()) {
                        let ty = node
                            .child_by_field("type")
                            .filter(|t| !self.is_implicit(*t))
                            .map(|t| self.comp.resolve_type(t, &self.scope));
                        if let Some(name) = node.name() {
                            self.declare_local(name, node.syntax_ref(), ty);
                        }
                    }
                }
                SyntaxKind::ImplicitParameter => {
                    let name = node.name().unwrap_or_else(|| node.text());
                    self.declare_local(name.trim(), node.syntax_ref(), None);
                }
                SyntaxKind::Identifier
                    if node.field() == Some("parameters")
                        && node.parent().map(|p| p.kind()) == Some(SyntaxKind::LambdaExpression) =>
                {
                    self.declare_local(node.text(), node.syntax_ref(), None);
                }
                SyntaxKind::IdentifierName | SyntaxKind::GenericName => {
                    self.bind_name(node);
                }
                SyntaxKind::InvocationExpression => {
                    self.bind_invocation(node);
                }
                SyntaxKind::ObjectCreationExpression => {
                    self.bind_creation(node);
                }
                _ => {}
            }
        }
    }

    fn sym(&self, id: SymbolId) -> &Symbol {
        let base = self.comp.symbols.len();
        let index = id.0 as usize;
        if index < base {
            &self.comp.symbols[index]
        } else {
            &self.out.symbols[index - base]
        }
    }

    // ========================================================================
    // Locals
    // ========================================================================

    fn declare_local(&mut self, name: &str, decl: SyntaxRef, ty: Option<TypeRef>) {
        let id = SymbolId((self.comp.symbols.len() + self.out.symbols.len()) as u32);
        self.out.symbols.push(Symbol {
            name: name.to_string(),
            container: Some(self.method),
            accessibility: Accessibility::NotApplicable,
            modifiers: Modifiers::default(),
            declarations: vec![decl],
            kind: SymbolKind::Local(ty),
        });
        self.out.declared.insert(decl, id);
        self.locals.insert(name.to_string(), id);
    }

    fn is_implicit(&self, type_node: NodeRef<'_>) -> bool {
        match type_node.kind() {
            SyntaxKind::ImplicitType => true,
            SyntaxKind::IdentifierName => {
                type_node.text() == "var"
                    && self.comp.resolve_simple("var", Vec::new(), &self.scope).is_none()
            }
            _ => false,
        }
    }

    fn declare_declarator(&mut self, declarator: NodeRef<'a>) {
        let Some(name) = declarator.name() else {
            return;
        };
        let type_node = declarator.parent().and_then(|d| d.child_by_field("type"));
        let ty = match type_node {
            Some(t) if !self.is_implicit(t) => Some(self.comp.resolve_type(t, &self.scope)),
            _ => initializer(declarator).and_then(|e| self.expression_type(e)),
        };
        self.declare_local(name, declarator.syntax_ref(), ty);
    }

    fn declare_foreach(&mut self, statement: NodeRef<'a>) {
        let Some(name) = statement
            .child_by_field("left")
            .filter(|n| n.kind() == SyntaxKind::Identifier)
        else {
            return;
        };
        let ty = match statement.child_by_field("type") {
            Some(t) if !self.is_implicit(t) => Some(self.comp.resolve_type(t, &self.scope)),
            _ => statement
                .child_by_field("right")
                .and_then(|e| self.expression_type(e))
                .and_then(element_type),
        };
        self.declare_local(name.text(), statement.syntax_ref(), ty);
    }

    fn declare_typed_name(&mut self, node: NodeRef<'a>) {
        let Some(name) = node.child_by_field("name").map(|n| n.text()) else {
            return;
        };
        let ty = node
            .child_by_field("type")
            .filter(|t| !self.is_implicit(*t))
            .map(|t| self.comp.resolve_type(t, &self.scope));
        self.declare_local(name, node.syntax_ref(), ty);
    }

    fn declare_pattern(&mut self, pattern: NodeRef<'a>) {
        let Some(name) = pattern
            .child_by_field("designation")
            .filter(|d| d.grammar_kind() == "single_variable_designation")
            .and_then(|d| d.children().next())
        else {
            return;
        };
        let ty = pattern
            .child_by_field("type")
            .map(|t| self.comp.resolve_type(t, &self.scope));
        self.declare_local(name.text(), pattern.syntax_ref(), ty);
    }

    // ========================================================================
    // Names
    // ========================================================================

    fn bind_name(&mut self, node: NodeRef<'a>) -> Option<SymbolId> {
        let key = node.syntax_ref();
        if let Some(result) = self.names.get(&key) {
            return *result;
        }
        // Guard against re-entry while this name is being resolved.
        self.names.insert(key, None);
        let result = self.lookup_name(node);
        self.names.insert(key, result);
        if let Some(id) = result {
            self.out.bound.insert(key, id);
        }
        result
    }

    fn lookup_name(&mut self, node: NodeRef<'a>) -> Option<SymbolId> {
        let parent = node.parent()?;
        match parent.kind() {
            SyntaxKind::MemberAccessExpression if node.field() == Some("name") => {
                return self.bind_member_name(parent, node);
            }
            SyntaxKind::QualifiedName => return None,
            _ => {}
        }

        let (name, arity) = simple_name(node);
        if let Some(invocation) = invocation_of(node) {
            let candidates = self.methods_in_scope(name);
            return self.select_overload(&candidates, argument_count(invocation));
        }
        if node.kind() == SyntaxKind::GenericName || arity > 0 {
            return self.comp.resolve_type(node, &self.scope).symbol();
        }
        self.lookup_value(name)
    }

    /// Simple name in expression position: locals, parameters, members, types, namespaces.
    fn lookup_value(&self, name: &str) -> Option<SymbolId> {
        if let Some(&local) = self.locals.get(name) {
            return Some(local);
        }
        if let Some(method) = self.sym(self.method).as_method() {
            if let Some(&param) = method
                .parameters
                .iter()
                .find(|&&p| self.sym(p).name == name)
            {
                return Some(param);
            }
        }
        let mut t = self.scope.current_type;
        while let Some(id) = t {
            if let Some(&member) = self.members_named(id, name, false).first() {
                return Some(member);
            }
            t = self.comp.containing_type(id);
        }
        if let Some(ty) = self.comp.resolve_simple(name, Vec::new(), &self.scope) {
            return ty.symbol();
        }
        self.comp.resolve_namespace_name(name, &self.scope)
    }

    fn bind_member_name(&mut self, access: NodeRef<'a>, name_node: NodeRef<'a>) -> Option<SymbolId> {
        let receiver = access
            .child_by_field("expression")
            .or_else(|| access.children().next())?;
        let (name, arity) = simple_name(name_node);
        let invocation = invocation_of(access);

        match self.receiver(receiver)? {
            Receiver::Value(ty) => {
                let owner = ty.symbol()?;
                self.member_of(owner, name, arity, invocation)
            }
            Receiver::Type(owner) => self.member_of(owner, name, arity, invocation),
            Receiver::Namespace(ns) => {
                if invocation.is_some() {
                    return None;
                }
                self.comp
                    .namespaces
                    .get(&(ns, name.to_string()))
                    .or_else(|| self.comp.types.get(&(ns, name.to_string(), arity)))
                    .copied()
            }
        }
    }

    fn member_of(
        &self,
        owner: SymbolId,
        name: &str,
        arity: usize,
        invocation: Option<NodeRef<'_>>,
    ) -> Option<SymbolId> {
        match invocation {
            Some(invocation) => {
                let candidates = self.members_named(owner, name, true);
                self.select_overload(&candidates, argument_count(invocation))
            }
            None => self
                .members_named(owner, name, false)
                .first()
                .copied()
                .or_else(|| self.comp.find_nested_type(owner, name, arity)),
        }
    }

    fn receiver(&mut self, expr: NodeRef<'a>) -> Option<Receiver> {
        match expr.kind() {
            SyntaxKind::ThisExpression => self.scope.current_type.map(|t| Receiver::Value(TypeRef::named(t))),
            SyntaxKind::BaseExpression => {
                let current = self.scope.current_type?;
                self.comp.base_type(current).map(|b| Receiver::Value(TypeRef::named(b)))
            }
            SyntaxKind::IdentifierName | SyntaxKind::GenericName => {
                let id = self.bind_name(expr)?;
                self.receiver_of(id)
            }
            SyntaxKind::MemberAccessExpression => {
                let name = expr
                    .child_by_field("name")
                    .or_else(|| expr.children().last())?;
                let id = self.bind_name(name)?;
                self.receiver_of(id)
            }
            SyntaxKind::PredefinedType => None,
            _ => self.expression_type(expr).map(Receiver::Value),
        }
    }

    fn receiver_of(&self, id: SymbolId) -> Option<Receiver> {
        let symbol = self.sym(id);
        match &symbol.kind {
            SymbolKind::Type(_) => Some(Receiver::Type(id)),
            SymbolKind::Namespace => Some(Receiver::Namespace(id)),
            SymbolKind::Method(_) => None,
            _ => symbol.value_type().cloned().map(Receiver::Value),
        }
    }

    /// Members named `name` on `owner` or the nearest base type declaring one.
    fn members_named(&self, owner: SymbolId, name: &str, methods: bool) -> Vec<SymbolId> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(owner);
        while let Some(id) = current {
            if !seen.insert(id) {
                break;
            }
            chain.push(id);
            current = self.comp.base_type(id);
        }
        if self.comp.symbol(owner).type_kind() == Some(TypeKind::Interface) {
            chain.extend(self.comp.all_interfaces(owner));
        }

        for ty in chain {
            let Some(named) = self.comp.symbol(ty).as_type() else {
                continue;
            };
            let found: Vec<SymbolId> = named
                .members
                .iter()
                .copied()
                .filter(|&m| {
                    let member = self.comp.symbol(m);
                    member.name == name
                        && if methods {
                            member.as_method().is_some()
                        } else {
                            matches!(
                                member.kind,
                                SymbolKind::Field(_) | SymbolKind::Property(_) | SymbolKind::Event(_)
                            )
                        }
                })
                .collect();
            if !found.is_empty() {
                return found;
            }
        }
        Vec::new()
    }

    /// Methods named `name` visible from the current type or its enclosing types.
    fn methods_in_scope(&self, name: &str) -> Vec<SymbolId> {
        let mut t = self.scope.current_type;
        while let Some(id) = t {
            let found = self.members_named(id, name, true);
            if !found.is_empty() {
                return found;
            }
            t = self.comp.containing_type(id);
        }
        Vec::new()
    }

    /// Pick the overload whose arity fits the call.
    fn select_overload(&self, candidates: &[SymbolId], args: usize) -> Option<SymbolId> {
        let params = |m: SymbolId| self.parameters_of(m);

        if let Some(&exact) = candidates.iter().find(|&&m| params(m).len() == args) {
            return Some(exact);
        }
        if let Some(&variadic) = candidates.iter().find(|&&m| {
            let p = params(m);
            p.last().and_then(|l| l.ref_kind.as_deref()) == Some("params") && args + 1 >= p.len()
        }) {
            return Some(variadic);
        }
        candidates
            .iter()
            .find(|&&m| {
                let p = params(m);
                let required = p.iter().filter(|p| !p.has_default).count();
                required <= args && args <= p.len()
            })
            .copied()
    }

    fn parameters_of(&self, method: SymbolId) -> Vec<&ParameterSymbol> {
        let Some(method) = self.sym(method).as_method() else {
            return Vec::new();
        };
        method
            .parameters
            .iter()
            .filter_map(|&p| match &self.sym(p).kind {
                SymbolKind::Parameter(param) => Some(param),
                _ => None,
            })
            .collect()
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn bind_invocation(&mut self, invocation: NodeRef<'a>) -> Option<SymbolId> {
        let key = invocation.syntax_ref();
        if let Some(result) = self.names.get(&key) {
            return *result;
        }
        self.names.insert(key, None);

        let function = invocation
            .child_by_field("function")
            .or_else(|| invocation.children().next());
        let target = match function {
            Some(f) if matches!(f.kind(), SyntaxKind::IdentifierName | SyntaxKind::GenericName) => {
                self.bind_name(f)
            }
            Some(f) if f.kind() == SyntaxKind::MemberAccessExpression => f
                .child_by_field("name")
                .or_else(|| f.children().last())
                .and_then(|n| self.bind_name(n)),
            _ => None,
        };
        let result = target.filter(|&id| self.sym(id).as_method().is_some());

        self.names.insert(key, result);
        if let Some(id) = result {
            self.out.bound.insert(key, id);
        }
        result
    }

    fn bind_creation(&mut self, creation: NodeRef<'a>) -> Option<TypeRef> {
        let key = creation.syntax_ref();
        if let Some(ty) = self.out.typed.get(&key) {
            return Some(ty.clone());
        }
        let type_node = creation.child_by_field("type")?;
        let ty = self.comp.resolve_type(type_node, &self.scope);
        self.out.typed.insert(key, ty.clone());

        if let Some(owner) = ty.symbol() {
            let constructors: Vec<SymbolId> = self
                .comp
                .symbol(owner)
                .as_type()
                .map(|t| {
                    t.members
                        .iter()
                        .copied()
                        .filter(|&m| {
                            self.comp.symbol(m).as_method().map(|m| m.method_kind)
                                == Some(MethodKind::Constructor)
                        })
                        .collect()
                })
                .unwrap_or_default();
            if let Some(ctor) = self.select_overload(&constructors, argument_count(creation)) {
                self.out.bound.insert(key, ctor);
            }
        }
        Some(ty)
    }

    fn expression_type(&mut self, expr: NodeRef<'a>) -> Option<TypeRef> {
        match expr.kind() {
            SyntaxKind::ObjectCreationExpression => self.bind_creation(expr),
            SyntaxKind::InvocationExpression => {
                let method = self.bind_invocation(expr)?;
                self.sym(method).as_method()?.return_type.clone()
            }
            SyntaxKind::CastExpression => expr
                .child_by_field("type")
                .map(|t| self.comp.resolve_type(t, &self.scope)),
            SyntaxKind::IdentifierName
            | SyntaxKind::GenericName
            | SyntaxKind::MemberAccessExpression
            | SyntaxKind::ThisExpression
            | SyntaxKind::BaseExpression => match self.receiver(expr)? {
                Receiver::Value(ty) => Some(ty),
                _ => None,
            },
            _ => match expr.grammar_kind() {
                "parenthesized_expression" => {
                    let inner = expr.children().next()?;
                    self.expression_type(inner)
                }
                "array_creation_expression" => expr
                    .child_by_field("type")
                    .map(|t| self.comp.resolve_type(t, &self.scope)),
                _ => literal_type(expr).map(|name| TypeRef::Special(name.to_string())),
            },
        }
    }
}

fn simple_name<'t>(node: NodeRef<'t>) -> (&'t str, usize) {
    if node.kind() == SyntaxKind::GenericName {
        let name = node
            .first_child_of_kind(SyntaxKind::Identifier)
            .map(|n| n.text())
            .unwrap_or_default();
        let arity = node
            .children()
            .find(|c| c.grammar_kind() == "type_argument_list")
            .map(|l| l.children().count())
            .unwrap_or(0);
        (name, arity)
    } else {
        (node.text().trim(), 0)
    }
}

/// The invocation whose callee is `node`.
fn invocation_of(node: NodeRef<'_>) -> Option<NodeRef<'_>> {
    let parent = node.parent()?;
    if parent.kind() != SyntaxKind::InvocationExpression {
        return None;
    }
    let is_function = match node.field() {
        Some(field) => field == "function",
        None => parent.children().next().map(|c| c.id()) == Some(node.id()),
    };
    is_function.then_some(parent)
}

fn argument_count(node: NodeRef<'_>) -> usize {
    node.child_by_field("arguments")
        .or_else(|| node.first_child_of_kind(SyntaxKind::ArgumentList))
        .map(|list| list.children_of_kind(SyntaxKind::Argument).count())
        .unwrap_or(0)
}

/// Initializer expression of a variable declarator.
fn initializer(declarator: NodeRef<'_>) -> Option<NodeRef<'_>> {
    let last = declarator
        .children()
        .filter(|c| {
            c.field() != Some("name")
                && c.kind() != SyntaxKind::Identifier
                && c.grammar_kind() != "bracketed_argument_list"
        })
        .last()?;
    if last.grammar_kind() == "equals_value_clause" {
        last.children().next()
    } else {
        Some(last)
    }
}

fn element_type(collection: TypeRef) -> Option<TypeRef> {
    match collection {
        TypeRef::Array { element, .. } => Some(*element),
        TypeRef::Named { mut args, .. } if args.len() == 1 => args.pop(),
        TypeRef::Special(name) if name == "string" => Some(TypeRef::Special("char".to_string())),
        _ => None,
    }
}

fn literal_type(expr: NodeRef<'_>) -> Option<&'static str> {
    let text = expr.text().to_ascii_lowercase();
    match expr.grammar_kind() {
        "string_literal"
        | "verbatim_string_literal"
        | "raw_string_literal"
        | "interpolated_string_expression" => Some("string"),
        "boolean_literal" => Some("bool"),
        "character_literal" => Some("char"),
        "integer_literal" => Some(if text.ends_with("ul") || text.ends_with("lu") {
            "ulong"
        } else if text.ends_with('l') {
            "long"
        } else if text.ends_with('u') {
            "uint"
        } else {
            "int"
        }),
        "real_literal" => Some(if text.ends_with('f') {
            "float"
        } else if text.ends_with('m') {
            "decimal"
        } else {
            "double"
        }),
        _ => None,
    }
}
