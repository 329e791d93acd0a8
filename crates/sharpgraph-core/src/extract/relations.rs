//! Relationship inference.
//!
//! Each rule returns the edges an element discovers about itself. Direction follows the
//! edge kind, so an element may sit on either end of the edges it owns:
//!
//! | Element | Edge | Direction |
//! |---|---|---|
//! | Class | INHERITS, IMPLEMENTS, INSTANTIATES | element -> target |
//! | Class, Struct, Enum | NESTED_IN | element -> containing class or struct |
//! | Interface | EXTENDS | element -> base interface |
//! | Delegate | DECLARES_DELEGATE | containing type -> element |
//! | Field, Property, Event | HAS_FIELD, HAS_PROPERTY, HAS_EVENT | containing type -> element |
//! | Method | HAS_METHOD, HAS_ABSTRACT_METHOD | containing type -> element |
//! | Method | OVERRIDES, IMPLEMENTS, INVOKES, ACCESS | element -> target |

use std::collections::{HashMap, HashSet};

use crate::model::{EdgeKind, ElementKind, Endpoint, Relationship};
use crate::symbols::{SymbolFacts, SymbolId, TypeKind, TypeRef};
use crate::syntax::{NodeRef, SyntaxKind};

const CLASS: &[ElementKind] = &[ElementKind::Class];
const INTERFACE: &[ElementKind] = &[ElementKind::Interface];
const METHOD: &[ElementKind] = &[ElementKind::Method];
const FIELD_OR_PROPERTY: &[ElementKind] = &[ElementKind::Field, ElementKind::Property];

// ============================================================================
// Types
// ============================================================================

/// INHERITS and IMPLEMENTS for a class.
pub fn class_hierarchy(facts: &dyn SymbolFacts, class: SymbolId, key: &str) -> Vec<Relationship> {
    let mut edges = Vec::new();
    let Some(named) = facts.symbol(class).as_type() else {
        return edges;
    };

    let base = named
        .base_type
        .as_ref()
        .and_then(TypeRef::symbol)
        .filter(|&b| facts.symbol(b).type_kind() == Some(TypeKind::Class));
    if let Some(base) = base {
        edges.push(Relationship::new(
            EdgeKind::Inherits,
            Endpoint::labeled(key, CLASS),
            Endpoint::labeled(facts.type_fqn(base), CLASS),
        ));
    }

    for iface in named.interfaces.iter().filter_map(TypeRef::symbol) {
        edges.push(Relationship::new(
            EdgeKind::Implements,
            Endpoint::labeled(key, CLASS),
            Endpoint::labeled(facts.type_fqn(iface), INTERFACE),
        ));
    }
    edges
}

/// EXTENDS for each base interface of an interface.
pub fn interface_bases(facts: &dyn SymbolFacts, iface: SymbolId, key: &str) -> Vec<Relationship> {
    let Some(named) = facts.symbol(iface).as_type() else {
        return Vec::new();
    };
    named
        .interfaces
        .iter()
        .filter_map(TypeRef::symbol)
        .map(|base| {
            Relationship::new(
                EdgeKind::Extends,
                Endpoint::labeled(key, INTERFACE),
                Endpoint::labeled(facts.type_fqn(base), INTERFACE),
            )
        })
        .collect()
}

/// NESTED_IN when the type is declared inside a class or struct.
pub fn nesting(facts: &dyn SymbolFacts, ty: SymbolId, key: &str) -> Option<Relationship> {
    let container = facts.containing_type(ty)?;
    match facts.symbol(container).type_kind() {
        Some(TypeKind::Class) | Some(TypeKind::Struct) => Some(Relationship::new(
            EdgeKind::NestedIn,
            Endpoint::any(key),
            Endpoint::any(facts.type_fqn(container)),
        )),
        _ => None,
    }
}

/// INSTANTIATES for every generic type created in `fragments`, skipping nested types.
pub fn instantiations<'t>(
    facts: &dyn SymbolFacts,
    fragments: impl IntoIterator<Item = NodeRef<'t>>,
    key: &str,
) -> Vec<Relationship> {
    let mut edges: Vec<Relationship> = Vec::new();
    for fragment in fragments {
        let nested: Vec<NodeRef<'t>> = fragment
            .descendants()
            .filter(|n| n.kind().is_type_declaration())
            .collect();
        for creation in fragment
            .descendants()
            .filter(|n| n.kind() == SyntaxKind::ObjectCreationExpression)
            .filter(|n| !nested.iter().any(|t| t.contains(*n)))
        {
            let Some(generic) = facts.type_info(creation.syntax_ref()).and_then(TypeRef::symbol) else {
                continue;
            };
            let is_generic = facts
                .symbol(generic)
                .as_type()
                .is_some_and(|t| !t.type_parameters.is_empty());
            if !is_generic {
                continue;
            }
            let edge = Relationship::new(
                EdgeKind::Instantiates,
                Endpoint::any(key),
                Endpoint::any(facts.type_fqn(generic)),
            );
            if !edges.contains(&edge) {
                edges.push(edge);
            }
        }
    }
    edges
}

// ============================================================================
// Containment
// ============================================================================

/// Owner-to-member edge of `kind` from the member's containing type.
pub fn owned_by_container(
    facts: &dyn SymbolFacts,
    member: SymbolId,
    key: &str,
    kind: EdgeKind,
) -> Option<Relationship> {
    let owner = facts.containing_type(member)?;
    Some(Relationship::new(
        kind,
        Endpoint::any(facts.type_fqn(owner)),
        Endpoint::any(key),
    ))
}

// ============================================================================
// Methods
// ============================================================================

/// HAS_METHOD, or HAS_ABSTRACT_METHOD for abstract methods.
pub fn method_owner(facts: &dyn SymbolFacts, method: SymbolId, key: &str) -> Option<Relationship> {
    let kind = if facts.symbol(method).modifiers.is_abstract {
        EdgeKind::HasAbstractMethod
    } else {
        EdgeKind::HasMethod
    };
    owned_by_container(facts, method, key, kind)
}

pub fn overrides(facts: &dyn SymbolFacts, method: SymbolId, key: &str) -> Option<Relationship> {
    let overridden = facts.symbol(method).as_method()?.overridden?;
    Some(method_to_method(EdgeKind::Overrides, key, facts.method_fqn(overridden)))
}

/// IMPLEMENTS to the first interface method with the same name and parameter types.
///
/// Interfaces are searched in [`SymbolFacts::all_interfaces`] order, members in
/// declaration order. The search stops at the first match. Interface parameter types
/// are compared after substituting the type arguments the interface is implemented
/// with, so `Compare(Foo, Foo)` implements `IComparer<T>.Compare(T, T)` through
/// `IComparer<Foo>`. An explicit implementation (`I2.Foo`) only matches members of the
/// interface it names.
pub fn implements(facts: &dyn SymbolFacts, method: SymbolId, key: &str) -> Option<Relationship> {
    let owner = facts.containing_type(method)?;
    let (explicit, name) = match facts.symbol(method).name.rsplit_once('.') {
        Some((interface, name)) if !interface.is_empty() => {
            (Some(interface_simple_name(interface)), name)
        }
        _ => (None, facts.symbol(method).name.as_str()),
    };
    let params: Vec<Option<TypeRef>> = facts
        .parameter_types(method)
        .into_iter()
        .map(|t| t.cloned())
        .collect();
    let bindings = interface_bindings(facts, owner);
    let unbound = Substitution::new();

    facts
        .all_interfaces(owner)
        .into_iter()
        .filter(|&iface| explicit.map_or(true, |e| facts.symbol(iface).name == e))
        .filter_map(|iface| {
            let named = facts.symbol(iface).as_type()?;
            let subst = bindings.get(&iface).unwrap_or(&unbound);
            Some(named.members.iter().map(move |&m| (m, subst)))
        })
        .flatten()
        .find(|&(candidate, subst)| {
            let symbol = facts.symbol(candidate);
            symbol.as_method().is_some()
                && symbol.name == name
                && facts
                    .parameter_types(candidate)
                    .into_iter()
                    .map(|t| t.map(|t| substitute(t, subst)))
                    .eq(params.iter().cloned())
        })
        .map(|(target, _)| method_to_method(EdgeKind::Implements, key, facts.method_fqn(target)))
}

type Substitution = HashMap<String, TypeRef>;

/// `IComparer` from a written specifier such as `System.Collections.Generic.IComparer<Foo>`.
fn interface_simple_name(written: &str) -> &str {
    let open = written.find('<').unwrap_or(written.len());
    let unqualified = &written[..open];
    unqualified.rsplit(['.', ':']).next().unwrap_or(unqualified)
}

/// Type-parameter bindings of every interface reachable from `owner`.
///
/// Walks the base class chain and each interface's own bases, carrying the arguments
/// down so `class C : Base<Foo>` with `class Base<T> : IComparer<T>` binds `T` to `Foo`.
/// The first binding found for an interface wins.
fn interface_bindings(facts: &dyn SymbolFacts, owner: SymbolId) -> HashMap<SymbolId, Substitution> {
    let mut bindings = HashMap::new();
    let mut seen = HashSet::new();
    let mut current = Some((owner, Substitution::new()));
    while let Some((ty, subst)) = current.take() {
        if !seen.insert(ty) {
            break;
        }
        let Some(named) = facts.symbol(ty).as_type() else {
            break;
        };
        for iface in &named.interfaces {
            bind_interface(facts, iface, &subst, &mut bindings);
        }
        current = named.base_type.as_ref().and_then(|base| construct(facts, base, &subst));
    }
    bindings
}

fn bind_interface(
    facts: &dyn SymbolFacts,
    iface: &TypeRef,
    outer: &Substitution,
    bindings: &mut HashMap<SymbolId, Substitution>,
) {
    let Some((id, subst)) = construct(facts, iface, outer) else {
        return;
    };
    if bindings.contains_key(&id) {
        return;
    }
    bindings.insert(id, subst.clone());
    if let Some(named) = facts.symbol(id).as_type() {
        for base in &named.interfaces {
            bind_interface(facts, base, &subst, bindings);
        }
    }
}

/// The declared type behind `ty` with its type parameters mapped to `ty`'s arguments.
fn construct(facts: &dyn SymbolFacts, ty: &TypeRef, outer: &Substitution) -> Option<(SymbolId, Substitution)> {
    let TypeRef::Named { symbol, args } = ty else {
        return None;
    };
    let params = facts.symbol(*symbol).as_type()?.type_parameters.iter().cloned();
    let subst = params.zip(args.iter().map(|a| substitute(a, outer))).collect();
    Some((*symbol, subst))
}

fn substitute(ty: &TypeRef, subst: &Substitution) -> TypeRef {
    match ty {
        TypeRef::TypeParameter(name) => subst.get(name).cloned().unwrap_or_else(|| ty.clone()),
        TypeRef::Named { symbol, args } => TypeRef::Named {
            symbol: *symbol,
            args: args.iter().map(|a| substitute(a, subst)).collect(),
        },
        TypeRef::Array { element, rank } => TypeRef::Array {
            element: Box::new(substitute(element, subst)),
            rank: rank.clone(),
        },
        TypeRef::Nullable(inner) => TypeRef::Nullable(Box::new(substitute(inner, subst))),
        TypeRef::Special(_) | TypeRef::Unresolved(_) => ty.clone(),
    }
}

/// INVOKES for each distinct bound call site and ACCESS for each distinct field or
/// property referenced in the method body.
pub fn body_references(facts: &dyn SymbolFacts, node: NodeRef<'_>, key: &str) -> Vec<Relationship> {
    let mut edges: Vec<Relationship> = Vec::new();
    let mut push = |edge: Relationship| {
        if !edges.contains(&edge) {
            edges.push(edge);
        }
    };

    for n in node.descendants() {
        let Some(target) = facts.symbol_info(n.syntax_ref()) else {
            continue;
        };
        let symbol = facts.symbol(target);
        match n.kind() {
            SyntaxKind::InvocationExpression if symbol.as_method().is_some() => {
                push(method_to_method(EdgeKind::Invokes, key, facts.method_fqn(target)));
            }
            SyntaxKind::IdentifierName if symbol.is_field_or_property() => {
                push(Relationship::new(
                    EdgeKind::Access,
                    Endpoint::labeled(key, METHOD),
                    Endpoint::labeled(facts.member_fqn(target), FIELD_OR_PROPERTY),
                ));
            }
            _ => {}
        }
    }
    edges
}

fn method_to_method(kind: EdgeKind, from: &str, to: String) -> Relationship {
    Relationship::new(kind, Endpoint::labeled(from, METHOD), Endpoint::labeled(to, METHOD))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::Compilation;

    fn method(c: &Compilation, fqn: &str) -> SymbolId {
        c.find_method(fqn).unwrap()
    }

    #[test]
    fn test_class_hierarchy_labels() {
        let c = Compilation::from_sources(&[(
            "T.cs",
            "namespace N { class A { } interface I { } class B : A, I { } }",
        )])
        .unwrap();
        let b = c.find_type("N.B").unwrap();
        let edges = class_hierarchy(&c, b, "N.B");
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].to_string(), "N.B -INHERITS-> N.A");
        assert_eq!(edges[0].to.labels, vec![ElementKind::Class]);
        assert_eq!(edges[1].to_string(), "N.B -IMPLEMENTS-> N.I");
        assert_eq!(edges[1].to.labels, vec![ElementKind::Interface]);
    }

    #[test]
    fn test_implements_stops_at_first_match() {
        let c = Compilation::from_sources(&[(
            "T.cs",
            "namespace N { interface I1 { void Foo(); } interface I2 { void Foo(); } class C : I1, I2 { public void Foo() { } } }",
        )])
        .unwrap();
        let foo = method(&c, "N.C.Foo()");
        let edge = implements(&c, foo, "N.C.Foo()").unwrap();
        assert_eq!(edge.to.key, "N.I1.Foo()");
    }

    #[test]
    fn test_implements_compares_parameter_types() {
        let c = Compilation::from_sources(&[(
            "T.cs",
            "interface I { void Foo(int x); } class C : I { public void Foo(string x) { } }",
        )])
        .unwrap();
        let foo = method(&c, "C.Foo(string)");
        assert!(implements(&c, foo, "C.Foo(string)").is_none());
    }

    #[test]
    fn test_explicit_implementation_targets_named_interface() {
        let c = Compilation::from_sources(&[(
            "T.cs",
            "namespace N {
               interface I1 { void Foo(); }
               interface I2 { void Foo(); }
               class C : I1, I2 { public void Foo() { } void I2.Foo() { } }
             }",
        )])
        .unwrap();
        let implicit = method(&c, "N.C.Foo()");
        assert_eq!(implements(&c, implicit, "N.C.Foo()").unwrap().to.key, "N.I1.Foo()");
        let explicit = method(&c, "N.C.I2.Foo()");
        assert_eq!(implements(&c, explicit, "N.C.I2.Foo()").unwrap().to.key, "N.I2.Foo()");
    }

    #[test]
    fn test_implements_substitutes_interface_type_arguments() {
        let c = Compilation::from_sources(&[(
            "T.cs",
            "interface IComparer<T> { int Compare(T a, T b); }
             interface ISink<T> : IComparer<T> { void Put(T[] items); }
             class Foo { }
             class Bar { }
             class C : IComparer<Foo> { public int Compare(Foo a, Foo b) { return 0; } }
             class D : IComparer<Foo> { public int Compare(Bar a, Bar b) { return 0; } }
             class Base<U> : ISink<U> { }
             class E : Base<Bar> {
               public void Put(Bar[] items) { }
               public int Compare(Bar a, Bar b) { return 0; }
             }",
        )])
        .unwrap();
        let compare = method(&c, "C.Compare(Foo, Foo)");
        let edge = implements(&c, compare, "C.Compare(Foo, Foo)").unwrap();
        assert_eq!(edge.to.key, "IComparer<T>.Compare(T, T)");

        let mismatched = method(&c, "D.Compare(Bar, Bar)");
        assert!(implements(&c, mismatched, "D.Compare(Bar, Bar)").is_none());

        let put = method(&c, "E.Put(Bar[])");
        assert_eq!(implements(&c, put, "E.Put(Bar[])").unwrap().to.key, "ISink<T>.Put(T[])");
        let inherited = method(&c, "E.Compare(Bar, Bar)");
        assert_eq!(
            implements(&c, inherited, "E.Compare(Bar, Bar)").unwrap().to.key,
            "IComparer<T>.Compare(T, T)"
        );
    }

    #[test]
    fn test_interface_simple_name() {
        assert_eq!(interface_simple_name("I2"), "I2");
        assert_eq!(interface_simple_name("System.IDisposable"), "IDisposable");
        assert_eq!(interface_simple_name("global::N.IComparer<N.Foo>"), "IComparer");
    }

    #[test]
    fn test_body_references_dedup() {
        let c = Compilation::from_sources(&[(
            "T.cs",
            "class A { int count; int Size { get; set; } void Run() { count++; count++; Size = count; Helper(); Helper(); } void Helper() { } }",
        )])
        .unwrap();
        let run = method(&c, "A.Run()");
        let node = c.node(c.symbol(run).declarations[0]).unwrap();
        let edges = body_references(&c, node, "A.Run()");
        let rendered: Vec<String> = edges.iter().map(|e| e.to_string()).collect();
        assert_eq!(
            rendered,
            vec![
                "A.Run() -ACCESS-> A.count",
                "A.Run() -ACCESS-> A.Size",
                "A.Run() -INVOKES-> A.Helper()",
            ]
        );
    }

    #[test]
    fn test_instantiations_of_generic_types() {
        let c = Compilation::from_sources(&[(
            "T.cs",
            "class Box<T> { } class Plain { } class User { void M() { var a = new Box<int>(); var b = new Plain(); } class Inner { void N() { var c = new Box<string>(); } } }",
        )])
        .unwrap();
        let user = c.find_type("User").unwrap();
        let fragments = c.symbol(user).declarations.iter().filter_map(|d| c.node(*d));
        let edges = instantiations(&c, fragments, "User");
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].to_string(), "User -INSTANTIATES-> Box<T>");
    }
}
