//! Classifiers for type declarations: class, struct, interface, enum and delegate.

use super::{relations, text, ClassifyContext};
use crate::model::{CodeElement, EdgeKind, ElementDetails, Relationship};
use crate::symbols::{SymbolFacts, SymbolId, TypeKind};
use crate::syntax::{NodeRef, SyntaxKind};

/// Symbol declared by `node` if it is a type of `kind`.
fn declared_type(facts: &dyn SymbolFacts, node: NodeRef<'_>, kind: TypeKind) -> Option<SymbolId> {
    let symbol = facts.declared_symbol(node.syntax_ref())?;
    (facts.symbol(symbol).type_kind() == Some(kind)).then_some(symbol)
}

fn element(
    facts: &dyn SymbolFacts,
    symbol: SymbolId,
    name: String,
    declaration: String,
    file_locations: Vec<String>,
    details: ElementDetails,
) -> CodeElement {
    CodeElement {
        name,
        namespace: facts.namespace_display(symbol),
        fqn: facts.type_fqn(symbol),
        declaration,
        accessibility: facts.symbol(symbol).accessibility,
        file_locations,
        details,
        relationships: Vec::new(),
    }
}

pub fn classify_class(node: NodeRef<'_>, ctx: &ClassifyContext<'_>) -> Option<CodeElement> {
    if !matches!(
        node.kind(),
        SyntaxKind::ClassDeclaration | SyntaxKind::RecordDeclaration
    ) {
        return None;
    }
    let facts = ctx.facts;
    let symbol = declared_type(facts, node, TypeKind::Class)?;
    let sym = facts.symbol(symbol);

    // Every fragment of a partial class contributes its file and declaration.
    let fragments: Vec<NodeRef<'_>> = sym
        .declarations
        .iter()
        .filter_map(|d| facts.node(*d))
        .collect();
    let mut file_locations: Vec<String> = Vec::new();
    let mut declaration = String::new();
    for fragment in &fragments {
        let path = fragment.tree().path().to_string();
        if !file_locations.contains(&path) {
            file_locations.push(path);
        }
        let candidate = text::type_declaration(facts, *fragment, symbol);
        if candidate.len() > declaration.len() {
            declaration = candidate;
        }
    }

    let details = ElementDetails::Class {
        is_abstract: sym.modifiers.is_abstract,
        is_sealed: sym.modifiers.is_sealed,
        is_static: sym.modifiers.is_static,
    };
    let mut class = element(
        facts,
        symbol,
        facts.type_short_name(symbol),
        declaration,
        file_locations,
        details,
    );

    let key = class.fqn.clone();
    let mut edges = relations::class_hierarchy(facts, symbol, &key);
    edges.extend(relations::nesting(facts, symbol, &key));
    edges.extend(relations::instantiations(facts, fragments, &key));
    attach(&mut class, edges);
    Some(class)
}

pub fn classify_struct(node: NodeRef<'_>, ctx: &ClassifyContext<'_>) -> Option<CodeElement> {
    if !matches!(
        node.kind(),
        SyntaxKind::StructDeclaration | SyntaxKind::RecordStructDeclaration
    ) {
        return None;
    }
    let facts = ctx.facts;
    let symbol = declared_type(facts, node, TypeKind::Struct)?;
    let mut structure = element(
        facts,
        symbol,
        facts.symbol(symbol).name.clone(),
        text::type_declaration(facts, node, symbol),
        vec![node.tree().path().to_string()],
        ElementDetails::Struct,
    );
    let key = structure.fqn.clone();
    attach(&mut structure, relations::nesting(facts, symbol, &key));
    Some(structure)
}

pub fn classify_interface(node: NodeRef<'_>, ctx: &ClassifyContext<'_>) -> Option<CodeElement> {
    if node.kind() != SyntaxKind::InterfaceDeclaration {
        return None;
    }
    let facts = ctx.facts;
    let symbol = declared_type(facts, node, TypeKind::Interface)?;
    let mut iface = element(
        facts,
        symbol,
        facts.symbol(symbol).name.clone(),
        text::type_declaration(facts, node, symbol),
        vec![node.tree().path().to_string()],
        ElementDetails::Interface,
    );
    let key = iface.fqn.clone();
    attach(&mut iface, relations::interface_bases(facts, symbol, &key));
    Some(iface)
}

pub fn classify_enum(node: NodeRef<'_>, ctx: &ClassifyContext<'_>) -> Option<CodeElement> {
    if node.kind() != SyntaxKind::EnumDeclaration {
        return None;
    }
    let facts = ctx.facts;
    let symbol = declared_type(facts, node, TypeKind::Enum)?;
    let mut enumeration = element(
        facts,
        symbol,
        facts.symbol(symbol).name.clone(),
        node.text_without_comments(),
        vec![node.tree().path().to_string()],
        ElementDetails::Enum,
    );
    let key = enumeration.fqn.clone();
    attach(&mut enumeration, relations::nesting(facts, symbol, &key));
    Some(enumeration)
}

pub fn classify_delegate(node: NodeRef<'_>, ctx: &ClassifyContext<'_>) -> Option<CodeElement> {
    if node.kind() != SyntaxKind::DelegateDeclaration {
        return None;
    }
    let facts = ctx.facts;
    let symbol = declared_type(facts, node, TypeKind::Delegate)?;
    let mut delegate = element(
        facts,
        symbol,
        facts.symbol(symbol).name.clone(),
        node.text_without_comments(),
        vec![node.tree().path().to_string()],
        ElementDetails::Delegate,
    );
    let key = delegate.fqn.clone();
    let owner = relations::owned_by_container(facts, symbol, &key, EdgeKind::DeclaresDelegate);
    attach(&mut delegate, owner);
    Some(delegate)
}

pub(super) fn attach(element: &mut CodeElement, edges: impl IntoIterator<Item = Relationship>) {
    for edge in edges {
        element.add_relationship(edge);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ElementKind;
    use crate::symbols::Compilation;

    fn classify_all(c: &Compilation) -> Vec<CodeElement> {
        let ctx = ClassifyContext {
            facts: c,
            expand_declarators: false,
        };
        let mut out = Vec::new();
        for tree in c.trees() {
            for node in tree.root().descendants() {
                let found = classify_class(node, &ctx)
                    .or_else(|| classify_struct(node, &ctx))
                    .or_else(|| classify_interface(node, &ctx))
                    .or_else(|| classify_enum(node, &ctx))
                    .or_else(|| classify_delegate(node, &ctx));
                out.extend(found);
            }
        }
        out
    }

    #[test]
    fn test_partial_class_scans_all_fragments() {
        let c = Compilation::from_sources(&[
            ("src/A1.cs", "namespace N { public partial class A { } }"),
            ("src/A2.cs", "namespace N { partial class A : System.IDisposable { } }"),
        ])
        .unwrap();
        let elements = classify_all(&c);
        assert_eq!(elements.len(), 2);
        for e in &elements {
            assert_eq!(e.fqn, "N.A");
            assert_eq!(e.file_locations, vec!["src/A1.cs", "src/A2.cs"]);
            assert_eq!(e.declaration, " partial class A: System.IDisposable");
        }
    }

    #[test]
    fn test_type_names_and_nesting() {
        let c = Compilation::from_sources(&[(
            "T.cs",
            "namespace N { class Outer<T> { struct Inner { } enum Mode { On /* lit */ } delegate void Done(int code); } interface IA : IB { } interface IB { } }",
        )])
        .unwrap();
        let elements = classify_all(&c);
        let find = |fqn: &str| elements.iter().find(|e| e.fqn == fqn).unwrap();

        let outer = find("N.Outer<T>");
        assert_eq!(outer.name, "Outer<T>");
        assert_eq!(outer.kind(), ElementKind::Class);

        let inner = find("N.Outer<T>.Inner");
        assert_eq!(inner.name, "Inner");
        assert_eq!(inner.relationships[0].to_string(), "N.Outer<T>.Inner -NESTED_IN-> N.Outer<T>");

        let mode = find("N.Outer<T>.Mode");
        assert!(!mode.declaration.contains("lit"));

        let done = find("N.Outer<T>.Done");
        assert_eq!(done.relationships[0].to_string(), "N.Outer<T> -DECLARES_DELEGATE-> N.Outer<T>.Done");

        let ia = find("N.IA");
        assert_eq!(ia.relationships[0].to_string(), "N.IA -EXTENDS-> N.IB");
        assert_eq!(ia.declaration, " interface IA: IB");
    }
}
