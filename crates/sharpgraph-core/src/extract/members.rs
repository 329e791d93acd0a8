//! Field, property and event classifiers.
//!
//! A field or event-field statement yields an element for its first declarator only:
//! `int a, b;` produces `a`. With `expand_declarators` set, the statement itself is skipped
//! and every declarator is classified on its own.

use super::types::attach;
use super::{relations, ClassifyContext};
use crate::model::{CodeElement, EdgeKind, ElementDetails};
use crate::symbols::{SymbolFacts, SymbolId, SymbolKind};
use crate::syntax::{NodeRef, SyntaxKind};

/// Field or event-field statement owning a `variable_declarator`.
fn declarator_statement(node: NodeRef<'_>) -> Option<NodeRef<'_>> {
    if node.kind() != SyntaxKind::VariableDeclarator {
        return None;
    }
    let statement = node.parent()?.parent()?;
    matches!(
        statement.kind(),
        SyntaxKind::FieldDeclaration | SyntaxKind::EventFieldDeclaration
    )
    .then_some(statement)
}

/// Member symbol for a statement or, in expanded mode, one of its declarators.
fn declared_member<'t>(
    node: NodeRef<'t>,
    ctx: &ClassifyContext<'_>,
    statement_kind: SyntaxKind,
) -> Option<(SymbolId, NodeRef<'t>)> {
    let statement = if ctx.expand_declarators {
        declarator_statement(node).filter(|s| s.kind() == statement_kind)?
    } else if node.kind() == statement_kind {
        node
    } else {
        return None;
    };
    let symbol = ctx.facts.declared_symbol(node.syntax_ref())?;
    Some((symbol, statement))
}

fn member_element(
    facts: &dyn SymbolFacts,
    symbol: SymbolId,
    statement: NodeRef<'_>,
    details: ElementDetails,
    edge: EdgeKind,
) -> CodeElement {
    let mut element = CodeElement {
        name: facts.symbol(symbol).name.clone(),
        namespace: facts.namespace_display(symbol),
        fqn: facts.member_fqn(symbol),
        declaration: statement.text().to_string(),
        accessibility: facts.symbol(symbol).accessibility,
        file_locations: vec![statement.tree().path().to_string()],
        details,
        relationships: Vec::new(),
    };
    let key = element.fqn.clone();
    attach(&mut element, relations::owned_by_container(facts, symbol, &key, edge));
    element
}

fn value_type_display(facts: &dyn SymbolFacts, symbol: SymbolId) -> String {
    facts
        .symbol(symbol)
        .value_type()
        .map(|t| facts.display_type(t))
        .unwrap_or_default()
}

pub fn classify_event(node: NodeRef<'_>, ctx: &ClassifyContext<'_>) -> Option<CodeElement> {
    let facts = ctx.facts;
    let (symbol, statement) = if node.kind() == SyntaxKind::EventDeclaration {
        (facts.declared_symbol(node.syntax_ref())?, node)
    } else {
        declared_member(node, ctx, SyntaxKind::EventFieldDeclaration)?
    };
    if !matches!(facts.symbol(symbol).kind, SymbolKind::Event(_)) {
        return None;
    }
    let details = ElementDetails::Event {
        handler_type: value_type_display(facts, symbol),
    };
    Some(member_element(facts, symbol, statement, details, EdgeKind::HasEvent))
}

pub fn classify_field(node: NodeRef<'_>, ctx: &ClassifyContext<'_>) -> Option<CodeElement> {
    let facts = ctx.facts;
    let (symbol, statement) = declared_member(node, ctx, SyntaxKind::FieldDeclaration)?;
    if !matches!(facts.symbol(symbol).kind, SymbolKind::Field(_)) {
        return None;
    }
    let details = ElementDetails::Field {
        type_name: value_type_display(facts, symbol),
    };
    Some(member_element(facts, symbol, statement, details, EdgeKind::HasField))
}

pub fn classify_property(node: NodeRef<'_>, ctx: &ClassifyContext<'_>) -> Option<CodeElement> {
    if node.kind() != SyntaxKind::PropertyDeclaration {
        return None;
    }
    let facts = ctx.facts;
    let symbol = facts.declared_symbol(node.syntax_ref())?;
    if !matches!(facts.symbol(symbol).kind, SymbolKind::Property(_)) {
        return None;
    }
    let details = ElementDetails::Property {
        type_name: value_type_display(facts, symbol),
    };
    Some(member_element(facts, symbol, node, details, EdgeKind::HasProperty))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::Compilation;

    fn fields(c: &Compilation, expand: bool) -> Vec<CodeElement> {
        let ctx = ClassifyContext {
            facts: c,
            expand_declarators: expand,
        };
        c.trees()
            .iter()
            .flat_map(|t| t.root().descendants())
            .filter_map(|n| {
                classify_event(n, &ctx)
                    .or_else(|| classify_field(n, &ctx))
                    .or_else(|| classify_property(n, &ctx))
            })
            .collect()
    }

    const SOURCE: &str = "namespace N { class P { public int x, y; event System.EventHandler Changed, Closed; public string Name { get; set; } } }";

    #[test]
    fn test_first_declarator_only() {
        let c = Compilation::from_sources(&[("P.cs", SOURCE)]).unwrap();
        let elements = fields(&c, false);
        let keys: Vec<&str> = elements.iter().map(|e| e.fqn.as_str()).collect();
        assert_eq!(keys, vec!["N.P.x", "N.P.Changed", "N.P.Name"]);

        let x = &elements[0];
        assert_eq!(x.declaration, "public int x, y;");
        assert_eq!(x.details, ElementDetails::Field { type_name: "int".to_string() });
        assert_eq!(x.relationships[0].to_string(), "N.P -HAS_FIELD-> N.P.x");

        let changed = &elements[1];
        assert_eq!(
            changed.details,
            ElementDetails::Event {
                handler_type: "System.EventHandler".to_string()
            }
        );
        assert_eq!(elements[2].relationships[0].kind, EdgeKind::HasProperty);
    }

    #[test]
    fn test_expand_declarators() {
        let c = Compilation::from_sources(&[("P.cs", SOURCE)]).unwrap();
        let keys: Vec<String> = fields(&c, true).into_iter().map(|e| e.fqn).collect();
        assert_eq!(
            keys,
            vec!["N.P.x", "N.P.y", "N.P.Changed", "N.P.Closed", "N.P.Name"]
        );
    }
}
