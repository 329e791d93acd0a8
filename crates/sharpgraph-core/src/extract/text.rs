//! Declaration and snippet text for elements.

use crate::symbols::{base_list_entries, SymbolFacts, SymbolId};
use crate::syntax::{NodeRef, SyntaxKind};

fn type_keyword(node: NodeRef<'_>) -> &'static str {
    match node.kind() {
        SyntaxKind::ClassDeclaration => "class",
        SyntaxKind::StructDeclaration => "struct",
        SyntaxKind::InterfaceDeclaration => "interface",
        SyntaxKind::RecordDeclaration | SyntaxKind::RecordStructDeclaration => "record",
        SyntaxKind::EnumDeclaration => "enum",
        SyntaxKind::DelegateDeclaration => "delegate",
        _ => "",
    }
}

/// `"{modifiers} {keyword} {ShortName}{: Base1, Base2}"` for one type fragment.
///
/// Attributes, constraints and bodies are left out. With no modifiers the string keeps its
/// leading space.
pub fn type_declaration(facts: &dyn SymbolFacts, node: NodeRef<'_>, symbol: SymbolId) -> String {
    let modifiers = node.modifiers().join(" ");
    let bases = node
        .first_child_of_kind(SyntaxKind::BaseList)
        .map(|list| {
            let entries: Vec<&str> = base_list_entries(list)
                .iter()
                .map(|e| e.text().trim())
                .collect();
            format!(": {}", entries.join(", "))
        })
        .unwrap_or_default();
    format!(
        "{} {} {}{}",
        modifiers,
        type_keyword(node),
        facts.type_short_name(symbol),
        bases
    )
}

/// Method text with the block body removed. Arrow bodies stay part of the declaration.
pub fn method_declaration(node: NodeRef<'_>) -> String {
    let text = node.text();
    match block_body(node) {
        Some(body) => text.replacen(body.text(), "", 1),
        None => text.to_string(),
    }
}

/// Block body of a method, comments removed; empty without a block.
pub fn method_body_without_comments(node: NodeRef<'_>) -> String {
    block_body(node)
        .map(|body| body.text_without_comments())
        .unwrap_or_default()
}

fn block_body(node: NodeRef<'_>) -> Option<NodeRef<'_>> {
    node.body().filter(|b| b.kind() == SyntaxKind::Block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::Compilation;
    use crate::syntax::SyntaxTree;

    fn find<'t>(tree: &'t SyntaxTree, kind: SyntaxKind) -> NodeRef<'t> {
        tree.root().descendants().find(|n| n.kind() == kind).unwrap()
    }

    #[test]
    fn test_type_declaration_is_assembled() {
        let c = Compilation::from_sources(&[(
            "T.cs",
            "namespace Ns { [Serializable] public sealed class Repo<T> : Base, IRepo where T : class { } class Base { } interface IRepo { } struct S { } }",
        )])
        .unwrap();
        let tree = &c.trees()[0];
        let class = find(tree, SyntaxKind::ClassDeclaration);
        let symbol = c.declared_symbol(class.syntax_ref()).unwrap();
        assert_eq!(
            type_declaration(&c, class, symbol),
            "public sealed class Repo<T>: Base, IRepo"
        );

        let s = find(tree, SyntaxKind::StructDeclaration);
        let symbol = c.declared_symbol(s.syntax_ref()).unwrap();
        assert_eq!(type_declaration(&c, s, symbol), " struct S");
    }

    #[test]
    fn test_method_declaration_and_snippet() {
        let c = Compilation::from_sources(&[(
            "T.cs",
            "class A { public int Foo(int x) { // note\n return x; } int Bar() => 1; }",
        )])
        .unwrap();
        let tree = &c.trees()[0];
        let methods: Vec<_> = tree
            .root()
            .descendants()
            .filter(|n| n.kind() == SyntaxKind::MethodDeclaration)
            .collect();

        assert_eq!(method_declaration(methods[0]), "public int Foo(int x) ");
        let body = method_body_without_comments(methods[0]);
        assert!(body.contains("return x;"));
        assert!(!body.contains("note"));

        assert_eq!(method_declaration(methods[1]), "int Bar() => 1;");
        assert_eq!(method_body_without_comments(methods[1]), "");
    }
}
