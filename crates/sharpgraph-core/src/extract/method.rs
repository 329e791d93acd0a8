//! Method classifier and the dependency contexts captured from method bodies.

use std::collections::HashSet;

use super::types::attach;
use super::{relations, text, ClassifyContext};
use crate::model::{CodeElement, ElementDetails, InvokedMethodContext, MethodDetails, VariableContext};
use crate::symbols::{MethodKind, SymbolFacts};
use crate::syntax::{NodeRef, SyntaxKind};

/// Methods, constructors and destructors.
pub fn classify_method(node: NodeRef<'_>, ctx: &ClassifyContext<'_>) -> Option<CodeElement> {
    if !node.kind().is_base_method() {
        return None;
    }
    let facts = ctx.facts;
    let symbol_id = facts.declared_symbol(node.syntax_ref())?;
    let symbol = facts.symbol(symbol_id);
    let method = symbol.as_method()?;

    let is_constructor = method.method_kind == MethodKind::Constructor;
    let is_destructor = method.method_kind == MethodKind::Destructor;
    let return_type = match (&method.return_type, method.method_kind) {
        (Some(ty), MethodKind::Ordinary) => facts.display_type(ty),
        _ => String::new(),
    };

    let declaration = text::method_declaration(node);
    let code_snippet = format!("{}{}", declaration, text::method_body_without_comments(node));
    let (variable_contexts, invoked_contexts) = dependency_contexts(facts, node);

    let mut element = CodeElement {
        name: facts.method_name(symbol_id),
        namespace: facts.namespace_display(symbol_id),
        fqn: facts.method_fqn(symbol_id),
        declaration,
        accessibility: symbol.accessibility,
        file_locations: vec![node.tree().path().to_string()],
        details: ElementDetails::Method(MethodDetails {
            return_type,
            is_constructor,
            is_destructor,
            is_abstract: symbol.modifiers.is_abstract,
            is_virtual: symbol.modifiers.is_virtual,
            code_snippet,
            variable_contexts,
            invoked_contexts,
        }),
        relationships: Vec::new(),
    };

    let key = element.fqn.clone();
    attach(&mut element, relations::method_owner(facts, symbol_id, &key));
    attach(&mut element, relations::overrides(facts, symbol_id, &key));
    attach(&mut element, relations::implements(facts, symbol_id, &key));
    attach(&mut element, relations::body_references(facts, node, &key));
    Some(element)
}

/// Variable and invocation contexts of a method body.
///
/// Identifier names are visited first, then invocations, both in source order. One set
/// of literal texts deduplicates across both lists: once a text has been seen it never
/// produces another entry, even if it failed to resolve the first time.
pub fn dependency_contexts(
    facts: &dyn SymbolFacts,
    method: NodeRef<'_>,
) -> (Vec<VariableContext>, Vec<InvokedMethodContext>) {
    let mut seen: HashSet<&str> = HashSet::new();

    let mut variables: Vec<VariableContext> = Vec::new();
    for name in method
        .descendants()
        .filter(|n| n.kind() == SyntaxKind::IdentifierName)
    {
        if !seen.insert(name.text()) {
            continue;
        }
        let Some(target) = facts.symbol_info(name.syntax_ref()) else {
            continue;
        };
        let symbol = facts.symbol(target);
        if !(symbol.is_field_or_property() || symbol.is_local_or_parameter()) {
            continue;
        }
        let Some(ty) = symbol.value_type() else {
            continue;
        };
        let context = VariableContext {
            name: symbol.name.clone(),
            type_name: facts.display_type(ty),
            is_local: !symbol.is_field_or_property(),
        };
        if !variables.contains(&context) {
            variables.push(context);
        }
    }

    let mut invocations: Vec<InvokedMethodContext> = Vec::new();
    for call in method
        .descendants()
        .filter(|n| n.kind() == SyntaxKind::InvocationExpression)
    {
        let Some(target) = facts.symbol_info(call.syntax_ref()) else {
            continue;
        };
        if facts.symbol(target).as_method().is_none() || !seen.insert(call.text()) {
            continue;
        }
        invocations.push(InvokedMethodContext {
            invocation: call.text().to_string(),
            fully_qualified_signature: facts.method_fqn(target),
        });
    }

    (variables, invocations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EdgeKind;
    use crate::symbols::Compilation;

    fn classify_methods(c: &Compilation) -> Vec<CodeElement> {
        let ctx = ClassifyContext {
            facts: c,
            expand_declarators: false,
        };
        c.trees()
            .iter()
            .flat_map(|t| t.root().descendants())
            .filter_map(|n| classify_method(n, &ctx))
            .collect()
    }

    #[test]
    fn test_constructor_and_destructor_names() {
        let c = Compilation::from_sources(&[(
            "T.cs",
            "namespace N { class Pool { public Pool(int size) { } ~Pool() { } } }",
        )])
        .unwrap();
        let methods = classify_methods(&c);
        assert_eq!(methods[0].name, "Pool(int)");
        assert_eq!(methods[0].fqn, "N.Pool.Pool(int)");
        let ctor = methods[0].method().unwrap();
        assert!(ctor.is_constructor);
        assert_eq!(ctor.return_type, "");

        assert_eq!(methods[1].name, "~Pool()");
        assert!(methods[1].method().unwrap().is_destructor);
        assert_eq!(methods[1].fqn, "N.Pool.~Pool()");
    }

    #[test]
    fn test_snippet_is_declaration_plus_body() {
        let c = Compilation::from_sources(&[(
            "T.cs",
            "class A { public int Twice(int x) { /* double it */ return x * 2; } }",
        )])
        .unwrap();
        let methods = classify_methods(&c);
        let twice = &methods[0];
        assert_eq!(twice.declaration, "public int Twice(int x) ");
        let details = twice.method().unwrap();
        assert_eq!(details.return_type, "int");
        assert_eq!(details.code_snippet, "public int Twice(int x) {  return x * 2; }");
    }

    #[test]
    fn test_abstract_methods_use_abstract_edge() {
        let c = Compilation::from_sources(&[(
            "T.cs",
            "abstract class Shape { public abstract double Area(); public void Print() { } } interface IShape { void Draw(); }",
        )])
        .unwrap();
        let methods = classify_methods(&c);
        let edge_of = |fqn: &str| {
            methods
                .iter()
                .find(|m| m.fqn == fqn)
                .unwrap()
                .relationships[0]
                .kind
        };
        assert_eq!(edge_of("Shape.Area()"), EdgeKind::HasAbstractMethod);
        assert_eq!(edge_of("Shape.Print()"), EdgeKind::HasMethod);
        assert_eq!(edge_of("IShape.Draw()"), EdgeKind::HasAbstractMethod);
    }

    #[test]
    fn test_contexts_share_one_dedup_set() {
        let c = Compilation::from_sources(&[(
            "T.cs",
            r#"
class Repo {
    private int count;
    public string Label { get; set; }
    public void Save(string item) {
        var local = item;
        count = count + 1;
        Label = local;
        Flush();
        Flush();
    }
    void Flush() { }
}
"#,
        )])
        .unwrap();
        let methods = classify_methods(&c);
        let save = methods.iter().find(|m| m.fqn == "Repo.Save(string)").unwrap();
        let details = save.method().unwrap();

        let vars: Vec<(&str, &str, bool)> = details
            .variable_contexts
            .iter()
            .map(|v| (v.name.as_str(), v.type_name.as_str(), v.is_local))
            .collect();
        assert_eq!(
            vars,
            vec![
                ("item", "string", true),
                ("count", "int", false),
                ("Label", "string", false),
                ("local", "string", true),
            ]
        );

        assert_eq!(details.invoked_contexts.len(), 1);
        assert_eq!(details.invoked_contexts[0].invocation, "Flush()");
        assert_eq!(details.invoked_contexts[0].fully_qualified_signature, "Repo.Flush()");
    }

    #[test]
    fn test_external_types_surface_as_variables_only() {
        let c = Compilation::from_sources(&[(
            "T.cs",
            "class Shop { void Bar() { Widget w = new Widget(); w.Spin(); } }",
        )])
        .unwrap();
        let methods = classify_methods(&c);
        let details = methods[0].method().unwrap();
        assert_eq!(details.variable_contexts.len(), 1);
        assert_eq!(details.variable_contexts[0].type_name, "Widget");
        assert!(details.invoked_contexts.is_empty());
    }
}
