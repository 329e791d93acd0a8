//! Ordered classifier dispatch over a syntax tree.

use super::members::{classify_event, classify_field, classify_property};
use super::method::classify_method;
use super::types::{
    classify_class, classify_delegate, classify_enum, classify_interface, classify_struct,
};
use super::ClassifyContext;
use crate::buffer::GraphBuffer;
use crate::model::{CodeElement, ElementKind};
use crate::syntax::NodeRef;

/// Maps one node to an element, or `None` when the node is not of its kind.
pub type Classifier = fn(NodeRef<'_>, &ClassifyContext<'_>) -> Option<CodeElement>;

/// Classifiers in priority order. The first match wins for a node.
pub const CLASSIFIERS: [(ElementKind, Classifier); 9] = [
    (ElementKind::Class, classify_class),
    (ElementKind::Struct, classify_struct),
    (ElementKind::Interface, classify_interface),
    (ElementKind::Enum, classify_enum),
    (ElementKind::Delegate, classify_delegate),
    (ElementKind::Method, classify_method),
    (ElementKind::Event, classify_event),
    (ElementKind::Field, classify_field),
    (ElementKind::Property, classify_property),
];

/// First classifier result for `node`.
pub fn classify(node: NodeRef<'_>, ctx: &ClassifyContext<'_>) -> Option<CodeElement> {
    CLASSIFIERS
        .iter()
        .find_map(|(_, classifier)| classifier(node, ctx))
}

/// Visit `root` and every descendant in pre-order, pushing each element into `buffer`.
///
/// Matched nodes are still descended into. Returns the number of elements produced.
pub fn traverse(root: NodeRef<'_>, ctx: &ClassifyContext<'_>, buffer: &mut GraphBuffer) -> usize {
    let mut produced = 0;
    for node in std::iter::once(root).chain(root.descendants()) {
        if let Some(element) = classify(node, ctx) {
            buffer.push(element);
            produced += 1;
        }
    }
    log::debug!("{}: {} elements", root.tree().path(), produced);
    produced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::Compilation;

    #[test]
    fn test_classifier_priority_order() {
        let kinds: Vec<ElementKind> = CLASSIFIERS.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            kinds,
            vec![
                ElementKind::Class,
                ElementKind::Struct,
                ElementKind::Interface,
                ElementKind::Enum,
                ElementKind::Delegate,
                ElementKind::Method,
                ElementKind::Event,
                ElementKind::Field,
                ElementKind::Property,
            ]
        );
    }

    #[test]
    fn test_traverse_descends_into_matches() {
        let c = Compilation::from_sources(&[(
            "T.cs",
            "namespace N { class A { int f; int P { get; set; } void M() { } class B { void N() { } } } }",
        )])
        .unwrap();
        let ctx = ClassifyContext {
            facts: &c,
            expand_declarators: false,
        };
        let mut buffer = GraphBuffer::new();
        let produced = traverse(c.trees()[0].root(), &ctx, &mut buffer);
        assert_eq!(produced, 6);

        let keys: Vec<&str> = buffer.elements().iter().map(|e| e.fqn.as_str()).collect();
        assert_eq!(keys, vec!["N.A", "N.A.f", "N.A.P", "N.A.M()", "N.A.B", "N.A.B.N()"]);
    }
}
