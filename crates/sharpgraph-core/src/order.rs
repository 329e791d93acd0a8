//! Callee-first ordering of methods over their INVOKES edges.

use std::collections::{BTreeSet, HashMap};

use crate::model::{CodeElement, EdgeKind};

/// Method keys ordered so that every method comes after the methods it calls.
///
/// Only calls between methods present in `elements` count; self-calls are ignored. Among
/// methods that are ready at the same time, buffer order wins. Methods caught in a call
/// cycle are appended at the end in buffer order.
pub fn method_order(elements: &[CodeElement]) -> Vec<String> {
    let methods: Vec<&str> = elements
        .iter()
        .filter(|e| e.method().is_some())
        .map(|e| e.fqn.as_str())
        .collect();
    let position: HashMap<&str, usize> = methods.iter().enumerate().map(|(i, k)| (*k, i)).collect();

    // pending[i]: distinct in-buffer callees of method i not yet emitted.
    let mut pending: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); methods.len()];
    let mut callers: Vec<Vec<usize>> = vec![Vec::new(); methods.len()];
    for element in elements {
        for rel in element
            .relationships
            .iter()
            .filter(|r| r.kind == EdgeKind::Invokes)
        {
            let (Some(&caller), Some(&callee)) = (
                position.get(rel.from.key.as_str()),
                position.get(rel.to.key.as_str()),
            ) else {
                continue;
            };
            if caller != callee && pending[caller].insert(callee) {
                callers[callee].push(caller);
            }
        }
    }

    let mut ready: BTreeSet<usize> = (0..methods.len()).filter(|&i| pending[i].is_empty()).collect();
    let mut emitted = vec![false; methods.len()];
    let mut order = Vec::with_capacity(methods.len());

    while let Some(next) = ready.pop_first() {
        emitted[next] = true;
        order.push(methods[next].to_string());
        for &caller in &callers[next] {
            pending[caller].remove(&next);
            if pending[caller].is_empty() && !emitted[caller] {
                ready.insert(caller);
            }
        }
    }

    let cyclic: Vec<&str> = (0..methods.len())
        .filter(|&i| !emitted[i])
        .map(|i| methods[i])
        .collect();
    if !cyclic.is_empty() {
        log::debug!("{} methods in call cycles", cyclic.len());
    }
    order.extend(cyclic.into_iter().map(String::from));
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ElementDetails, ElementKind, Endpoint, MethodDetails, Relationship};
    use crate::symbols::Accessibility;

    fn method(fqn: &str, calls: &[&str]) -> CodeElement {
        let mut element = CodeElement {
            name: fqn.to_string(),
            namespace: String::new(),
            fqn: fqn.to_string(),
            declaration: String::new(),
            accessibility: Accessibility::Public,
            file_locations: vec!["a.cs".to_string()],
            details: ElementDetails::Method(MethodDetails::default()),
            relationships: Vec::new(),
        };
        for callee in calls {
            element.add_relationship(Relationship::new(
                EdgeKind::Invokes,
                Endpoint::labeled(fqn, &[ElementKind::Method]),
                Endpoint::labeled(*callee, &[ElementKind::Method]),
            ));
        }
        element
    }

    #[test]
    fn test_callees_first_ties_by_buffer_order() {
        let elements = vec![
            method("A.Main()", &["A.Load()", "A.Save()"]),
            method("A.Save()", &["A.Log()"]),
            method("A.Load()", &["A.Log()", "System.IO.File.ReadAllText(string)"]),
            method("A.Log()", &["A.Log()"]),
        ];
        assert_eq!(
            method_order(&elements),
            vec!["A.Log()", "A.Save()", "A.Load()", "A.Main()"]
        );
    }

    #[test]
    fn test_cycles_appended_in_buffer_order() {
        let elements = vec![
            method("B.Ping()", &["B.Pong()"]),
            method("B.Run()", &["B.Ping()"]),
            method("B.Pong()", &["B.Ping()"]),
            method("B.Idle()", &[]),
        ];
        assert_eq!(
            method_order(&elements),
            vec!["B.Idle()", "B.Ping()", "B.Run()", "B.Pong()"]
        );
    }
}
