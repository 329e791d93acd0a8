//! Graph assembly buffer: extracted elements in traversal order.

use std::collections::HashMap;

use crate::model::CodeElement;

/// Elements collected during traversal, each carrying the edges it discovered.
#[derive(Debug, Default)]
pub struct GraphBuffer {
    elements: Vec<CodeElement>,
}

impl GraphBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, element: CodeElement) {
        self.elements.push(element);
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn elements(&self) -> &[CodeElement] {
        &self.elements
    }

    /// Total edge descriptors held across all elements.
    pub fn relationship_count(&self) -> usize {
        self.elements.iter().map(|e| e.relationships.len()).sum()
    }

    /// Fold elements sharing a key into the first one seen.
    ///
    /// Same-kind fragments of a partial type merge (see [`CodeElement::merge`]). Any other
    /// collision, a kind mismatch or two members with the same key, drops the later
    /// element with a warning. Returns how many elements were folded away.
    pub fn merge_fragments(&mut self) -> usize {
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut merged: Vec<CodeElement> = Vec::with_capacity(self.elements.len());
        let mut folded = 0;

        for element in std::mem::take(&mut self.elements) {
            match index.get(&element.fqn) {
                Some(&at) => {
                    folded += 1;
                    let first = &mut merged[at];
                    if first.kind() == element.kind() && first.kind().can_be_partial() {
                        first.merge(element);
                    } else if first.kind() == element.kind() {
                        log::warn!(
                            "{} {} declared twice ({} and {}); keeping the first",
                            first.kind(),
                            element.fqn,
                            first.file_locations.join(", "),
                            element.file_locations.join(", ")
                        );
                    } else {
                        log::warn!(
                            "{} declared as both {} and {}; keeping {}",
                            element.fqn,
                            first.kind(),
                            element.kind(),
                            first.kind()
                        );
                    }
                }
                None => {
                    index.insert(element.fqn.clone(), merged.len());
                    merged.push(element);
                }
            }
        }

        self.elements = merged;
        folded
    }
}
