//! Element extraction.
//!
//! The dispatcher walks each syntax tree once and hands every node to the classifiers in
//! priority order. A classifier turns a declaration into a [`CodeElement`] and attaches the
//! relationships that element discovers.

mod dispatch;
mod members;
mod method;
mod relations;
mod text;
mod types;

pub use dispatch::{classify, traverse, Classifier, CLASSIFIERS};
pub use method::dependency_contexts;

use crate::symbols::SymbolFacts;

/// What classifiers read besides the node itself.
pub struct ClassifyContext<'f> {
    pub facts: &'f dyn SymbolFacts,
    /// One element per declarator in `int a, b;` instead of the first only.
    pub expand_declarators: bool,
}
