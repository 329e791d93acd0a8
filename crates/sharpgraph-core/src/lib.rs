//! Extracts a property graph of types, members and call relationships from C# sources.
//!
//! A run parses every input file into one [`Compilation`], walks each tree through the
//! ordered classifiers into a [`GraphBuffer`], persists nodes then edges to a
//! [`GraphStore`], and validates method dependency contexts against the stored graph.

pub mod buffer;
pub mod config;
pub mod extract;
pub mod input;
pub mod model;
pub mod order;
pub mod persist;
pub mod pipeline;
pub mod store;
pub mod symbols;
pub mod syntax;
pub mod validate;

pub use buffer::GraphBuffer;
pub use config::{Config, ConfigError};
pub use input::{InputError, InputResolver};
pub use model::{CodeElement, EdgeKind, ElementKind, Relationship};
pub use order::method_order;
pub use persist::{persist, PersistStats};
pub use pipeline::{open_store, Pipeline, PipelineError, RunPhase, RunSummary};
pub use store::{EdgeOutcome, GraphStore, InMemoryStore, StoreError, StoreStats, SurrealStore};
pub use symbols::{Compilation, SymbolFacts};
pub use validate::{UnresolvedRegistry, ValidationStats, Validator};
