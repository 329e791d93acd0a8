//! Graph persistence.
//!
//! Nodes are keyed by fully-qualified name; edges by kind and endpoint keys. Both upserts
//! are idempotent. An edge whose endpoint is missing (or has the wrong kind) is skipped
//! without error and reported as [`EdgeOutcome::MissingEndpoint`].

mod error;
mod memory;
mod surreal;

pub use error::StoreError;
pub use memory::InMemoryStore;
pub use surreal::SurrealStore;

use async_trait::async_trait;
use serde::Serialize;

use crate::model::{EdgeKind, ElementKind, Endpoint, PropertyMap, PropertyValue};

/// Result of an edge upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOutcome {
    /// The edge exists now, whether it was new or merged.
    Created,
    /// An endpoint is absent or has a kind the edge does not accept. Nothing was written.
    MissingEndpoint,
}

/// A node as read back from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredNode {
    pub kind: ElementKind,
    pub properties: PropertyMap,
}

/// Node and edge totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub nodes: usize,
    pub edges: usize,
}

/// A property graph keyed by fully-qualified names.
///
/// Node properties always carry `Label` and `FullyQualifiedName`, whatever the caller
/// passed.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Define tables and indexes. Safe to call on an initialized store.
    async fn initialize(&self) -> Result<(), StoreError>;

    /// Delete every node and edge.
    async fn purge(&self) -> Result<(), StoreError>;

    /// Create the node or merge `properties` into the existing one.
    async fn upsert_node(
        &self,
        kind: ElementKind,
        key: &str,
        properties: &PropertyMap,
    ) -> Result<(), StoreError>;

    /// Create the edge or merge `properties` into the existing one.
    async fn upsert_edge(
        &self,
        kind: EdgeKind,
        from: &Endpoint,
        to: &Endpoint,
        properties: &PropertyMap,
    ) -> Result<EdgeOutcome, StoreError>;

    /// Kind of the node stored under `key`.
    async fn find_node(&self, key: &str) -> Result<Option<ElementKind>, StoreError>;

    async fn node(&self, key: &str) -> Result<Option<StoredNode>, StoreError>;

    /// Set one property on a node of `kind`. Returns `false` when no such node exists.
    async fn set_node_property(
        &self,
        kind: ElementKind,
        key: &str,
        name: &str,
        value: PropertyValue,
    ) -> Result<bool, StoreError>;

    /// `(from, to)` keys of every edge of `kind`.
    async fn edges(&self, kind: EdgeKind) -> Result<Vec<(String, String)>, StoreError>;

    async fn stats(&self) -> Result<StoreStats, StoreError>;
}

#[async_trait]
impl GraphStore for Box<dyn GraphStore> {
    async fn initialize(&self) -> Result<(), StoreError> {
        (**self).initialize().await
    }

    async fn purge(&self) -> Result<(), StoreError> {
        (**self).purge().await
    }

    async fn upsert_node(
        &self,
        kind: ElementKind,
        key: &str,
        properties: &PropertyMap,
    ) -> Result<(), StoreError> {
        (**self).upsert_node(kind, key, properties).await
    }

    async fn upsert_edge(
        &self,
        kind: EdgeKind,
        from: &Endpoint,
        to: &Endpoint,
        properties: &PropertyMap,
    ) -> Result<EdgeOutcome, StoreError> {
        (**self).upsert_edge(kind, from, to, properties).await
    }

    async fn find_node(&self, key: &str) -> Result<Option<ElementKind>, StoreError> {
        (**self).find_node(key).await
    }

    async fn node(&self, key: &str) -> Result<Option<StoredNode>, StoreError> {
        (**self).node(key).await
    }

    async fn set_node_property(
        &self,
        kind: ElementKind,
        key: &str,
        name: &str,
        value: PropertyValue,
    ) -> Result<bool, StoreError> {
        (**self).set_node_property(kind, key, name, value).await
    }

    async fn edges(&self, kind: EdgeKind) -> Result<Vec<(String, String)>, StoreError> {
        (**self).edges(kind).await
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        (**self).stats().await
    }
}

/// Properties as written: the caller's map plus the identity fields.
pub(crate) fn with_identity(kind: ElementKind, key: &str, properties: &PropertyMap) -> PropertyMap {
    let mut props = properties.clone();
    props.insert("Label".to_string(), kind.label().into());
    props.insert("FullyQualifiedName".to_string(), key.into());
    props
}
