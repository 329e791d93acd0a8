//! In-memory graph store, used for dry runs and tests.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use super::{with_identity, EdgeOutcome, GraphStore, StoreError, StoreStats, StoredNode};
use crate::model::{EdgeKind, ElementKind, Endpoint, PropertyMap, PropertyValue};

#[derive(Debug, Default)]
struct Graph {
    nodes: BTreeMap<String, StoredNode>,
    /// (kind, from, to) -> properties, in insertion order through `order`.
    edges: HashMap<(EdgeKind, String, String), PropertyMap>,
    order: Vec<(EdgeKind, String, String)>,
}

impl Graph {
    fn accepts(&self, endpoint: &Endpoint) -> bool {
        self.nodes
            .get(&endpoint.key)
            .is_some_and(|n| endpoint.accepts(n.kind))
    }
}

/// Graph held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    graph: RwLock<Graph>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GraphStore for InMemoryStore {
    async fn initialize(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn purge(&self) -> Result<(), StoreError> {
        *self.graph.write().await = Graph::default();
        Ok(())
    }

    async fn upsert_node(
        &self,
        kind: ElementKind,
        key: &str,
        properties: &PropertyMap,
    ) -> Result<(), StoreError> {
        let props = with_identity(kind, key, properties);
        let mut graph = self.graph.write().await;
        let node = graph.nodes.entry(key.to_string()).or_insert_with(|| StoredNode {
            kind,
            properties: PropertyMap::new(),
        });
        node.kind = kind;
        node.properties.extend(props);
        Ok(())
    }

    async fn upsert_edge(
        &self,
        kind: EdgeKind,
        from: &Endpoint,
        to: &Endpoint,
        properties: &PropertyMap,
    ) -> Result<EdgeOutcome, StoreError> {
        let mut graph = self.graph.write().await;
        if !graph.accepts(from) || !graph.accepts(to) {
            return Ok(EdgeOutcome::MissingEndpoint);
        }
        let id = (kind, from.key.clone(), to.key.clone());
        match graph.edges.get_mut(&id) {
            Some(existing) => existing.extend(properties.clone()),
            None => {
                graph.edges.insert(id.clone(), properties.clone());
                graph.order.push(id);
            }
        }
        Ok(EdgeOutcome::Created)
    }

    async fn find_node(&self, key: &str) -> Result<Option<ElementKind>, StoreError> {
        Ok(self.graph.read().await.nodes.get(key).map(|n| n.kind))
    }

    async fn node(&self, key: &str) -> Result<Option<StoredNode>, StoreError> {
        Ok(self.graph.read().await.nodes.get(key).cloned())
    }

    async fn set_node_property(
        &self,
        kind: ElementKind,
        key: &str,
        name: &str,
        value: PropertyValue,
    ) -> Result<bool, StoreError> {
        let mut graph = self.graph.write().await;
        match graph.nodes.get_mut(key) {
            Some(node) if node.kind == kind => {
                node.properties.insert(name.to_string(), value);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn edges(&self, kind: EdgeKind) -> Result<Vec<(String, String)>, StoreError> {
        let graph = self.graph.read().await;
        Ok(graph
            .order
            .iter()
            .filter(|(k, _, _)| *k == kind)
            .map(|(_, from, to)| (from.clone(), to.clone()))
            .collect())
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let graph = self.graph.read().await;
        Ok(StoreStats {
            nodes: graph.nodes.len(),
            edges: graph.edges.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(name: &str) -> PropertyMap {
        let mut p = PropertyMap::new();
        p.insert("Name".to_string(), name.into());
        p
    }

    #[tokio::test]
    async fn test_upsert_node_is_idempotent() {
        let store = InMemoryStore::new();
        store.upsert_node(ElementKind::Class, "N.A", &props("A")).await.unwrap();
        store.upsert_node(ElementKind::Class, "N.A", &props("A")).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.nodes, 1);
        let node = store.node("N.A").await.unwrap().unwrap();
        assert_eq!(node.properties["Label"], PropertyValue::from("Class"));
        assert_eq!(node.properties["FullyQualifiedName"], PropertyValue::from("N.A"));
    }

    #[tokio::test]
    async fn test_dangling_and_mislabeled_edges_are_skipped() {
        let store = InMemoryStore::new();
        store.upsert_node(ElementKind::Class, "A", &props("A")).await.unwrap();
        store.upsert_node(ElementKind::Interface, "I", &props("I")).await.unwrap();

        let outcome = store
            .upsert_edge(
                EdgeKind::Inherits,
                &Endpoint::labeled("A", &[ElementKind::Class]),
                &Endpoint::labeled("Missing", &[ElementKind::Class]),
                &PropertyMap::new(),
            )
            .await
            .unwrap();
        assert_eq!(outcome, EdgeOutcome::MissingEndpoint);

        let outcome = store
            .upsert_edge(
                EdgeKind::Inherits,
                &Endpoint::labeled("A", &[ElementKind::Class]),
                &Endpoint::labeled("I", &[ElementKind::Class]),
                &PropertyMap::new(),
            )
            .await
            .unwrap();
        assert_eq!(outcome, EdgeOutcome::MissingEndpoint);

        let stats = store.stats().await.unwrap();
        assert_eq!(stats, StoreStats { nodes: 2, edges: 0 });
    }
}
