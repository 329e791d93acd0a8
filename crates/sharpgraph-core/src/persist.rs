//! Two-pass persistence: every node first, then every edge.

use serde::Serialize;

use crate::model::CodeElement;
use crate::store::{EdgeOutcome, GraphStore};

/// Counts from one persistence run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PersistStats {
    pub nodes_written: usize,
    pub node_failures: usize,
    pub edges_written: usize,
    /// Edges skipped because an endpoint was absent or had the wrong kind.
    pub edges_dangling: usize,
    pub edge_failures: usize,
}

/// Write `elements` to `store`.
///
/// All node upserts complete before the first edge upsert, since edges need both
/// endpoints in place. A failed upsert is logged and skipped.
pub async fn persist(store: &dyn GraphStore, elements: &[CodeElement]) -> PersistStats {
    let mut stats = PersistStats::default();

    for element in elements {
        match store
            .upsert_node(element.kind(), &element.fqn, &element.node_properties())
            .await
        {
            Ok(()) => stats.nodes_written += 1,
            Err(e) => {
                log::warn!("Failed to write {} {}: {}", element.kind(), element.fqn, e);
                stats.node_failures += 1;
            }
        }
    }
    log::info!("Wrote {} nodes ({} failed)", stats.nodes_written, stats.node_failures);

    for element in elements {
        for rel in &element.relationships {
            match store
                .upsert_edge(rel.kind, &rel.from, &rel.to, &rel.properties)
                .await
            {
                Ok(EdgeOutcome::Created) => stats.edges_written += 1,
                Ok(EdgeOutcome::MissingEndpoint) => {
                    log::debug!("Skipped edge with missing endpoint: {}", rel);
                    stats.edges_dangling += 1;
                }
                Err(e) => {
                    log::warn!("Failed to write edge {}: {}", rel, e);
                    stats.edge_failures += 1;
                }
            }
        }
    }
    log::info!(
        "Wrote {} edges ({} dangling, {} failed)",
        stats.edges_written,
        stats.edges_dangling,
        stats.edge_failures
    );

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EdgeKind, ElementDetails, ElementKind, Endpoint, Relationship};
    use crate::store::InMemoryStore;
    use crate::symbols::Accessibility;

    fn class(fqn: &str) -> CodeElement {
        CodeElement {
            name: fqn.to_string(),
            namespace: "<global namespace>".to_string(),
            fqn: fqn.to_string(),
            declaration: format!(" class {}", fqn),
            accessibility: Accessibility::Internal,
            file_locations: vec!["a.cs".to_string()],
            details: ElementDetails::Class {
                is_abstract: false,
                is_sealed: false,
                is_static: false,
            },
            relationships: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_edges_written_after_all_nodes() {
        // The edge is owned by the first element but targets the second.
        let mut b = class("B");
        b.add_relationship(Relationship::new(
            EdgeKind::Inherits,
            Endpoint::labeled("B", &[ElementKind::Class]),
            Endpoint::labeled("A", &[ElementKind::Class]),
        ));
        b.add_relationship(Relationship::new(
            EdgeKind::Inherits,
            Endpoint::labeled("B", &[ElementKind::Class]),
            Endpoint::labeled("External", &[ElementKind::Class]),
        ));
        let elements = vec![b, class("A")];

        let store = InMemoryStore::new();
        let stats = persist(&store, &elements).await;
        assert_eq!(stats.nodes_written, 2);
        assert_eq!(stats.edges_written, 1);
        assert_eq!(stats.edges_dangling, 1);
        assert_eq!(
            store.edges(EdgeKind::Inherits).await.unwrap(),
            vec![("B".to_string(), "A".to_string())]
        );
    }
}
