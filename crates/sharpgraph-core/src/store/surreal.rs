//! Embedded SurrealDB graph store.
//!
//! Every element lives in the `element` table under the record id
//! `element:⟨fully-qualified name⟩`, with the node properties as top-level fields. Each
//! edge kind has its own relation table (`inherits`, `has_method`...).

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use surrealdb::engine::local::{Db, Mem, RocksDb};
use surrealdb::sql::Thing;
use surrealdb::Surreal;

use super::{with_identity, EdgeOutcome, GraphStore, StoreError, StoreStats, StoredNode};
use crate::model::{EdgeKind, ElementKind, Endpoint, PropertyMap, PropertyValue};

const ELEMENT_TABLE: &str = "element";

#[derive(Deserialize)]
struct CountResult {
    count: i64,
}

#[derive(Deserialize)]
struct LabelRow {
    #[serde(rename = "Label")]
    label: String,
}

#[derive(Deserialize)]
struct EdgeRow {
    source: String,
    target: String,
}

/// Graph store backed by an embedded SurrealDB instance.
pub struct SurrealStore {
    db: Surreal<Db>,
}

impl SurrealStore {
    /// Open or create a RocksDB-backed database at `path`.
    pub async fn open(path: &Path, namespace: &str, database: &str) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        let db = Surreal::new::<RocksDb>(path).await?;
        db.use_ns(namespace).use_db(database).await?;
        Ok(Self { db })
    }

    /// Open a throwaway in-memory database.
    pub async fn open_in_memory(namespace: &str, database: &str) -> Result<Self, StoreError> {
        let db = Surreal::new::<Mem>(()).await?;
        db.use_ns(namespace).use_db(database).await?;
        Ok(Self { db })
    }

    fn record(key: &str) -> Thing {
        Thing::from((ELEMENT_TABLE, key))
    }

    async fn count(&self, query: String) -> Result<usize, StoreError> {
        let result: Option<CountResult> = self.db.query(query).await?.take(0)?;
        Ok(result.map(|r| r.count as usize).unwrap_or(0))
    }

    async fn endpoint_exists(&self, endpoint: &Endpoint) -> Result<bool, StoreError> {
        Ok(self
            .find_node(&endpoint.key)
            .await?
            .is_some_and(|kind| endpoint.accepts(kind)))
    }
}

#[async_trait]
impl GraphStore for SurrealStore {
    async fn initialize(&self) -> Result<(), StoreError> {
        // ===========================================================================
        // NODE TABLE
        // ===========================================================================
        self.db
            .query(
                r#"
                DEFINE TABLE IF NOT EXISTS element SCHEMALESS;
                DEFINE FIELD IF NOT EXISTS FullyQualifiedName ON element TYPE string;
                DEFINE FIELD IF NOT EXISTS Label ON element TYPE string;
                DEFINE INDEX IF NOT EXISTS element_label ON element FIELDS Label;
                "#,
            )
            .await?
            .check()?;

        // ===========================================================================
        // EDGE TABLES
        // ===========================================================================
        let mut schema = String::new();
        for kind in EdgeKind::ALL {
            let table = kind.table_name();
            schema.push_str(&format!(
                "DEFINE TABLE IF NOT EXISTS {table} TYPE RELATION;\n\
                 DEFINE INDEX IF NOT EXISTS {table}_pair ON {table} FIELDS in, out UNIQUE;\n"
            ));
        }
        self.db.query(schema).await?.check()?;

        Ok(())
    }

    async fn purge(&self) -> Result<(), StoreError> {
        let mut query = format!("DELETE {};\n", ELEMENT_TABLE);
        for kind in EdgeKind::ALL {
            query.push_str(&format!("DELETE {};\n", kind.table_name()));
        }
        self.db.query(query).await?.check()?;
        Ok(())
    }

    async fn upsert_node(
        &self,
        kind: ElementKind,
        key: &str,
        properties: &PropertyMap,
    ) -> Result<(), StoreError> {
        let props = serde_json::to_value(with_identity(kind, key, properties))?;
        self.db
            .query("UPSERT $node MERGE $props")
            .bind(("node", Self::record(key)))
            .bind(("props", props))
            .await?
            .check()?;
        Ok(())
    }

    async fn upsert_edge(
        &self,
        kind: EdgeKind,
        from: &Endpoint,
        to: &Endpoint,
        properties: &PropertyMap,
    ) -> Result<EdgeOutcome, StoreError> {
        if !self.endpoint_exists(from).await? || !self.endpoint_exists(to).await? {
            return Ok(EdgeOutcome::MissingEndpoint);
        }

        let table = kind.table_name();
        let props = serde_json::to_value(properties)?;
        let existing: Option<CountResult> = self
            .db
            .query(format!(
                "SELECT count() FROM {table} WHERE in = $from AND out = $to GROUP ALL"
            ))
            .bind(("from", Self::record(&from.key)))
            .bind(("to", Self::record(&to.key)))
            .await?
            .take(0)?;

        let query = if existing.is_some_and(|c| c.count > 0) {
            format!("UPDATE {table} MERGE $props WHERE in = $from AND out = $to")
        } else {
            format!("RELATE $from->{table}->$to CONTENT $props")
        };
        self.db
            .query(query)
            .bind(("from", Self::record(&from.key)))
            .bind(("to", Self::record(&to.key)))
            .bind(("props", props))
            .await?
            .check()?;
        Ok(EdgeOutcome::Created)
    }

    async fn find_node(&self, key: &str) -> Result<Option<ElementKind>, StoreError> {
        let row: Option<LabelRow> = self
            .db
            .query("SELECT Label FROM $node")
            .bind(("node", Self::record(key)))
            .await?
            .take(0)?;
        Ok(row.and_then(|r| ElementKind::from_label(&r.label)))
    }

    async fn node(&self, key: &str) -> Result<Option<StoredNode>, StoreError> {
        let properties: Option<PropertyMap> = self
            .db
            .query("SELECT * OMIT id FROM $node")
            .bind(("node", Self::record(key)))
            .await?
            .take(0)?;
        let Some(properties) = properties else {
            return Ok(None);
        };
        let kind = properties
            .get("Label")
            .and_then(PropertyValue::as_str)
            .and_then(ElementKind::from_label)
            .ok_or_else(|| StoreError::InvalidRecord {
                key: key.to_string(),
                message: "missing or unknown Label".to_string(),
            })?;
        Ok(Some(StoredNode { kind, properties }))
    }

    async fn set_node_property(
        &self,
        kind: ElementKind,
        key: &str,
        name: &str,
        value: PropertyValue,
    ) -> Result<bool, StoreError> {
        if self.find_node(key).await? != Some(kind) {
            return Ok(false);
        }
        let mut patch = PropertyMap::new();
        patch.insert(name.to_string(), value);
        self.db
            .query("UPDATE $node MERGE $patch")
            .bind(("node", Self::record(key)))
            .bind(("patch", serde_json::to_value(patch)?))
            .await?
            .check()?;
        Ok(true)
    }

    async fn edges(&self, kind: EdgeKind) -> Result<Vec<(String, String)>, StoreError> {
        let rows: Vec<EdgeRow> = self
            .db
            .query(format!(
                "SELECT in.FullyQualifiedName AS source, out.FullyQualifiedName AS target FROM {}",
                kind.table_name()
            ))
            .await?
            .take(0)?;
        Ok(rows.into_iter().map(|r| (r.source, r.target)).collect())
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let nodes = self
            .count(format!("SELECT count() FROM {} GROUP ALL", ELEMENT_TABLE))
            .await?;
        let mut edges = 0;
        for kind in EdgeKind::ALL {
            edges += self
                .count(format!("SELECT count() FROM {} GROUP ALL", kind.table_name()))
                .await?;
        }
        Ok(StoreStats { nodes, edges })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SurrealStore {
        let store = SurrealStore::open_in_memory("test", "graph").await.unwrap();
        store.initialize().await.unwrap();
        store
    }

    fn props(name: &str) -> PropertyMap {
        let mut p = PropertyMap::new();
        p.insert("Name".to_string(), name.into());
        p.insert("FileLocation".to_string(), vec!["a.cs".to_string()].into());
        p
    }

    #[tokio::test]
    async fn test_node_round_trip() {
        let store = store().await;
        store
            .upsert_node(ElementKind::Class, "Ns.Repo<T>", &props("Repo<T>"))
            .await
            .unwrap();
        store
            .upsert_node(ElementKind::Class, "Ns.Repo<T>", &props("Repo<T>"))
            .await
            .unwrap();

        assert_eq!(store.find_node("Ns.Repo<T>").await.unwrap(), Some(ElementKind::Class));
        let node = store.node("Ns.Repo<T>").await.unwrap().unwrap();
        assert_eq!(
            node.properties["FileLocation"],
            PropertyValue::List(vec!["a.cs".to_string()])
        );
        assert_eq!(store.stats().await.unwrap().nodes, 1);
    }

    #[tokio::test]
    async fn test_edges_merge_and_skip_missing_endpoints() {
        let store = store().await;
        store.upsert_node(ElementKind::Method, "A.M()", &props("M()")).await.unwrap();
        store.upsert_node(ElementKind::Method, "A.N()", &props("N()")).await.unwrap();

        let from = Endpoint::labeled("A.M()", &[ElementKind::Method]);
        let to = Endpoint::labeled("A.N()", &[ElementKind::Method]);
        for _ in 0..2 {
            let outcome = store
                .upsert_edge(EdgeKind::Invokes, &from, &to, &PropertyMap::new())
                .await
                .unwrap();
            assert_eq!(outcome, EdgeOutcome::Created);
        }
        let missing = Endpoint::labeled("System.Console.WriteLine(string)", &[ElementKind::Method]);
        let outcome = store
            .upsert_edge(EdgeKind::Invokes, &from, &missing, &PropertyMap::new())
            .await
            .unwrap();
        assert_eq!(outcome, EdgeOutcome::MissingEndpoint);

        assert_eq!(
            store.edges(EdgeKind::Invokes).await.unwrap(),
            vec![("A.M()".to_string(), "A.N()".to_string())]
        );
        assert_eq!(store.stats().await.unwrap(), StoreStats { nodes: 2, edges: 1 });
    }

    #[tokio::test]
    async fn test_set_property_requires_matching_kind() {
        let store = store().await;
        store.upsert_node(ElementKind::Method, "A.M()", &props("M()")).await.unwrap();
        assert!(store
            .set_node_property(ElementKind::Method, "A.M()", "VariableContext", "[]".into())
            .await
            .unwrap());
        assert!(!store
            .set_node_property(ElementKind::Class, "A.M()", "VariableContext", "[]".into())
            .await
            .unwrap());
        let node = store.node("A.M()").await.unwrap().unwrap();
        assert_eq!(node.properties["VariableContext"], PropertyValue::from("[]"));
    }
}
