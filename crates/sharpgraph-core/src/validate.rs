//! Referential validation of method dependency contexts.
//!
//! Runs against a fully populated store. Every variable type and every invoked callee a
//! method mentions is looked up by key; misses go into an [`UnresolvedRegistry`] that the
//! run writes out as a sorted report.

use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;

use crate::model::{CodeElement, ElementKind, PropertyValue};
use crate::store::{GraphStore, StoreError};

/// Node property holding the variable-context snapshot.
pub const VARIABLE_CONTEXT_PROPERTY: &str = "VariableContext";
/// Node property holding the invoked-method-context snapshot.
pub const INVOKED_CONTEXT_PROPERTY: &str = "InvokedContext";

/// Names referenced by the graph but missing from it, collected over one run.
#[derive(Debug, Default, Clone)]
pub struct UnresolvedRegistry {
    names: HashSet<String>,
}

impl UnresolvedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the name was not yet recorded.
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.names.insert(name.into())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Recorded names in lexicographic order.
    pub fn sorted(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.names.iter().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Write the sorted names to `path`, one per line, replacing any existing file.
    pub fn write_report(&self, path: &Path) -> std::io::Result<()> {
        let mut content = String::new();
        for name in self.sorted() {
            content.push_str(name);
            content.push('\n');
        }
        std::fs::write(path, content)
    }
}

/// Counts from one validation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ValidationStats {
    pub methods_checked: usize,
    pub variable_misses: usize,
    pub invocation_misses: usize,
    pub snapshots_written: usize,
    pub failures: usize,
}

/// Checks method contexts against the store and writes snapshots back.
pub struct Validator<'s> {
    store: &'s dyn GraphStore,
}

impl<'s> Validator<'s> {
    pub fn new(store: &'s dyn GraphStore) -> Self {
        Self { store }
    }

    /// Validate every method in `elements`, recording misses in `registry`.
    ///
    /// A failed lookup or write is logged and counted; the pass continues with the next
    /// context.
    pub async fn validate(
        &self,
        elements: &[CodeElement],
        registry: &mut UnresolvedRegistry,
    ) -> ValidationStats {
        let mut stats = ValidationStats::default();

        for element in elements {
            let Some(method) = element.method() else {
                continue;
            };
            stats.methods_checked += 1;

            for variable in &method.variable_contexts {
                match self.store.find_node(&variable.type_name).await {
                    Ok(Some(_)) => {}
                    Ok(None) => {
                        stats.variable_misses += 1;
                        registry.insert(variable.type_name.as_str());
                    }
                    Err(e) => {
                        log::warn!("Lookup of {} failed: {}", variable.type_name, e);
                        stats.failures += 1;
                    }
                }
            }

            for call in &method.invoked_contexts {
                let signature = &call.fully_qualified_signature;
                match self.store.find_node(signature).await {
                    Ok(Some(ElementKind::Method)) => {}
                    Ok(_) => {
                        stats.invocation_misses += 1;
                        registry.insert(signature.as_str());
                    }
                    Err(e) => {
                        log::warn!("Lookup of {} failed: {}", signature, e);
                        stats.failures += 1;
                    }
                }
            }

            match self.write_snapshots(element).await {
                Ok(true) => stats.snapshots_written += 1,
                Ok(false) => log::debug!("No Method node for {}; snapshots not written", element.fqn),
                Err(e) => {
                    log::warn!("Failed to write context snapshots for {}: {}", element.fqn, e);
                    stats.failures += 1;
                }
            }
        }

        log::info!(
            "Validated {} methods: {} unresolved variable types, {} unresolved calls",
            stats.methods_checked,
            stats.variable_misses,
            stats.invocation_misses
        );
        stats
    }

    async fn write_snapshots(&self, element: &CodeElement) -> Result<bool, StoreError> {
        let Some(method) = element.method() else {
            return Ok(false);
        };
        let variables = serde_json::to_string_pretty(&method.variable_contexts)?;
        let invoked = serde_json::to_string_pretty(&method.invoked_contexts)?;

        let written = self
            .store
            .set_node_property(
                ElementKind::Method,
                &element.fqn,
                VARIABLE_CONTEXT_PROPERTY,
                PropertyValue::from(variables),
            )
            .await?;
        if !written {
            return Ok(false);
        }
        self.store
            .set_node_property(
                ElementKind::Method,
                &element.fqn,
                INVOKED_CONTEXT_PROPERTY,
                PropertyValue::from(invoked),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_dedups_and_sorts() {
        let mut registry = UnresolvedRegistry::new();
        assert!(registry.insert("Widget"));
        assert!(registry.insert("Acme.Log.Write(string)"));
        assert!(!registry.insert("Widget"));
        assert!(registry.insert("int"));

        assert_eq!(registry.len(), 3);
        assert!(registry.contains("Widget"));
        assert_eq!(registry.sorted(), vec!["Acme.Log.Write(string)", "Widget", "int"]);
    }

    #[test]
    fn test_write_report_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outsideDep.txt");
        std::fs::write(&path, "stale\n").unwrap();

        let mut registry = UnresolvedRegistry::new();
        registry.insert("Zeta");
        registry.insert("Alpha");
        registry.write_report(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Alpha\nZeta\n");

        UnresolvedRegistry::new().write_report(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }
}
