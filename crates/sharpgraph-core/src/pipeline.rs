//! Run driver: input resolution through report writing.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::buffer::GraphBuffer;
use crate::config::{Config, ConfigError};
use crate::extract::{traverse, ClassifyContext};
use crate::input::{InputError, InputResolver};
use crate::model::CodeElement;
use crate::order::method_order;
use crate::persist::{persist, PersistStats};
use crate::store::{GraphStore, InMemoryStore, StoreError, StoreStats, SurrealStore};
use crate::symbols::Compilation;
use crate::validate::{UnresolvedRegistry, ValidationStats, Validator};

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Stage reported to the progress callback as it starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Resolve,
    Parse,
    Extract,
    Persist,
    Validate,
    Report,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunPhase::Resolve => "Resolving inputs",
            RunPhase::Parse => "Parsing sources",
            RunPhase::Extract => "Extracting elements",
            RunPhase::Persist => "Writing graph",
            RunPhase::Validate => "Validating references",
            RunPhase::Report => "Writing reports",
        };
        f.write_str(label)
    }
}

/// What one run did.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub files_parsed: usize,
    pub files_failed: usize,
    pub elements: usize,
    pub fragments_merged: usize,
    pub persist: PersistStats,
    pub validation: ValidationStats,
    pub unresolved: usize,
    pub store: StoreStats,
    pub report_path: PathBuf,
}

type PhaseCallback = Box<dyn Fn(RunPhase) + Send + Sync>;

/// Open the store a run writes to.
///
/// `in_memory` selects a throwaway store; otherwise the embedded database lives at
/// `store.path`, or under `save_path` when that is unset.
pub async fn open_store(
    config: &Config,
    save_path: &Path,
    in_memory: bool,
) -> Result<Box<dyn GraphStore>, StoreError> {
    if in_memory {
        return Ok(Box::new(InMemoryStore::new()));
    }
    let path = config.store.db_path(save_path);
    log::info!("Opening graph store at {}", path.display());
    let store = SurrealStore::open(&path, &config.store.namespace, &config.store.database).await?;
    Ok(Box::new(store))
}

/// One analysis session over a set of inputs.
pub struct Pipeline<S: GraphStore> {
    config: Config,
    store: S,
    on_phase: Option<PhaseCallback>,
}

impl<S: GraphStore> Pipeline<S> {
    pub fn new(config: Config, store: S) -> Self {
        Self {
            config,
            store,
            on_phase: None,
        }
    }

    /// Call `callback` as each stage starts.
    pub fn with_progress(mut self, callback: impl Fn(RunPhase) + Send + Sync + 'static) -> Self {
        self.on_phase = Some(Box::new(callback));
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn phase(&self, phase: RunPhase) {
        log::info!("{}", phase);
        if let Some(callback) = &self.on_phase {
            callback(phase);
        }
    }

    /// Analyze `inputs` and write the graph plus reports under `save_path`.
    pub async fn run(&self, save_path: &Path, inputs: &[PathBuf]) -> Result<RunSummary, PipelineError> {
        self.phase(RunPhase::Resolve);
        let files = InputResolver::new(&self.config.input).resolve(inputs)?;
        self.run_files(save_path, &files).await
    }

    /// Analyze already resolved source files.
    pub async fn run_files(&self, save_path: &Path, files: &[PathBuf]) -> Result<RunSummary, PipelineError> {
        let started_at = Utc::now();

        // =======================================================================
        // STORE
        // =======================================================================
        std::fs::create_dir_all(save_path).map_err(|e| PipelineError::io(save_path, e))?;

        if self.config.store.purge_on_start {
            self.store.purge().await?;
        }
        self.store.initialize().await?;

        // =======================================================================
        // FRONT END
        // =======================================================================
        self.phase(RunPhase::Parse);
        let (compilation, files_failed) = build_compilation(files);
        let files_parsed = compilation.trees().len();

        self.phase(RunPhase::Extract);
        let mut buffer = GraphBuffer::new();
        let ctx = ClassifyContext {
            facts: &compilation,
            expand_declarators: self.config.analysis.expand_declarators,
        };
        for tree in compilation.trees() {
            traverse(tree.root(), &ctx, &mut buffer);
        }
        let fragments_merged = buffer.merge_fragments();
        log::info!(
            "Extracted {} elements with {} relationships ({} partial fragments merged)",
            buffer.len(),
            buffer.relationship_count(),
            fragments_merged
        );
        let elements = buffer.elements();

        // A failed dump is not fatal.
        if let Some(name) = &self.config.output.elements_file {
            if let Err(e) = write_elements(&save_path.join(name), elements) {
                log::warn!("Skipping element dump: {}", e);
            }
        }

        // =======================================================================
        // PERSISTENCE
        // =======================================================================
        self.phase(RunPhase::Persist);
        let persist_stats = persist(&self.store, elements).await;

        self.phase(RunPhase::Validate);
        let mut registry = UnresolvedRegistry::new();
        let validation = Validator::new(&self.store)
            .validate(elements, &mut registry)
            .await;

        // =======================================================================
        // REPORTS
        // =======================================================================
        self.phase(RunPhase::Report);
        let report_path = save_path.join(&self.config.output.report_file);
        registry
            .write_report(&report_path)
            .map_err(|e| PipelineError::io(&report_path, e))?;
        log::info!("Wrote {} unresolved names to {}", registry.len(), report_path.display());

        if let Some(name) = &self.config.output.method_order_file {
            let path = save_path.join(name);
            let mut content = method_order(elements).join("\n");
            if !content.is_empty() {
                content.push('\n');
            }
            std::fs::write(&path, content).map_err(|e| PipelineError::io(&path, e))?;
        }

        let store = self.store.stats().await?;
        Ok(RunSummary {
            started_at,
            finished_at: Utc::now(),
            files_parsed,
            files_failed,
            elements: elements.len(),
            fragments_merged,
            persist: persist_stats,
            validation,
            unresolved: registry.len(),
            store,
            report_path,
        })
    }
}

/// Parse every file into one compilation. Unreadable or unparsable files are logged and
/// skipped; the count of those is returned alongside.
fn build_compilation(files: &[PathBuf]) -> (Compilation, usize) {
    let mut builder = Compilation::builder();
    let mut failed = 0;
    for file in files {
        let location = file.to_string_lossy().replace('\\', "/");
        let source = match std::fs::read_to_string(file) {
            Ok(source) => source,
            Err(e) => {
                log::warn!("Failed to read {}: {}", location, e);
                failed += 1;
                continue;
            }
        };
        if let Err(e) = builder.add_source(&location, &source) {
            log::warn!("Skipping {}: {}", location, e);
            failed += 1;
        }
    }
    log::info!("Parsed {} files ({} skipped)", builder.len(), failed);
    (builder.build(), failed)
}

fn write_elements(path: &Path, elements: &[CodeElement]) -> Result<(), PipelineError> {
    let json = serde_json::to_string_pretty(elements)?;
    std::fs::write(path, json).map_err(|e| PipelineError::io(path, e))?;
    log::debug!("Wrote element dump to {}", path.display());
    Ok(())
}
