//! Default values for sharpgraph configuration.
//!
//! All hardcoded defaults are centralized here for easy maintenance.

// ============================================================================
// Store Defaults
// ============================================================================

/// Directory (relative to the save path) holding the embedded graph database.
pub const DEFAULT_DB_DIR: &str = "graph.db";

/// SurrealDB namespace used for the graph.
pub const DEFAULT_DB_NAMESPACE: &str = "sharpgraph";

/// SurrealDB database name used for the graph.
pub const DEFAULT_DB_DATABASE: &str = "code";

/// Clear the graph before every run.
pub const DEFAULT_PURGE_ON_START: bool = true;

// ============================================================================
// Input Defaults
// ============================================================================

/// Source file extensions picked up when walking a project directory.
pub const DEFAULT_SOURCE_EXTENSIONS: &[&str] = &["cs"];

/// Directories never walked for sources.
pub const DEFAULT_EXCLUDE_DIRS: &[&str] = &[
    // Build outputs
    "obj",
    "bin",
    // Version control
    ".git",
    ".svn",
    // IDE/Editor
    ".vs",
    ".idea",
    ".vscode",
    // Package caches
    "packages",
    "node_modules",
];

// ============================================================================
// Output Defaults
// ============================================================================

/// Unresolved external dependency report.
pub const DEFAULT_REPORT_FILE: &str = "outsideDep.txt";

/// Pretty JSON dump of every extracted element.
pub const DEFAULT_ELEMENTS_FILE: &str = "elements.json";

/// Callee-first method ordering.
pub const DEFAULT_METHOD_ORDER_FILE: &str = "method_order.txt";

// ============================================================================
// Analysis Defaults
// ============================================================================

/// Emit one element per declarator in `int a, b;` style declarations.
pub const DEFAULT_EXPAND_DECLARATORS: bool = false;

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "sharpgraph.toml";
