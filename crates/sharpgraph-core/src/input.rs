//! Batch input resolution: solutions, projects, directories and single files.

use ignore::WalkBuilder;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::InputConfig;

/// Directory names that never contain sources, whatever the configuration says.
const BUILD_OUTPUT_DIRS: &[&str] = &["obj", "bin"];

/// `Project("{type-guid}") = "Name", "rel\path\Name.csproj", "{guid}"`
const SOLUTION_PROJECT_PATTERN: &str =
    r#"Project\("\{[^}]+\}"\)\s*=\s*"[^"]+"\s*,\s*"([^"]+\.csproj)""#;

/// Invalid batch input. Any of these aborts the run before processing starts.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("Input not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Unsupported input {}: expected a .sln, .csproj or source file, or a directory", .0.display())]
    Unsupported(PathBuf),

    #[error("Solution {} lists no projects", .0.display())]
    EmptySolution(PathBuf),

    #[error("No input paths given")]
    NoInputs,

    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl InputError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        InputError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Expands input descriptors into the source files of one session.
pub struct InputResolver {
    extensions: Vec<String>,
    exclude_dirs: Vec<String>,
}

impl InputResolver {
    pub fn new(config: &InputConfig) -> Self {
        Self {
            extensions: config
                .extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            exclude_dirs: config.exclude_dirs.clone(),
        }
    }

    /// Source files for `inputs`, in input order, each path at most once.
    pub fn resolve(&self, inputs: &[PathBuf]) -> Result<Vec<PathBuf>, InputError> {
        if inputs.is_empty() {
            return Err(InputError::NoInputs);
        }

        let mut seen: HashSet<PathBuf> = HashSet::new();
        let mut files = Vec::new();
        for input in inputs {
            for file in self.expand(input)? {
                let identity = std::fs::canonicalize(&file).unwrap_or_else(|_| file.clone());
                if seen.insert(identity) {
                    files.push(file);
                } else {
                    log::debug!("Skipping already collected {}", file.display());
                }
            }
        }

        log::info!("Resolved {} source files from {} inputs", files.len(), inputs.len());
        Ok(files)
    }

    fn expand(&self, input: &Path) -> Result<Vec<PathBuf>, InputError> {
        if !input.exists() {
            return Err(InputError::NotFound(input.to_path_buf()));
        }
        if input.is_dir() {
            return Ok(self.walk(input));
        }

        match extension_of(input).as_deref() {
            Some("sln") => self.solution_files(input),
            Some("csproj") => Ok(self.project_files(input)),
            Some(ext) if self.is_source_extension(ext) => Ok(vec![input.to_path_buf()]),
            _ => Err(InputError::Unsupported(input.to_path_buf())),
        }
    }

    /// Project paths listed in a solution, relative entries resolved against its directory.
    pub fn solution_projects(&self, solution: &Path) -> Result<Vec<PathBuf>, InputError> {
        let content =
            std::fs::read_to_string(solution).map_err(|e| InputError::io(solution, e))?;
        let re = match Regex::new(SOLUTION_PROJECT_PATTERN) {
            Ok(r) => r,
            Err(e) => {
                log::warn!("Invalid solution pattern: {}", e);
                return Err(InputError::EmptySolution(solution.to_path_buf()));
            }
        };
        let base = solution.parent().unwrap_or_else(|| Path::new(""));
        let projects: Vec<PathBuf> = re
            .captures_iter(&content)
            .map(|caps| base.join(caps[1].replace('\\', "/")))
            .collect();
        if projects.is_empty() {
            return Err(InputError::EmptySolution(solution.to_path_buf()));
        }
        Ok(projects)
    }

    fn solution_files(&self, solution: &Path) -> Result<Vec<PathBuf>, InputError> {
        let mut files = Vec::new();
        for project in self.solution_projects(solution)? {
            if !project.is_file() {
                log::warn!(
                    "Project {} listed in {} not found; skipping",
                    project.display(),
                    solution.display()
                );
                continue;
            }
            files.extend(self.project_files(&project));
        }
        Ok(files)
    }

    /// A project compiles every source file under its directory.
    fn project_files(&self, project: &Path) -> Vec<PathBuf> {
        match project.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => self.walk(dir),
            _ => self.walk(Path::new(".")),
        }
    }

    fn walk(&self, root: &Path) -> Vec<PathBuf> {
        let walker = WalkBuilder::new(root)
            .hidden(true)
            .git_ignore(true)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        let mut files = Vec::new();
        for entry in walker.flatten() {
            let path = entry.path();
            if !path.is_file() || !self.should_collect(root, path) {
                continue;
            }
            files.push(path.to_path_buf());
        }
        log::debug!("{}: {} source files", root.display(), files.len());
        files
    }

    fn should_collect(&self, root: &Path, path: &Path) -> bool {
        let Some(ext) = extension_of(path) else {
            return false;
        };
        if !self.is_source_extension(&ext) {
            return false;
        }
        let relative = path.strip_prefix(root).unwrap_or(path);
        !relative.components().any(|c| {
            let name = c.as_os_str().to_string_lossy();
            BUILD_OUTPUT_DIRS.contains(&name.as_ref())
                || self.exclude_dirs.iter().any(|d| d == name.as_ref())
        })
    }

    fn is_source_extension(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e == ext)
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}
