//! Input discovery for replicate tables.
//!
//! Resolves the paths given on the command line into an ordered list of
//! tables to load. Directories are walked recursively and filtered by
//! extension; hidden entries are skipped.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// Configuration for input discovery.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Table file extensions picked up inside directories (without dot).
    pub extensions: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["txt", "tsv", "csv", "dat"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl From<&crate::config::InputConfig> for ScanConfig {
    fn from(config: &crate::config::InputConfig) -> Self {
        Self {
            extensions: config.extensions.clone(),
        }
    }
}

/// One table to be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Stdin,
    File(PathBuf),
}

impl InputSource {
    /// Name used in logs and error messages.
    pub fn name(&self) -> String {
        match self {
            InputSource::Stdin => "<stdin>".to_string(),
            InputSource::File(path) => path.display().to_string(),
        }
    }
}

/// Resolves command-line paths to input tables.
pub struct InputScanner {
    config: ScanConfig,
}

impl InputScanner {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Discover all inputs, in command-line order.
    ///
    /// No paths, or a lone `-`, means standard input.
    pub fn discover(&self, paths: &[PathBuf]) -> Result<Vec<InputSource>> {
        if paths.is_empty() {
            return Ok(vec![InputSource::Stdin]);
        }

        let mut sources = Vec::new();
        for path in paths {
            if path.as_os_str() == "-" {
                if sources.contains(&InputSource::Stdin) {
                    bail!("Standard input given more than once");
                }
                sources.push(InputSource::Stdin);
            } else if path.is_dir() {
                let found = self.walk_dir(path)?;
                if found.is_empty() {
                    bail!(
                        "No table files ({}) found in {}",
                        self.config.extensions.join(", "),
                        path.display()
                    );
                }
                sources.extend(found.into_iter().map(InputSource::File));
            } else if path.is_file() {
                sources.push(InputSource::File(path.clone()));
            } else {
                bail!("Input not found: {}", path.display());
            }
        }

        Ok(sources)
    }

    /// Check if a file has one of the configured extensions.
    pub fn matches(&self, path: &Path) -> bool {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        self.config.extensions.iter().any(|e| e == ext)
    }

    fn walk_dir(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        let walker = WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

        for entry in walker {
            let entry =
                entry.with_context(|| format!("Failed to walk directory {}", dir.display()))?;
            if entry.file_type().is_file() && self.matches(entry.path()) {
                debug!("Found table: {}", entry.path().display());
                files.push(entry.into_path());
            }
        }

        files.sort();
        Ok(files)
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}
