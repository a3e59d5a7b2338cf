use std::collections::HashSet;
use std::path::PathBuf;

use thiserror::Error;

use crate::resource::{ProjectId, Resource};

/// Failures raised by the project-configuration collaborator.
///
/// Both variants are recovered at the call site by treating the project as
/// having no source paths; they never reach the consumer.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("project has no path configuration")]
    Unavailable,

    #[error("path configuration could not be read: {0}")]
    Access(String),
}

/// The project-configuration collaborator.
///
/// Supplies, per project, the declared source paths that decide which
/// containers are promoted into source folders, and recognizes source files
/// for content-change refreshes.
pub trait ProjectConfig: Send + Sync {
    /// Whether the project has path-aware configuration at all. Projects
    /// without it contribute only plain, unwrapped resources.
    fn has_path_config(&self, project: ProjectId) -> bool;

    /// The raw, pipe-delimited source-path declaration for a project.
    fn raw_source_paths(&self, project: ProjectId) -> Result<String, ConfigError>;

    /// The resolved set of in-project source paths, normalized.
    fn source_path_set(&self, project: ProjectId) -> Result<HashSet<PathBuf>, ConfigError>;

    /// Whether the resource is a file the model treats as source.
    fn is_source_file(&self, resource: &Resource) -> bool;
}

/// Splits a raw pipe-delimited source-path declaration into trimmed,
/// non-empty entries, preserving order.
pub fn split_source_paths(raw: &str) -> Vec<String> {
    raw.split('|')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_owned)
        .collect()
}
