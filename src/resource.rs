use std::path::{Path, PathBuf};

use crossbeam_channel::Receiver;
use serde::{Deserialize, Serialize};

use crate::delta::ResourceDelta;

/// Opaque identity of a resource within the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub u64);

/// Identity of a project. Every resource belongs to exactly one project; a
/// project root resource's `ProjectId` shares its numeric identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub u64);

/// The kind of a resource as reported by the resource-tree collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceKind {
    File,
    Folder,
    Project,
    /// Anything the provider cannot classify further (workspace root,
    /// linked entries, and the like).
    Other,
}

impl ResourceKind {
    pub fn is_container(self) -> bool {
        matches!(self, ResourceKind::Folder | ResourceKind::Project)
    }
}

/// Value handle to an external file-system entry.
///
/// Resources are owned by the provider; the engine never creates or deletes
/// them, only observes them. Handles are cheap to clone and compare by
/// identity, not by path.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: ResourceId,
    pub project: ProjectId,
    pub kind: ResourceKind,
    pub path: PathBuf,
}

impl Resource {
    pub fn is_container(&self) -> bool {
        self.kind.is_container()
    }

    /// The final path segment, used for display and diagnostics.
    pub fn name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl std::hash::Hash for Resource {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// The resource-tree collaborator.
///
/// Implementations wrap whatever actually owns the file-system tree (a
/// workspace, a daemon connection, an in-memory fixture). All queries must be
/// callable from any thread, and environment failures are expected to degrade
/// to the empty/None/false defaults rather than surface — the engine cannot
/// usefully react to them mid-update.
pub trait ResourceProvider: Send + Sync {
    /// The synthetic root above all projects.
    fn workspace_root(&self) -> Resource;

    /// Direct children of a resource, or empty if it has none or cannot be
    /// enumerated.
    fn children(&self, resource: &Resource) -> Vec<Resource>;

    /// The parent of a resource, or None at the workspace root.
    fn parent(&self, resource: &Resource) -> Option<Resource>;

    /// Whether the resource currently exists and can be read.
    fn is_accessible(&self, resource: &Resource) -> bool;

    /// Whether the given project is open. Closed projects contribute nothing
    /// to the model.
    fn is_open(&self, project: ProjectId) -> bool;

    /// The root resource of a project, if it still exists.
    fn project_root(&self, project: ProjectId) -> Option<Resource>;

    /// A project's location path, used when rebuilding its source-folder
    /// set. None if the location cannot be determined.
    fn location(&self, project: ProjectId) -> Option<PathBuf>;

    /// The channel on which the provider delivers change-delta trees.
    fn event_receiver(&self) -> Receiver<ResourceDelta>;
}

/// Normalizes a workspace path for set membership tests: strips `.`
/// components, folds `..`, and drops trailing separators.
pub fn normalize_path(path: &Path) -> PathBuf {
    use std::path::Component;

    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
