use std::collections::{BTreeMap, HashMap};

use crate::resource::{ProjectId, Resource, ResourceId};

use super::{ModelElement, Node, SourceFolder, SourceFolderInfo};

/// Per-project model state: the set of source folders found so far.
///
/// Folders are keyed by their container's identity in a `BTreeMap` so that
/// iteration during resolution is deterministic.
#[derive(Debug, Default)]
pub struct ProjectInfo {
    source_folders: BTreeMap<ResourceId, SourceFolder>,
}

impl ProjectInfo {
    pub fn source_folders(&self) -> impl Iterator<Item = &SourceFolder> {
        self.source_folders.values()
    }

    pub fn source_folder_count(&self) -> usize {
        self.source_folders.len()
    }

    pub fn node_count(&self) -> usize {
        self.source_folders
            .values()
            .map(SourceFolder::child_count)
            .sum()
    }
}

/// Result of resolving a resource against the model.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    SourceFolder(SourceFolderInfo),
    Node(Node),
}

impl Resolved {
    pub fn into_element(self) -> ModelElement {
        match self {
            Resolved::SourceFolder(info) => ModelElement::SourceFolder(info),
            Resolved::Node(node) => ModelElement::Node(node),
        }
    }

    pub fn is_source_folder(&self) -> bool {
        matches!(self, Resolved::SourceFolder(_))
    }
}

/// The registry of all per-project model state.
///
/// The registry is shared mutable state: the engine keeps exactly one behind
/// a single mutex, and every lookup-then-mutate pair (notably
/// [`ModelRegistry::resolve`] with removal) is one call so it executes as one
/// critical section. Two deltas racing to wrap the same resource therefore
/// cannot both create a wrapper.
#[derive(Debug)]
pub struct ModelRegistry {
    /// None once the registry has been torn down; every query then reports
    /// an empty model.
    projects: Option<HashMap<ProjectId, ProjectInfo>>,
}

impl ModelRegistry {
    pub fn new() -> ModelRegistry {
        ModelRegistry {
            projects: Some(HashMap::new()),
        }
    }

    /// Tears the registry down. Subsequent lookups observe an empty model;
    /// mutation requests are ignored.
    pub fn dispose(&mut self) {
        self.projects = None;
    }

    pub fn is_disposed(&self) -> bool {
        self.projects.is_none()
    }

    /// Project state, created lazily for open projects.
    ///
    /// Returns None if the registry is disposed or the project is closed; a
    /// closed project's stale state is dropped on observation.
    pub fn project_info(&mut self, project: ProjectId, is_open: bool) -> Option<&mut ProjectInfo> {
        let projects = self.projects.as_mut()?;

        if !is_open {
            projects.remove(&project);
            return None;
        }

        Some(projects.entry(project).or_default())
    }

    /// Removes every trace of a project from the model.
    pub fn remove_project(&mut self, project: ProjectId) {
        if let Some(projects) = self.projects.as_mut() {
            projects.remove(&project);
        }
    }

    /// Registers a source folder under its project. Returns false if the
    /// registry is disposed or the project is closed.
    pub fn add_source_folder(&mut self, folder: SourceFolder, is_open: bool) -> bool {
        let project = folder.resource().project;
        match self.project_info(project, is_open) {
            Some(info) => {
                log::trace!(
                    "registering source folder {} for project {:?}",
                    folder.path().display(),
                    project
                );
                info.source_folders.insert(folder.id(), folder);
                true
            }
            None => false,
        }
    }

    /// Removes a source folder (and every node it owns) by identity.
    pub fn remove_source_folder(
        &mut self,
        project: ProjectId,
        id: ResourceId,
    ) -> Option<SourceFolder> {
        let info = self.projects.as_mut()?.get_mut(&project)?;
        info.source_folders.remove(&id)
    }

    /// Read-only handles to a project's source folders; empty when the
    /// project has no state.
    pub fn source_folders(&self, project: ProjectId) -> Vec<SourceFolderInfo> {
        self.projects
            .as_ref()
            .and_then(|projects| projects.get(&project))
            .map(|info| {
                info.source_folders
                    .values()
                    .map(SourceFolder::info)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Resolves a resource to its model representation, searching every
    /// source folder of the resource's project: a folder matches directly if
    /// it wraps the resource itself, otherwise through its child map. First
    /// match wins.
    ///
    /// With `remove_if_found`, the matched entry is removed from its owning
    /// container in the same critical section before being returned. Returns
    /// None on a miss; the identity fallback is the caller's policy.
    pub fn resolve(
        &mut self,
        resource: &Resource,
        remove_if_found: bool,
        is_open: bool,
    ) -> Option<Resolved> {
        let info = self.project_info(resource.project, is_open)?;

        let mut matched_folder = None;
        let mut matched_child = None;
        for folder in info.source_folders.values() {
            if folder.resource() == resource {
                matched_folder = Some(folder.id());
                break;
            }
            if folder.child(resource.id).is_some() {
                matched_child = Some(folder.id());
                break;
            }
        }

        if let Some(id) = matched_folder {
            let found = info.source_folders.get(&id).expect("folder just matched");
            let resolved = Resolved::SourceFolder(found.info());
            if remove_if_found {
                info.source_folders.remove(&id);
            }
            return Some(resolved);
        }

        if let Some(id) = matched_child {
            let folder = info
                .source_folders
                .get_mut(&id)
                .expect("folder just matched");
            let resolved = if remove_if_found {
                folder.remove_child(resource.id).expect("child just matched")
            } else {
                folder.child(resource.id).expect("child just matched").clone()
            };
            return Some(Resolved::Node(resolved));
        }

        None
    }

    /// Removes and returns a wrapped node, leaving source folders untouched.
    /// Used when re-attaching an existing wrapper during child enumeration.
    pub fn take_node(&mut self, resource: &Resource, is_open: bool) -> Option<Node> {
        let info = self.project_info(resource.project, is_open)?;
        for folder in info.source_folders.values_mut() {
            if let Some(node) = folder.remove_child(resource.id) {
                return Some(node);
            }
        }
        None
    }

    /// Inserts a node into the child map of its owning source folder.
    /// Returns false (dropping the node) if that folder no longer exists.
    pub fn attach_child(&mut self, node: Node) -> bool {
        let project = node.resource.project;
        let Some(info) = self
            .projects
            .as_mut()
            .and_then(|projects| projects.get_mut(&project))
        else {
            return false;
        };

        match info.source_folders.get_mut(&node.source_folder) {
            Some(folder) => {
                folder.insert_child(node);
                true
            }
            None => false,
        }
    }

    /// (projects, source folders, wrapped nodes) currently in the model.
    pub fn counts(&self) -> (usize, usize, usize) {
        match self.projects.as_ref() {
            Some(projects) => {
                let folders = projects.values().map(ProjectInfo::source_folder_count).sum();
                let nodes = projects.values().map(ProjectInfo::node_count).sum();
                (projects.len(), folders, nodes)
            }
            None => (0, 0, 0),
        }
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}
