//! In-memory implementations of the external collaborators, useful for
//! embedding tests and for exercising the engine without a real workspace.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crossbeam_channel::{Receiver, Sender};

use crate::config::{split_source_paths, ConfigError, ProjectConfig};
use crate::delta::ResourceDelta;
use crate::resource::{
    normalize_path, ProjectId, Resource, ResourceId, ResourceKind, ResourceProvider,
};

struct Entry {
    resource: Resource,
    parent: Option<ResourceId>,
    children: Vec<ResourceId>,
    accessible: bool,
}

struct TreeState {
    entries: HashMap<ResourceId, Entry>,
    open_projects: HashSet<ProjectId>,
    next_id: u64,
}

/// A simple in-memory resource tree.
///
/// Mutations only change the stored tree; change deltas are delivered
/// separately through [`InMemoryResourceTree::raise`], mirroring how a real
/// provider's notification channel is decoupled from its query surface.
pub struct InMemoryResourceTree {
    state: Mutex<TreeState>,
    root: Resource,
    event_sender: Sender<ResourceDelta>,
    event_receiver: Receiver<ResourceDelta>,
}

impl InMemoryResourceTree {
    pub fn new() -> InMemoryResourceTree {
        let root = Resource {
            id: ResourceId(0),
            project: ProjectId(0),
            kind: ResourceKind::Other,
            path: PathBuf::from("/"),
        };

        let mut entries = HashMap::new();
        entries.insert(
            root.id,
            Entry {
                resource: root.clone(),
                parent: None,
                children: Vec::new(),
                accessible: true,
            },
        );

        let (event_sender, event_receiver) = crossbeam_channel::unbounded();

        InMemoryResourceTree {
            state: Mutex::new(TreeState {
                entries,
                open_projects: HashSet::new(),
                next_id: 1,
            }),
            root,
            event_sender,
            event_receiver,
        }
    }

    /// Creates an open project directly below the workspace root.
    pub fn create_project(&self, name: &str) -> Resource {
        let mut state = self.state.lock().unwrap();
        let id = ResourceId(state.next_id);
        state.next_id += 1;

        let resource = Resource {
            id,
            project: ProjectId(id.0),
            kind: ResourceKind::Project,
            path: self.root.path.join(name),
        };
        state.open_projects.insert(resource.project);
        Self::insert(&mut state, resource.clone(), Some(self.root.id));
        resource
    }

    pub fn create_folder(&self, parent: &Resource, name: &str) -> Resource {
        self.create_child(parent, name, ResourceKind::Folder)
    }

    pub fn create_file(&self, parent: &Resource, name: &str) -> Resource {
        self.create_child(parent, name, ResourceKind::File)
    }

    pub fn create_child(&self, parent: &Resource, name: &str, kind: ResourceKind) -> Resource {
        let mut state = self.state.lock().unwrap();
        let id = ResourceId(state.next_id);
        state.next_id += 1;

        let resource = Resource {
            id,
            project: parent.project,
            kind,
            path: parent.path.join(name),
        };
        Self::insert(&mut state, resource.clone(), Some(parent.id));
        resource
    }

    fn insert(state: &mut TreeState, resource: Resource, parent: Option<ResourceId>) {
        if let Some(parent_id) = parent {
            if let Some(parent_entry) = state.entries.get_mut(&parent_id) {
                parent_entry.children.push(resource.id);
            }
        }
        state.entries.insert(
            resource.id,
            Entry {
                resource,
                parent,
                children: Vec::new(),
                accessible: true,
            },
        );
    }

    /// Removes a resource and its subtree from the stored tree. Does not
    /// raise a delta; callers decide what notification, if any, to deliver.
    pub fn remove(&self, resource: &Resource) {
        let mut state = self.state.lock().unwrap();

        let parent = state
            .entries
            .get(&resource.id)
            .and_then(|entry| entry.parent);
        if let Some(parent_id) = parent {
            if let Some(parent_entry) = state.entries.get_mut(&parent_id) {
                parent_entry.children.retain(|&child| child != resource.id);
            }
        }

        let mut queue = vec![resource.id];
        while let Some(id) = queue.pop() {
            if let Some(entry) = state.entries.remove(&id) {
                queue.extend(entry.children);
            }
        }
    }

    pub fn set_open(&self, project: ProjectId, open: bool) {
        let mut state = self.state.lock().unwrap();
        if open {
            state.open_projects.insert(project);
        } else {
            state.open_projects.remove(&project);
        }
    }

    pub fn set_accessible(&self, resource: &Resource, accessible: bool) {
        let mut state = self.state.lock().unwrap();
        if let Some(entry) = state.entries.get_mut(&resource.id) {
            entry.accessible = accessible;
        }
    }

    /// Delivers a change-delta tree on the notification channel.
    pub fn raise(&self, delta: ResourceDelta) {
        let _ = self.event_sender.send(delta);
    }
}

impl Default for InMemoryResourceTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceProvider for InMemoryResourceTree {
    fn workspace_root(&self) -> Resource {
        self.root.clone()
    }

    fn children(&self, resource: &Resource) -> Vec<Resource> {
        let state = self.state.lock().unwrap();
        state
            .entries
            .get(&resource.id)
            .map(|entry| {
                entry
                    .children
                    .iter()
                    .filter_map(|id| state.entries.get(id))
                    .map(|child| child.resource.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn parent(&self, resource: &Resource) -> Option<Resource> {
        let state = self.state.lock().unwrap();
        let parent_id = state.entries.get(&resource.id)?.parent?;
        state
            .entries
            .get(&parent_id)
            .map(|entry| entry.resource.clone())
    }

    fn is_accessible(&self, resource: &Resource) -> bool {
        let state = self.state.lock().unwrap();
        let Some(entry) = state.entries.get(&resource.id) else {
            return false;
        };
        if !entry.accessible {
            return false;
        }
        match resource.kind {
            ResourceKind::Project => state.open_projects.contains(&resource.project),
            _ => true,
        }
    }

    fn is_open(&self, project: ProjectId) -> bool {
        self.state.lock().unwrap().open_projects.contains(&project)
    }

    fn project_root(&self, project: ProjectId) -> Option<Resource> {
        let state = self.state.lock().unwrap();
        state
            .entries
            .get(&ResourceId(project.0))
            .map(|entry| entry.resource.clone())
    }

    fn location(&self, project: ProjectId) -> Option<PathBuf> {
        self.project_root(project).map(|root| root.path)
    }

    fn event_receiver(&self) -> Receiver<ResourceDelta> {
        self.event_receiver.clone()
    }
}

/// In-memory project configuration: raw pipe-delimited source-path
/// declarations per project, plus the set of file extensions recognized as
/// source.
pub struct InMemoryProjectConfig {
    raw_paths: Mutex<HashMap<ProjectId, String>>,
    source_extensions: Mutex<HashSet<String>>,
}

impl InMemoryProjectConfig {
    pub fn new() -> InMemoryProjectConfig {
        InMemoryProjectConfig {
            raw_paths: Mutex::new(HashMap::new()),
            source_extensions: Mutex::new(HashSet::new()),
        }
    }

    /// Declares a project's source paths as a raw pipe-delimited string.
    pub fn set_source_paths(&self, project: ProjectId, raw: &str) {
        self.raw_paths
            .lock()
            .unwrap()
            .insert(project, raw.to_owned());
    }

    /// Removes a project's path configuration entirely.
    pub fn clear_source_paths(&self, project: ProjectId) {
        self.raw_paths.lock().unwrap().remove(&project);
    }

    pub fn add_source_extension(&self, extension: &str) {
        self.source_extensions
            .lock()
            .unwrap()
            .insert(extension.to_owned());
    }
}

impl Default for InMemoryProjectConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectConfig for InMemoryProjectConfig {
    fn has_path_config(&self, project: ProjectId) -> bool {
        self.raw_paths.lock().unwrap().contains_key(&project)
    }

    fn raw_source_paths(&self, project: ProjectId) -> Result<String, ConfigError> {
        self.raw_paths
            .lock()
            .unwrap()
            .get(&project)
            .cloned()
            .ok_or(ConfigError::Unavailable)
    }

    fn source_path_set(&self, project: ProjectId) -> Result<HashSet<PathBuf>, ConfigError> {
        let raw = self.raw_source_paths(project)?;
        Ok(split_source_paths(&raw)
            .iter()
            .map(|entry| normalize_path(Path::new(entry)))
            .collect())
    }

    fn is_source_file(&self, resource: &Resource) -> bool {
        if resource.kind != ResourceKind::File {
            return false;
        }
        let Some(extension) = resource.path.extension().and_then(|ext| ext.to_str()) else {
            return false;
        };
        self.source_extensions.lock().unwrap().contains(extension)
    }
}

#[cfg(test)]
mod test {
    use maplit::hashset;

    use super::*;

    #[test]
    fn source_path_set_is_split_and_normalized() {
        let config = InMemoryProjectConfig::new();
        let project = ProjectId(1);
        config.set_source_paths(project, "/p/src/| /p/lib |");

        assert_eq!(
            config.source_path_set(project).unwrap(),
            hashset! { PathBuf::from("/p/src"), PathBuf::from("/p/lib") }
        );

        config.clear_source_paths(project);
        assert!(matches!(
            config.source_path_set(project),
            Err(ConfigError::Unavailable)
        ));
    }

    #[test]
    fn tree_mutations_are_visible_through_the_provider() {
        let tree = InMemoryResourceTree::new();
        let project = tree.create_project("p");
        let folder = tree.create_folder(&project, "src");
        let file = tree.create_file(&folder, "a.src");

        assert_eq!(tree.children(&project), vec![folder.clone()]);
        assert_eq!(tree.parent(&file), Some(folder.clone()));
        assert_eq!(tree.location(project.project), Some(PathBuf::from("/p")));
        assert!(tree.is_accessible(&project));

        tree.set_open(project.project, false);
        assert!(!tree.is_accessible(&project));

        tree.remove(&folder);
        assert!(tree.children(&project).is_empty());
        assert!(!tree.is_accessible(&file));
    }
}
