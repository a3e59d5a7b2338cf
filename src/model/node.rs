use std::collections::HashMap;
use std::path::Path;

use crate::resource::{Resource, ResourceId, ResourceKind};
use crate::view::WorkingSet;

/// The variant of a wrapped, non-source-folder node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Folder,
    File,
    /// A resource that is neither a file nor a plain folder (for example a
    /// nested project). Rendered, but never recursed into by the model.
    Generic,
}

impl NodeKind {
    pub fn for_resource(kind: ResourceKind) -> NodeKind {
        match kind {
            ResourceKind::Folder => NodeKind::Folder,
            ResourceKind::File => NodeKind::File,
            ResourceKind::Project | ResourceKind::Other => NodeKind::Generic,
        }
    }
}

/// A wrapped resource below a source folder.
///
/// Back-references are non-owning handles: ownership flows strictly downward
/// from the source folder's child map, navigation flows upward through the
/// parent handle and the owning folder's id.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub resource: Resource,
    pub kind: NodeKind,
    /// The resource of the element this node appeared under.
    pub parent: Resource,
    /// Identity of the source folder that owns this node.
    pub source_folder: ResourceId,
}

impl Node {
    pub fn new(parent: &Resource, resource: Resource, source_folder: ResourceId) -> Node {
        let kind = NodeKind::for_resource(resource.kind);
        Node {
            resource,
            kind,
            parent: parent.clone(),
            source_folder,
        }
    }
}

/// Which variant of source folder a container became.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFolderKind {
    /// The project root itself is on the source path.
    ProjectRoot,
    /// An ordinary folder on the source path.
    Folder,
}

/// A container promoted into the model because it lies on its project's
/// declared source path. Owns the wrapped nodes beneath it.
#[derive(Debug)]
pub struct SourceFolder {
    resource: Resource,
    kind: SourceFolderKind,
    parent: Resource,
    children: HashMap<ResourceId, Node>,
}

impl SourceFolder {
    /// Wraps a container. Panics if handed a non-container resource: only
    /// projects and folders can reach source-folder construction, anything
    /// else is a logic bug upstream, not an environmental failure.
    pub fn new(parent: &Resource, resource: Resource) -> SourceFolder {
        let kind = match resource.kind {
            ResourceKind::Project => SourceFolderKind::ProjectRoot,
            ResourceKind::Folder => SourceFolderKind::Folder,
            other => panic!("source folder cannot wrap a {other:?} resource"),
        };

        SourceFolder {
            resource,
            kind,
            parent: parent.clone(),
            children: HashMap::new(),
        }
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn id(&self) -> ResourceId {
        self.resource.id
    }

    pub fn kind(&self) -> SourceFolderKind {
        self.kind
    }

    pub fn path(&self) -> &Path {
        &self.resource.path
    }

    pub fn child(&self, id: ResourceId) -> Option<&Node> {
        self.children.get(&id)
    }

    pub fn insert_child(&mut self, node: Node) {
        self.children.insert(node.resource.id, node);
    }

    pub fn remove_child(&mut self, id: ResourceId) -> Option<Node> {
        self.children.remove(&id)
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn info(&self) -> SourceFolderInfo {
        SourceFolderInfo {
            resource: self.resource.clone(),
            kind: self.kind,
            parent: self.parent.clone(),
        }
    }
}

/// Lightweight value view of a source folder, handed to the display.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFolderInfo {
    pub resource: Resource,
    pub kind: SourceFolderKind,
    pub parent: Resource,
}

/// What the display consumes: either something from the derived model, or a
/// raw resource the model has no representation for (the identity fallback,
/// so callers can always render something).
#[derive(Debug, Clone, PartialEq)]
pub enum ModelElement {
    Resource(Resource),
    Node(Node),
    SourceFolder(SourceFolderInfo),
    WorkingSet(WorkingSet),
}

impl ModelElement {
    /// The underlying resource, for every variant that has one.
    pub fn resource(&self) -> Option<&Resource> {
        match self {
            ModelElement::Resource(resource) => Some(resource),
            ModelElement::Node(node) => Some(&node.resource),
            ModelElement::SourceFolder(info) => Some(&info.resource),
            ModelElement::WorkingSet(_) => None,
        }
    }
}
