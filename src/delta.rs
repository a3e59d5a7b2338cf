use serde::{Deserialize, Serialize};

use crate::resource::Resource;

/// How a delta node relates to its parent: the resource changed in place,
/// appeared, or disappeared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeltaKind {
    Changed,
    Added,
    Removed,
}

/// Change flags carried by a single delta node.
///
/// The set is closed: providers deliver deltas already structured with these
/// flags, never raw OS events. `moved_from`/`moved_to` are move-correlation
/// markers set on added/removed children that participated in a move.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeltaFlags {
    pub open: bool,
    pub kind_changed: bool,
    pub sync: bool,
    pub description: bool,
    pub content: bool,
    pub replaced: bool,
    pub changed: bool,
    pub moved_from: bool,
    pub moved_to: bool,
}

/// One node of a structured change-delta tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDelta {
    pub resource: Resource,
    pub kind: DeltaKind,
    #[serde(default)]
    pub flags: DeltaFlags,
    #[serde(default)]
    pub children: Vec<ResourceDelta>,
}

impl ResourceDelta {
    pub fn new(resource: Resource, kind: DeltaKind) -> Self {
        ResourceDelta {
            resource,
            kind,
            flags: DeltaFlags::default(),
            children: Vec::new(),
        }
    }

    pub fn changed(resource: Resource) -> Self {
        Self::new(resource, DeltaKind::Changed)
    }

    pub fn added(resource: Resource) -> Self {
        Self::new(resource, DeltaKind::Added)
    }

    pub fn removed(resource: Resource) -> Self {
        Self::new(resource, DeltaKind::Removed)
    }

    pub fn with_flags(mut self, flags: DeltaFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_child(mut self, child: ResourceDelta) -> Self {
        self.children.push(child);
        self
    }

    /// Child deltas of the given kind, in delivery order.
    pub fn children_of(&self, kind: DeltaKind) -> impl Iterator<Item = &ResourceDelta> {
        self.children.iter().filter(move |child| child.kind == kind)
    }
}
