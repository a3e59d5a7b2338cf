use std::sync::Arc;

use crate::config::ProjectConfig;
use crate::delta::{DeltaKind, ResourceDelta};
use crate::resource::{ResourceKind, ResourceProvider};

use super::UpdateOp;

/// Walks a change-delta tree and decides, per node, whether to refresh a
/// whole subtree, update a node in place, or process added/removed children
/// as one batch.
///
/// The rules are ordered; the first matching rule terminates processing for
/// the node. A child changing kind invalidates incremental diffing for the
/// entire subtree (mapping that change to a remove plus an add is too dicey),
/// which is why rule 1 is checked before anything else.
pub struct DeltaClassifier {
    resources: Arc<dyn ResourceProvider>,
    config: Arc<dyn ProjectConfig>,
}

impl DeltaClassifier {
    pub fn new(resources: Arc<dyn ResourceProvider>, config: Arc<dyn ProjectConfig>) -> Self {
        DeltaClassifier { resources, config }
    }

    /// Classifies one delta pass into an ordered operation batch.
    pub fn classify(&self, delta: &ResourceDelta) -> Vec<UpdateOp> {
        let mut ops = Vec::new();
        self.process(delta, &mut ops);
        ops
    }

    fn process(&self, delta: &ResourceDelta, ops: &mut Vec<UpdateOp>) {
        let resource = &delta.resource;

        // 1. A changed child whose kind changed: full refresh of this
        //    parent, nothing incremental below it can be trusted.
        if delta
            .children_of(DeltaKind::Changed)
            .any(|child| child.flags.kind_changed)
        {
            ops.push(UpdateOp::refresh(resource.clone()));
            return;
        }

        // 2. Opening only affects presentation, but closing must refresh:
        //    children not yet materialized in the tree still change.
        if delta.flags.open {
            if self.resources.is_accessible(resource) {
                ops.push(UpdateOp::update(resource.clone()));
            } else {
                ops.push(UpdateOp::refresh(resource.clone()));
                return;
            }
        }

        // 3. Label-affecting flags update in place.
        if delta.flags.sync || delta.flags.kind_changed || delta.flags.description {
            ops.push(UpdateOp::update(resource.clone()));
        }

        // 4. Replacement may affect both label and children.
        if delta.flags.replaced {
            ops.push(UpdateOp::refresh(resource.clone()));
            return;
        }

        // 5. Content changes refresh recognized source files and never
        //    recurse further.
        if delta.flags.changed || delta.flags.content {
            if resource.kind == ResourceKind::File && self.config.is_source_file(resource) {
                ops.push(UpdateOp::refresh(resource.clone()));
            }
            return;
        }

        // 6. Descend into changed children.
        for child in delta.children_of(DeltaKind::Changed) {
            self.process(child, ops);
        }

        // 7. Batch structural additions and removals under this node.
        let added_children: Vec<&ResourceDelta> = delta.children_of(DeltaKind::Added).collect();
        let removed_children: Vec<&ResourceDelta> = delta.children_of(DeltaKind::Removed).collect();

        if added_children.is_empty() && removed_children.is_empty() {
            return;
        }

        let moved_from = added_children
            .iter()
            .filter(|child| child.flags.moved_from)
            .count();
        let moved_to = removed_children
            .iter()
            .filter(|child| child.flags.moved_to)
            .count();
        // Heuristic test for items moving within the same parent: at least
        // one end of a move on each side, not necessarily the same pair.
        let is_rename = moved_from > 0 && moved_to > 0;

        let added: Vec<_> = added_children
            .iter()
            .map(|child| child.resource.clone())
            .collect();
        let removed: Vec<_> = removed_children
            .iter()
            .map(|child| child.resource.clone())
            .collect();

        log::trace!(
            "structural change under {}: {} added, {} removed, rename={}",
            resource.path.display(),
            added.len(),
            removed.len(),
            is_rename
        );

        ops.push(UpdateOp::AddRemove {
            parent: resource.clone(),
            added,
            removed,
            is_rename,
        });
    }
}
