use serde::{Deserialize, Serialize};

use crate::resource::Resource;

/// One update operation produced by classifying a change delta.
///
/// All operations generated for one delta pass form a batch and must be
/// applied in the order generated; add/remove batches come last, after the
/// refresh/update short-circuits for the same node have already returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "op")]
pub enum UpdateOp {
    /// Structural refresh of the resource's subtree.
    Refresh { resource: Resource },

    /// In-place update of the resource's presentation.
    Update { resource: Resource },

    /// One batched structural change below `parent`. When `is_rename` is
    /// set, the consumer applies the pair as a single redraw-suppressed
    /// unit so old and new representation never flash together.
    AddRemove {
        parent: Resource,
        added: Vec<Resource>,
        removed: Vec<Resource>,
        is_rename: bool,
    },
}

impl UpdateOp {
    pub fn refresh(resource: Resource) -> UpdateOp {
        UpdateOp::Refresh { resource }
    }

    pub fn update(resource: Resource) -> UpdateOp {
        UpdateOp::Update { resource }
    }
}

/// Batch totals, for the applied-summary log line.
pub fn summarize(ops: &[UpdateOp]) -> (usize, usize, usize, usize) {
    let mut refreshes = 0;
    let mut updates = 0;
    let mut added = 0;
    let mut removed = 0;
    for op in ops {
        match op {
            UpdateOp::Refresh { .. } => refreshes += 1,
            UpdateOp::Update { .. } => updates += 1,
            UpdateOp::AddRemove {
                added: a,
                removed: r,
                ..
            } => {
                added += a.len();
                removed += r.len();
            }
        }
    }
    (refreshes, updates, added, removed)
}
