use serde::{Deserialize, Serialize};

use crate::model::ModelElement;
use crate::resource::Resource;

/// What the top level of the tree shows: raw projects, or an external
/// grouping of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RootMode {
    Projects,
    WorkingSets,
}

/// Handle to one external top-level group. The engine treats groups as
/// opaque: it only ever lists their members and maps members back to them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingSet {
    pub name: String,
}

/// External classifier deciding the top-level grouping.
pub trait TopLevelGrouping: Send + Sync {
    fn root_mode(&self) -> RootMode {
        RootMode::Projects
    }

    fn working_sets(&self) -> Vec<WorkingSet> {
        Vec::new()
    }

    fn members(&self, _group: &WorkingSet) -> Vec<Resource> {
        Vec::new()
    }

    /// The group owning a project, if the grouping is active and knows it.
    fn group_of(&self, _project: &Resource) -> Option<WorkingSet> {
        None
    }
}

/// The default grouping: top-level entries are raw projects.
pub struct ProjectsOnly;

impl TopLevelGrouping for ProjectsOnly {}

/// The display collaborator.
///
/// Consumes batched update operations. All methods are invoked only from the
/// consumer's execution context (see [`Executor`]); `is_busy` and `is_live`
/// are polled before every dispatch.
pub trait TreeView: Send + Sync {
    /// Whether the underlying surface still exists. Once false, pending work
    /// is discarded and no further calls are made.
    fn is_live(&self) -> bool;

    /// Whether the view is currently mid-update. Batches produced while busy
    /// are deferred, not dropped.
    fn is_busy(&self) -> bool;

    fn add(&self, parent: &ModelElement, children: &[ModelElement]);

    fn remove(&self, elements: &[ModelElement]);

    /// Structural refresh of an element's subtree.
    fn refresh(&self, element: &ModelElement);

    /// In-place update of an element's presentation, no structural change.
    fn update(&self, element: &ModelElement);

    /// Suppress or restore redraw around combined add/remove pairs.
    fn set_redraw(&self, redraw: bool);
}

/// The consumer's execution context, passed explicitly so the engine can be
/// exercised without a real display surface.
pub trait Executor: Send + Sync {
    /// Whether the calling thread already is the consumer's context.
    fn is_dispatch_thread(&self) -> bool;

    /// Submit a job to run on the consumer's context without blocking the
    /// caller.
    fn spawn(&self, job: Box<dyn FnOnce() + Send>);
}

/// An executor whose context is wherever the caller already is: jobs run
/// synchronously, in submission order.
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn is_dispatch_thread(&self) -> bool {
        true
    }

    fn spawn(&self, job: Box<dyn FnOnce() + Send>) {
        job();
    }
}
