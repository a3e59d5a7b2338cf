mod config;
mod delta;
mod dispatch;
mod in_memory;
mod model;
mod processor;
mod resource;
mod scheduler;
mod session;
mod view;

#[cfg(test)]
mod test_util;

pub use config::{split_source_paths, ConfigError, ProjectConfig};
pub use delta::{DeltaFlags, DeltaKind, ResourceDelta};
pub use dispatch::UpdateDispatcher;
pub use in_memory::{InMemoryProjectConfig, InMemoryResourceTree};
pub use model::{
    DeltaClassifier, ModelElement, ModelRegistry, Node, NodeKind, ProjectInfo, Resolved,
    SourceFolder, SourceFolderInfo, SourceFolderKind, UpdateOp,
};
pub use resource::{
    normalize_path, ProjectId, Resource, ResourceId, ResourceKind, ResourceProvider,
};
pub use scheduler::{RebuildRequest, RebuildScheduler, REBUILD_DEBOUNCE};
pub use session::{ModelSession, ModelStats};
pub use view::{
    Executor, InlineExecutor, ProjectsOnly, RootMode, TopLevelGrouping, TreeView, WorkingSet,
};
