use std::sync::{Arc, Mutex};

use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};

use crate::config::{split_source_paths, ProjectConfig};
use crate::delta::ResourceDelta;
use crate::dispatch::{OpApplier, UpdateDispatcher};
use crate::model::{
    DeltaClassifier, ModelElement, ModelRegistry, Node, NodeKind, Resolved, SourceFolder,
};
use crate::processor::DeltaProcessor;
use crate::resource::{normalize_path, Resource, ResourceKind, ResourceProvider};
use crate::scheduler::{RebuildRequest, RebuildScheduler};
use crate::view::{Executor, RootMode, TopLevelGrouping, TreeView};

/// Counts of what the derived model currently holds, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelStats {
    pub projects: usize,
    pub source_folders: usize,
    pub nodes: usize,
}

/// Contains all of the state for one model-synchronization session: the
/// source-folder registry, the background threads that consume change deltas
/// and debounce rebuilds, and the dispatcher that marshals update batches to
/// the display.
///
/// Nothing here is specific to any particular display technology; the view,
/// its execution context, and the top-level grouping are all supplied as
/// capabilities so the same engine runs against a real widget or a test
/// harness.
pub struct ModelSession {
    /// SHOULD BE DROPPED FIRST! The background threads talk to the rest of
    /// the session via channels; dropping them first lets them finish their
    /// current work before shared state goes away.
    #[allow(unused)]
    processor: DeltaProcessor,
    #[allow(unused)]
    scheduler: RebuildScheduler,

    registry: Arc<Mutex<ModelRegistry>>,
    resources: Arc<dyn ResourceProvider>,
    config: Arc<dyn ProjectConfig>,
    grouping: Arc<dyn TopLevelGrouping>,
    dispatcher: Arc<UpdateDispatcher>,
    classifier: DeltaClassifier,
    rebuild_sender: Sender<RebuildRequest>,
}

impl ModelSession {
    /// Starts a new session against the given collaborators and subscribes
    /// to the provider's notification channel.
    pub fn new(
        resources: Arc<dyn ResourceProvider>,
        config: Arc<dyn ProjectConfig>,
        view: Arc<dyn TreeView>,
        executor: Arc<dyn Executor>,
        grouping: Arc<dyn TopLevelGrouping>,
    ) -> ModelSession {
        let registry = Arc::new(Mutex::new(ModelRegistry::new()));
        let (rebuild_sender, rebuild_receiver) = crossbeam_channel::unbounded();

        let applier = OpApplier::new(
            Arc::clone(&registry),
            Arc::clone(&resources),
            Arc::clone(&config),
            Arc::clone(&view),
            rebuild_sender.clone(),
        );
        let dispatcher = Arc::new(UpdateDispatcher::new(
            Arc::clone(&view),
            executor,
            applier,
        ));

        log::trace!("starting RebuildScheduler");
        let scheduler = RebuildScheduler::start(
            Arc::clone(&registry),
            Arc::clone(&resources),
            Arc::clone(&dispatcher),
            rebuild_sender.clone(),
            rebuild_receiver,
        );

        let classifier = DeltaClassifier::new(Arc::clone(&resources), Arc::clone(&config));

        log::trace!("starting DeltaProcessor");
        let processor = DeltaProcessor::start(
            DeltaClassifier::new(Arc::clone(&resources), Arc::clone(&config)),
            Arc::clone(&dispatcher),
            resources.event_receiver(),
        );

        ModelSession {
            processor,
            scheduler,
            registry,
            resources,
            config,
            grouping,
            dispatcher,
            classifier,
            rebuild_sender,
        }
    }

    /// Classifies and dispatches one change-delta tree synchronously, on the
    /// calling thread. Deltas arriving on the provider's notification
    /// channel go through the same path on the background thread.
    pub fn process_delta(&self, delta: &ResourceDelta) {
        let ops = self.classifier.classify(delta);
        self.dispatcher.dispatch(ops);
    }

    /// Notification that a project's declared source paths were rebuilt.
    /// `None` means the project lost its path configuration entirely, which
    /// removes every source folder it has. Repeated calls within the
    /// debounce window coalesce; the latest path list wins.
    pub fn notify_rebuilt(&self, project: &Resource, paths: Option<Vec<String>>) {
        let _ = self.rebuild_sender.send(RebuildRequest {
            project: project.clone(),
            paths: paths.unwrap_or_default(),
        });
    }

    /// Convenience form of [`ModelSession::notify_rebuilt`] that re-reads
    /// the project's configuration.
    pub fn notify_config_changed(&self, project: &Resource) {
        let paths = if self.config.has_path_config(project.project) {
            match self.config.raw_source_paths(project.project) {
                Ok(raw) => split_source_paths(&raw),
                Err(_) => Vec::new(),
            }
        } else {
            Vec::new()
        };
        self.notify_rebuilt(project, Some(paths));
    }

    /// Tells the dispatcher the consumer finished its current update, so
    /// deferred operations can drain into one new batch.
    pub fn notify_idle(&self) {
        self.dispatcher.flush();
    }

    /// The top-level elements: raw projects, or the external grouping.
    pub fn roots(&self) -> Vec<ModelElement> {
        match self.grouping.root_mode() {
            RootMode::WorkingSets => self
                .grouping
                .working_sets()
                .into_iter()
                .map(ModelElement::WorkingSet)
                .collect(),
            RootMode::Projects => {
                self.children(&ModelElement::Resource(self.resources.workspace_root()))
            }
        }
    }

    /// The children of an element, wrapped into the model where it applies.
    pub fn children(&self, element: &ModelElement) -> Vec<ModelElement> {
        match element {
            ModelElement::WorkingSet(group) => self
                .grouping
                .members(group)
                .into_iter()
                .map(ModelElement::Resource)
                .collect(),
            ModelElement::Node(node) if node.kind == NodeKind::File => Vec::new(),
            ModelElement::Node(_) | ModelElement::SourceFolder(_) => {
                self.wrapped_children(element)
            }
            ModelElement::Resource(resource) => self.children_for_resource(resource),
        }
    }

    /// The parent of an element. The actual parent of a project may be a
    /// working set when the grouping is active.
    pub fn parent(&self, element: &ModelElement) -> Option<ModelElement> {
        if let Some(resource) = element.resource() {
            if resource.kind == ResourceKind::Project {
                if let Some(group) = self.grouping.group_of(resource) {
                    return Some(ModelElement::WorkingSet(group));
                }
            }
        }

        match element {
            ModelElement::WorkingSet(_) => None,
            ModelElement::Node(node) => Some(self.element_for(&node.parent)),
            ModelElement::SourceFolder(info) => Some(self.element_for(&info.parent)),
            ModelElement::Resource(resource) => self
                .resources
                .parent(resource)
                .map(ModelElement::Resource),
        }
    }

    /// Whether an element has children. File nodes are reported childless
    /// without materializing their contents.
    pub fn has_children(&self, element: &ModelElement) -> bool {
        if let ModelElement::Node(node) = element {
            if node.kind == NodeKind::File {
                return false;
            }
        }
        !self.children(element).is_empty()
    }

    /// Counts of what the model currently holds.
    pub fn stats(&self) -> ModelStats {
        let (projects, source_folders, nodes) = self.registry.lock().unwrap().counts();
        ModelStats {
            projects,
            source_folders,
            nodes,
        }
    }

    /// Tears down the derived model. Subsequent lookups observe an empty
    /// model; background threads stop when the session is dropped.
    pub fn dispose(&self) {
        log::trace!("disposing model session");
        self.registry.lock().unwrap().dispose();
    }

    /// The model representation of a resource, falling back to the resource
    /// itself so callers always have something to render.
    fn element_for(&self, resource: &Resource) -> ModelElement {
        let is_open = self.resources.is_open(resource.project);
        let mut registry = self.registry.lock().unwrap();
        registry
            .resolve(resource, false, is_open)
            .map(Resolved::into_element)
            .unwrap_or_else(|| ModelElement::Resource(resource.clone()))
    }

    /// Children beneath an element that is already part of the model: every
    /// child becomes (or stays) a wrapped node of the owning source folder.
    fn wrapped_children(&self, parent: &ModelElement) -> Vec<ModelElement> {
        let (actual, source_folder) = match parent {
            ModelElement::SourceFolder(info) => (info.resource.clone(), info.resource.id),
            ModelElement::Node(node) => (node.resource.clone(), node.source_folder),
            _ => return Vec::new(),
        };

        let raw_children = self.resources.children(&actual);
        let mut out = Vec::with_capacity(raw_children.len());

        let mut registry = self.registry.lock().unwrap();
        for child in raw_children {
            let is_open = self.resources.is_open(child.project);
            match registry.resolve(&child, false, is_open) {
                Some(Resolved::SourceFolder(info)) => {
                    out.push(ModelElement::SourceFolder(info));
                }
                _ => {
                    // Re-attach a known wrapper rather than duplicating it;
                    // otherwise construct the right variant for the child.
                    let node = match registry.take_node(&child, is_open) {
                        Some(mut node) => {
                            node.parent = actual.clone();
                            node.source_folder = source_folder;
                            node
                        }
                        None => Node::new(&actual, child, source_folder),
                    };
                    // A vanished owning folder means the child cannot be
                    // represented; skip it without aborting its siblings.
                    if registry.attach_child(node.clone()) {
                        out.push(ModelElement::Node(node));
                    }
                }
            }
        }

        out
    }

    /// Children of a plain resource, above or outside the derived model.
    /// This is where new source folders are discovered lazily: a container
    /// child whose path is on its project's declared source path gets
    /// promoted without a full project rescan.
    fn children_for_resource(&self, parent: &Resource) -> Vec<ModelElement> {
        let parent_project = parent.project;
        let parent_configured = self.resources.is_open(parent_project)
            && self.config.has_path_config(parent_project);

        let raw_children = self.resources.children(parent);
        let mut out = Vec::with_capacity(raw_children.len());

        let mut registry = self.registry.lock().unwrap();
        for child in raw_children {
            let child_open = self.resources.is_open(child.project);
            if let Some(existing) = registry.resolve(&child, false, child_open) {
                out.push(existing.into_element());
                continue;
            }

            let mut element = ModelElement::Resource(child.clone());

            if child.is_container() {
                // Which project's configuration applies: the parent's, or —
                // when the container is itself a project we know nothing
                // about yet — its own, acquired on the spot.
                let config_project = if parent_configured {
                    Some(parent_project)
                } else if child.kind == ResourceKind::Project
                    && self.resources.is_open(child.project)
                    && self.config.has_path_config(child.project)
                {
                    Some(child.project)
                } else {
                    None
                };

                if let Some(project) = config_project {
                    let path_set = self.config.source_path_set(project).unwrap_or_default();
                    if path_set.contains(&normalize_path(&child.path)) {
                        let folder = SourceFolder::new(parent, child.clone());
                        let info = folder.info();
                        if registry.add_source_folder(folder, child_open) {
                            element = ModelElement::SourceFolder(info);
                        }
                    }
                }
            }

            out.push(element);
        }

        out
    }
}
