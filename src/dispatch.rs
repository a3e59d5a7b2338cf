use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use crossbeam_channel::Sender;

use crate::config::{split_source_paths, ProjectConfig};
use crate::model::{
    summarize, ModelElement, ModelRegistry, Node, Resolved, SourceFolder, UpdateOp,
};
use crate::resource::{normalize_path, ProjectId, Resource, ResourceProvider};
use crate::scheduler::RebuildRequest;
use crate::view::{Executor, TreeView};

/// Restores redraw when the suppressed unit completes, even if applying an
/// operation panics mid-batch.
struct RedrawGuard<'a> {
    view: &'a dyn TreeView,
}

impl<'a> RedrawGuard<'a> {
    fn new(view: &'a dyn TreeView) -> Self {
        view.set_redraw(false);
        RedrawGuard { view }
    }
}

impl Drop for RedrawGuard<'_> {
    fn drop(&mut self) {
        self.view.set_redraw(true);
    }
}

/// Applies individual update operations to the view and performs the
/// consumer-side model maintenance that goes with them: wrapping added
/// resources, evicting removed ones, and requesting a path rebuild for any
/// project whose source-folder set was touched.
pub(crate) struct OpApplier {
    registry: Arc<Mutex<ModelRegistry>>,
    resources: Arc<dyn ResourceProvider>,
    config: Arc<dyn ProjectConfig>,
    view: Arc<dyn TreeView>,
    rebuild_sender: Sender<RebuildRequest>,
}

impl OpApplier {
    pub(crate) fn new(
        registry: Arc<Mutex<ModelRegistry>>,
        resources: Arc<dyn ResourceProvider>,
        config: Arc<dyn ProjectConfig>,
        view: Arc<dyn TreeView>,
        rebuild_sender: Sender<RebuildRequest>,
    ) -> Self {
        OpApplier {
            registry,
            resources,
            config,
            view,
            rebuild_sender,
        }
    }

    fn apply(&self, op: UpdateOp) {
        match op {
            UpdateOp::Refresh { resource } => {
                let element = self.element_for(&resource);
                self.view.refresh(&element);
            }
            UpdateOp::Update { resource } => {
                let element = self.element_for(&resource);
                self.view.update(&element);
            }
            UpdateOp::AddRemove {
                parent,
                added,
                removed,
                is_rename,
            } => self.apply_add_remove(&parent, &added, &removed, is_rename),
        }
    }

    /// The model representation of a resource, or the resource itself when
    /// the model has none.
    fn element_for(&self, resource: &Resource) -> ModelElement {
        let is_open = self.resources.is_open(resource.project);
        let mut registry = self.registry.lock().unwrap();
        registry
            .resolve(resource, false, is_open)
            .map(Resolved::into_element)
            .unwrap_or_else(|| ModelElement::Resource(resource.clone()))
    }

    fn apply_add_remove(
        &self,
        parent: &Resource,
        added: &[Resource],
        removed: &[Resource],
        is_rename: bool,
    ) {
        let parent_element = self.element_for(parent);

        // Suppress redraw only for the combined remove-and-add of a rename,
        // so the view never shows both representations at once.
        let _redraw = is_rename.then(|| RedrawGuard::new(&*self.view));

        let mut needs_rebuild: BTreeSet<ProjectId> = BTreeSet::new();

        // Additions before removals, so selection preservation does not run
        // against objects that are about to appear.
        if !added.is_empty() {
            let elements: Vec<ModelElement> =
                added.iter().cloned().map(ModelElement::Resource).collect();
            self.view.add(&parent_element, &elements);

            let mut registry = self.registry.lock().unwrap();
            for resource in added {
                if let Some(resolved) = self.resolve_added(&mut registry, parent, resource) {
                    if resolved.is_source_folder() {
                        needs_rebuild.insert(resource.project);
                    }
                }
            }
        }

        if !removed.is_empty() {
            let elements: Vec<ModelElement> = removed
                .iter()
                .cloned()
                .map(ModelElement::Resource)
                .collect();
            self.view.remove(&elements);

            let mut registry = self.registry.lock().unwrap();
            for resource in removed {
                let is_open = self.resources.is_open(resource.project);
                if let Some(resolved) = registry.resolve(resource, true, is_open) {
                    if resolved.is_source_folder() {
                        needs_rebuild.insert(resource.project);
                    }
                }
            }
        }

        // One rebuild request per touched project, after the whole batch.
        for project in needs_rebuild {
            if !self.config.has_path_config(project) {
                continue;
            }
            let paths = match self.config.raw_source_paths(project) {
                Ok(raw) => split_source_paths(&raw),
                Err(err) => {
                    log::debug!("source paths unavailable for {project:?}: {err}");
                    Vec::new()
                }
            };
            let Some(root) = self.resources.project_root(project) else {
                continue;
            };
            let _ = self.rebuild_sender.send(RebuildRequest {
                project: root,
                paths,
            });
        }
    }

    /// Resolves an added resource into the model, creating wrappers as
    /// needed: a container on the project's source path becomes a source
    /// folder, anything else becomes a node beneath its parent's
    /// representation (or stays plain until enumeration wraps it lazily).
    fn resolve_added(
        &self,
        registry: &mut ModelRegistry,
        parent: &Resource,
        resource: &Resource,
    ) -> Option<Resolved> {
        let is_open = self.resources.is_open(resource.project);

        if let Some(existing) = registry.resolve(resource, false, is_open) {
            return Some(existing);
        }

        if resource.is_container() && self.config.has_path_config(resource.project) {
            let path_set = self
                .config
                .source_path_set(resource.project)
                .unwrap_or_default();
            if path_set.contains(&normalize_path(&resource.path)) {
                let folder = SourceFolder::new(parent, resource.clone());
                let info = folder.info();
                if registry.add_source_folder(folder, is_open) {
                    return Some(Resolved::SourceFolder(info));
                }
                return None;
            }
        }

        match registry.resolve(parent, false, is_open) {
            Some(Resolved::SourceFolder(info)) => {
                let node = Node::new(parent, resource.clone(), info.resource.id);
                registry
                    .attach_child(node.clone())
                    .then_some(Resolved::Node(node))
            }
            Some(Resolved::Node(parent_node)) => {
                let node = Node::new(parent, resource.clone(), parent_node.source_folder);
                registry
                    .attach_child(node.clone())
                    .then_some(Resolved::Node(node))
            }
            _ => None,
        }
    }
}

/// Marshals update batches onto the consumer's execution context.
///
/// Operations produced while the consumer is mid-update are appended to a
/// shared pending queue and deferred, never dropped; the queue drains into
/// one batch on the next dispatch or when the consumer reports idle. A dead
/// surface clears the queue and stops all further work.
pub struct UpdateDispatcher {
    inner: Arc<DispatchInner>,
}

struct DispatchInner {
    view: Arc<dyn TreeView>,
    executor: Arc<dyn Executor>,
    applier: OpApplier,
    pending: Mutex<Vec<UpdateOp>>,
}

impl UpdateDispatcher {
    pub(crate) fn new(
        view: Arc<dyn TreeView>,
        executor: Arc<dyn Executor>,
        applier: OpApplier,
    ) -> Self {
        UpdateDispatcher {
            inner: Arc::new(DispatchInner {
                view,
                executor,
                applier,
                pending: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Queues a batch for the consumer. Runs synchronously when already on
    /// the consumer's context, otherwise submits without blocking.
    pub fn dispatch(&self, ops: Vec<UpdateOp>) {
        if ops.is_empty() || !self.inner.view.is_live() {
            return;
        }
        self.marshal(ops);
    }

    /// Drains deferred operations now that the consumer is idle again.
    pub fn flush(&self) {
        if self.inner.pending.lock().unwrap().is_empty() {
            return;
        }
        self.marshal(Vec::new());
    }

    fn marshal(&self, ops: Vec<UpdateOp>) {
        if self.inner.executor.is_dispatch_thread() {
            self.inner.run_updates(ops);
        } else {
            let inner = Arc::clone(&self.inner);
            self.inner
                .executor
                .spawn(Box::new(move || inner.run_updates(ops)));
        }
    }
}

impl DispatchInner {
    fn run_updates(&self, ops: Vec<UpdateOp>) {
        // The surface may have been torn down by the time this runs.
        if !self.view.is_live() {
            self.pending.lock().unwrap().clear();
            return;
        }

        self.pending.lock().unwrap().extend(ops);

        if self.view.is_busy() {
            log::trace!(
                "consumer busy, deferring {} pending operation(s)",
                self.pending.lock().unwrap().len()
            );
            return;
        }

        let batch: Vec<UpdateOp> = {
            let mut pending = self.pending.lock().unwrap();
            pending.drain(..).collect()
        };
        if batch.is_empty() {
            return;
        }

        let (refreshes, updates, added, removed) = summarize(&batch);
        for op in batch {
            self.applier.apply(op);
        }
        log::debug!(
            "update batch applied: {refreshes} refreshed, {updates} updated, \
             {added} added, {removed} removed"
        );
    }
}
