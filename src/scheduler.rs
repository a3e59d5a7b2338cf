use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crossbeam_channel::{select, Receiver, RecvError, Sender};
use jod_thread::JoinHandle;

use crate::dispatch::UpdateDispatcher;
use crate::model::{ModelRegistry, SourceFolderKind, UpdateOp};
use crate::resource::{normalize_path, ProjectId, Resource, ResourceProvider};

/// How long repeated rebuild notifications for one project coalesce before a
/// single recomputation runs.
pub const REBUILD_DEBOUNCE: Duration = Duration::from_millis(200);

/// How often the scheduler thread checks for due records when no requests
/// are arriving.
const SWEEP_INTERVAL: Duration = Duration::from_millis(50);

/// A request to recompute one project's source-folder set. `paths` is the
/// declared source-path list; empty means the project no longer declares
/// any, which removes every source folder it has.
#[derive(Debug, Clone)]
pub struct RebuildRequest {
    pub project: Resource,
    pub paths: Vec<String>,
}

/// Debounce record for one project. Created on first request and reused for
/// the scheduler's lifetime, so there is never more than one timer per
/// project.
struct PendingRebuild {
    state: Mutex<PendingState>,
}

struct PendingState {
    /// Latest payload wins; earlier payloads within the window are simply
    /// overwritten.
    payload: Option<(Resource, Vec<String>)>,
    armed: bool,
    deadline: Instant,
}

impl PendingRebuild {
    fn new() -> Arc<PendingRebuild> {
        Arc::new(PendingRebuild {
            state: Mutex::new(PendingState {
                payload: None,
                armed: false,
                deadline: Instant::now(),
            }),
        })
    }
}

/// Coalesces bursts of per-project "source paths rebuilt" notifications into
/// one delayed recomputation each, on its own background thread.
///
/// Consumers communicate with the scheduler via channels; dropping it joins
/// the thread after signaling shutdown.
pub struct RebuildScheduler {
    shutdown_sender: Sender<()>,
    request_sender: Sender<RebuildRequest>,

    /// Dropping this joins the scheduler thread.
    #[allow(unused)]
    job_thread: JoinHandle<Result<(), RecvError>>,
}

impl RebuildScheduler {
    pub(crate) fn start(
        registry: Arc<Mutex<ModelRegistry>>,
        resources: Arc<dyn ResourceProvider>,
        dispatcher: Arc<UpdateDispatcher>,
        request_sender: Sender<RebuildRequest>,
        request_receiver: Receiver<RebuildRequest>,
    ) -> Self {
        let (shutdown_sender, shutdown_receiver) = crossbeam_channel::bounded(1);
        let context = SchedulerContext {
            records: Mutex::new(HashMap::new()),
            registry,
            resources,
            dispatcher,
        };

        let job_thread = jod_thread::Builder::new()
            .name("RebuildScheduler thread".to_owned())
            .spawn(move || {
                log::trace!("RebuildScheduler thread started");

                loop {
                    select! {
                        recv(request_receiver) -> request => {
                            context.schedule(request?);
                        },
                        recv(shutdown_receiver) -> _ => {
                            log::trace!("RebuildScheduler shutdown signal received...");
                            return Ok(());
                        },
                        default(SWEEP_INTERVAL) => {
                            context.fire_due(Instant::now());
                        },
                    }
                }
            })
            .expect("Could not start RebuildScheduler thread");

        Self {
            shutdown_sender,
            request_sender,
            job_thread,
        }
    }

    /// Records (or overwrites) the pending rebuild for a project and arms
    /// its delay window if it is not already armed.
    pub fn notify(&self, project: Resource, paths: Vec<String>) {
        let _ = self.request_sender.send(RebuildRequest { project, paths });
    }
}

impl Drop for RebuildScheduler {
    fn drop(&mut self) {
        // Without this we would hang forever waiting for the scheduler loop
        // to terminate.
        let _ = self.shutdown_sender.send(());
    }
}

/// State shared by the scheduler loop.
struct SchedulerContext {
    records: Mutex<HashMap<ProjectId, Arc<PendingRebuild>>>,
    registry: Arc<Mutex<ModelRegistry>>,
    resources: Arc<dyn ResourceProvider>,
    dispatcher: Arc<UpdateDispatcher>,
}

impl SchedulerContext {
    fn schedule(&self, request: RebuildRequest) {
        let record = {
            let mut records = self.records.lock().unwrap();
            Arc::clone(
                records
                    .entry(request.project.project)
                    .or_insert_with(PendingRebuild::new),
            )
        };

        let mut state = record.state.lock().unwrap();
        state.payload = Some((request.project, request.paths));
        if !state.armed {
            state.armed = true;
            state.deadline = Instant::now() + REBUILD_DEBOUNCE;
        }
    }

    /// Fires every armed record whose delay has elapsed. The payload is
    /// swapped out under the record's lock and the recomputation runs with
    /// the lock released, so a notification arriving during the rebuild
    /// starts a fresh cycle instead of blocking.
    fn fire_due(&self, now: Instant) {
        let records: Vec<Arc<PendingRebuild>> = {
            let records = self.records.lock().unwrap();
            records.values().map(Arc::clone).collect()
        };

        for record in records {
            let payload = {
                let mut state = record.state.lock().unwrap();
                if !state.armed || state.deadline > now {
                    continue;
                }
                state.armed = false;
                state.payload.take()
            };

            if let Some((project, paths)) = payload {
                self.perform_rebuild(project, paths);
            }
        }
    }

    /// Recomputes a project's source-folder set from the given path list
    /// and emits exactly one refresh for the computed target.
    fn perform_rebuild(&self, project: Resource, paths: Vec<String>) {
        let Some(location) = self.resources.location(project.project) else {
            log::debug!(
                "skipping rebuild for {}: location cannot be determined",
                project.path.display()
            );
            return;
        };

        log::debug!(
            "rebuilding source folders for {}: {paths:?}",
            project.path.display()
        );

        let project_parent = self.resources.parent(&project);
        let mut refresh_target = project.clone();

        let mut path_set: HashSet<PathBuf> = HashSet::new();
        for raw in &paths {
            let path = normalize_path(Path::new(raw));
            // The project's own location on the source path affects the
            // project's visibility in the model, so the refresh must start
            // one level up.
            if path == location {
                if let Some(parent) = &project_parent {
                    refresh_target = parent.clone();
                }
            }
            path_set.insert(path);
        }

        {
            let mut registry = self.registry.lock().unwrap();
            let is_open = self.resources.is_open(project.project);
            let existing = registry.source_folders(project.project);

            if registry.project_info(project.project, is_open).is_some() {
                for folder in existing {
                    if path_set.contains(&normalize_path(&folder.resource.path)) {
                        continue;
                    }
                    if folder.kind == SourceFolderKind::ProjectRoot {
                        if let Some(parent) = &project_parent {
                            refresh_target = parent.clone();
                        }
                    }
                    log::trace!(
                        "removing source folder {} (no longer on source path)",
                        folder.resource.path.display()
                    );
                    registry.remove_source_folder(project.project, folder.resource.id);
                }
            }
        }

        self.dispatcher
            .dispatch(vec![UpdateOp::refresh(refresh_target)]);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::split_source_paths;
    use crate::dispatch::OpApplier;
    use crate::in_memory::{InMemoryProjectConfig, InMemoryResourceTree};
    use crate::model::SourceFolder;
    use crate::test_util::{RecordingView, ViewCall};
    use crate::view::InlineExecutor;

    struct Fixture {
        resources: Arc<InMemoryResourceTree>,
        registry: Arc<Mutex<ModelRegistry>>,
        view: Arc<RecordingView>,
        context: SchedulerContext,
    }

    fn fixture() -> Fixture {
        let resources = Arc::new(InMemoryResourceTree::new());
        let config = Arc::new(InMemoryProjectConfig::new());
        let registry = Arc::new(Mutex::new(ModelRegistry::new()));
        let view = Arc::new(RecordingView::new());
        let (rebuild_sender, _rebuild_receiver) = crossbeam_channel::unbounded();

        let applier = OpApplier::new(
            Arc::clone(&registry),
            resources.clone() as Arc<dyn ResourceProvider>,
            config,
            view.clone() as Arc<dyn crate::view::TreeView>,
            rebuild_sender,
        );
        let dispatcher = Arc::new(UpdateDispatcher::new(
            view.clone() as Arc<dyn crate::view::TreeView>,
            Arc::new(InlineExecutor),
            applier,
        ));

        let context = SchedulerContext {
            records: Mutex::new(HashMap::new()),
            registry: Arc::clone(&registry),
            resources: resources.clone() as Arc<dyn ResourceProvider>,
            dispatcher,
        };

        Fixture {
            resources,
            registry,
            view,
            context,
        }
    }

    fn request(project: &Resource, raw: &str) -> RebuildRequest {
        RebuildRequest {
            project: project.clone(),
            paths: split_source_paths(raw),
        }
    }

    #[test]
    fn repeated_notifications_coalesce_into_one_rebuild_with_last_payload() {
        let fx = fixture();
        let project = fx.resources.create_project("p");
        let src = fx.resources.create_folder(&project, "src");
        let lib = fx.resources.create_folder(&project, "lib");

        {
            let mut registry = fx.registry.lock().unwrap();
            registry.add_source_folder(SourceFolder::new(&project, src.clone()), true);
            registry.add_source_folder(SourceFolder::new(&project, lib.clone()), true);
        }

        fx.context.schedule(request(&project, "/p/src"));
        fx.context.schedule(request(&project, "/p/lib"));

        // Before the window elapses nothing fires.
        fx.context.fire_due(Instant::now());
        assert!(fx.view.calls().is_empty());

        fx.context.fire_due(Instant::now() + Duration::from_secs(1));

        // Exactly one refresh, and the surviving folder is the one from the
        // most recent payload.
        let calls = fx.view.calls();
        assert_eq!(calls.len(), 1);
        assert!(matches!(calls[0], ViewCall::Refresh(_)));

        let folders = fx.registry.lock().unwrap().source_folders(project.project);
        assert_eq!(folders.len(), 1);
        assert_eq!(folders[0].resource, lib);

        // The window is re-armed only by the next notification.
        fx.view.clear();
        fx.context.fire_due(Instant::now() + Duration::from_secs(2));
        assert!(fx.view.calls().is_empty());
    }

    #[test]
    fn empty_path_list_removes_everything_and_retargets_the_parent() {
        let fx = fixture();
        let project = fx.resources.create_project("p");
        let src = fx.resources.create_folder(&project, "src");

        {
            let mut registry = fx.registry.lock().unwrap();
            registry.add_source_folder(SourceFolder::new(&project, project.clone()), true);
            registry.add_source_folder(SourceFolder::new(&project, src.clone()), true);
        }

        fx.context.perform_rebuild(project.clone(), Vec::new());

        let folders = fx.registry.lock().unwrap().source_folders(project.project);
        assert!(folders.is_empty());

        let calls = fx.view.calls();
        assert_eq!(calls.len(), 1);
        let ViewCall::Refresh(target) = &calls[0] else {
            panic!("expected a refresh, got {:?}", calls[0]);
        };
        assert_eq!(
            target.resource().unwrap(),
            &fx.resources.workspace_root(),
            "removing the project-root folder must widen the refresh to the parent"
        );
    }

    #[test]
    fn project_location_on_source_path_widens_the_refresh() {
        let fx = fixture();
        let project = fx.resources.create_project("p");

        fx.context
            .perform_rebuild(project.clone(), vec!["/p".to_owned()]);

        let calls = fx.view.calls();
        assert_eq!(calls.len(), 1);
        let ViewCall::Refresh(target) = &calls[0] else {
            panic!("expected a refresh, got {:?}", calls[0]);
        };
        assert_eq!(target.resource().unwrap(), &fx.resources.workspace_root());
    }

    // A project closing while its rebuild is pending must simply be
    // observed closed and discarded.
    #[test]
    fn closed_project_rebuild_discards_state() {
        let fx = fixture();
        let project = fx.resources.create_project("p");
        fx.resources.set_open(project.project, false);

        fx.context.perform_rebuild(project.clone(), vec!["/p/src".to_owned()]);

        // Still emits its refresh; the registry simply has nothing to drop.
        assert_eq!(fx.view.calls().len(), 1);
        let (projects, folders, nodes) = fx.registry.lock().unwrap().counts();
        assert_eq!((projects, folders, nodes), (0, 0, 0));
    }
}
