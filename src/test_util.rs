//! Shared fixtures for the crate's tests: a call-recording view and a fully
//! wired in-memory session harness.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::in_memory::{InMemoryProjectConfig, InMemoryResourceTree};
use crate::model::ModelElement;
use crate::session::ModelSession;
use crate::view::{InlineExecutor, ProjectsOnly, TreeView};

#[derive(Debug, Clone, PartialEq)]
pub enum ViewCall {
    Add {
        parent: ModelElement,
        children: Vec<ModelElement>,
    },
    Remove(Vec<ModelElement>),
    Refresh(ModelElement),
    Update(ModelElement),
    Redraw(bool),
}

/// A display double that records every call in order.
pub struct RecordingView {
    calls: Mutex<Vec<ViewCall>>,
    busy: AtomicBool,
    live: AtomicBool,
}

impl RecordingView {
    pub fn new() -> RecordingView {
        RecordingView {
            calls: Mutex::new(Vec::new()),
            busy: AtomicBool::new(false),
            live: AtomicBool::new(true),
        }
    }

    pub fn calls(&self) -> Vec<ViewCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn set_busy(&self, busy: bool) {
        self.busy.store(busy, Ordering::SeqCst);
    }

    pub fn set_live(&self, live: bool) {
        self.live.store(live, Ordering::SeqCst);
    }

    fn record(&self, call: ViewCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl TreeView for RecordingView {
    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    fn add(&self, parent: &ModelElement, children: &[ModelElement]) {
        self.record(ViewCall::Add {
            parent: parent.clone(),
            children: children.to_vec(),
        });
    }

    fn remove(&self, elements: &[ModelElement]) {
        self.record(ViewCall::Remove(elements.to_vec()));
    }

    fn refresh(&self, element: &ModelElement) {
        self.record(ViewCall::Refresh(element.clone()));
    }

    fn update(&self, element: &ModelElement) {
        self.record(ViewCall::Update(element.clone()));
    }

    fn set_redraw(&self, redraw: bool) {
        self.record(ViewCall::Redraw(redraw));
    }
}

/// A session wired entirely to in-memory collaborators, with the consumer
/// context inlined so every dispatch runs synchronously.
pub struct Harness {
    pub resources: Arc<InMemoryResourceTree>,
    pub config: Arc<InMemoryProjectConfig>,
    pub view: Arc<RecordingView>,
    pub session: ModelSession,
}

pub fn harness() -> Harness {
    let resources = Arc::new(InMemoryResourceTree::new());
    let config = Arc::new(InMemoryProjectConfig::new());
    let view = Arc::new(RecordingView::new());

    let session = ModelSession::new(
        Arc::clone(&resources) as Arc<dyn crate::resource::ResourceProvider>,
        Arc::clone(&config) as Arc<dyn crate::config::ProjectConfig>,
        Arc::clone(&view) as Arc<dyn TreeView>,
        Arc::new(InlineExecutor),
        Arc::new(ProjectsOnly),
    );

    Harness {
        resources,
        config,
        view,
        session,
    }
}
