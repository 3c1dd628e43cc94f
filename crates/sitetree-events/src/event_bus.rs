// ABOUTME: Event bus trait and in-process implementations
// ABOUTME: Provides publish-subscribe dispatch for the engine's domain events

use parking_lot::Mutex;
use std::sync::Arc;

use crate::{mutation, navigation, project};

/// Event bus trait for dispatching domain events
pub trait EventBus: Send + Sync {
    fn dispatch_navigation(&self, event: navigation::Event);

    fn dispatch_project(&self, event: project::Event);

    fn dispatch_mutation(&self, event: mutation::Event);
}

/// Bus that drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBus;

impl EventBus for NullBus {
    fn dispatch_navigation(&self, _event: navigation::Event) {}

    fn dispatch_project(&self, _event: project::Event) {}

    fn dispatch_mutation(&self, _event: mutation::Event) {}
}

/// Any event that went through a [`RecordingBus`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedEvent {
    Navigation(navigation::Event),
    Project(project::Event),
    Mutation(mutation::Event),
}

/// Bus that keeps every dispatched event in order, and traces it
#[derive(Debug, Default, Clone)]
pub struct RecordingBus {
    events: Arc<Mutex<Vec<RecordedEvent>>>,
}

impl RecordingBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything dispatched so far
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().clone()
    }

    /// Remove and return everything dispatched so far
    pub fn drain(&self) -> Vec<RecordedEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn mutation_events(&self) -> Vec<mutation::Event> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                RecordedEvent::Mutation(event) => Some(event.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn project_events(&self) -> Vec<project::Event> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                RecordedEvent::Project(event) => Some(event.clone()),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: RecordedEvent) {
        tracing::trace!(?event, "event dispatched");
        self.events.lock().push(event);
    }
}

impl EventBus for RecordingBus {
    fn dispatch_navigation(&self, event: navigation::Event) {
        self.push(RecordedEvent::Navigation(event));
    }

    fn dispatch_project(&self, event: project::Event) {
        self.push(RecordedEvent::Project(event));
    }

    fn dispatch_mutation(&self, event: mutation::Event) {
        self.push(RecordedEvent::Mutation(event));
    }
}
