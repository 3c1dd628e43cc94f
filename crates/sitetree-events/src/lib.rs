// ABOUTME: Cross-crate event definitions for decoupled communication
// ABOUTME: Bounded contexts for navigation, project loading, and page mutations

pub mod event_bus;
pub mod mutation;
pub mod navigation;
pub mod project;

pub use event_bus::{EventBus, NullBus, RecordedEvent, RecordingBus};
