// ABOUTME: Cross-module tests for the engine running against in-memory collaborators
// ABOUTME: Covers project loading, optimistic sync, the console flow, and debounced lookup

mod fakes;
mod project_selection_tests;
