// ABOUTME: Project domain events for tree loading and selection
// ABOUTME: Each project reports success or failure independently

/// Project domain events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    ProjectSelected {
        previous: Option<String>,
        project: String,
        source: SelectionSource,
    },

    TreeLoaded {
        project: String,
        node_count: usize,
        generation: u64,
    },

    TreeLoadFailed { project: String, error: String },

    /// A forced refetch replaced the cached tree wholesale
    TreeReplaced { project: String, generation: u64 },
}

/// Why a project became the selected one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionSource {
    /// Previous selection kept
    Retained,
    /// Project segment embedded in the route
    Route,
    /// First configured project
    Fallback,
    /// Explicit user choice (site selector, search result)
    User,
}
