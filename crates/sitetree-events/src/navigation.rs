// ABOUTME: Navigation domain events for the page tree sidebar
// ABOUTME: Immutable facts about expansion, selection, and route changes

/// Navigation domain events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A node's expand affordance was toggled by the user
    NodeToggled {
        project: String,
        path: String,
        expanded: bool,
    },

    /// A node label was clicked and the page should be opened
    PageSelected {
        project: String,
        path: String,
        route: String,
    },

    /// The route changed and the active node was recomputed
    RouteChanged {
        route: String,
        active_path: Option<String>,
    },

    /// All per-node state was discarded, e.g. after a project switch
    StateReset { project: String },
}
