// ABOUTME: Per-project page tree snapshot and search result projection
// ABOUTME: Accepts the backend's `name`/`templates` field names on input

use serde::{Deserialize, Serialize};

use crate::page::PageNode;

/// The full page hierarchy of one website/project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectTree {
    #[serde(alias = "name")]
    pub project_name: String,
    #[serde(alias = "templates")]
    pub root: PageNode,
}

impl ProjectTree {
    pub fn new(project_name: impl Into<String>, root: PageNode) -> Self {
        Self {
            project_name: project_name.into(),
            root,
        }
    }
}

/// A search hit; transient, not owned by any tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchMatch {
    pub project_name: String,
    /// Absolute path of the matched node, e.g. `/blog/post-1`
    pub node_path: String,
    pub title: Option<String>,
}
