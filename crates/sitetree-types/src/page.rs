// ABOUTME: Recursive page node data structure for a project's page hierarchy
// ABOUTME: Nodes own their children; absolute paths are derived, never stored

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::user::User;

/// Publication status of a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PageStatus {
    /// Known to the console but not yet in the site's code repository
    #[default]
    New,
    /// Live on the site
    Available,
    /// Removal requested
    ToDelete,
}

/// An external tracking ticket attached to a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedTask {
    pub id: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// A single page in the hierarchy
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PageNode {
    /// Server-assigned identifier; `None` until the backend has confirmed the page
    #[serde(default)]
    pub id: Option<u64>,
    /// Path segment relative to the parent, `""` for the root
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub copy_doc_link: Option<String>,
    #[serde(default)]
    pub owner: Option<User>,
    #[serde(default)]
    pub reviewers: Vec<User>,
    #[serde(default)]
    pub status: PageStatus,
    #[serde(default)]
    pub related_tasks: Vec<RelatedTask>,
    #[serde(default)]
    pub children: Vec<PageNode>,
}

impl PageNode {
    /// Create a node with the given path segment and no metadata
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Create an empty project root
    pub fn root() -> Self {
        Self::new("")
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_status(mut self, status: PageStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_owner(mut self, owner: User) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_child(mut self, child: PageNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn is_root(&self) -> bool {
        self.name.is_empty()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Find a direct child by its path segment
    pub fn child(&self, name: &str) -> Option<&PageNode> {
        self.children.iter().find(|child| child.name == name)
    }

    /// Total number of nodes in this subtree, including self
    pub fn subtree_len(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(PageNode::subtree_len)
            .sum::<usize>()
    }
}
