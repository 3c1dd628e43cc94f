// ABOUTME: Generation-counted wrapper around a project's page tree
// ABOUTME: Consumers compare generations to detect that a tree changed under them

use sitetree_types::{PageNode, ProjectTree};

use crate::error::Result;
use crate::traversal;

/// A cached project tree plus a monotonically increasing generation.
///
/// Every successful mutation bumps the generation, and so does replacing
/// the whole tree after a forced refetch.
#[derive(Debug, Clone, PartialEq)]
pub struct PageTree {
    tree: ProjectTree,
    generation: u64,
}

impl PageTree {
    pub fn new(tree: ProjectTree) -> Self {
        Self {
            tree,
            generation: 1,
        }
    }

    pub fn project_name(&self) -> &str {
        &self.tree.project_name
    }

    pub fn root(&self) -> &PageNode {
        &self.tree.root
    }

    pub fn project_tree(&self) -> &ProjectTree {
        &self.tree
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn node_count(&self) -> usize {
        self.tree.root.subtree_len()
    }

    pub fn find(&self, absolute_path: &str) -> Result<&PageNode> {
        traversal::find_node(&self.tree.root, absolute_path)
    }

    pub fn contains(&self, absolute_path: &str) -> bool {
        traversal::contains(&self.tree.root, absolute_path)
    }

    /// Insert under `parent_path`, returning the new node's path
    pub fn insert(&mut self, parent_path: &str, node: PageNode) -> Result<String> {
        self.apply(|root| traversal::insert_node(root, parent_path, node))
    }

    /// Run a mutation against the root; the generation only moves when it succeeds
    pub fn apply<T, F>(&mut self, mutate: F) -> Result<T>
    where
        F: FnOnce(&mut PageNode) -> Result<T>,
    {
        let value = mutate(&mut self.tree.root)?;
        self.generation += 1;
        Ok(value)
    }

    /// Swap in a freshly fetched tree; the generation keeps counting up
    pub fn replace(&mut self, tree: ProjectTree) {
        self.tree = tree;
        self.generation += 1;
    }

    pub fn into_project_tree(self) -> ProjectTree {
        self.tree
    }
}

impl From<ProjectTree> for PageTree {
    fn from(tree: ProjectTree) -> Self {
        Self::new(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TreeError;

    fn tree() -> PageTree {
        PageTree::new(ProjectTree::new(
            "example.com",
            PageNode::root().with_child(PageNode::new("blog")),
        ))
    }

    #[test]
    fn test_generation_moves_on_success_only() {
        let mut tree = tree();
        assert_eq!(tree.generation(), 1);

        tree.insert("/blog", PageNode::new("post-1")).unwrap();
        assert_eq!(tree.generation(), 2);

        let error = tree.insert("/missing", PageNode::new("x")).unwrap_err();
        assert!(matches!(error, TreeError::NotFound { .. }));
        assert_eq!(tree.generation(), 2);
    }

    #[test]
    fn test_replace_bumps_generation() {
        let mut tree = tree();
        tree.replace(ProjectTree::new("example.com", PageNode::root()));
        assert_eq!(tree.generation(), 2);
        assert_eq!(tree.node_count(), 1);
        assert!(!tree.contains("/blog"));
    }
}
