// ABOUTME: Expansion and active-node state for the page tree sidebar of one project
// ABOUTME: Driven by route changes and user toggles, flattened into a render list

use std::collections::HashSet;

use sitetree_logging::debug;
use sitetree_types::PageNode;

use crate::error::{Result, TreeError};
use crate::path;
use crate::route::Route;
use crate::traversal;
use crate::tree::PageTree;

/// Horizontal extent, from the row's left edge, that acts as the expand toggle
pub const DEFAULT_TOGGLE_HIT_WIDTH: f32 = 35.0;

/// Which part of a row a click landed on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTarget {
    Toggle,
    Label,
}

/// A page the user asked to open
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSelection {
    pub project: String,
    pub path: String,
    pub route: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    Toggled { expanded: bool },
    Selected(PageSelection),
}

/// One row of the flattened sidebar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationEntry {
    pub path: String,
    pub display_name: String,
    pub depth: usize,
    pub expanded: bool,
    pub active: bool,
    pub has_children: bool,
}

#[derive(Debug, Clone)]
pub struct NavigationState {
    project: String,
    /// Absolute paths of expanded nodes
    expanded: HashSet<String>,
    /// At most one active path
    active: Option<String>,
    toggle_hit_width: f32,
}

impl NavigationState {
    /// Fresh state for a tree opened at `route`.
    ///
    /// The root is expanded, as is every node on the way to the routed page
    /// and the page itself.
    pub fn mount(tree: &PageTree, route: &Route) -> Self {
        let mut state = Self {
            project: tree.project_name().to_string(),
            expanded: HashSet::new(),
            active: None,
            toggle_hit_width: DEFAULT_TOGGLE_HIT_WIDTH,
        };
        state.expanded.insert(String::new());

        if route.is_in_project(&state.project) {
            for prefix in path::prefixes(&route.page_path) {
                if tree.contains(&prefix) {
                    state.expanded.insert(prefix);
                }
            }
            if tree.contains(&route.page_path) {
                state.active = Some(route.page_path.clone());
            }
        }

        state
    }

    pub fn with_toggle_hit_width(mut self, width: f32) -> Self {
        self.toggle_hit_width = width;
        self
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn is_expanded(&self, absolute_path: &str) -> bool {
        self.expanded.contains(&path::normalize_path(absolute_path))
    }

    pub fn active_path(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn is_active(&self, absolute_path: &str) -> bool {
        self.active.as_deref() == Some(path::normalize_path(absolute_path).as_str())
    }

    /// Flip a node's expansion; returns the new value. Never touches `active`.
    pub fn toggle(&mut self, tree: &PageTree, absolute_path: &str) -> Result<bool> {
        let absolute_path = path::normalize_path(absolute_path);
        if !tree.contains(&absolute_path) {
            return Err(TreeError::page_not_found(&self.project, &absolute_path));
        }

        let expanded = if self.expanded.remove(&absolute_path) {
            false
        } else {
            self.expanded.insert(absolute_path.clone());
            true
        };
        debug!(path = %path::display_name(&absolute_path), expanded, "Node toggled");
        Ok(expanded)
    }

    /// Classify a click by its horizontal offset from the row's left edge.
    /// Leaves have no toggle affordance.
    pub fn click_target(&self, node: &PageNode, offset_x: f32) -> ClickTarget {
        if !node.is_leaf() && offset_x < self.toggle_hit_width {
            ClickTarget::Toggle
        } else {
            ClickTarget::Label
        }
    }

    pub fn click(&mut self, tree: &PageTree, absolute_path: &str, offset_x: f32) -> Result<ClickOutcome> {
        let absolute_path = path::normalize_path(absolute_path);
        let node = tree
            .find(&absolute_path)
            .map_err(|_| TreeError::page_not_found(&self.project, &absolute_path))?;

        match self.click_target(node, offset_x) {
            ClickTarget::Toggle => {
                let expanded = self.toggle(tree, &absolute_path)?;
                Ok(ClickOutcome::Toggled { expanded })
            }
            ClickTarget::Label => Ok(ClickOutcome::Selected(PageSelection {
                route: Route::for_page(&self.project, &absolute_path),
                project: self.project.clone(),
                path: absolute_path,
            })),
        }
    }

    /// Recompute the active node for a new route and open its ancestors.
    ///
    /// Idempotent. Nodes the user expanded stay expanded. A route into
    /// another project, or naming no node, leaves nothing active.
    pub fn on_route_change(&mut self, tree: &PageTree, route: &Route) -> Option<&str> {
        self.active = None;
        if route.is_in_project(&self.project) && tree.contains(&route.page_path) {
            let mut ancestor = path::parent(&route.page_path);
            while let Some(current) = ancestor {
                self.expanded.insert(current.to_string());
                ancestor = path::parent(current);
            }
            self.active = Some(route.page_path.clone());
        }
        self.active.as_deref()
    }

    /// Discard all per-node state, e.g. after switching project
    pub fn reset(&mut self, tree: &PageTree, route: &Route) {
        let toggle_hit_width = self.toggle_hit_width;
        *self = Self::mount(tree, route).with_toggle_hit_width(toggle_hit_width);
    }

    /// Forget paths that no longer exist after the tree was replaced
    pub fn prune(&mut self, tree: &PageTree) {
        self.expanded.retain(|absolute_path| tree.contains(absolute_path));
        if self
            .active
            .as_deref()
            .is_some_and(|active| !tree.contains(active))
        {
            self.active = None;
        }
    }

    /// Rows to render: the root, then children sorted by display name,
    /// descending only into expanded nodes.
    pub fn visible_entries(&self, tree: &PageTree) -> Vec<NavigationEntry> {
        let mut entries = Vec::new();
        self.collect_entries(tree.root(), "", 0, &mut entries);
        entries
    }

    fn collect_entries(&self, node: &PageNode, absolute_path: &str, depth: usize, entries: &mut Vec<NavigationEntry>) {
        let expanded = self.expanded.contains(absolute_path);
        entries.push(NavigationEntry {
            path: absolute_path.to_string(),
            display_name: path::display_name(absolute_path).to_string(),
            depth,
            expanded,
            active: self.active.as_deref() == Some(absolute_path),
            has_children: !node.is_leaf(),
        });

        if expanded {
            for child in traversal::sorted_children(node) {
                let child_path = path::join(absolute_path, &child.name);
                self.collect_entries(child, &child_path, depth + 1, entries);
            }
        }
    }
}
