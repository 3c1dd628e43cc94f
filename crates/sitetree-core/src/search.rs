// ABOUTME: Substring search across every loaded project tree
// ABOUTME: SearchBox applies the activation threshold and turns a hit into a route

use sitetree_logging::debug;
use sitetree_types::{ProjectTree, SearchMatch};

use crate::route::Route;
use crate::traversal;

/// Default number of characters before a search runs
pub const DEFAULT_MIN_QUERY_LEN: usize = 3;

/// Find every node whose name segment or title contains `query`.
///
/// The comparison is case-sensitive. Results follow pre-order with children
/// in stored order, projects in the order given. `None` entries stand for
/// projects that are still loading or failed and are skipped. An empty
/// query matches nothing.
pub fn search<'a, I>(trees: I, query: &str) -> Vec<SearchMatch>
where
    I: IntoIterator<Item = Option<&'a ProjectTree>>,
{
    let mut matches = Vec::new();
    if query.is_empty() {
        return matches;
    }

    for tree in trees.into_iter().flatten() {
        traversal::walk(&tree.root, &mut |absolute_path, node, _| {
            if node.is_root() {
                return;
            }
            let title_hit = node
                .title
                .as_deref()
                .is_some_and(|title| title.contains(query));
            if node.name.contains(query) || title_hit {
                matches.push(SearchMatch {
                    project_name: tree.project_name.clone(),
                    node_path: absolute_path.to_string(),
                    title: node.title.clone(),
                });
            }
        });
    }

    matches
}

/// What to do after a search hit was picked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSelection {
    pub route: String,
    pub project: String,
    /// The hit lives in another project than the selected one
    pub switch_project: bool,
}

/// Input state of the sidebar search field
#[derive(Debug, Clone, Default)]
pub struct SearchBox {
    input: String,
    matches: Vec<SearchMatch>,
    min_query_len: usize,
}

impl SearchBox {
    pub fn new(min_query_len: usize) -> Self {
        Self {
            input: String::new(),
            matches: Vec::new(),
            min_query_len,
        }
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn matches(&self) -> &[SearchMatch] {
        &self.matches
    }

    /// Record new input and recompute matches once it is long enough
    pub fn on_input<'a, I>(&mut self, input: &str, trees: I) -> &[SearchMatch]
    where
        I: IntoIterator<Item = Option<&'a ProjectTree>>,
    {
        self.input = input.to_string();
        if input.chars().count() < self.min_query_len {
            self.matches.clear();
        } else {
            self.matches = search(trees, input);
            debug!(query = %input, hits = self.matches.len(), "Search updated");
        }
        &self.matches
    }

    pub fn clear(&mut self) {
        self.input.clear();
        self.matches.clear();
    }

    /// Resolve a picked match and reset the box
    pub fn select(&mut self, hit: &SearchMatch, selected_project: Option<&str>) -> SearchSelection {
        self.clear();
        SearchSelection {
            route: Route::for_page(&hit.project_name, &hit.node_path),
            project: hit.project_name.clone(),
            switch_project: selected_project != Some(hit.project_name.as_str()),
        }
    }
}
