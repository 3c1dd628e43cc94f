// ABOUTME: Session context holding the selection state and the per-project tree cache
// ABOUTME: Cloneable handle over shared state; absence is reported as None, never as an error

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use sitetree_logging::{debug, warn};
use sitetree_types::{PageNode, ProjectTree, SearchMatch, User};

use crate::error::{Result, TreeError};
use crate::search;
use crate::tree::PageTree;

/// Outcome of fetching one project's tree
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectLoad {
    Loading,
    Ready(PageTree),
    Failed(TreeError),
}

impl ProjectLoad {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn tree(&self) -> Option<&PageTree> {
        match self {
            Self::Ready(tree) => Some(tree),
            _ => None,
        }
    }
}

/// Which project is selected and who is signed in
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionState {
    pub selected_project: Option<String>,
    pub user: Option<User>,
}

#[derive(Debug)]
struct ProjectSlot {
    load: ProjectLoad,
    fetched_at: Option<Instant>,
    /// Bumped whenever the tree is replaced wholesale
    epoch: u64,
    /// Ticket of the fetch whose response is cached
    stored_ticket: u64,
}

#[derive(Debug, Default)]
struct SessionState {
    selection: SelectionState,
    /// Registration order of projects, which is also search order
    order: Vec<String>,
    slots: HashMap<String, ProjectSlot>,
    /// Last fetch ticket handed out; survives `clear`
    last_ticket: u64,
    /// Tickets up to this one were taken before the last `clear`
    cleared_through: u64,
}

impl SessionState {
    fn slot_mut(&mut self, project: &str) -> &mut ProjectSlot {
        if !self.slots.contains_key(project) {
            self.order.push(project.to_string());
        }
        self.slots
            .entry(project.to_string())
            .or_insert_with(|| ProjectSlot {
                load: ProjectLoad::Loading,
                fetched_at: None,
                epoch: 0,
                stored_ticket: 0,
            })
    }
}

/// Explicit session context shared by everything that needs the cache.
///
/// Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct Session {
    inner: Arc<RwLock<SessionState>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> SelectionState {
        self.inner.read().selection.clone()
    }

    pub fn selected_project(&self) -> Option<String> {
        self.inner.read().selection.selected_project.clone()
    }

    pub fn user(&self) -> Option<User> {
        self.inner.read().selection.user.clone()
    }

    pub fn set_user(&self, user: Option<User>) {
        self.inner.write().selection.user = user;
    }

    /// Only project selection decides which project is current
    pub(crate) fn set_selected_project(&self, project: Option<String>) -> Option<String> {
        let mut state = self.inner.write();
        std::mem::replace(&mut state.selection.selected_project, project)
    }

    /// Forget everything, as on logout
    pub fn clear(&self) {
        let mut state = self.inner.write();
        let last_ticket = state.last_ticket;
        *state = SessionState {
            last_ticket,
            cleared_through: last_ticket,
            ..SessionState::default()
        };
        debug!("Session cleared");
    }

    /// Copy of a ready tree
    pub fn tree(&self, project: &str) -> Option<PageTree> {
        self.with_tree(project, PageTree::clone)
    }

    pub fn project_load(&self, project: &str) -> Option<ProjectLoad> {
        self.inner
            .read()
            .slots
            .get(project)
            .map(|slot| slot.load.clone())
    }

    /// Projects whose tree is ready, in registration order
    pub fn loaded_projects(&self) -> Vec<String> {
        let state = self.inner.read();
        state
            .order
            .iter()
            .filter(|project| {
                state
                    .slots
                    .get(project.as_str())
                    .is_some_and(|slot| slot.load.is_ready())
            })
            .cloned()
            .collect()
    }

    pub fn generation(&self, project: &str) -> Option<u64> {
        self.with_tree(project, PageTree::generation)
    }

    pub fn epoch(&self, project: &str) -> Option<u64> {
        self.inner.read().slots.get(project).map(|slot| slot.epoch)
    }

    pub fn fetched_at(&self, project: &str) -> Option<Instant> {
        self.inner
            .read()
            .slots
            .get(project)
            .and_then(|slot| slot.fetched_at)
    }

    /// Whether a project has no ready tree or its tree is older than `max_age`
    pub fn needs_fetch(&self, project: &str, max_age: Duration) -> bool {
        let state = self.inner.read();
        match state.slots.get(project) {
            Some(ProjectSlot {
                load: ProjectLoad::Ready(_),
                fetched_at: Some(fetched_at),
                ..
            }) => fetched_at.elapsed() >= max_age,
            _ => true,
        }
    }

    /// Read a ready tree without copying it
    pub fn with_tree<R>(&self, project: &str, read: impl FnOnce(&PageTree) -> R) -> Option<R> {
        let state = self.inner.read();
        state
            .slots
            .get(project)
            .and_then(|slot| slot.load.tree())
            .map(read)
    }

    /// Mutate a ready tree; the generation moves only if `mutate` succeeds
    pub(crate) fn with_tree_mut<T>(
        &self,
        project: &str,
        mutate: impl FnOnce(&mut PageNode) -> Result<T>,
    ) -> Result<T> {
        let mut state = self.inner.write();
        match state.slots.get_mut(project).map(|slot| &mut slot.load) {
            Some(ProjectLoad::Ready(tree)) => tree.apply(mutate),
            _ => Err(TreeError::project_not_found(project)),
        }
    }

    /// Register a project as loading. A tree already cached stays visible.
    pub(crate) fn mark_loading(&self, project: &str) {
        let mut state = self.inner.write();
        let slot = state.slot_mut(project);
        if !slot.load.is_ready() {
            slot.load = ProjectLoad::Loading;
        }
    }

    /// Ticket for a fetch about to start. Later tickets win in `store_tree`.
    pub(crate) fn begin_fetch(&self) -> u64 {
        let mut state = self.inner.write();
        state.last_ticket += 1;
        state.last_ticket
    }

    /// Cache a fetched tree, replacing any previous one wholesale.
    ///
    /// Returns the new generation, or `None` when the response is dropped
    /// because a fetch started later was stored first or the session was
    /// cleared since the fetch started.
    pub(crate) fn store_tree(&self, tree: ProjectTree, ticket: u64) -> Option<u64> {
        let project = tree.project_name.clone();
        let mut state = self.inner.write();
        if ticket <= state.cleared_through {
            debug!(project = %project, ticket, "Dropping response fetched before sign-out");
            return None;
        }
        let slot = state.slot_mut(&project);
        if ticket < slot.stored_ticket {
            debug!(
                project = %project,
                ticket,
                stored = slot.stored_ticket,
                "Dropping response overtaken by a later fetch"
            );
            return None;
        }
        slot.stored_ticket = ticket;
        slot.epoch += 1;
        slot.fetched_at = Some(Instant::now());
        match &mut slot.load {
            ProjectLoad::Ready(existing) => {
                existing.replace(tree);
                Some(existing.generation())
            }
            load => {
                let fresh = PageTree::new(tree);
                let generation = fresh.generation();
                *load = ProjectLoad::Ready(fresh);
                Some(generation)
            }
        }
    }

    /// Record a failed fetch. Returns `true` when an older tree was kept.
    pub(crate) fn mark_failed(&self, project: &str, error: TreeError) -> bool {
        let mut state = self.inner.write();
        let slot = state.slot_mut(project);
        if slot.load.is_ready() {
            warn!(project, %error, "Refresh failed, keeping cached tree");
            true
        } else {
            slot.load = ProjectLoad::Failed(error);
            false
        }
    }

    /// Search every ready tree in registration order
    pub fn search(&self, query: &str) -> Vec<SearchMatch> {
        let state = self.inner.read();
        search::search(
            state.order.iter().map(|project| {
                state
                    .slots
                    .get(project)
                    .and_then(|slot| slot.load.tree())
                    .map(PageTree::project_tree)
            }),
            query,
        )
    }

    /// Run a closure over every slot's tree in registration order, `None` for unready ones
    pub fn with_trees<R>(&self, read: impl FnOnce(Vec<Option<&ProjectTree>>) -> R) -> R {
        let state = self.inner.read();
        let trees = state
            .order
            .iter()
            .map(|project| {
                state
                    .slots
                    .get(project)
                    .and_then(|slot| slot.load.tree())
                    .map(PageTree::project_tree)
            })
            .collect();
        read(trees)
    }
}
