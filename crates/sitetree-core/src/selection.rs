// ABOUTME: Resolves the current project from the previous selection, the route, or configuration order
// ABOUTME: Loads project trees concurrently and records each project's outcome independently

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;

use sitetree_events::EventBus;
use sitetree_events::project::{Event as ProjectEvent, SelectionSource};
use sitetree_logging::{debug, info, instrument, warn};
use sitetree_types::ProjectTree;

use crate::error::{Result, TreeError};
use crate::route::Route;
use crate::services::PageFetchService;
use crate::store::Session;
use crate::traversal;

/// The project that should be current, and why
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub project: String,
    pub source: SelectionSource,
}

/// Pick the current project.
///
/// A still-known current selection wins, then the project named in the
/// route, then the first known project. `known` is in configured order.
pub fn resolve_project(known: &[String], route: &Route, current: Option<&str>) -> Option<Resolution> {
    let is_known = |project: &str| known.iter().any(|candidate| candidate == project);

    if let Some(current) = current.filter(|current| is_known(current)) {
        return Some(Resolution {
            project: current.to_string(),
            source: SelectionSource::Retained,
        });
    }

    if let Some(project) = route.project.as_deref().filter(|project| is_known(project)) {
        return Some(Resolution {
            project: project.to_string(),
            source: SelectionSource::Route,
        });
    }

    known.first().map(|project| Resolution {
        project: project.clone(),
        source: SelectionSource::Fallback,
    })
}

/// Fetches project trees into the session cache
#[derive(Clone)]
pub struct ProjectLoader {
    fetcher: Arc<dyn PageFetchService>,
    session: Session,
    bus: Arc<dyn EventBus>,
    stale_after: Duration,
}

impl ProjectLoader {
    pub fn new(
        fetcher: Arc<dyn PageFetchService>,
        session: Session,
        bus: Arc<dyn EventBus>,
        stale_after: Duration,
    ) -> Self {
        Self {
            fetcher,
            session,
            bus,
            stale_after,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Fetch several projects concurrently.
    ///
    /// Each outcome is recorded on its own; one failure never hides the others.
    #[instrument(skip(self), fields(count = projects.len()))]
    pub async fn load_all(&self, projects: &[String]) -> Vec<(String, Result<u64>)> {
        for project in projects {
            self.session.mark_loading(project);
        }

        let outcomes = join_all(projects.iter().map(|project| self.fetch(project, false))).await;
        let loaded = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
        info!(loaded, failed = projects.len() - loaded, "Project trees loaded");

        projects.iter().cloned().zip(outcomes).collect()
    }

    /// Fetch a project unless a fresh enough tree is cached. Returns its generation.
    pub async fn ensure_loaded(&self, project: &str) -> Result<u64> {
        if !self.session.needs_fetch(project, self.stale_after) {
            if let Some(generation) = self.session.generation(project) {
                return Ok(generation);
            }
        }
        self.session.mark_loading(project);
        self.fetch(project, false).await
    }

    /// Bypass every cache and replace the project's tree wholesale
    pub async fn refresh(&self, project: &str) -> Result<u64> {
        let generation = self.fetch(project, true).await?;
        self.bus.dispatch_project(ProjectEvent::TreeReplaced {
            project: project.to_string(),
            generation,
        });
        Ok(generation)
    }

    /// Resolve the current project against the loaded ones and store the result
    pub fn select_for_route(&self, route: &Route) -> Option<Resolution> {
        let known = self.session.loaded_projects();
        let current = self.session.selected_project();
        let resolution = resolve_project(&known, route, current.as_deref());

        let next = resolution.as_ref().map(|resolution| resolution.project.clone());
        let previous = self.session.set_selected_project(next);
        if let Some(resolution) = &resolution {
            if previous.as_deref() != Some(resolution.project.as_str()) {
                self.announce(previous, resolution);
            }
        }
        resolution
    }

    /// Switch to a project the user picked, loading it if needed
    pub async fn select_project(&self, project: &str) -> Result<Resolution> {
        self.ensure_loaded(project).await?;
        let resolution = Resolution {
            project: project.to_string(),
            source: SelectionSource::User,
        };
        let previous = self
            .session
            .set_selected_project(Some(resolution.project.clone()));
        if previous.as_deref() != Some(project) {
            self.announce(previous, &resolution);
        }
        Ok(resolution)
    }

    fn announce(&self, previous: Option<String>, resolution: &Resolution) {
        info!(project = %resolution.project, source = ?resolution.source, "Project selected");
        self.bus.dispatch_project(ProjectEvent::ProjectSelected {
            previous,
            project: resolution.project.clone(),
            source: resolution.source,
        });
    }

    async fn fetch(&self, project: &str, bypass_cache: bool) -> Result<u64> {
        let ticket = self.session.begin_fetch();
        debug!(project, bypass_cache, ticket, "Fetching page tree");
        match self.fetcher.fetch_page_tree(project, bypass_cache).await {
            Ok(tree) => {
                let tree = self.checked(project, tree);
                let node_count = tree.root.subtree_len();
                let Some(generation) = self.session.store_tree(tree, ticket) else {
                    // a later fetch already landed; report what is cached now
                    return self
                        .session
                        .generation(project)
                        .ok_or_else(|| TreeError::project_not_found(project));
                };
                self.bus.dispatch_project(ProjectEvent::TreeLoaded {
                    project: project.to_string(),
                    node_count,
                    generation,
                });
                Ok(generation)
            }
            Err(error) => {
                warn!(project, %error, "Failed to fetch page tree");
                self.session.mark_failed(project, error.clone());
                self.bus.dispatch_project(ProjectEvent::TreeLoadFailed {
                    project: project.to_string(),
                    error: error.to_string(),
                });
                Err(error)
            }
        }
    }

    /// Log integrity problems in a fetched tree and file it under the requested project
    fn checked(&self, project: &str, mut tree: ProjectTree) -> ProjectTree {
        if tree.project_name != project {
            warn!(
                requested = project,
                received = %tree.project_name,
                "Fetched tree carries another project name"
            );
            tree.project_name = project.to_string();
        }

        let duplicates = traversal::duplicate_paths(&tree.root);
        if !duplicates.is_empty() {
            let error = TreeError::data_integrity(format!(
                "duplicate page paths: {}",
                duplicates.join(", ")
            ));
            warn!(project, %error, "Page tree violates path uniqueness");
        }
        tree
    }
}
