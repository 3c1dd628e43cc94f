// ABOUTME: Orchestrates project selection, navigation state, search, lookup, and mutations for one session
// ABOUTME: Wires the collaborator services to the session cache and publishes events on the bus

use std::sync::Arc;
use tokio::sync::watch;

use sitetree_events::EventBus;
use sitetree_events::navigation::Event as NavigationEvent;
use sitetree_logging::{debug, info, instrument};
use sitetree_types::{PageNode, SearchMatch};

use crate::config::ConsoleConfig;
use crate::debounce::{LookupOptions, UserLookup};
use crate::error::{Result, TreeError};
use crate::navigation::{ClickOutcome, NavigationEntry, NavigationState};
use crate::route::{Breadcrumb, Route};
use crate::search::{SearchBox, SearchSelection};
use crate::selection::{ProjectLoader, Resolution};
use crate::services::{LocationProvider, MutationService, PageFetchService, UserDirectory};
use crate::store::Session;
use crate::sync::PageMutations;
use crate::tree::PageTree;

/// External services a console talks to
#[derive(Clone)]
pub struct Collaborators {
    pub fetcher: Arc<dyn PageFetchService>,
    pub mutations: Arc<dyn MutationService>,
    pub directory: Arc<dyn UserDirectory>,
    pub location: Arc<dyn LocationProvider>,
    pub bus: Arc<dyn EventBus>,
}

pub struct SiteConsole {
    config: ConsoleConfig,
    session: Session,
    loader: ProjectLoader,
    mutations: PageMutations,
    location: Arc<dyn LocationProvider>,
    bus: Arc<dyn EventBus>,
    navigation: Option<NavigationState>,
    search: SearchBox,
    lookup: UserLookup,
}

impl SiteConsole {
    pub fn new(config: ConsoleConfig, collaborators: Collaborators) -> Self {
        let session = Session::new();
        let loader = ProjectLoader::new(
            collaborators.fetcher,
            session.clone(),
            collaborators.bus.clone(),
            config.cache.stale_after(),
        );
        let mutations = PageMutations::new(
            loader.clone(),
            collaborators.mutations,
            collaborators.bus.clone(),
        );
        let search = SearchBox::new(config.search.threshold());
        let lookup = UserLookup::with_settings(
            collaborators.directory,
            config.lookup.quiet_period(),
            config.lookup.min_query_len,
        );

        Self {
            config,
            session,
            loader,
            mutations,
            location: collaborators.location,
            bus: collaborators.bus,
            navigation: None,
            search,
            lookup,
        }
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn mutations(&self) -> &PageMutations {
        &self.mutations
    }

    pub fn navigation(&self) -> Option<&NavigationState> {
        self.navigation.as_ref()
    }

    /// Load every configured project, then settle on a project for the current route
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> Option<Resolution> {
        let projects = self.config.projects.clone();
        self.loader.load_all(&projects).await;
        self.sync_route().await
    }

    /// React to the location provider's current route
    pub async fn sync_route(&mut self) -> Option<Resolution> {
        let route_path = self.location.current_route_path();
        let route = Route::parse(&route_path);
        let resolution = self.loader.select_for_route(&route)?;

        if let Err(error) = self.loader.ensure_loaded(&resolution.project).await {
            debug!(project = %resolution.project, %error, "Serving cached tree");
        }
        let toggle_hit_width = self.config.navigation.toggle_hit_width;
        let navigation = &mut self.navigation;
        let event = self.session.with_tree(&resolution.project, |tree| {
            match navigation
                .as_mut()
                .filter(|navigation| navigation.project() == resolution.project)
            {
                Some(navigation) => {
                    navigation.prune(tree);
                    let active_path = navigation
                        .on_route_change(tree, &route)
                        .map(str::to_string);
                    NavigationEvent::RouteChanged {
                        route: route_path.clone(),
                        active_path,
                    }
                }
                None => {
                    *navigation = Some(
                        NavigationState::mount(tree, &route)
                            .with_toggle_hit_width(toggle_hit_width),
                    );
                    NavigationEvent::StateReset {
                        project: resolution.project.clone(),
                    }
                }
            }
        })?;

        self.bus.dispatch_navigation(event);
        Some(resolution)
    }

    /// Switch project from the site selector; navigation state starts over
    pub async fn switch_project(&mut self, project: &str) -> Result<Resolution> {
        let resolution = self.loader.select_project(project).await?;
        let route = Route::parse(&self.location.current_route_path());

        let toggle_hit_width = self.config.navigation.toggle_hit_width;
        let navigation = &mut self.navigation;
        self.session
            .with_tree(project, |tree| match navigation.as_mut() {
                Some(navigation) => navigation.reset(tree, &route),
                None => {
                    *navigation = Some(
                        NavigationState::mount(tree, &route)
                            .with_toggle_hit_width(toggle_hit_width),
                    )
                }
            })
            .ok_or_else(|| TreeError::project_not_found(project))?;
        self.bus.dispatch_navigation(NavigationEvent::StateReset {
            project: project.to_string(),
        });
        info!(project, "Switched project");
        Ok(resolution)
    }

    /// Rows of the sidebar for the selected project
    pub fn visible_entries(&self) -> Vec<NavigationEntry> {
        let Some(navigation) = &self.navigation else {
            return Vec::new();
        };
        self.session
            .with_tree(navigation.project(), |tree| navigation.visible_entries(tree))
            .unwrap_or_default()
    }

    pub fn toggle(&mut self, page_path: &str) -> Result<bool> {
        let (project, expanded) =
            self.with_navigation(|navigation, tree| navigation.toggle(tree, page_path))?;
        self.bus.dispatch_navigation(NavigationEvent::NodeToggled {
            project,
            path: page_path.to_string(),
            expanded,
        });
        Ok(expanded)
    }

    /// Handle a click on a sidebar row at `offset_x` from its left edge
    pub fn click(&mut self, page_path: &str, offset_x: f32) -> Result<ClickOutcome> {
        let (project, outcome) = self.with_navigation(|navigation, tree| {
            navigation.click(tree, page_path, offset_x)
        })?;
        match &outcome {
            ClickOutcome::Toggled { expanded } => {
                self.bus.dispatch_navigation(NavigationEvent::NodeToggled {
                    project,
                    path: page_path.to_string(),
                    expanded: *expanded,
                });
            }
            ClickOutcome::Selected(selection) => {
                self.bus.dispatch_navigation(NavigationEvent::PageSelected {
                    project: selection.project.clone(),
                    path: selection.path.clone(),
                    route: selection.route.clone(),
                });
            }
        }
        Ok(outcome)
    }

    /// The node the current route points at
    pub fn current_page(&self) -> Option<PageNode> {
        let navigation = self.navigation.as_ref()?;
        let active = navigation.active_path()?;
        self.session
            .with_tree(navigation.project(), |tree| tree.find(active).ok().cloned())
            .flatten()
    }

    pub fn breadcrumbs(&self) -> Vec<Breadcrumb> {
        Route::parse(&self.location.current_route_path()).breadcrumbs()
    }

    pub fn search_input(&mut self, input: &str) -> Vec<SearchMatch> {
        let search = &mut self.search;
        self.session
            .with_trees(|trees| search.on_input(input, trees).to_vec())
    }

    /// Pick a search hit, switching project first when the hit lives elsewhere
    pub async fn select_search_match(&mut self, hit: &SearchMatch) -> Result<SearchSelection> {
        let selected = self.session.selected_project();
        let selection = self.search.select(hit, selected.as_deref());
        if selection.switch_project {
            self.switch_project(&selection.project).await?;
        }
        Ok(selection)
    }

    pub fn lookup_input(&mut self, input: &str) {
        self.lookup.on_input(input);
    }

    pub fn lookup_options(&self) -> watch::Receiver<LookupOptions> {
        self.lookup.subscribe()
    }

    /// Refetch a project and forget navigation state for pages that vanished
    pub async fn refresh(&mut self, project: &str) -> Result<u64> {
        let generation = self.loader.refresh(project).await?;
        if let Some(navigation) = self.navigation.as_mut().filter(|nav| nav.project() == project) {
            self.session.with_tree(project, |tree| navigation.prune(tree));
        }
        Ok(generation)
    }

    pub fn logout(&mut self) {
        self.session.clear();
        self.navigation = None;
        self.search.clear();
        self.lookup.clear();
        info!("Signed out");
    }

    /// Run `act` against the navigation state and its project's tree, under the session read lock.
    /// Returns the project name alongside the result.
    fn with_navigation<T>(
        &mut self,
        act: impl FnOnce(&mut NavigationState, &PageTree) -> Result<T>,
    ) -> Result<(String, T)> {
        let navigation = self
            .navigation
            .as_mut()
            .ok_or_else(|| TreeError::not_found("selected project"))?;
        let project = navigation.project().to_string();
        let outcome = self
            .session
            .with_tree(&project, |tree| act(navigation, tree))
            .ok_or_else(|| TreeError::project_not_found(&project))??;
        Ok((project, outcome))
    }
}
