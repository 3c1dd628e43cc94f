// ABOUTME: Collaborator traits the engine consumes: page fetch, mutation, user directory, location
// ABOUTME: Transport-free seams so the engine can run against HTTP clients, disk snapshots, or fakes

use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;

use sitetree_types::{
    ChangeRequest, CreatedPage, NewPageSpec, ProjectTree, RelatedTask, RemovalRequest, User,
};

use crate::error::Result;

/// Source of full page tree snapshots
#[async_trait]
pub trait PageFetchService: Send + Sync {
    /// Fetch a project's whole tree; `bypass_cache` asks for a fresh copy
    async fn fetch_page_tree(&self, project: &str, bypass_cache: bool) -> Result<ProjectTree>;
}

/// Persists page edits
#[async_trait]
pub trait MutationService: Send + Sync {
    async fn submit_owner(&self, owner: Option<User>, page_id: u64) -> Result<()>;

    async fn submit_reviewers(&self, reviewers: Vec<User>, page_id: u64) -> Result<()>;

    /// Create a page and its copy document
    async fn create_page(&self, spec: NewPageSpec) -> Result<CreatedPage>;

    async fn request_changes(&self, request: ChangeRequest) -> Result<RelatedTask>;

    async fn request_removal(&self, request: RemovalRequest) -> Result<RelatedTask>;
}

/// Lookup of people who can own or review pages
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn lookup_users(&self, fragment: &str) -> Result<Vec<User>>;
}

/// Current navigation location
pub trait LocationProvider: Send + Sync {
    fn current_route_path(&self) -> String;
}

/// Location held in memory, updated by whoever drives navigation
#[derive(Debug, Clone, Default)]
pub struct MemoryLocation {
    path: Arc<RwLock<String>>,
}

impl MemoryLocation {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: Arc::new(RwLock::new(path.into())),
        }
    }

    pub fn navigate(&self, path: impl Into<String>) {
        *self.path.write() = path.into();
    }
}

impl LocationProvider for MemoryLocation {
    fn current_route_path(&self) -> String {
        self.path.read().clone()
    }
}
