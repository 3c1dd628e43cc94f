// ABOUTME: Collaborators backed by JSON snapshots on disk: `<dir>/<project>.json` and `<dir>/users.json`
// ABOUTME: Snapshots are read-only, so every mutation is refused

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use sitetree_core::{MutationService, PageFetchService, Result, TreeError, UserDirectory};
use sitetree_logging::debug;
use sitetree_types::{
    ChangeRequest, CreatedPage, NewPageSpec, ProjectTree, RelatedTask, RemovalRequest, User,
};

pub const USERS_FILE_NAME: &str = "users.json";

/// Serves page trees from `<dir>/<project>.json`
#[derive(Debug, Clone)]
pub struct SnapshotFetchService {
    dir: PathBuf,
}

impl SnapshotFetchService {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn snapshot_path(&self, project: &str) -> Result<PathBuf> {
        if project.is_empty() || project.contains(['/', '\\']) || project.starts_with('.') {
            return Err(TreeError::invalid(format!(
                "'{project}' cannot name a snapshot file"
            )));
        }
        Ok(self.dir.join(format!("{project}.json")))
    }
}

#[async_trait]
impl PageFetchService for SnapshotFetchService {
    async fn fetch_page_tree(&self, project: &str, bypass_cache: bool) -> Result<ProjectTree> {
        let path = self.snapshot_path(project)?;
        debug!(path = %path.display(), bypass_cache, "Reading page tree snapshot");

        let contents = read_file(&path).await?.ok_or_else(|| {
            TreeError::not_found(format!("snapshot '{}'", path.display()))
        })?;
        serde_json::from_str(&contents).map_err(|error| {
            TreeError::data_integrity(format!("{} is not a page tree: {error}", path.display()))
        })
    }
}

/// Looks users up in `<dir>/users.json`; a missing file means nobody
#[derive(Debug, Clone)]
pub struct SnapshotDirectory {
    path: PathBuf,
}

impl SnapshotDirectory {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(USERS_FILE_NAME),
        }
    }
}

#[async_trait]
impl UserDirectory for SnapshotDirectory {
    async fn lookup_users(&self, fragment: &str) -> Result<Vec<User>> {
        let Some(contents) = read_file(&self.path).await? else {
            return Ok(Vec::new());
        };
        let users: Vec<User> = serde_json::from_str(&contents).map_err(|error| {
            TreeError::data_integrity(format!("{} is not a user list: {error}", self.path.display()))
        })?;

        let fragment = fragment.to_lowercase();
        Ok(users
            .into_iter()
            .filter(|user| {
                user.name.to_lowercase().contains(&fragment)
                    || user.email.to_lowercase().contains(&fragment)
            })
            .collect())
    }
}

/// Refuses every edit
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOnlyMutations;

impl ReadOnlyMutations {
    fn refuse<T>() -> Result<T> {
        Err(TreeError::invalid("snapshot data is read-only"))
    }
}

#[async_trait]
impl MutationService for ReadOnlyMutations {
    async fn submit_owner(&self, _owner: Option<User>, _page_id: u64) -> Result<()> {
        Self::refuse()
    }

    async fn submit_reviewers(&self, _reviewers: Vec<User>, _page_id: u64) -> Result<()> {
        Self::refuse()
    }

    async fn create_page(&self, _spec: NewPageSpec) -> Result<CreatedPage> {
        Self::refuse()
    }

    async fn request_changes(&self, _request: ChangeRequest) -> Result<RelatedTask> {
        Self::refuse()
    }

    async fn request_removal(&self, _request: RemovalRequest) -> Result<RelatedTask> {
        Self::refuse()
    }
}

/// File contents, or `None` when the file does not exist
async fn read_file(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => Ok(Some(contents)),
        Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
        Err(error) => Err(TreeError::network(format!(
            "failed to read {}: {error}",
            path.display()
        ))),
    }
}
