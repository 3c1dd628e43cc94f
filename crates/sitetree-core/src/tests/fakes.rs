// ABOUTME: In-memory backend and user directory used by the engine tests
// ABOUTME: Server-side trees can be edited, failed, or held until a test releases a response

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::time::Instant;

use sitetree_events::{EventBus, RecordingBus};
use sitetree_types::{
    ChangeRequest, CreatedPage, NewPageSpec, PageNode, PageStatus, ProjectTree, RelatedTask,
    RemovalRequest, User,
};

use crate::error::{Result, TreeError};
use crate::selection::ProjectLoader;
use crate::services::{MutationService, PageFetchService, UserDirectory};
use crate::store::Session;
use crate::sync::PageMutations;
use crate::traversal;

pub const PROJECT: &str = "example.com";
pub const OTHER_PROJECT: &str = "example.org";

pub fn ada() -> User {
    User::new("Ada", "ada@example.com").with_id(1)
}

pub fn grace() -> User {
    User::new("Grace", "grace@example.com").with_id(2)
}

pub fn example_tree() -> ProjectTree {
    ProjectTree::new(
        PROJECT,
        PageNode::root()
            .with_id(1)
            .with_child(
                PageNode::new("blog")
                    .with_id(2)
                    .with_title("Blog")
                    .with_status(PageStatus::Available)
                    .with_child(
                        PageNode::new("post-1")
                            .with_id(3)
                            .with_title("Post One")
                            .with_status(PageStatus::Available),
                    ),
            )
            .with_child(PageNode::new("about").with_id(4).with_owner(grace()))
            .with_child(PageNode::new("drafts").with_id(5)),
    )
}

pub fn other_tree() -> ProjectTree {
    ProjectTree::new(
        OTHER_PROJECT,
        PageNode::root()
            .with_id(100)
            .with_child(PageNode::new("post-office").with_id(101)),
    )
}

/// Fake server holding the authoritative trees
#[derive(Default)]
pub struct FakeBackend {
    trees: Mutex<HashMap<String, ProjectTree>>,
    failing_fetches: Mutex<HashSet<String>>,
    fetches: Mutex<Vec<(String, bool)>>,
    /// Held responses for owner and reviewer submissions, consumed in order
    held: Mutex<VecDeque<oneshot::Receiver<Result<()>>>>,
    /// Gates for tree fetches; a held fetch answers with the tree as it was when asked
    held_fetches: Mutex<VecDeque<oneshot::Receiver<()>>>,
    fail_create: Mutex<Option<TreeError>>,
    submissions: Mutex<Vec<String>>,
    next_id: Mutex<u64>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        let backend = Self::default();
        *backend.next_id.lock() = 1000;
        Arc::new(backend)
    }

    pub fn with_trees(trees: Vec<ProjectTree>) -> Arc<Self> {
        let backend = Self::new();
        for tree in trees {
            backend.set_tree(tree);
        }
        backend
    }

    pub fn set_tree(&self, tree: ProjectTree) {
        self.trees.lock().insert(tree.project_name.clone(), tree);
    }

    pub fn fail_fetches(&self, project: &str) {
        self.failing_fetches.lock().insert(project.to_string());
    }

    pub fn heal_fetches(&self, project: &str) {
        self.failing_fetches.lock().remove(project);
    }

    pub fn fetches(&self) -> Vec<(String, bool)> {
        self.fetches.lock().clone()
    }

    pub fn fail_next_create(&self, error: TreeError) {
        *self.fail_create.lock() = Some(error);
    }

    /// Make the next owner or reviewer submission wait for the returned sender
    pub fn hold_next_submission(&self) -> oneshot::Sender<Result<()>> {
        let (sender, receiver) = oneshot::channel();
        self.held.lock().push_back(receiver);
        sender
    }

    /// Make the next tree fetch wait for the returned sender
    pub fn hold_next_fetch(&self) -> oneshot::Sender<()> {
        let (sender, receiver) = oneshot::channel();
        self.held_fetches.lock().push_back(receiver);
        sender
    }

    pub fn submissions(&self) -> Vec<String> {
        self.submissions.lock().clone()
    }

    async fn respond(&self, submission: String) -> Result<()> {
        self.submissions.lock().push(submission);
        let held = self.held.lock().pop_front();
        match held {
            Some(receiver) => receiver
                .await
                .unwrap_or_else(|_| Err(TreeError::network("response dropped"))),
            None => Ok(()),
        }
    }

    fn task(&self, summary: &str) -> RelatedTask {
        let mut next_id = self.next_id.lock();
        *next_id += 1;
        RelatedTask {
            id: format!("WD-{}", *next_id),
            summary: summary.to_string(),
            status: "To Do".to_string(),
            created_at: Utc::now(),
        }
    }
}

#[async_trait]
impl PageFetchService for FakeBackend {
    async fn fetch_page_tree(&self, project: &str, bypass_cache: bool) -> Result<ProjectTree> {
        self.fetches.lock().push((project.to_string(), bypass_cache));
        let response = if self.failing_fetches.lock().contains(project) {
            Err(TreeError::server(502, "bad gateway"))
        } else {
            self.trees
                .lock()
                .get(project)
                .cloned()
                .ok_or_else(|| TreeError::server(404, format!("unknown project {project}")))
        };

        let gate = self.held_fetches.lock().pop_front();
        if let Some(gate) = gate {
            gate.await
                .map_err(|_| TreeError::network("fetch abandoned"))?;
        }
        response
    }
}

#[async_trait]
impl MutationService for FakeBackend {
    async fn submit_owner(&self, owner: Option<User>, page_id: u64) -> Result<()> {
        let name = owner.map(|owner| owner.name).unwrap_or_default();
        self.respond(format!("owner {page_id} {name}")).await
    }

    async fn submit_reviewers(&self, reviewers: Vec<User>, page_id: u64) -> Result<()> {
        self.respond(format!("reviewers {page_id} {}", reviewers.len()))
            .await
    }

    async fn create_page(&self, spec: NewPageSpec) -> Result<CreatedPage> {
        if let Some(error) = self.fail_create.lock().take() {
            return Err(error);
        }

        let id = {
            let mut next_id = self.next_id.lock();
            *next_id += 1;
            *next_id
        };
        let mut node = PageNode::new(spec.name.clone())
            .with_id(id)
            .with_owner(spec.owner.clone());
        let copy_doc_link = format!("https://docs.example.com/document/{id}");
        node.copy_doc_link = Some(copy_doc_link.clone());

        let mut trees = self.trees.lock();
        let tree = trees
            .get_mut(&spec.project)
            .ok_or_else(|| TreeError::server(404, "unknown project"))?;
        traversal::insert_node(&mut tree.root, &spec.parent_path, node)
            .map_err(|error| TreeError::server(400, error.to_string()))?;
        Ok(CreatedPage { copy_doc_link })
    }

    async fn request_changes(&self, request: ChangeRequest) -> Result<RelatedTask> {
        Ok(self.task(&request.description))
    }

    async fn request_removal(&self, request: RemovalRequest) -> Result<RelatedTask> {
        Ok(self.task(&request.description))
    }
}

/// Directory that records when and with what it was queried
#[derive(Default)]
pub struct FakeDirectory {
    users: Vec<User>,
    queries: Mutex<Vec<(String, Instant)>>,
}

impl FakeDirectory {
    pub fn new(users: Vec<User>) -> Arc<Self> {
        Arc::new(Self {
            users,
            queries: Mutex::new(Vec::new()),
        })
    }

    pub fn queries(&self) -> Vec<(String, Instant)> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl UserDirectory for FakeDirectory {
    async fn lookup_users(&self, fragment: &str) -> Result<Vec<User>> {
        self.queries.lock().push((fragment.to_string(), Instant::now()));
        let fragment = fragment.to_lowercase();
        Ok(self
            .users
            .iter()
            .filter(|user| {
                user.name.to_lowercase().contains(&fragment)
                    || user.email.to_lowercase().contains(&fragment)
            })
            .cloned()
            .collect())
    }
}

/// Engine pieces wired to a fake backend
pub struct Harness {
    pub backend: Arc<FakeBackend>,
    pub bus: RecordingBus,
    pub session: Session,
    pub loader: ProjectLoader,
    pub mutations: PageMutations,
}

impl Harness {
    pub fn new(trees: Vec<ProjectTree>) -> Self {
        let backend = FakeBackend::with_trees(trees);
        let bus = RecordingBus::new();
        let session = Session::new();
        let shared_bus: Arc<dyn EventBus> = Arc::new(bus.clone());
        let loader = ProjectLoader::new(
            backend.clone(),
            session.clone(),
            shared_bus.clone(),
            std::time::Duration::from_secs(300),
        );
        let mutations = PageMutations::new(loader.clone(), backend.clone(), shared_bus);
        Self {
            backend,
            bus,
            session,
            loader,
            mutations,
        }
    }

    /// Harness with `example.com` already loaded
    pub async fn loaded() -> Self {
        let harness = Self::new(vec![example_tree(), other_tree()]);
        harness
            .loader
            .ensure_loaded(PROJECT)
            .await
            .expect("example.com loads");
        harness
    }

    pub fn node(&self, page_path: &str) -> PageNode {
        self.session
            .with_tree(PROJECT, |tree| tree.find(page_path).cloned())
            .expect("project loaded")
            .expect("page exists")
    }
}
