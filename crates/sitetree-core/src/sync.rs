// ABOUTME: Optimistic page mutations coordinated with the mutation service
// ABOUTME: Local edits land before the request; a rejected edit on display reverts to the last accepted value

use chrono::NaiveDate;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use sitetree_events::EventBus;
use sitetree_events::mutation::{Event as MutationEvent, MutationField};
use sitetree_logging::{debug, info, warn};
use sitetree_types::{
    ChangeRequest, ChangeRequestKind, NewPageSpec, PageNode, PageStatus, RelatedTask,
    RemovalRequest, User,
};

use crate::error::{Result, TreeError};
use crate::path;
use crate::selection::ProjectLoader;
use crate::services::MutationService;
use crate::store::Session;
use crate::traversal;

/// Free-form part of a change or removal request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub due_date: Option<NaiveDate>,
    pub description: String,
}

/// What a removal request did to the local tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalOutcome {
    /// The page never went live and was dropped
    Dropped,
    /// The page is live and is now marked for deletion
    MarkedForDeletion,
}

/// Project and page a field edit targets
type PageKey = (String, String);

/// Bookkeeping for the overlapping writes to one field of one page.
///
/// `confirmed` is the last value the server accepted (or the value found
/// before the first write); it only moves forward on confirmation.
/// `shown_sequence` names the write whose value the tree displays.
struct FieldWrites<V> {
    epoch: Option<u64>,
    last_sequence: u64,
    outstanding: usize,
    confirmed_sequence: u64,
    confirmed: V,
    shown_sequence: u64,
}

impl<V: Clone> FieldWrites<V> {
    fn new(epoch: Option<u64>, baseline: V) -> Self {
        Self {
            epoch,
            last_sequence: 0,
            outstanding: 0,
            confirmed_sequence: 0,
            confirmed: baseline,
            shown_sequence: 0,
        }
    }

    fn begin(&mut self, epoch: Option<u64>, previous: V) -> u64 {
        // nothing in flight, or the tree was refetched: what is shown is known-good
        if self.outstanding == 0 || self.epoch != epoch {
            self.epoch = epoch;
            self.confirmed_sequence = self.last_sequence;
            self.confirmed = previous;
        }
        self.last_sequence += 1;
        self.outstanding += 1;
        self.shown_sequence = self.last_sequence;
        self.last_sequence
    }

    /// Record a confirmation. Returns a value to show when the tree had
    /// been rolled back past this write.
    fn confirm(&mut self, sequence: u64, live: bool, value: V) -> Option<V> {
        self.outstanding = self.outstanding.saturating_sub(1);
        if !live || sequence <= self.confirmed_sequence {
            return None;
        }
        self.confirmed_sequence = sequence;
        self.confirmed = value.clone();
        if self.shown_sequence < sequence {
            self.shown_sequence = sequence;
            return Some(value);
        }
        None
    }

    /// Record a rejection. Returns the baseline to restore when the
    /// rejected value is the one on display.
    fn reject(&mut self, sequence: u64, live: bool) -> Option<V> {
        self.outstanding = self.outstanding.saturating_sub(1);
        if !live || self.shown_sequence != sequence {
            return None;
        }
        self.shown_sequence = self.confirmed_sequence;
        Some(self.confirmed.clone())
    }
}

/// Write bookkeeping for one field across pages
struct WriteLog<V> {
    fields: Mutex<HashMap<PageKey, FieldWrites<V>>>,
}

impl<V: Clone> WriteLog<V> {
    fn new() -> Self {
        Self {
            fields: Mutex::new(HashMap::new()),
        }
    }

    fn begin(&self, key: &PageKey, epoch: Option<u64>, previous: V) -> u64 {
        let mut fields = self.fields.lock();
        fields
            .entry(key.clone())
            .or_insert_with(|| FieldWrites::new(epoch, previous.clone()))
            .begin(epoch, previous)
    }

    fn settle(
        &self,
        key: &PageKey,
        settle: impl FnOnce(&mut FieldWrites<V>) -> Option<V>,
    ) -> Option<V> {
        let mut fields = self.fields.lock();
        let writes = fields.get_mut(key)?;
        let shown = settle(writes);
        if writes.outstanding == 0 {
            fields.remove(key);
        }
        shown
    }
}

/// Coordinates local optimistic edits with the mutation service.
///
/// A rejected edit that is still on display is rolled back to the last
/// value the server accepted, even when older edits of the same field are
/// still in flight. A tree replaced by a refetch in the meantime is never
/// rolled back into.
#[derive(Clone)]
pub struct PageMutations {
    session: Session,
    loader: ProjectLoader,
    service: Arc<dyn MutationService>,
    bus: Arc<dyn EventBus>,
    owners: Arc<WriteLog<Option<User>>>,
    reviewers: Arc<WriteLog<Vec<User>>>,
}

impl PageMutations {
    pub fn new(loader: ProjectLoader, service: Arc<dyn MutationService>, bus: Arc<dyn EventBus>) -> Self {
        Self {
            session: loader.session().clone(),
            loader,
            service,
            bus,
            owners: Arc::new(WriteLog::new()),
            reviewers: Arc::new(WriteLog::new()),
        }
    }

    pub async fn set_owner(&self, project: &str, page_path: &str, owner: Option<User>) -> Result<()> {
        let service = self.service.clone();
        self.patch_field(
            project,
            page_path,
            MutationField::Owner,
            &self.owners,
            owner,
            traversal::set_owner,
            |owner, page_id| async move { service.submit_owner(owner, page_id).await },
        )
        .await
    }

    pub async fn set_reviewers(&self, project: &str, page_path: &str, reviewers: Vec<User>) -> Result<()> {
        let service = self.service.clone();
        self.patch_field(
            project,
            page_path,
            MutationField::Reviewers,
            &self.reviewers,
            traversal::dedup_users(reviewers),
            traversal::set_reviewers,
            |reviewers, page_id| async move { service.submit_reviewers(reviewers, page_id).await },
        )
        .await
    }

    /// Add a reviewer; a user already reviewing the page is left alone
    pub async fn add_reviewer(&self, project: &str, page_path: &str, reviewer: User) -> Result<()> {
        let mut reviewers = self.current_reviewers(project, page_path)?;
        if reviewers.iter().any(|existing| existing.same_identity(&reviewer)) {
            debug!(project, path = page_path, "Reviewer already assigned");
            return Ok(());
        }
        reviewers.push(reviewer);
        self.set_reviewers(project, page_path, reviewers).await
    }

    pub async fn remove_reviewer(&self, project: &str, page_path: &str, reviewer: &User) -> Result<()> {
        let reviewers = self.current_reviewers(project, page_path)?;
        let remaining: Vec<User> = reviewers
            .iter()
            .filter(|existing| !existing.same_identity(reviewer))
            .cloned()
            .collect();
        if remaining.len() == reviewers.len() {
            return Ok(());
        }
        self.set_reviewers(project, page_path, remaining).await
    }

    /// Create a page, returning the generated copy document link.
    ///
    /// The page shows up locally as `NEW` right away. Once the service
    /// confirms, the project is refetched and the server's tree replaces
    /// the optimistic one. On failure the optimistic page is removed.
    pub async fn create_page(&self, spec: NewPageSpec) -> Result<String> {
        if !path::is_valid_segment(&spec.name) {
            return Err(TreeError::invalid(format!(
                "'{}' is not a valid page name",
                spec.name
            )));
        }
        if spec.owner.email.trim().is_empty() {
            return Err(TreeError::invalid("a new page needs an owner"));
        }

        let project = spec.project.clone();
        let parent_path = path::normalize_path(&spec.parent_path);
        let mut node = PageNode::new(spec.name.clone())
            .with_status(PageStatus::New)
            .with_owner(spec.owner.clone());
        node.reviewers = traversal::dedup_users(spec.reviewers.clone());
        node.copy_doc_link = spec.copy_doc_link.clone();

        let epoch = self.session.epoch(&project);
        let new_path = self
            .session
            .with_tree_mut(&project, |root| traversal::insert_node(root, &parent_path, node))?;
        self.optimistic_applied(&project, &new_path, MutationField::Children);

        match self.service.create_page(spec).await {
            Ok(created) => {
                info!(project = %project, path = %new_path, "Page created");
                if let Err(error) = self.loader.refresh(&project).await {
                    warn!(project = %project, %error, "Refetch after page creation failed");
                    let copy_doc_link = created.copy_doc_link.clone();
                    if let Err(patch_error) = self.session.with_tree_mut(&project, |root| {
                        traversal::find_node_mut(root, &new_path)
                            .map(|node| node.copy_doc_link = Some(copy_doc_link))
                    }) {
                        warn!(path = %new_path, error = %patch_error, "Created page missing locally");
                    }
                }
                self.bus.dispatch_mutation(MutationEvent::Confirmed {
                    project: project.clone(),
                    path: new_path.clone(),
                    field: MutationField::Children,
                });
                self.bus.dispatch_mutation(MutationEvent::PageCreated {
                    project,
                    path: new_path,
                    copy_doc_link: created.copy_doc_link.clone(),
                });
                Ok(created.copy_doc_link)
            }
            Err(error) => {
                if self.session.epoch(&project) == epoch {
                    if let Err(remove_error) = self
                        .session
                        .with_tree_mut(&project, |root| traversal::remove_node(root, &new_path))
                    {
                        warn!(path = %new_path, error = %remove_error, "Optimistic page already gone");
                    }
                    self.rolled_back(&project, &new_path, MutationField::Children, &error);
                } else {
                    self.superseded(&project, &new_path, MutationField::Children);
                }
                Err(error)
            }
        }
    }

    /// File a change request against a page and attach the resulting task
    pub async fn request_changes(
        &self,
        project: &str,
        page_path: &str,
        kind: ChangeRequestKind,
        draft: TaskDraft,
    ) -> Result<RelatedTask> {
        let page_path = path::normalize_path(page_path);
        let page_id = self.page_id(project, &page_path)?;
        let reporter_id = self
            .session
            .user()
            .and_then(|user| user.id)
            .ok_or_else(|| TreeError::invalid("change requests need a signed-in reporter"))?;
        let due_date = draft
            .due_date
            .ok_or_else(|| TreeError::invalid("change requests need a due date"))?;

        let task = self
            .service
            .request_changes(ChangeRequest {
                page_id,
                reporter_id,
                due_date,
                kind,
                description: draft.description,
            })
            .await?;

        self.attach_task(project, &page_path, &task)?;
        Ok(task)
    }

    /// Ask for a page to be removed.
    ///
    /// A page that never went live disappears from the local tree. A live
    /// page is marked `TO_DELETE` and carries the removal task.
    pub async fn request_removal(
        &self,
        project: &str,
        page_path: &str,
        draft: TaskDraft,
    ) -> Result<RemovalOutcome> {
        let page_path = path::normalize_path(page_path);
        let page_id = self.page_id(project, &page_path)?;
        let reporter_id = self.session.user().and_then(|user| user.id);

        let task = self
            .service
            .request_removal(RemovalRequest {
                page_id,
                reporter_id,
                due_date: draft.due_date,
                description: draft.description,
            })
            .await?;

        let status = self
            .session
            .with_tree(project, |tree| tree.find(&page_path).map(|node| node.status))
            .ok_or_else(|| TreeError::project_not_found(project))??;

        if status == PageStatus::New {
            self.session
                .with_tree_mut(project, |root| traversal::remove_node(root, &page_path))?;
            self.bus.dispatch_mutation(MutationEvent::Confirmed {
                project: project.to_string(),
                path: page_path,
                field: MutationField::Children,
            });
            return Ok(RemovalOutcome::Dropped);
        }

        self.session.with_tree_mut(project, |root| {
            traversal::set_status(root, &page_path, PageStatus::ToDelete)
        })?;
        self.bus.dispatch_mutation(MutationEvent::Confirmed {
            project: project.to_string(),
            path: page_path.clone(),
            field: MutationField::Status,
        });
        self.attach_task(project, &page_path, &task)?;
        Ok(RemovalOutcome::MarkedForDeletion)
    }

    #[allow(clippy::too_many_arguments)]
    async fn patch_field<V, Submit, Fut>(
        &self,
        project: &str,
        page_path: &str,
        field: MutationField,
        writes: &WriteLog<V>,
        value: V,
        apply: fn(&mut PageNode, &str, V) -> Result<V>,
        submit: Submit,
    ) -> Result<()>
    where
        V: Clone,
        Submit: FnOnce(V, u64) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let page_path = path::normalize_path(page_path);
        let page_id = self.page_id(project, &page_path)?;
        let key = (project.to_string(), page_path.clone());

        let epoch = self.session.epoch(project);
        let previous = self
            .session
            .with_tree_mut(project, |root| apply(root, &page_path, value.clone()))?;
        let sequence = writes.begin(&key, epoch, previous);
        self.optimistic_applied(project, &page_path, field);

        let outcome = submit(value.clone(), page_id).await;
        let live = self.session.epoch(project) == epoch;
        match outcome {
            Ok(()) => {
                if let Some(shown) = writes.settle(&key, |log| log.confirm(sequence, live, value)) {
                    debug!(project, path = %page_path, ?field, "Showing confirmed value again");
                    self.session
                        .with_tree_mut(project, |root| apply(root, &page_path, shown))?;
                }
                self.bus.dispatch_mutation(MutationEvent::Confirmed {
                    project: project.to_string(),
                    path: page_path,
                    field,
                });
                Ok(())
            }
            Err(error) => {
                match writes.settle(&key, |log| log.reject(sequence, live)) {
                    Some(baseline) => {
                        self.session
                            .with_tree_mut(project, |root| apply(root, &page_path, baseline))?;
                        self.rolled_back(project, &page_path, field, &error);
                    }
                    None => self.superseded(project, &page_path, field),
                }
                Err(error)
            }
        }
    }

    fn page_id(&self, project: &str, page_path: &str) -> Result<u64> {
        let id = self
            .session
            .with_tree(project, |tree| tree.find(page_path).map(|node| node.id))
            .ok_or_else(|| TreeError::project_not_found(project))?
            .map_err(|_| TreeError::page_not_found(project, page_path))?;
        id.ok_or_else(|| {
            TreeError::not_found(format!(
                "server id for page '{}' in project '{project}'",
                path::display_name(page_path)
            ))
        })
    }

    fn current_reviewers(&self, project: &str, page_path: &str) -> Result<Vec<User>> {
        let page_path = path::normalize_path(page_path);
        self.session
            .with_tree(project, |tree| {
                tree.find(&page_path).map(|node| node.reviewers.clone())
            })
            .ok_or_else(|| TreeError::project_not_found(project))?
    }

    fn attach_task(&self, project: &str, page_path: &str, task: &RelatedTask) -> Result<()> {
        self.session.with_tree_mut(project, |root| {
            traversal::append_related_task(root, page_path, task.clone())
        })?;
        self.bus.dispatch_mutation(MutationEvent::TaskAppended {
            project: project.to_string(),
            path: page_path.to_string(),
            task_id: task.id.clone(),
        });
        Ok(())
    }

    fn optimistic_applied(&self, project: &str, page_path: &str, field: MutationField) {
        let generation = self.session.generation(project).unwrap_or_default();
        debug!(project, path = page_path, ?field, generation, "Optimistic edit applied");
        self.bus.dispatch_mutation(MutationEvent::OptimisticApplied {
            project: project.to_string(),
            path: page_path.to_string(),
            field,
            generation,
        });
    }

    fn rolled_back(&self, project: &str, page_path: &str, field: MutationField, error: &TreeError) {
        warn!(project, path = page_path, ?field, %error, "Mutation rejected, local edit rolled back");
        self.bus.dispatch_mutation(MutationEvent::RolledBack {
            project: project.to_string(),
            path: page_path.to_string(),
            field,
            error: error.to_string(),
        });
    }

    fn superseded(&self, project: &str, page_path: &str, field: MutationField) {
        warn!(project, path = page_path, ?field, "Mutation rejected after a newer local edit, keeping it");
        self.bus.dispatch_mutation(MutationEvent::Superseded {
            project: project.to_string(),
            path: page_path.to_string(),
            field,
        });
    }
}
