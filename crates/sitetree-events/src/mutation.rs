// ABOUTME: Mutation domain events for optimistic page edits
// ABOUTME: Tracks the lifecycle from local patch to confirmation or rollback

/// Which part of a page a mutation touched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationField {
    Owner,
    Reviewers,
    Children,
    RelatedTasks,
    Status,
}

/// Mutation domain events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    OptimisticApplied {
        project: String,
        path: String,
        field: MutationField,
        generation: u64,
    },

    Confirmed {
        project: String,
        path: String,
        field: MutationField,
    },

    /// The backend rejected the change and the local value was restored
    RolledBack {
        project: String,
        path: String,
        field: MutationField,
        error: String,
    },

    /// The backend rejected the change but a newer local edit was kept
    Superseded {
        project: String,
        path: String,
        field: MutationField,
    },

    PageCreated {
        project: String,
        path: String,
        copy_doc_link: String,
    },

    TaskAppended {
        project: String,
        path: String,
        task_id: String,
    },
}
