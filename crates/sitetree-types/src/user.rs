// ABOUTME: User records referenced by page owners and reviewers
// ABOUTME: Two records are the same person when their ids match or their emails do

use serde::{Deserialize, Serialize};
use std::fmt;

/// A person that can own or review pages
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct User {
    /// Backend identifier, absent for users entered but not yet persisted
    #[serde(default)]
    pub id: Option<u64>,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, alias = "jobTitle")]
    pub job_title: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub team: String,
}

/// What makes two user records refer to the same person
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UserIdentity {
    Id(u64),
    Email(String),
}

impl fmt::Display for UserIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserIdentity::Id(id) => write!(f, "#{id}"),
            UserIdentity::Email(email) => write!(f, "{email}"),
        }
    }
}

impl User {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    /// The key this user is shown and logged under: `id` when present, else the lowercased email
    pub fn identity(&self) -> UserIdentity {
        match self.id {
            Some(id) => UserIdentity::Id(id),
            None => UserIdentity::Email(self.email.trim().to_lowercase()),
        }
    }

    /// Trimmed, lowercased email; `None` when blank
    pub fn normalized_email(&self) -> Option<String> {
        let email = self.email.trim();
        (!email.is_empty()).then(|| email.to_lowercase())
    }

    /// Whether both records name the same person.
    ///
    /// Matching ids or matching non-blank emails are each enough, so a
    /// persisted user and the same person entered by email compare equal.
    pub fn same_identity(&self, other: &User) -> bool {
        let same_id = matches!((self.id, other.id), (Some(a), Some(b)) if a == b);
        let same_email = match (self.normalized_email(), other.normalized_email()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        };
        same_id || same_email
    }
}
