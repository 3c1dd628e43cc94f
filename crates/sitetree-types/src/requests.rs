// ABOUTME: Payloads submitted to the mutation backend
// ABOUTME: New pages, change requests and removal requests

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::user::User;

/// Everything needed to create a page under an existing parent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPageSpec {
    pub project: String,
    /// Absolute path of the parent page (`""` for the project root)
    pub parent_path: String,
    /// Path segment of the new page
    pub name: String,
    #[serde(default)]
    pub copy_doc_link: Option<String>,
    pub owner: User,
    #[serde(default)]
    pub reviewers: Vec<User>,
}

impl NewPageSpec {
    /// Absolute path the page will have once created
    pub fn path(&self) -> String {
        format!("{}/{}", self.parent_path.trim_end_matches('/'), self.name)
    }
}

/// Backend answer to a page creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedPage {
    /// Copy document link, generated by the backend when none was supplied
    #[serde(alias = "copy_doc")]
    pub copy_doc_link: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeRequestKind {
    CopyUpdate,
    PageRefresh,
    NewWebpage,
}

/// Request for content work on an existing page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRequest {
    pub page_id: u64,
    pub reporter_id: u64,
    pub due_date: NaiveDate,
    pub kind: ChangeRequestKind,
    #[serde(default)]
    pub description: String,
}

/// Request to take a page off the site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemovalRequest {
    pub page_id: u64,
    pub reporter_id: Option<u64>,
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_page_path() {
        let spec = NewPageSpec {
            project: "example.com".into(),
            parent_path: "/blog".into(),
            name: "post-2".into(),
            copy_doc_link: None,
            owner: User::new("Ada", "ada@example.com"),
            reviewers: Vec::new(),
        };
        assert_eq!(spec.path(), "/blog/post-2");

        let at_root = NewPageSpec {
            parent_path: String::new(),
            ..spec
        };
        assert_eq!(at_root.path(), "/post-2");
    }
}
