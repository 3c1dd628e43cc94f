// ABOUTME: Pure data types with no cross-crate dependencies
// ABOUTME: Foundation layer for all other sitetree crates

pub mod page;
pub mod project;
pub mod requests;
pub mod user;

// Re-export commonly used types
pub use page::{PageNode, PageStatus, RelatedTask};
pub use project::{ProjectTree, SearchMatch};
pub use requests::{ChangeRequest, ChangeRequestKind, CreatedPage, NewPageSpec, RemovalRequest};
pub use user::{User, UserIdentity};
