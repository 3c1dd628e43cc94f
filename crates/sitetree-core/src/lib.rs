// ABOUTME: Page-tree cache and synchronization engine for the sitetree console
// ABOUTME: Tree traversal, search, navigation state, project selection, and optimistic mutations

pub mod config;
pub mod console;
pub mod debounce;
pub mod error;
pub mod navigation;
pub mod path;
pub mod route;
pub mod search;
pub mod selection;
pub mod services;
pub mod store;
pub mod sync;
pub mod traversal;
pub mod tree;

pub use config::ConsoleConfig;
pub use console::{Collaborators, SiteConsole};
pub use debounce::{Debouncer, LookupOptions, UserLookup};
pub use error::{Result, TreeError};
pub use navigation::{
    ClickOutcome, ClickTarget, NavigationEntry, NavigationState, PageSelection,
};
pub use route::{Breadcrumb, Route};
pub use search::{SearchBox, SearchSelection, search};
pub use selection::{ProjectLoader, Resolution, resolve_project};
pub use services::{
    LocationProvider, MemoryLocation, MutationService, PageFetchService, UserDirectory,
};
pub use store::{ProjectLoad, SelectionState, Session};
pub use sync::{PageMutations, RemovalOutcome, TaskDraft};
pub use tree::PageTree;

#[cfg(test)]
mod tests;
