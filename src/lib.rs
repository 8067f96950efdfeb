//! NextNode: Local-First Hierarchical Notes
//!
//! A tree of pages, each holding a tree of content blocks, kept in memory and mirrored
//! into an embedded sled store. A navigation guard sequences the two stores when the
//! current route changes.

pub mod backup;
pub mod block;
pub mod config;
pub mod document;
pub mod error;
pub mod format;
pub mod logging;
pub mod navigation;
pub mod page;
pub mod session;
pub mod store;
pub mod tooling;
pub mod tree;
pub mod types;

pub use document::{Document, DocumentSettings, DocumentStore};
pub use error::{ApiError, StorageError};
pub use navigation::{Navigator, Route};
pub use session::Session;
pub use tree::PageTree;
