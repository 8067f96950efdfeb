//! Record Store
//!
//! Repository ports for the two persisted collections (pages and blocks) and the
//! sled-backed adapter that implements them. The in-memory stores talk to these traits
//! only, so tests can swap in other implementations.

pub mod persistence;

use crate::block::{Block, BlockMap, StoredBlock};
use crate::error::StorageError;
use crate::page::{Page, PageMap};

pub use persistence::SledStore;

/// Current on-disk schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Page collection: keyed by page id, indexed by parent id and update time
pub trait PageRepository: Send + Sync {
    fn get(&self, id: &str) -> Result<Option<Page>, StorageError>;
    fn put(&self, page: &Page) -> Result<(), StorageError>;
    fn put_all(&self, pages: &[Page]) -> Result<(), StorageError>;
    fn get_all(&self) -> Result<PageMap, StorageError>;
    /// Pages whose parent is `parent_id` (`None` = root pages)
    fn get_by_parent(&self, parent_id: Option<&str>) -> Result<Vec<Page>, StorageError>;
    /// Most recently updated pages first
    fn recently_updated(&self, limit: usize) -> Result<Vec<Page>, StorageError>;
    fn delete(&self, id: &str) -> Result<(), StorageError>;
    fn clear(&self) -> Result<(), StorageError>;
}

/// Block collection: keyed by block id, indexed by owning page and by parent id
pub trait BlockRepository: Send + Sync {
    /// Point lookup; the owning page id is stripped from the result
    fn get(&self, id: &str) -> Result<Option<Block>, StorageError>;
    fn put(&self, page_id: &str, block: &Block) -> Result<(), StorageError>;
    fn put_all(&self, blocks: &[StoredBlock]) -> Result<(), StorageError>;
    fn get_by_page(&self, page_id: &str) -> Result<BlockMap, StorageError>;
    fn get_by_parent(
        &self,
        parent_id: Option<&str>,
        page_id: &str,
    ) -> Result<Vec<Block>, StorageError>;
    /// Every stored block, with its owning page id
    fn get_all(&self) -> Result<Vec<StoredBlock>, StorageError>;
    fn delete(&self, id: &str) -> Result<(), StorageError>;
    /// Delete every block of a page; returns how many were removed
    fn delete_by_page(&self, page_id: &str) -> Result<usize, StorageError>;
    fn clear(&self) -> Result<(), StorageError>;
}
