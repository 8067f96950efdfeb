//! Storage failures propagate as errors and are not retried.

use nextnode::block::{Block, BlockMap, StoredBlock};
use nextnode::page::{Page, PageMap};
use nextnode::store::{BlockRepository, PageRepository};
use nextnode::{ApiError, DocumentSettings, DocumentStore, PageTree, StorageError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Reads succeed with nothing stored; every write fails.
#[derive(Default)]
struct ReadOnlyRepo {
    writes: AtomicUsize,
}

impl ReadOnlyRepo {
    fn refuse(&self) -> StorageError {
        self.writes.fetch_add(1, Ordering::SeqCst);
        StorageError::IoError(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
    }
}

impl PageRepository for ReadOnlyRepo {
    fn get(&self, _id: &str) -> Result<Option<Page>, StorageError> {
        Ok(None)
    }
    fn put(&self, _page: &Page) -> Result<(), StorageError> {
        Err(self.refuse())
    }
    fn put_all(&self, _pages: &[Page]) -> Result<(), StorageError> {
        Err(self.refuse())
    }
    fn get_all(&self) -> Result<PageMap, StorageError> {
        Ok(PageMap::new())
    }
    fn get_by_parent(&self, _parent_id: Option<&str>) -> Result<Vec<Page>, StorageError> {
        Ok(Vec::new())
    }
    fn recently_updated(&self, _limit: usize) -> Result<Vec<Page>, StorageError> {
        Ok(Vec::new())
    }
    fn delete(&self, _id: &str) -> Result<(), StorageError> {
        Err(self.refuse())
    }
    fn clear(&self) -> Result<(), StorageError> {
        Err(self.refuse())
    }
}

impl BlockRepository for ReadOnlyRepo {
    fn get(&self, _id: &str) -> Result<Option<Block>, StorageError> {
        Ok(None)
    }
    fn put(&self, _page_id: &str, _block: &Block) -> Result<(), StorageError> {
        Err(self.refuse())
    }
    fn put_all(&self, _blocks: &[StoredBlock]) -> Result<(), StorageError> {
        Err(self.refuse())
    }
    fn get_by_page(&self, _page_id: &str) -> Result<BlockMap, StorageError> {
        Ok(BlockMap::new())
    }
    fn get_by_parent(&self, _parent_id: Option<&str>, _page_id: &str) -> Result<Vec<Block>, StorageError> {
        Ok(Vec::new())
    }
    fn get_all(&self) -> Result<Vec<StoredBlock>, StorageError> {
        Ok(Vec::new())
    }
    fn delete(&self, _id: &str) -> Result<(), StorageError> {
        Err(self.refuse())
    }
    fn delete_by_page(&self, _page_id: &str) -> Result<usize, StorageError> {
        Err(self.refuse())
    }
    fn clear(&self) -> Result<(), StorageError> {
        Err(self.refuse())
    }
}

#[test]
fn create_page_surfaces_storage_error_once() {
    let repo = Arc::new(ReadOnlyRepo::default());
    let mut tree = PageTree::new(repo.clone(), repo.clone());

    let err = tree.create_page("Doomed", None).unwrap_err();
    assert!(matches!(err, ApiError::StorageError(StorageError::IoError(_))));
    assert_eq!(repo.writes.load(Ordering::SeqCst), 1);
    assert!(tree.pages().is_empty());
}

#[test]
fn create_document_surfaces_storage_error() {
    let repo = Arc::new(ReadOnlyRepo::default());
    let mut docs = DocumentStore::new(repo.clone(), repo.clone(), DocumentSettings::default());
    assert!(matches!(
        docs.create_document("Doomed", None),
        Err(ApiError::StorageError(_))
    ));
    assert!(docs.current_document().is_none());
}
