//! Sled-backed persistence for pages and blocks.
//!
//! Each collection is a primary tree (id -> JSON record) plus index trees whose keys are
//! built so that a prefix scan answers the index query. A record and its index entries
//! are written in one transaction over that collection's trees.

use super::{BlockRepository, PageRepository, SCHEMA_VERSION};
use crate::block::{Block, BlockMap, StoredBlock};
use crate::error::StorageError;
use crate::page::{Page, PageMap};
use crate::types::Timestamp;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionResult,
    TransactionalTree,
};
use sled::{Db, Transactional, Tree};
use std::path::Path;
use tracing::{debug, info};

const PAGES_TREE: &str = "pages";
const PAGES_BY_PARENT_TREE: &str = "pages.by_parent";
const PAGES_BY_UPDATED_TREE: &str = "pages.by_updated";
const BLOCKS_TREE: &str = "blocks";
const BLOCKS_BY_PARENT_TREE: &str = "blocks.by_parent";
const BLOCKS_BY_PAGE_TREE: &str = "blocks.by_page";
const META_TREE: &str = "meta";
const SCHEMA_VERSION_KEY: &[u8] = b"schema_version";

/// Key segment separator; ids never contain NUL
const SEP: u8 = 0x00;
/// Parent-key marker for "no parent"
const ROOT_MARKER: u8 = 0x00;
/// Parent-key marker followed by the parent id
const CHILD_MARKER: u8 = 0x01;

fn parent_prefix(parent_id: Option<&str>) -> Vec<u8> {
    match parent_id {
        None => vec![ROOT_MARKER],
        Some(id) => {
            let mut key = Vec::with_capacity(id.len() + 2);
            key.push(CHILD_MARKER);
            key.extend_from_slice(id.as_bytes());
            key.push(SEP);
            key
        }
    }
}

fn page_parent_key(parent_id: Option<&str>, id: &str) -> Vec<u8> {
    let mut key = parent_prefix(parent_id);
    key.extend_from_slice(id.as_bytes());
    key
}

fn page_updated_key(updated_at: Timestamp, id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(8 + id.len());
    key.extend_from_slice(&(updated_at.max(0) as u64).to_be_bytes());
    key.extend_from_slice(id.as_bytes());
    key
}

fn page_scope(page_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(page_id.len() + 1);
    key.extend_from_slice(page_id.as_bytes());
    key.push(SEP);
    key
}

fn block_page_key(page_id: &str, id: &str) -> Vec<u8> {
    let mut key = page_scope(page_id);
    key.extend_from_slice(id.as_bytes());
    key
}

fn block_parent_prefix(page_id: &str, parent_id: Option<&str>) -> Vec<u8> {
    let mut key = page_scope(page_id);
    key.extend_from_slice(&parent_prefix(parent_id));
    key
}

fn block_parent_key(page_id: &str, parent_id: Option<&str>, id: &str) -> Vec<u8> {
    let mut key = block_parent_prefix(page_id, parent_id);
    key.extend_from_slice(id.as_bytes());
    key
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StorageError> {
    Ok(serde_json::to_vec(value)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StorageError> {
    Ok(serde_json::from_slice(bytes)?)
}

fn abort<T>(err: impl Into<StorageError>) -> ConflictableTransactionResult<T, StorageError> {
    Err(ConflictableTransactionError::Abort(err.into()))
}

/// Embedded store holding both collections
#[derive(Clone)]
pub struct SledStore {
    db: Db,
    pages: Tree,
    pages_by_parent: Tree,
    pages_by_updated: Tree,
    blocks: Tree,
    blocks_by_parent: Tree,
    blocks_by_page: Tree,
}

impl SledStore {
    /// Open (or create) a store at `path`.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        std::fs::create_dir_all(path)?;
        let db = sled::open(path)?;
        info!(path = %path.display(), "Opened page store");
        Self::from_db(db)
    }

    /// Store backed by a temporary database that is removed on drop.
    pub fn temporary() -> Result<Self, StorageError> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    pub fn from_db(db: Db) -> Result<Self, StorageError> {
        let store = Self {
            pages: db.open_tree(PAGES_TREE)?,
            pages_by_parent: db.open_tree(PAGES_BY_PARENT_TREE)?,
            pages_by_updated: db.open_tree(PAGES_BY_UPDATED_TREE)?,
            blocks: db.open_tree(BLOCKS_TREE)?,
            blocks_by_parent: db.open_tree(BLOCKS_BY_PARENT_TREE)?,
            blocks_by_page: db.open_tree(BLOCKS_BY_PAGE_TREE)?,
            db,
        };
        store.check_schema_version()?;
        Ok(store)
    }

    fn check_schema_version(&self) -> Result<(), StorageError> {
        let meta = self.db.open_tree(META_TREE)?;
        match meta.get(SCHEMA_VERSION_KEY)? {
            None => {
                meta.insert(SCHEMA_VERSION_KEY, SCHEMA_VERSION.to_be_bytes().to_vec())?;
                debug!(version = SCHEMA_VERSION, "Stamped new store with schema version");
                Ok(())
            }
            Some(raw) => {
                let found = <[u8; 4]>::try_from(raw.as_ref())
                    .map(u32::from_be_bytes)
                    .map_err(|_| StorageError::CorruptIndex {
                        tree: META_TREE.to_string(),
                        key: String::from_utf8_lossy(SCHEMA_VERSION_KEY).into_owned(),
                    })?;
                if found != SCHEMA_VERSION {
                    return Err(StorageError::SchemaMismatch {
                        found,
                        expected: SCHEMA_VERSION,
                    });
                }
                Ok(())
            }
        }
    }

    /// Schema version stamped in this store
    pub fn schema_version(&self) -> Result<u32, StorageError> {
        let meta = self.db.open_tree(META_TREE)?;
        let raw = meta.get(SCHEMA_VERSION_KEY)?.ok_or_else(|| StorageError::CorruptIndex {
            tree: META_TREE.to_string(),
            key: String::from_utf8_lossy(SCHEMA_VERSION_KEY).into_owned(),
        })?;
        let bytes = <[u8; 4]>::try_from(raw.as_ref()).map_err(|_| StorageError::CorruptIndex {
            tree: META_TREE.to_string(),
            key: String::from_utf8_lossy(SCHEMA_VERSION_KEY).into_owned(),
        })?;
        Ok(u32::from_be_bytes(bytes))
    }

    /// Flush pending writes to disk.
    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }

    /// Resolve the ids stored as values under an index prefix.
    fn index_ids(&self, index: &Tree, tree_name: &str, prefix: &[u8]) -> Result<Vec<String>, StorageError> {
        let mut ids = Vec::new();
        for entry in index.scan_prefix(prefix) {
            let (key, value) = entry?;
            let id = String::from_utf8(value.to_vec()).map_err(|_| StorageError::CorruptIndex {
                tree: tree_name.to_string(),
                key: String::from_utf8_lossy(&key).into_owned(),
            })?;
            ids.push(id);
        }
        Ok(ids)
    }

    fn get_stored_block(&self, id: &str) -> Result<Option<StoredBlock>, StorageError> {
        match self.blocks.get(id.as_bytes())? {
            Some(raw) => Ok(Some(decode(&raw)?)),
            None => Ok(None),
        }
    }
}

fn put_page_tx(
    pages: &TransactionalTree,
    by_parent: &TransactionalTree,
    by_updated: &TransactionalTree,
    page: &Page,
    encoded: &[u8],
) -> ConflictableTransactionResult<(), StorageError> {
    if let Some(previous) = pages.insert(page.id.as_bytes(), encoded)? {
        let previous: Page = match decode(&previous) {
            Ok(p) => p,
            Err(e) => return abort(e),
        };
        by_parent.remove(page_parent_key(previous.parent_id.as_deref(), &previous.id))?;
        by_updated.remove(page_updated_key(previous.updated_at, &previous.id))?;
    }
    by_parent.insert(
        page_parent_key(page.parent_id.as_deref(), &page.id),
        page.id.as_bytes(),
    )?;
    by_updated.insert(
        page_updated_key(page.updated_at, &page.id),
        page.id.as_bytes(),
    )?;
    Ok(())
}

fn remove_page_tx(
    pages: &TransactionalTree,
    by_parent: &TransactionalTree,
    by_updated: &TransactionalTree,
    id: &str,
) -> ConflictableTransactionResult<(), StorageError> {
    if let Some(previous) = pages.remove(id.as_bytes())? {
        let previous: Page = match decode(&previous) {
            Ok(p) => p,
            Err(e) => return abort(e),
        };
        by_parent.remove(page_parent_key(previous.parent_id.as_deref(), &previous.id))?;
        by_updated.remove(page_updated_key(previous.updated_at, &previous.id))?;
    }
    Ok(())
}

fn unindex_block_tx(
    by_parent: &TransactionalTree,
    by_page: &TransactionalTree,
    previous: &[u8],
) -> ConflictableTransactionResult<(), StorageError> {
    let previous: StoredBlock = match decode(previous) {
        Ok(b) => b,
        Err(e) => return abort(e),
    };
    by_parent.remove(block_parent_key(
        &previous.page_id,
        previous.block.parent_id.as_deref(),
        &previous.block.id,
    ))?;
    by_page.remove(block_page_key(&previous.page_id, &previous.block.id))?;
    Ok(())
}

fn put_block_tx(
    blocks: &TransactionalTree,
    by_parent: &TransactionalTree,
    by_page: &TransactionalTree,
    page_id: &str,
    block: &Block,
    encoded: &[u8],
) -> ConflictableTransactionResult<(), StorageError> {
    if let Some(previous) = blocks.insert(block.id.as_bytes(), encoded)? {
        unindex_block_tx(by_parent, by_page, &previous)?;
    }
    by_parent.insert(
        block_parent_key(page_id, block.parent_id.as_deref(), &block.id),
        block.id.as_bytes(),
    )?;
    by_page.insert(block_page_key(page_id, &block.id), block.id.as_bytes())?;
    Ok(())
}

fn remove_block_tx(
    blocks: &TransactionalTree,
    by_parent: &TransactionalTree,
    by_page: &TransactionalTree,
    id: &str,
) -> ConflictableTransactionResult<bool, StorageError> {
    match blocks.remove(id.as_bytes())? {
        Some(previous) => {
            unindex_block_tx(by_parent, by_page, &previous)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

impl PageRepository for SledStore {
    fn get(&self, id: &str) -> Result<Option<Page>, StorageError> {
        match self.pages.get(id.as_bytes())? {
            Some(raw) => Ok(Some(decode(&raw)?)),
            None => Ok(None),
        }
    }

    fn put(&self, page: &Page) -> Result<(), StorageError> {
        PageRepository::put_all(self, std::slice::from_ref(page))
    }

    fn put_all(&self, pages: &[Page]) -> Result<(), StorageError> {
        let encoded = pages.iter().map(encode).collect::<Result<Vec<_>, _>>()?;
        let result: TransactionResult<(), StorageError> =
            (&self.pages, &self.pages_by_parent, &self.pages_by_updated).transaction(
                |(tx_pages, tx_by_parent, tx_by_updated)| {
                    for (page, bytes) in pages.iter().zip(&encoded) {
                        put_page_tx(tx_pages, tx_by_parent, tx_by_updated, page, bytes)?;
                    }
                    Ok(())
                },
            );
        result?;
        Ok(())
    }

    fn get_all(&self) -> Result<PageMap, StorageError> {
        let mut map = PageMap::new();
        for entry in self.pages.iter() {
            let (_, raw) = entry?;
            let page: Page = decode(&raw)?;
            map.insert(page.id.clone(), page);
        }
        Ok(map)
    }

    fn get_by_parent(&self, parent_id: Option<&str>) -> Result<Vec<Page>, StorageError> {
        let ids = self.index_ids(
            &self.pages_by_parent,
            PAGES_BY_PARENT_TREE,
            &parent_prefix(parent_id),
        )?;
        let mut pages = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(page) = PageRepository::get(self, &id)? {
                pages.push(page);
            }
        }
        Ok(pages)
    }

    fn recently_updated(&self, limit: usize) -> Result<Vec<Page>, StorageError> {
        let mut pages = Vec::new();
        for entry in self.pages_by_updated.iter().rev() {
            if pages.len() >= limit {
                break;
            }
            let (key, value) = entry?;
            let id = String::from_utf8(value.to_vec()).map_err(|_| StorageError::CorruptIndex {
                tree: PAGES_BY_UPDATED_TREE.to_string(),
                key: String::from_utf8_lossy(&key).into_owned(),
            })?;
            if let Some(page) = PageRepository::get(self, &id)? {
                pages.push(page);
            }
        }
        Ok(pages)
    }

    fn delete(&self, id: &str) -> Result<(), StorageError> {
        let result: TransactionResult<(), StorageError> =
            (&self.pages, &self.pages_by_parent, &self.pages_by_updated).transaction(
                |(tx_pages, tx_by_parent, tx_by_updated)| {
                    remove_page_tx(tx_pages, tx_by_parent, tx_by_updated, id)
                },
            );
        result?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.pages.clear()?;
        self.pages_by_parent.clear()?;
        self.pages_by_updated.clear()?;
        Ok(())
    }
}

impl BlockRepository for SledStore {
    fn get(&self, id: &str) -> Result<Option<Block>, StorageError> {
        Ok(self.get_stored_block(id)?.map(|stored| stored.block))
    }

    fn put(&self, page_id: &str, block: &Block) -> Result<(), StorageError> {
        let stored = StoredBlock {
            block: block.clone(),
            page_id: page_id.to_string(),
        };
        BlockRepository::put_all(self, std::slice::from_ref(&stored))
    }

    fn put_all(&self, blocks: &[StoredBlock]) -> Result<(), StorageError> {
        let encoded = blocks.iter().map(encode).collect::<Result<Vec<_>, _>>()?;
        let result: TransactionResult<(), StorageError> =
            (&self.blocks, &self.blocks_by_parent, &self.blocks_by_page).transaction(
                |(tx_blocks, tx_by_parent, tx_by_page)| {
                    for (stored, bytes) in blocks.iter().zip(&encoded) {
                        put_block_tx(
                            tx_blocks,
                            tx_by_parent,
                            tx_by_page,
                            &stored.page_id,
                            &stored.block,
                            bytes,
                        )?;
                    }
                    Ok(())
                },
            );
        result?;
        Ok(())
    }

    fn get_by_page(&self, page_id: &str) -> Result<BlockMap, StorageError> {
        let ids = self.index_ids(&self.blocks_by_page, BLOCKS_BY_PAGE_TREE, &page_scope(page_id))?;
        let mut map = BlockMap::with_capacity(ids.len());
        for id in ids {
            if let Some(stored) = self.get_stored_block(&id)? {
                map.insert(stored.block.id.clone(), stored.block);
            }
        }
        Ok(map)
    }

    fn get_by_parent(
        &self,
        parent_id: Option<&str>,
        page_id: &str,
    ) -> Result<Vec<Block>, StorageError> {
        let ids = self.index_ids(
            &self.blocks_by_parent,
            BLOCKS_BY_PARENT_TREE,
            &block_parent_prefix(page_id, parent_id),
        )?;
        let mut blocks = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(stored) = self.get_stored_block(&id)? {
                blocks.push(stored.block);
            }
        }
        Ok(blocks)
    }

    fn get_all(&self) -> Result<Vec<StoredBlock>, StorageError> {
        let mut blocks = Vec::new();
        for entry in self.blocks.iter() {
            let (_, raw) = entry?;
            blocks.push(decode(&raw)?);
        }
        Ok(blocks)
    }

    fn delete(&self, id: &str) -> Result<(), StorageError> {
        let result: TransactionResult<bool, StorageError> =
            (&self.blocks, &self.blocks_by_parent, &self.blocks_by_page).transaction(
                |(tx_blocks, tx_by_parent, tx_by_page)| {
                    remove_block_tx(tx_blocks, tx_by_parent, tx_by_page, id)
                },
            );
        result?;
        Ok(())
    }

    fn delete_by_page(&self, page_id: &str) -> Result<usize, StorageError> {
        let ids = self.index_ids(&self.blocks_by_page, BLOCKS_BY_PAGE_TREE, &page_scope(page_id))?;
        if ids.is_empty() {
            return Ok(0);
        }
        let result: TransactionResult<usize, StorageError> =
            (&self.blocks, &self.blocks_by_parent, &self.blocks_by_page).transaction(
                |(tx_blocks, tx_by_parent, tx_by_page)| {
                    let mut removed = 0;
                    for id in &ids {
                        if remove_block_tx(tx_blocks, tx_by_parent, tx_by_page, id)? {
                            removed += 1;
                        }
                    }
                    Ok(removed)
                },
            );
        let removed = result?;
        debug!(page_id, removed, "Deleted page blocks");
        Ok(removed)
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.blocks.clear()?;
        self.blocks_by_parent.clear()?;
        self.blocks_by_page.clear()?;
        Ok(())
    }
}
