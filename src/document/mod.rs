//! Document Store
//!
//! Block state for the one open page: a flat id -> Block map, the root block and the
//! page metadata. Mutations are written through to the block repository as they happen.

use crate::block::{Block, BlockContent, BlockMap, BlockType, BlockUpdate, StoredBlock};
use crate::error::{logged, ApiError};
use crate::page::{Page, PageUpdate};
use crate::store::{BlockRepository, PageRepository};
use crate::types::{generate_id, now_ms, BlockId, PageId};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Knobs for new blocks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSettings {
    /// Language given to freshly created code blocks
    pub default_code_language: String,
}

impl Default for DocumentSettings {
    fn default() -> Self {
        Self {
            default_code_language: "javascript".to_string(),
        }
    }
}

/// Borrowed view of the open document
#[derive(Debug, Clone, Copy)]
pub struct Document<'a> {
    pub page: &'a Page,
    pub blocks: &'a BlockMap,
    pub root_block_id: Option<&'a str>,
}

fn block_cmp(a: &Block, b: &Block) -> Ordering {
    a.order
        .cmp(&b.order)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Parent-less block with the lowest sibling order.
fn find_root(blocks: &BlockMap) -> Option<BlockId> {
    blocks
        .values()
        .filter(|block| block.parent_id.is_none())
        .min_by(|a, b| block_cmp(a, b))
        .map(|block| block.id.clone())
}

pub struct DocumentStore {
    current_page: Option<Page>,
    blocks: BlockMap,
    root_block_id: Option<BlockId>,
    revision: u64,
    settings: DocumentSettings,
    page_repo: Arc<dyn PageRepository>,
    block_repo: Arc<dyn BlockRepository>,
}

impl DocumentStore {
    pub fn new(
        page_repo: Arc<dyn PageRepository>,
        block_repo: Arc<dyn BlockRepository>,
        settings: DocumentSettings,
    ) -> Self {
        Self {
            current_page: None,
            blocks: BlockMap::new(),
            root_block_id: None,
            revision: 0,
            settings,
            page_repo,
            block_repo,
        }
    }

    pub fn current_page(&self) -> Option<&Page> {
        self.current_page.as_ref()
    }

    pub fn blocks(&self) -> &BlockMap {
        &self.blocks
    }

    pub fn root_block_id(&self) -> Option<&str> {
        self.root_block_id.as_deref()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn settings(&self) -> &DocumentSettings {
        &self.settings
    }

    pub fn current_document(&self) -> Option<Document<'_>> {
        self.current_page.as_ref().map(|page| Document {
            page,
            blocks: &self.blocks,
            root_block_id: self.root_block_id.as_deref(),
        })
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    fn open_page_id(&self) -> Result<PageId, ApiError> {
        self.current_page
            .as_ref()
            .map(|page| page.id.clone())
            .ok_or(ApiError::NoDocumentLoaded)
    }

    fn persist(&mut self, page_id: &str, block: Block) -> Result<(), ApiError> {
        logged("put_block", self.block_repo.put(page_id, &block))?;
        self.blocks.insert(block.id.clone(), block);
        Ok(())
    }

    /// Open `page_id`: read its metadata and blocks, seeding a default block if it has none.
    pub fn load_document(&mut self, page_id: &str) -> Result<(), ApiError> {
        let page = logged("get_page", self.page_repo.get(page_id))?
            .ok_or_else(|| ApiError::PageNotFound(page_id.to_string()))?;
        let mut blocks = logged("get_by_page", self.block_repo.get_by_page(page_id))?;

        if blocks.is_empty() {
            let block = Block::default_paragraph(generate_id(), now_ms());
            logged("put_block", self.block_repo.put(page_id, &block))?;
            debug!(page_id, block_id = %block.id, "Seeded empty document");
            blocks.insert(block.id.clone(), block);
        }

        self.root_block_id = find_root(&blocks);
        self.blocks = blocks;
        self.current_page = Some(page);
        self.touch();
        debug!(page_id, blocks = self.blocks.len(), "Loaded document");
        Ok(())
    }

    /// Persist a new page with one default block. The open document is left alone.
    pub fn create_document(
        &mut self,
        title: impl Into<String>,
        parent_id: Option<&str>,
    ) -> Result<Page, ApiError> {
        let now = now_ms();
        let mut parent = match parent_id {
            Some(parent_id) => Some(
                logged("get_page", self.page_repo.get(parent_id))?
                    .ok_or_else(|| ApiError::PageNotFound(parent_id.to_string()))?,
            ),
            None => None,
        };
        let siblings = logged("get_by_parent", self.page_repo.get_by_parent(parent_id))?;
        let page = Page::new(
            generate_id(),
            title,
            parent_id.map(str::to_string),
            siblings.len() as i64,
            now,
        );

        logged("put_page", self.page_repo.put(&page))?;
        let block = Block::default_paragraph(generate_id(), now);
        logged("put_block", self.block_repo.put(&page.id, &block))?;

        if let Some(parent) = parent.as_mut() {
            parent.children_ids.push(page.id.clone());
            parent.updated_at = now;
            logged("put_page", self.page_repo.put(parent))?;
        }

        info!(page_id = %page.id, parent_id = ?parent_id, "Created document");
        Ok(page)
    }

    /// Merge `update` into the open page's metadata.
    pub fn update_page_metadata(&mut self, update: PageUpdate) -> Result<Page, ApiError> {
        let mut page = self.current_page.clone().ok_or(ApiError::NoDocumentLoaded)?;
        page.apply(update, now_ms());
        logged("put_page", self.page_repo.put(&page))?;
        self.current_page = Some(page.clone());
        self.touch();
        Ok(page)
    }

    pub fn get_block(&self, id: &str) -> Option<&Block> {
        self.blocks.get(id)
    }

    /// Children of `id` in `children_ids` sequence.
    pub fn child_blocks(&self, id: &str) -> Vec<&Block> {
        self.blocks
            .get(id)
            .map(|parent| {
                parent
                    .children_ids
                    .iter()
                    .filter_map(|child| self.blocks.get(child))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Top-level blocks sorted by order.
    pub fn root_blocks(&self) -> Vec<&Block> {
        let mut roots: Vec<&Block> = self
            .blocks
            .values()
            .filter(|block| block.parent_id.is_none())
            .collect();
        roots.sort_by(|a, b| block_cmp(a, b));
        roots
    }

    /// Insert a new block of `block_type` under `parent_id`, after `after` when given.
    pub fn add_block(
        &mut self,
        block_type: BlockType,
        parent_id: Option<&str>,
        after: Option<&str>,
    ) -> Result<Block, ApiError> {
        let page_id = self.open_page_id()?;
        let now = now_ms();

        let mut parent = match parent_id {
            Some(parent_id) => Some(
                self.blocks
                    .get(parent_id)
                    .cloned()
                    .ok_or_else(|| ApiError::BlockNotFound(parent_id.to_string()))?,
            ),
            None => None,
        };
        let anchor = after.and_then(|after| self.blocks.get(after));

        let order = match (anchor, parent.as_ref()) {
            (Some(anchor), _) => anchor.order + 1,
            (None, Some(parent)) => parent.children_ids.len() as i64,
            (None, None) => self.blocks.len() as i64,
        };

        // Make room among root siblings so the new block sorts right after its anchor.
        let mut shifted = Vec::new();
        if parent.is_none() && anchor.is_some() {
            for block in self.blocks.values() {
                if block.parent_id.is_none() && block.order >= order {
                    let mut block = block.clone();
                    block.order += 1;
                    block.updated_at = now;
                    shifted.push(StoredBlock {
                        block,
                        page_id: page_id.clone(),
                    });
                }
            }
        }
        if !shifted.is_empty() {
            logged("put_blocks", self.block_repo.put_all(&shifted))?;
            for stored in shifted {
                self.blocks.insert(stored.block.id.clone(), stored.block);
            }
        }

        let content = BlockContent::default_for(block_type, &self.settings.default_code_language);
        let block = Block::new(
            generate_id(),
            block_type,
            content,
            parent_id.map(str::to_string),
            order,
            now,
        );
        self.persist(&page_id, block.clone())?;

        if let Some(parent) = parent.as_mut() {
            let position = after
                .and_then(|after| parent.children_ids.iter().position(|child| child == after))
                .map(|index| index + 1)
                .unwrap_or(parent.children_ids.len());
            parent.children_ids.insert(position, block.id.clone());
            parent.updated_at = now;
        }
        if let Some(parent) = parent {
            self.persist(&page_id, parent)?;
        }

        self.root_block_id = find_root(&self.blocks);
        self.touch();
        debug!(page_id = %page_id, block_id = %block.id, block_type = %block_type, order, "Added block");
        Ok(block)
    }

    /// Merge `update` into a block of the open document. Widget blocks keep their type.
    pub fn update_block(&mut self, id: &str, update: BlockUpdate) -> Result<Block, ApiError> {
        let page_id = self.open_page_id()?;
        let mut block = self
            .blocks
            .get(id)
            .cloned()
            .ok_or_else(|| ApiError::BlockNotFound(id.to_string()))?;
        if let Some(new_type) = update.block_type {
            if block.block_type.is_widget() && new_type != block.block_type {
                return Err(ApiError::InvalidArgument(format!(
                    "{} block {} cannot be converted to {}",
                    block.block_type, id, new_type
                )));
            }
        }
        block.apply(update, now_ms());
        self.persist(&page_id, block.clone())?;
        self.root_block_id = find_root(&self.blocks);
        self.touch();
        Ok(block)
    }

    /// Delete a block and its descendants. A document emptied this way gets a fresh
    /// default paragraph. Unknown ids are ignored.
    pub fn delete_block(&mut self, id: &str) -> Result<(), ApiError> {
        let page_id = self.open_page_id()?;
        let target = match self.blocks.get(id) {
            Some(block) => block.clone(),
            None => {
                debug!(block_id = id, "Delete of unknown block ignored");
                return Ok(());
            }
        };

        let mut doomed = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![target.id.clone()];
        while let Some(current) = stack.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }
            if let Some(block) = self.blocks.get(&current) {
                stack.extend(block.children_ids.iter().cloned());
            }
            doomed.push(current);
        }

        for doomed_id in &doomed {
            logged("delete_block", self.block_repo.delete(doomed_id))?;
            self.blocks.remove(doomed_id);
        }

        if let Some(parent_id) = target.parent_id.as_deref() {
            if let Some(mut parent) = self.blocks.get(parent_id).cloned() {
                parent.children_ids.retain(|child| child != id);
                parent.updated_at = now_ms();
                self.persist(&page_id, parent)?;
            }
        }

        if self.blocks.is_empty() {
            let block = Block::default_paragraph(generate_id(), now_ms());
            debug!(page_id = %page_id, block_id = %block.id, "Document emptied, seeding default block");
            self.persist(&page_id, block)?;
        }

        self.root_block_id = find_root(&self.blocks);
        self.touch();
        info!(page_id = %page_id, block_id = id, removed = doomed.len(), "Deleted block subtree");
        Ok(())
    }

    /// Move a block under `new_parent_id` at `index`; same contract as moving a page.
    pub fn move_block(
        &mut self,
        id: &str,
        new_parent_id: Option<&str>,
        index: usize,
    ) -> Result<(), ApiError> {
        let page_id = self.open_page_id()?;
        let mut block = self
            .blocks
            .get(id)
            .cloned()
            .ok_or_else(|| ApiError::BlockNotFound(id.to_string()))?;
        let mut new_parent = match new_parent_id {
            Some(parent_id) => Some(
                self.blocks
                    .get(parent_id)
                    .cloned()
                    .ok_or_else(|| ApiError::BlockNotFound(parent_id.to_string()))?,
            ),
            None => None,
        };
        let now = now_ms();
        let old_parent_id = block.parent_id.clone();
        let mut position = index;

        if old_parent_id.as_deref() != new_parent_id {
            if let Some(mut old_parent) = old_parent_id
                .as_deref()
                .and_then(|old| self.blocks.get(old))
                .cloned()
            {
                old_parent.children_ids.retain(|child| child != id);
                old_parent.updated_at = now;
                self.persist(&page_id, old_parent)?;
            }
        }

        if let Some(parent) = new_parent.as_mut() {
            parent.children_ids.retain(|child| child != id);
            position = index.min(parent.children_ids.len());
            parent.children_ids.insert(position, id.to_string());
            parent.updated_at = now;
        }
        if let Some(parent) = new_parent {
            self.persist(&page_id, parent)?;
        }

        block.parent_id = new_parent_id.map(str::to_string);
        block.order = position as i64;
        block.updated_at = now;
        self.persist(&page_id, block)?;

        self.root_block_id = find_root(&self.blocks);
        self.touch();
        debug!(page_id = %page_id, block_id = id, to = ?new_parent_id, position, "Moved block");
        Ok(())
    }

    /// Drop all document state.
    pub fn clear_document(&mut self) {
        self.current_page = None;
        self.blocks.clear();
        self.root_block_id = None;
        self.touch();
    }
}
