//! Backup
//!
//! Whole-store export and import as a plain JSON bundle `{ "pages": [...], "blocks": [...] }`.
//! Import merges into whatever is already stored; use `clear_all` first for a clean restore.

use crate::block::StoredBlock;
use crate::error::StorageError;
use crate::page::Page;
use crate::store::{BlockRepository, PageRepository};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Every page and every block (with its owning page id)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportBundle {
    pub pages: Vec<Page>,
    pub blocks: Vec<StoredBlock>,
}

impl ExportBundle {
    pub fn to_json(&self) -> Result<String, StorageError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, StorageError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn write_to(&self, path: &Path) -> Result<(), StorageError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn read_from(path: &Path) -> Result<Self, StorageError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

/// Read both collections into a bundle, in a stable order.
pub fn export_data(
    pages: &dyn PageRepository,
    blocks: &dyn BlockRepository,
) -> Result<ExportBundle, StorageError> {
    let mut page_list: Vec<Page> = pages.get_all()?.into_values().collect();
    page_list.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

    let mut block_list = blocks.get_all()?;
    block_list.sort_by(|a, b| {
        a.page_id
            .cmp(&b.page_id)
            .then_with(|| a.block.order.cmp(&b.block.order))
            .then_with(|| a.block.id.cmp(&b.block.id))
    });

    info!(pages = page_list.len(), blocks = block_list.len(), "Exported store");
    Ok(ExportBundle {
        pages: page_list,
        blocks: block_list,
    })
}

/// Write a bundle back. Records with existing ids are overwritten.
pub fn import_data(
    bundle: &ExportBundle,
    pages: &dyn PageRepository,
    blocks: &dyn BlockRepository,
) -> Result<(), StorageError> {
    pages.put_all(&bundle.pages)?;
    blocks.put_all(&bundle.blocks)?;
    info!(pages = bundle.pages.len(), blocks = bundle.blocks.len(), "Imported bundle");
    Ok(())
}

pub fn clear_all(
    pages: &dyn PageRepository,
    blocks: &dyn BlockRepository,
) -> Result<(), StorageError> {
    pages.clear()?;
    blocks.clear()?;
    info!("Cleared store");
    Ok(())
}
