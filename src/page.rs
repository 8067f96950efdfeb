//! Page records and the derived sidebar tree view.

use crate::types::{PageId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Page metadata: one document node in the sidebar tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: PageId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    /// Parent page; `None` for root pages
    pub parent_id: Option<PageId>,
    #[serde(default)]
    pub children_ids: Vec<PageId>,
    /// Position among siblings
    pub order: i64,
}

/// Flat id -> Page map
pub type PageMap = HashMap<PageId, Page>;

impl Page {
    pub fn new(
        id: PageId,
        title: impl Into<String>,
        parent_id: Option<PageId>,
        order: i64,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            emoji: None,
            cover: None,
            icon: None,
            created_at: now,
            updated_at: now,
            parent_id,
            children_ids: Vec::new(),
            order,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Apply a partial update; `id` and `created_at` never change.
    pub fn apply(&mut self, update: PageUpdate, now: Timestamp) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(emoji) = update.emoji {
            self.emoji = emoji;
        }
        if let Some(cover) = update.cover {
            self.cover = cover;
        }
        if let Some(icon) = update.icon {
            self.icon = icon;
        }
        if let Some(parent_id) = update.parent_id {
            self.parent_id = parent_id;
        }
        if let Some(children_ids) = update.children_ids {
            self.children_ids = children_ids;
        }
        if let Some(order) = update.order {
            self.order = order;
        }
        self.updated_at = now;
    }
}

/// Partial page update. Outer `None` leaves a field untouched; for the optional
/// fields `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageUpdate {
    pub title: Option<String>,
    pub emoji: Option<Option<String>>,
    pub cover: Option<Option<String>>,
    pub icon: Option<Option<String>>,
    pub parent_id: Option<Option<PageId>>,
    pub children_ids: Option<Vec<PageId>>,
    pub order: Option<i64>,
}

impl PageUpdate {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == PageUpdate::default()
    }
}

/// Sidebar node: a page joined with its already-loaded children. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    pub id: PageId,
    pub title: String,
    pub emoji: Option<String>,
    pub icon: Option<String>,
    pub children: Vec<TreeNode>,
    pub metadata: Page,
}

impl TreeNode {
    pub fn leaf(page: &Page) -> Self {
        Self {
            id: page.id.clone(),
            title: page.title.clone(),
            emoji: page.emoji.clone(),
            icon: page.icon.clone(),
            children: Vec::new(),
            metadata: page.clone(),
        }
    }

    /// Number of nodes in this subtree, including the node itself.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(TreeNode::size).sum::<usize>()
    }
}
