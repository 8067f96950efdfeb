//! Block records: the content units inside a page.
//!
//! The rich-text payload of text blocks is owned by the editor framework and kept as
//! opaque JSON nodes; every other block kind has a typed payload.

use crate::types::{BlockId, PageId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Block type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockType {
    #[serde(rename = "page")]
    Page,
    #[serde(rename = "heading_1")]
    Heading1,
    #[serde(rename = "heading_2")]
    Heading2,
    #[serde(rename = "heading_3")]
    Heading3,
    #[serde(rename = "paragraph")]
    Paragraph,
    #[serde(rename = "bullet_list")]
    BulletList,
    #[serde(rename = "numbered_list")]
    NumberedList,
    #[serde(rename = "todo")]
    Todo,
    #[serde(rename = "toggle")]
    Toggle,
    #[serde(rename = "code")]
    Code,
    #[serde(rename = "quote")]
    Quote,
    #[serde(rename = "calendar")]
    Calendar,
    #[serde(rename = "kanban")]
    Kanban,
    #[serde(rename = "image")]
    Image,
    #[serde(rename = "divider")]
    Divider,
}

impl BlockType {
    pub const ALL: [BlockType; 15] = [
        BlockType::Page,
        BlockType::Heading1,
        BlockType::Heading2,
        BlockType::Heading3,
        BlockType::Paragraph,
        BlockType::BulletList,
        BlockType::NumberedList,
        BlockType::Todo,
        BlockType::Toggle,
        BlockType::Code,
        BlockType::Quote,
        BlockType::Calendar,
        BlockType::Kanban,
        BlockType::Image,
        BlockType::Divider,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::Page => "page",
            BlockType::Heading1 => "heading_1",
            BlockType::Heading2 => "heading_2",
            BlockType::Heading3 => "heading_3",
            BlockType::Paragraph => "paragraph",
            BlockType::BulletList => "bullet_list",
            BlockType::NumberedList => "numbered_list",
            BlockType::Todo => "todo",
            BlockType::Toggle => "toggle",
            BlockType::Code => "code",
            BlockType::Quote => "quote",
            BlockType::Calendar => "calendar",
            BlockType::Kanban => "kanban",
            BlockType::Image => "image",
            BlockType::Divider => "divider",
        }
    }

    /// Embedded widgets are atomic: their type cannot be converted in place.
    pub fn is_widget(&self) -> bool {
        matches!(self, BlockType::Calendar | BlockType::Kanban | BlockType::Image)
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        BlockType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| format!("unknown block type: {}", s))
    }
}

/// Rich-text document as produced by the editor: `{ "type": "doc", "content": [...] }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub content: Vec<serde_json::Value>,
}

impl Default for TextContent {
    fn default() -> Self {
        Self {
            node_type: "doc".to_string(),
            content: Vec::new(),
        }
    }
}

impl TextContent {
    /// A document holding one paragraph of plain text.
    pub fn plain(text: &str) -> Self {
        if text.is_empty() {
            return Self::default();
        }
        Self {
            node_type: "doc".to_string(),
            content: vec![serde_json::json!({
                "type": "paragraph",
                "content": [{ "type": "text", "text": text }],
            })],
        }
    }

    /// Concatenated text of all `text` leaves, paragraphs separated by newlines.
    pub fn plain_text(&self) -> String {
        fn collect(node: &serde_json::Value, out: &mut String) {
            if let Some(text) = node.get("text").and_then(|t| t.as_str()) {
                out.push_str(text);
            }
            if let Some(children) = node.get("content").and_then(|c| c.as_array()) {
                for child in children {
                    collect(child, out);
                }
            }
        }

        self.content
            .iter()
            .map(|node| {
                let mut out = String::new();
                collect(node, &mut out);
                out
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeContent {
    pub language: String,
    pub code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageContent {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// `YYYY-MM-DD`
    pub date: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarView {
    #[default]
    Month,
    Week,
    Day,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarContent {
    pub events: Vec<CalendarEvent>,
    pub view_mode: CalendarView,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListContent {
    pub items: Vec<String>,
    /// Per-item check state, used by todo lists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked: Option<Vec<bool>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KanbanColumn {
    pub id: String,
    pub title: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KanbanTask {
    pub id: String,
    pub content: String,
    pub column_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KanbanContent {
    pub columns: Vec<KanbanColumn>,
    #[serde(default)]
    pub tasks: Vec<KanbanTask>,
}

impl Default for KanbanContent {
    fn default() -> Self {
        let column = |id: &str, title: &str, color: &str| KanbanColumn {
            id: id.to_string(),
            title: title.to_string(),
            color: color.to_string(),
        };
        Self {
            columns: vec![
                column("todo", "To Do", "#ffe2dd"),
                column("progress", "In Progress", "#fdecc8"),
                column("done", "Done", "#dbeddb"),
            ],
            tasks: Vec::new(),
        }
    }
}

/// Polymorphic block payload, stored without a discriminator.
///
/// Variants are tried in order; each one requires a field the later ones lack
/// (`type`, `language`, `url`, `columns`, `events`, `items`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockContent {
    Text(TextContent),
    Code(CodeContent),
    Image(ImageContent),
    Kanban(KanbanContent),
    Calendar(CalendarContent),
    List(ListContent),
}

impl BlockContent {
    /// Default payload for a freshly created block of the given type.
    pub fn default_for(block_type: BlockType, code_language: &str) -> Self {
        match block_type {
            BlockType::Code => BlockContent::Code(CodeContent {
                language: code_language.to_string(),
                code: String::new(),
            }),
            BlockType::Calendar => BlockContent::Calendar(CalendarContent::default()),
            BlockType::Kanban => BlockContent::Kanban(KanbanContent::default()),
            BlockType::Image => BlockContent::Image(ImageContent::default()),
            _ => BlockContent::Text(TextContent::default()),
        }
    }

    /// Short human-readable summary, used for outlines.
    pub fn summary(&self) -> String {
        match self {
            BlockContent::Text(text) => text.plain_text(),
            BlockContent::Code(code) => format!("[{}] {}", code.language, code.code),
            BlockContent::Image(image) => image
                .alt
                .clone()
                .unwrap_or_else(|| image.url.clone()),
            BlockContent::Calendar(calendar) => {
                format!("{} event(s), {:?} view", calendar.events.len(), calendar.view_mode)
            }
            BlockContent::List(list) => list.items.join(", "),
            BlockContent::Kanban(kanban) => format!(
                "{} column(s), {} task(s)",
                kanban.columns.len(),
                kanban.tasks.len()
            ),
        }
    }
}

/// Block: a content unit within a page's content tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: BlockId,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    pub content: BlockContent,
    /// Parent block; `None` at the top level of the page
    pub parent_id: Option<BlockId>,
    #[serde(default)]
    pub children_ids: Vec<BlockId>,
    pub order: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    /// Fold state of toggle blocks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collapsed: Option<bool>,
}

/// Flat id -> Block map for one page
pub type BlockMap = HashMap<BlockId, Block>;

impl Block {
    pub fn new(
        id: BlockId,
        block_type: BlockType,
        content: BlockContent,
        parent_id: Option<BlockId>,
        order: i64,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            block_type,
            content,
            parent_id,
            children_ids: Vec::new(),
            order,
            created_at: now,
            updated_at: now,
            collapsed: None,
        }
    }

    /// The empty top-level paragraph every document falls back to.
    pub fn default_paragraph(id: BlockId, now: Timestamp) -> Self {
        Self::new(
            id,
            BlockType::Paragraph,
            BlockContent::Text(TextContent::default()),
            None,
            0,
            now,
        )
    }

    /// Apply a partial update; `id` and `created_at` never change.
    pub fn apply(&mut self, update: BlockUpdate, now: Timestamp) {
        if let Some(block_type) = update.block_type {
            self.block_type = block_type;
        }
        if let Some(content) = update.content {
            self.content = content;
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
        if let Some(collapsed) = update.collapsed {
            self.collapsed = collapsed;
        }
        self.updated_at = now;
    }
}

/// Partial block update; same `Option<Option<_>>` convention as `PageUpdate`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockUpdate {
    pub block_type: Option<BlockType>,
    pub content: Option<BlockContent>,
    pub parent_id: Option<Option<BlockId>>,
    pub children_ids: Option<Vec<BlockId>>,
    pub order: Option<i64>,
    pub collapsed: Option<Option<bool>>,
}

impl BlockUpdate {
    pub fn content(content: BlockContent) -> Self {
        Self {
            content: Some(content),
            ..Default::default()
        }
    }
}

/// Block as persisted: the record plus the owning page id used for indexing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredBlock {
    #[serde(flatten)]
    pub block: Block,
    pub page_id: PageId,
}
