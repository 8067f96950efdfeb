//! Format page trees, documents and page listings as text.

use crate::block::Block;
use crate::document::DocumentStore;
use crate::page::{Page, TreeNode};
use crate::types::Timestamp;
use chrono::{TimeZone, Utc};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use std::collections::HashSet;

/// Format a section heading with bold/underline.
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

fn format_timestamp(ms: Timestamp) -> String {
    Utc.timestamp_millis_opt(ms)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ms.to_string())
}

fn page_label(title: &str, emoji: Option<&str>) -> String {
    let title = if title.is_empty() { "Untitled" } else { title };
    match emoji {
        Some(emoji) => format!("{} {}", emoji, title),
        None => title.to_string(),
    }
}

/// One line per page, children indented under their parent.
pub fn format_tree(nodes: &[TreeNode]) -> String {
    let mut out = format!("{}\n\n", format_section_heading("Pages"));
    if nodes.is_empty() {
        out.push_str("No pages yet.\n");
        return out;
    }
    for node in nodes {
        push_tree_node(&mut out, node, 0);
    }
    out
}

fn push_tree_node(out: &mut String, node: &TreeNode, depth: usize) {
    let marker = if node.children.is_empty() { "-" } else { "+" };
    out.push_str(&format!(
        "{}{} {}  {}\n",
        "  ".repeat(depth),
        marker,
        page_label(&node.title, node.emoji.as_deref()),
        node.id.dimmed()
    ));
    for child in &node.children {
        push_tree_node(out, child, depth + 1);
    }
}

/// Short page description used after create/update commands.
pub fn format_page(page: &Page) -> String {
    let parent = page.parent_id.as_deref().unwrap_or("-");
    format!(
        "{}\n  id: {}\n  parent: {}\n  order: {}\n  children: {}\n  updated: {}\n",
        page_label(&page.title, page.emoji.as_deref()).bold(),
        page.id,
        parent,
        page.order,
        page.children_ids.len(),
        format_timestamp(page.updated_at)
    )
}

/// Table of pages, most recent first as given.
pub fn format_recent_pages(pages: &[Page]) -> String {
    let mut out = format!("{}\n\n", format_section_heading("Recently updated"));
    if pages.is_empty() {
        out.push_str("No pages yet.\n");
        return out;
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Page", "Id", "Updated"]);
    for page in pages {
        table.add_row(vec![
            page_label(&page.title, page.emoji.as_deref()),
            page.id.clone(),
            format_timestamp(page.updated_at),
        ]);
    }
    out.push_str(&format!("{}\n", table));
    out
}

/// Outline of the open document: title, then the block tree.
pub fn format_document(docs: &DocumentStore) -> String {
    let page = match docs.current_page() {
        Some(page) => page,
        None => return "No document open.\n".to_string(),
    };
    let mut out = format!(
        "{}\n\n",
        format_section_heading(&page_label(&page.title, page.emoji.as_deref()))
    );
    let mut visited = HashSet::new();
    for block in docs.root_blocks() {
        push_block(&mut out, docs, block, 0, &mut visited);
    }
    out
}

fn push_block<'a>(
    out: &mut String,
    docs: &'a DocumentStore,
    block: &'a Block,
    depth: usize,
    visited: &mut HashSet<&'a str>,
) {
    if !visited.insert(block.id.as_str()) {
        return;
    }
    let summary = block.content.summary();
    out.push_str(&format!(
        "{}[{}] {}  {}\n",
        "  ".repeat(depth),
        block.block_type.cyan(),
        if summary.is_empty() { "(empty)" } else { summary.as_str() },
        block.id.dimmed()
    ));
    for child in docs.child_blocks(&block.id) {
        push_block(out, docs, child, depth + 1, visited);
    }
}
