//! Page Tree
//!
//! In-memory aggregate of every page, plus the derived sidebar forest and the
//! expand/collapse state. Every mutation is mirrored to the page repository right away.

use crate::error::{logged, ApiError};
use crate::page::{Page, PageMap, PageUpdate, TreeNode};
use crate::store::{BlockRepository, PageRepository};
use crate::types::{generate_id, now_ms, PageId};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

/// Sibling order: `order`, then creation time, then id
pub(crate) fn sibling_cmp(a: &Page, b: &Page) -> Ordering {
    a.order
        .cmp(&b.order)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Page tree store
pub struct PageTree {
    pages: PageMap,
    expanded: HashSet<PageId>,
    revision: u64,
    page_repo: Arc<dyn PageRepository>,
    block_repo: Arc<dyn BlockRepository>,
}

impl PageTree {
    pub fn new(page_repo: Arc<dyn PageRepository>, block_repo: Arc<dyn BlockRepository>) -> Self {
        Self {
            pages: PageMap::new(),
            expanded: HashSet::new(),
            revision: 0,
            page_repo,
            block_repo,
        }
    }

    /// Replace the cache with every stored page.
    pub fn load_all_pages(&mut self) -> Result<(), ApiError> {
        let pages = logged("load_all_pages", self.page_repo.get_all())?;
        debug!(count = pages.len(), "Loaded pages");
        self.pages = pages;
        self.touch();
        Ok(())
    }

    pub fn pages(&self) -> &PageMap {
        &self.pages
    }

    pub fn get_page(&self, id: &str) -> Option<&Page> {
        self.pages.get(id)
    }

    /// Direct store lookup, bypassing the cache
    pub fn fetch_page(&self, id: &str) -> Result<Option<Page>, ApiError> {
        logged("fetch_page", self.page_repo.get(id))
    }

    /// Refresh one cached entry after someone else persisted it.
    pub fn replace_cached(&mut self, page: Page) {
        self.pages.insert(page.id.clone(), page);
        self.touch();
    }

    /// Increases on every change to the cache or the expanded set
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    /// Cached copy if present, otherwise the stored record.
    fn lookup(&self, id: &str) -> Result<Option<Page>, ApiError> {
        match self.pages.get(id) {
            Some(page) => Ok(Some(page.clone())),
            None => self.fetch_page(id),
        }
    }

    fn persist(&mut self, page: Page) -> Result<(), ApiError> {
        logged("put_page", self.page_repo.put(&page))?;
        self.pages.insert(page.id.clone(), page);
        Ok(())
    }

    /// Derive the sidebar forest from the cached pages.
    pub fn tree(&self) -> Vec<TreeNode> {
        let mut by_parent: HashMap<Option<&str>, Vec<&Page>> = HashMap::new();
        for page in self.pages.values() {
            by_parent
                .entry(page.parent_id.as_deref())
                .or_default()
                .push(page);
        }
        for siblings in by_parent.values_mut() {
            siblings.sort_by(|a, b| sibling_cmp(a, b));
        }

        let mut visited = HashSet::new();
        by_parent
            .get(&None)
            .map(|roots| {
                roots
                    .iter()
                    .filter_map(|page| build_node(*page, &by_parent, &mut visited))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Create a page under `parent_id` (or at root level) and persist it.
    pub fn create_page(
        &mut self,
        title: impl Into<String>,
        parent_id: Option<&str>,
    ) -> Result<Page, ApiError> {
        let now = now_ms();
        let siblings = logged("get_by_parent", self.page_repo.get_by_parent(parent_id))?;
        let page = Page::new(
            generate_id(),
            title,
            parent_id.map(str::to_string),
            siblings.len() as i64,
            now,
        );

        if let Some(parent_id) = parent_id {
            let mut parent = self
                .lookup(parent_id)?
                .ok_or_else(|| ApiError::PageNotFound(parent_id.to_string()))?;
            parent.children_ids.push(page.id.clone());
            parent.updated_at = now;
            self.persist(parent)?;
        }
        self.persist(page.clone())?;
        self.touch();

        info!(page_id = %page.id, parent_id = ?parent_id, order = page.order, "Created page");
        Ok(page)
    }

    /// Merge `update` into a page and persist it.
    pub fn update_page(&mut self, id: &str, update: PageUpdate) -> Result<Page, ApiError> {
        let mut page = self
            .lookup(id)?
            .ok_or_else(|| ApiError::PageNotFound(id.to_string()))?;
        page.apply(update, now_ms());
        self.persist(page.clone())?;
        self.touch();
        debug!(page_id = id, "Updated page");
        Ok(page)
    }

    /// Delete a page, its descendants and all of their blocks. Unknown ids are ignored.
    pub fn delete_page(&mut self, id: &str) -> Result<(), ApiError> {
        let page = match self.lookup(id)? {
            Some(page) => page,
            None => {
                debug!(page_id = id, "Delete of unknown page ignored");
                return Ok(());
            }
        };

        // Pre-order walk over children_ids; removal runs deepest first.
        let mut doomed = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![page.id.clone()];
        while let Some(current) = stack.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }
            if let Some(record) = self.lookup(&current)? {
                stack.extend(record.children_ids.iter().rev().cloned());
            }
            doomed.push(current);
        }

        if let Some(parent_id) = page.parent_id.as_deref() {
            if let Some(mut parent) = self.lookup(parent_id)? {
                parent.children_ids.retain(|child| child != id);
                parent.updated_at = now_ms();
                self.persist(parent)?;
            }
        }

        for doomed_id in doomed.iter().rev() {
            logged("delete_by_page", self.block_repo.delete_by_page(doomed_id))?;
            logged("delete_page", self.page_repo.delete(doomed_id))?;
            self.pages.remove(doomed_id);
            self.expanded.remove(doomed_id);
        }
        self.touch();

        info!(page_id = id, removed = doomed.len(), "Deleted page subtree");
        Ok(())
    }

    /// Move a page under `new_parent_id` at `index` among its siblings.
    pub fn move_page(
        &mut self,
        id: &str,
        new_parent_id: Option<&str>,
        index: usize,
    ) -> Result<(), ApiError> {
        let mut page = self
            .lookup(id)?
            .ok_or_else(|| ApiError::PageNotFound(id.to_string()))?;
        let mut new_parent = match new_parent_id {
            Some(parent_id) => Some(
                self.lookup(parent_id)?
                    .ok_or_else(|| ApiError::PageNotFound(parent_id.to_string()))?,
            ),
            None => None,
        };
        let now = now_ms();
        let old_parent_id = page.parent_id.clone();
        let mut position = index;

        if old_parent_id.as_deref() != new_parent_id {
            if let Some(old_parent_id) = old_parent_id.as_deref() {
                if let Some(mut old_parent) = self.lookup(old_parent_id)? {
                    old_parent.children_ids.retain(|child| child != id);
                    old_parent.updated_at = now;
                    self.persist(old_parent)?;
                }
            }
        }

        if let Some(parent) = new_parent.as_mut() {
            parent.children_ids.retain(|child| child != id);
            position = index.min(parent.children_ids.len());
            parent.children_ids.insert(position, id.to_string());
            parent.updated_at = now;
        }
        if let Some(parent) = new_parent {
            self.persist(parent)?;
        }

        page.parent_id = new_parent_id.map(str::to_string);
        page.order = position as i64;
        page.updated_at = now;
        self.persist(page)?;
        self.touch();

        info!(page_id = id, from = ?old_parent_id, to = ?new_parent_id, position, "Moved page");
        Ok(())
    }

    pub fn toggle_expand(&mut self, id: &str) {
        if !self.expanded.remove(id) {
            self.expanded.insert(id.to_string());
        }
        self.touch();
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.expanded.contains(id)
    }

    /// Expand every page that has children.
    pub fn expand_all(&mut self) {
        self.expanded = self
            .pages
            .values()
            .filter(|page| !page.children_ids.is_empty())
            .map(|page| page.id.clone())
            .collect();
        self.touch();
    }

    pub fn collapse_all(&mut self) {
        self.expanded.clear();
        self.touch();
    }

    /// Most recently updated pages first, read through the store index.
    pub fn recently_updated(&self, limit: usize) -> Result<Vec<Page>, ApiError> {
        logged("recently_updated", self.page_repo.recently_updated(limit))
    }
}

fn build_node<'a>(
    page: &'a Page,
    by_parent: &HashMap<Option<&'a str>, Vec<&'a Page>>,
    visited: &mut HashSet<&'a str>,
) -> Option<TreeNode> {
    if !visited.insert(page.id.as_str()) {
        return None;
    }
    let mut node = TreeNode::leaf(page);
    if let Some(children) = by_parent.get(&Some(page.id.as_str())) {
        node.children = children
            .iter()
            .filter_map(|child| build_node(*child, by_parent, visited))
            .collect();
    }
    Some(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Block;
    use crate::store::SledStore;

    fn tree_with_store() -> (PageTree, Arc<SledStore>) {
        let store = Arc::new(SledStore::temporary().unwrap());
        let tree = PageTree::new(store.clone(), store.clone());
        (tree, store)
    }

    fn titles(nodes: &[TreeNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.title.as_str()).collect()
    }

    #[test]
    fn test_create_assigns_order_and_links_parent() {
        let (mut tree, store) = tree_with_store();
        let a = tree.create_page("A", None).unwrap();
        let b = tree.create_page("B", Some(&a.id)).unwrap();
        let c = tree.create_page("C", Some(&a.id)).unwrap();

        assert_eq!(a.order, 0);
        assert_eq!(b.order, 0);
        assert_eq!(c.order, 1);

        let stored_a = PageRepository::get(store.as_ref(), &a.id).unwrap().unwrap();
        assert_eq!(stored_a.children_ids, vec![b.id.clone(), c.id.clone()]);
        assert_eq!(tree.get_page(&a.id).unwrap().children_ids.len(), 2);
    }

    #[test]
    fn test_create_under_missing_parent_fails() {
        let (mut tree, _store) = tree_with_store();
        let err = tree.create_page("Orphan", Some("missing")).unwrap_err();
        assert!(matches!(err, ApiError::PageNotFound(id) if id == "missing"));
        assert!(tree.pages().is_empty());
    }

    #[test]
    fn test_tree_sorts_siblings_and_hides_orphans() {
        let (mut tree, _store) = tree_with_store();
        let a = tree.create_page("A", None).unwrap();
        let b = tree.create_page("B", None).unwrap();
        tree.create_page("A1", Some(&a.id)).unwrap();
        tree.update_page(&b.id, PageUpdate { order: Some(-1), ..Default::default() })
            .unwrap();

        let mut orphan = Page::new("orphan".to_string(), "Lost", Some("gone".to_string()), 0, 1);
        orphan.updated_at = 1;
        tree.replace_cached(orphan);

        let forest = tree.tree();
        assert_eq!(titles(&forest), vec!["B", "A"]);
        assert_eq!(titles(&forest[1].children), vec!["A1"]);
        assert_eq!(forest.iter().map(TreeNode::size).sum::<usize>(), 3);
    }

    #[test]
    fn test_update_unknown_page() {
        let (mut tree, _store) = tree_with_store();
        let err = tree.update_page("nope", PageUpdate::title("x")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_delete_cascades_to_descendants_and_blocks() {
        let (mut tree, store) = tree_with_store();
        let a = tree.create_page("A", None).unwrap();
        let b = tree.create_page("B", Some(&a.id)).unwrap();
        let c = tree.create_page("C", Some(&b.id)).unwrap();
        BlockRepository::put(store.as_ref(), &c.id, &Block::default_paragraph("blk".to_string(), 1))
            .unwrap();

        tree.delete_page(&a.id).unwrap();

        assert!(tree.pages().is_empty());
        assert!(tree.tree().is_empty());
        assert!(PageRepository::get_all(store.as_ref()).unwrap().is_empty());
        assert!(BlockRepository::get(store.as_ref(), "blk").unwrap().is_none());
    }

    #[test]
    fn test_delete_child_unlinks_from_parent() {
        let (mut tree, store) = tree_with_store();
        let a = tree.create_page("A", None).unwrap();
        let b = tree.create_page("B", Some(&a.id)).unwrap();
        let c = tree.create_page("C", Some(&a.id)).unwrap();

        tree.delete_page(&b.id).unwrap();

        let stored_a = PageRepository::get(store.as_ref(), &a.id).unwrap().unwrap();
        assert_eq!(stored_a.children_ids, vec![c.id.clone()]);
        assert_eq!(tree.get_page(&a.id).unwrap().children_ids, vec![c.id]);
    }

    #[test]
    fn test_delete_unknown_is_noop() {
        let (mut tree, _store) = tree_with_store();
        tree.create_page("A", None).unwrap();
        let before = tree.revision();
        tree.delete_page("unknown").unwrap();
        assert_eq!(tree.revision(), before);
        assert_eq!(tree.pages().len(), 1);
    }

    #[test]
    fn test_move_between_parents() {
        let (mut tree, store) = tree_with_store();
        let a = tree.create_page("A", None).unwrap();
        let b = tree.create_page("B", None).unwrap();
        let x = tree.create_page("X", Some(&a.id)).unwrap();
        let y = tree.create_page("Y", Some(&b.id)).unwrap();
        let z = tree.create_page("Z", Some(&b.id)).unwrap();

        tree.move_page(&x.id, Some(&b.id), 1).unwrap();

        let stored_a = PageRepository::get(store.as_ref(), &a.id).unwrap().unwrap();
        let stored_b = PageRepository::get(store.as_ref(), &b.id).unwrap().unwrap();
        let stored_x = PageRepository::get(store.as_ref(), &x.id).unwrap().unwrap();
        assert!(stored_a.children_ids.is_empty());
        assert_eq!(stored_b.children_ids, vec![y.id, x.id.clone(), z.id]);
        assert_eq!(stored_x.parent_id.as_deref(), Some(b.id.as_str()));
        assert_eq!(stored_x.order, 1);
    }

    #[test]
    fn test_move_within_parent_clamps_index() {
        let (mut tree, _store) = tree_with_store();
        let a = tree.create_page("A", None).unwrap();
        let x = tree.create_page("X", Some(&a.id)).unwrap();
        let y = tree.create_page("Y", Some(&a.id)).unwrap();

        tree.move_page(&x.id, Some(&a.id), 10).unwrap();

        let parent = tree.get_page(&a.id).unwrap();
        assert_eq!(parent.children_ids, vec![y.id, x.id.clone()]);
        assert_eq!(tree.get_page(&x.id).unwrap().order, 1);
    }

    #[test]
    fn test_move_to_root_and_missing_target() {
        let (mut tree, _store) = tree_with_store();
        let a = tree.create_page("A", None).unwrap();
        let x = tree.create_page("X", Some(&a.id)).unwrap();

        let err = tree.move_page(&x.id, Some("missing"), 0).unwrap_err();
        assert!(matches!(err, ApiError::PageNotFound(_)));

        tree.move_page(&x.id, None, 0).unwrap();
        assert!(tree.get_page(&a.id).unwrap().children_ids.is_empty());
        assert!(tree.get_page(&x.id).unwrap().is_root());
        assert_eq!(tree.tree().len(), 2);
    }

    #[test]
    fn test_expand_state() {
        let (mut tree, _store) = tree_with_store();
        let a = tree.create_page("A", None).unwrap();
        let b = tree.create_page("B", None).unwrap();
        tree.create_page("A1", Some(&a.id)).unwrap();

        tree.toggle_expand(&b.id);
        assert!(tree.is_expanded(&b.id));
        tree.toggle_expand(&b.id);
        assert!(!tree.is_expanded(&b.id));

        tree.expand_all();
        assert!(tree.is_expanded(&a.id));
        assert!(!tree.is_expanded(&b.id));

        tree.collapse_all();
        assert!(!tree.is_expanded(&a.id));
    }

    #[test]
    fn test_load_all_pages_reads_store() {
        let (mut tree, store) = tree_with_store();
        let a = tree.create_page("A", None).unwrap();

        let mut fresh = PageTree::new(store.clone(), store.clone());
        assert!(fresh.get_page(&a.id).is_none());
        assert_eq!(fresh.fetch_page(&a.id).unwrap().unwrap().title, "A");
        fresh.load_all_pages().unwrap();
        assert_eq!(fresh.get_page(&a.id).unwrap().title, "A");
    }
}
