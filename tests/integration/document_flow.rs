use nextnode::block::BlockType;
use nextnode::store::BlockRepository;
use nextnode::Route;

use crate::integration::support::Harness;

#[test]
fn deleting_every_block_leaves_one_default_paragraph() {
    let mut h = Harness::new();
    let page = h.tree.create_page("Doc", None).unwrap();
    h.nav.navigate(Route::Page(page.id.clone()), &mut h.tree, &mut h.docs).unwrap();

    let root = h.docs.root_block_id().unwrap().to_string();
    h.docs.add_block(BlockType::Heading2, None, Some(&root)).unwrap();
    h.docs.add_block(BlockType::Kanban, None, None).unwrap();
    h.docs.add_block(BlockType::Todo, Some(&root), None).unwrap();
    assert_eq!(h.docs.blocks().len(), 4);

    let ids: Vec<String> = h.docs.root_blocks().iter().map(|b| b.id.clone()).collect();
    for id in ids {
        h.docs.delete_block(&id).unwrap();
    }

    assert_eq!(h.docs.blocks().len(), 1);
    let only = h.docs.blocks().values().next().unwrap();
    assert_eq!(only.block_type, BlockType::Paragraph);
    assert!(only.parent_id.is_none());
    assert_eq!(h.docs.root_block_id(), Some(only.id.as_str()));

    let stored = h.store.get_by_page(&page.id).unwrap();
    assert_eq!(stored.len(), 1);
    assert!(stored.contains_key(&only.id));
}

#[test]
fn loading_empty_page_persists_exactly_one_block() {
    let mut h = Harness::new();
    let page = h.tree.create_page("Empty", None).unwrap();
    assert!(h.store.get_by_page(&page.id).unwrap().is_empty());

    h.docs.load_document(&page.id).unwrap();

    let stored = h.store.get_by_page(&page.id).unwrap();
    assert_eq!(stored.len(), 1);
    let block = stored.values().next().unwrap();
    assert_eq!(h.docs.get_block(&block.id), Some(block));
}

#[test]
fn block_edits_survive_reload() {
    let mut h = Harness::new();
    let page = h.tree.create_page("Doc", None).unwrap();
    h.docs.load_document(&page.id).unwrap();
    let root = h.docs.root_block_id().unwrap().to_string();
    let code = h.docs.add_block(BlockType::Code, Some(&root), None).unwrap();
    let cal = h.docs.add_block(BlockType::Calendar, Some(&root), None).unwrap();
    h.docs.move_block(&cal.id, Some(&root), 0).unwrap();

    let snapshot = h.docs.blocks().clone();
    let mut fresh = Harness::over(h.store.clone());
    fresh.docs.load_document(&page.id).unwrap();

    assert_eq!(fresh.docs.blocks(), &snapshot);
    let order: Vec<&str> = fresh.docs.child_blocks(&root).iter().map(|b| b.id.as_str()).collect();
    assert_eq!(order, vec![cal.id.as_str(), code.id.as_str()]);
    assert_eq!(
        BlockRepository::get(h.store.as_ref(), &code.id).unwrap().unwrap().block_type,
        BlockType::Code
    );
}
