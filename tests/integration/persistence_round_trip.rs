use nextnode::backup::{clear_all, export_data, import_data, ExportBundle};
use nextnode::block::{Block, BlockContent, BlockType, StoredBlock};
use nextnode::page::Page;
use nextnode::store::{BlockRepository, PageRepository, SledStore, SCHEMA_VERSION};
use tempfile::TempDir;

fn sample_pages() -> Vec<Page> {
    let mut root = Page::new("root".to_string(), "Root", None, 0, 100);
    root.emoji = Some("📁".to_string());
    root.cover = Some("covers/sky.png".to_string());
    root.children_ids = vec!["child".to_string()];
    let child = Page::new("child".to_string(), "Child", Some("root".to_string()), 0, 200);
    vec![root, child]
}

fn sample_blocks() -> Vec<StoredBlock> {
    let mut parent = Block::default_paragraph("b-root".to_string(), 100);
    parent.children_ids = vec!["b-kanban".to_string()];
    parent.collapsed = Some(true);
    let kanban = Block::new(
        "b-kanban".to_string(),
        BlockType::Kanban,
        BlockContent::default_for(BlockType::Kanban, "javascript"),
        Some("b-root".to_string()),
        0,
        150,
    );
    vec![
        StoredBlock { block: parent, page_id: "root".to_string() },
        StoredBlock { block: kanban, page_id: "root".to_string() },
    ]
}

#[test]
fn records_survive_reopen_field_for_field() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store");
    {
        let store = SledStore::open(&path).unwrap();
        PageRepository::put_all(&store, &sample_pages()).unwrap();
        BlockRepository::put_all(&store, &sample_blocks()).unwrap();
        store.flush().unwrap();
    }

    let store = SledStore::open(&path).unwrap();
    assert_eq!(store.schema_version().unwrap(), SCHEMA_VERSION);

    let pages = PageRepository::get_all(&store).unwrap();
    for page in sample_pages() {
        assert_eq!(pages.get(&page.id), Some(&page));
    }

    let blocks = store.get_by_page("root").unwrap();
    for stored in sample_blocks() {
        assert_eq!(blocks.get(&stored.block.id), Some(&stored.block));
    }
    let children = BlockRepository::get_by_parent(&store, Some("b-root"), "root").unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].id, "b-kanban");
}

#[test]
fn export_file_restores_into_fresh_store() {
    let temp = TempDir::new().unwrap();
    let source = SledStore::temporary().unwrap();
    PageRepository::put_all(&source, &sample_pages()).unwrap();
    BlockRepository::put_all(&source, &sample_blocks()).unwrap();

    let file = temp.path().join("backup.json");
    export_data(&source, &source).unwrap().write_to(&file).unwrap();

    let target = SledStore::temporary().unwrap();
    PageRepository::put(&target, &Page::new("stale".to_string(), "Stale", None, 0, 1)).unwrap();
    clear_all(&target, &target).unwrap();
    import_data(&ExportBundle::read_from(&file).unwrap(), &target, &target).unwrap();

    assert_eq!(
        export_data(&target, &target).unwrap(),
        export_data(&source, &source).unwrap()
    );
    assert!(PageRepository::get(&target, "stale").unwrap().is_none());
    assert_eq!(PageRepository::get_by_parent(&target, Some("root")).unwrap().len(), 1);
}
