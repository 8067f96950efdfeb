use nextnode::page::PageUpdate;
use nextnode::store::{BlockRepository, PageRepository};
use nextnode::Route;

use crate::integration::support::Harness;

#[test]
fn create_nested_then_delete_root_leaves_nothing() {
    let mut h = Harness::new();
    let a = h.tree.create_page("A", None).unwrap();
    let b = h.tree.create_page("B", Some(&a.id)).unwrap();

    // Give both pages documents so their blocks exist in the store.
    h.nav.navigate(Route::Page(a.id.clone()), &mut h.tree, &mut h.docs).unwrap();
    h.nav.navigate(Route::Page(b.id.clone()), &mut h.tree, &mut h.docs).unwrap();
    h.nav.navigate(Route::Home, &mut h.tree, &mut h.docs).unwrap();
    assert_eq!(h.store.get_by_page(&a.id).unwrap().len(), 1);
    assert_eq!(h.store.get_by_page(&b.id).unwrap().len(), 1);

    h.tree.delete_page(&a.id).unwrap();

    assert!(PageRepository::get(h.store.as_ref(), &a.id).unwrap().is_none());
    assert!(PageRepository::get(h.store.as_ref(), &b.id).unwrap().is_none());
    assert!(h.store.get_by_page(&a.id).unwrap().is_empty());
    assert!(h.store.get_by_page(&b.id).unwrap().is_empty());
    assert!(BlockRepository::get_all(h.store.as_ref()).unwrap().is_empty());
    assert!(h.tree.tree().is_empty());
}

#[test]
fn tree_reflects_store_after_reload() {
    let mut h = Harness::new();
    let a = h.tree.create_page("A", None).unwrap();
    let a1 = h.tree.create_page("A1", Some(&a.id)).unwrap();
    h.tree.create_page("A2", Some(&a.id)).unwrap();
    h.tree
        .update_page(&a1.id, PageUpdate { emoji: Some(Some("🌱".to_string())), ..Default::default() })
        .unwrap();

    let mut fresh = Harness::over(h.store.clone());
    fresh.tree.load_all_pages().unwrap();
    let forest = fresh.tree.tree();

    assert_eq!(forest.len(), 1);
    assert_eq!(forest[0].id, a.id);
    let titles: Vec<&str> = forest[0].children.iter().map(|n| n.title.as_str()).collect();
    assert_eq!(titles, vec!["A1", "A2"]);
    assert_eq!(forest[0].children[0].emoji.as_deref(), Some("🌱"));
}

#[test]
fn recently_updated_tracks_edits() {
    let mut h = Harness::new();
    let a = h.tree.create_page("A", None).unwrap();
    let b = h.tree.create_page("B", None).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(5));
    h.tree.update_page(&a.id, PageUpdate::title("A'")).unwrap();

    let recent = h.tree.recently_updated(1).unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].id, a.id);

    let all = h.tree.recently_updated(10).unwrap();
    let ids: Vec<&str> = all.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec![a.id.as_str(), b.id.as_str()]);
}
