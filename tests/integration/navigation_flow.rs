use nextnode::page::Page;
use nextnode::store::PageRepository;
use nextnode::Route;

use crate::integration::support::Harness;

#[test]
fn page_only_in_store_still_resolves() {
    let mut h = Harness::new();
    h.nav.navigate(Route::Home, &mut h.tree, &mut h.docs).unwrap();

    // Written behind the tree's back, as another session would.
    let page = Page::new("external".to_string(), "External", None, 0, 1);
    PageRepository::put(h.store.as_ref(), &page).unwrap();
    assert!(h.tree.get_page("external").is_none());

    let reached = h
        .nav
        .navigate_path("/page/external", &mut h.tree, &mut h.docs)
        .unwrap();
    assert_eq!(reached, Route::Page("external".to_string()));
    assert!(h.tree.get_page("external").is_some());
    assert_eq!(h.docs.current_page().unwrap().title, "External");
}

#[test]
fn deleted_page_redirects_home_and_clears_document() {
    let mut h = Harness::new();
    let a = h.tree.create_page("A", None).unwrap();
    let b = h.tree.create_page("B", None).unwrap();
    h.nav.navigate(Route::Page(a.id.clone()), &mut h.tree, &mut h.docs).unwrap();

    h.tree.delete_page(&b.id).unwrap();
    let reached = h
        .nav
        .navigate(Route::Page(b.id.clone()), &mut h.tree, &mut h.docs)
        .unwrap();

    assert_eq!(reached, Route::Home);
    assert_eq!(h.nav.current(), &Route::Home);
    assert!(h.docs.current_document().is_none());
}

#[test]
fn query_and_fragment_are_ignored() {
    let mut h = Harness::new();
    let a = h.tree.create_page("A", None).unwrap();
    let path = format!("/page/{}/?from=sidebar#top", a.id);
    let reached = h.nav.navigate_path(&path, &mut h.tree, &mut h.docs).unwrap();
    assert_eq!(reached.page_id(), Some(a.id.as_str()));
}
