use nextnode::store::SledStore;
use nextnode::{DocumentSettings, DocumentStore, Navigator, PageTree};
use std::sync::Arc;

/// Stores and navigator over one temporary sled store.
pub struct Harness {
    pub store: Arc<SledStore>,
    pub tree: PageTree,
    pub docs: DocumentStore,
    pub nav: Navigator,
}

impl Harness {
    pub fn new() -> Self {
        Self::over(Arc::new(SledStore::temporary().unwrap()))
    }

    pub fn over(store: Arc<SledStore>) -> Self {
        Self {
            tree: PageTree::new(store.clone(), store.clone()),
            docs: DocumentStore::new(store.clone(), store.clone(), DocumentSettings::default()),
            nav: Navigator::new(),
            store,
        }
    }
}
