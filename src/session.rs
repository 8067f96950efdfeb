//! Session: one open store with its page tree, document store and navigator.

use crate::backup::{self, ExportBundle};
use crate::config::NextNodeConfig;
use crate::document::DocumentStore;
use crate::error::{logged, ApiError};
use crate::navigation::{Navigator, Route};
use crate::page::{Page, PageUpdate};
use crate::store::SledStore;
use crate::tree::PageTree;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub struct Session {
    store: Arc<SledStore>,
    tree: PageTree,
    documents: DocumentStore,
    navigator: Navigator,
}

impl Session {
    /// Open the store configured for `workspace_root`.
    pub fn open(workspace_root: &Path, config: &NextNodeConfig) -> Result<Self, ApiError> {
        let path = config.storage.resolve_path(workspace_root);
        let store = logged("open_store", SledStore::open(&path))?;
        info!(workspace = %workspace_root.display(), store = %path.display(), "Session opened");
        Ok(Self::with_store(Arc::new(store), config))
    }

    /// Session over a throwaway store.
    pub fn in_memory(config: &NextNodeConfig) -> Result<Self, ApiError> {
        let store = logged("open_store", SledStore::temporary())?;
        Ok(Self::with_store(Arc::new(store), config))
    }

    pub fn with_store(store: Arc<SledStore>, config: &NextNodeConfig) -> Self {
        Self {
            tree: PageTree::new(store.clone(), store.clone()),
            documents: DocumentStore::new(store.clone(), store.clone(), config.document.settings()),
            navigator: Navigator::new(),
            store,
        }
    }

    pub fn navigate(&mut self, to: Route) -> Result<Route, ApiError> {
        self.navigator.navigate(to, &mut self.tree, &mut self.documents)
    }

    pub fn navigate_path(&mut self, path: &str) -> Result<Route, ApiError> {
        self.navigator
            .navigate_path(path, &mut self.tree, &mut self.documents)
    }

    pub fn tree(&self) -> &PageTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut PageTree {
        &mut self.tree
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    pub fn documents_mut(&mut self) -> &mut DocumentStore {
        &mut self.documents
    }

    pub fn store(&self) -> &SledStore {
        &self.store
    }

    /// Update the open page and keep the tree's cached copy in step.
    pub fn update_current_page(&mut self, update: PageUpdate) -> Result<Page, ApiError> {
        let page = self.documents.update_page_metadata(update)?;
        self.tree.replace_cached(page.clone());
        Ok(page)
    }

    pub fn export(&self) -> Result<ExportBundle, ApiError> {
        logged(
            "export",
            backup::export_data(self.store.as_ref(), self.store.as_ref()),
        )
    }

    /// Import a bundle, reload the page tree and reopen the current page from the store.
    pub fn import(&mut self, bundle: &ExportBundle) -> Result<(), ApiError> {
        logged(
            "import",
            backup::import_data(bundle, self.store.as_ref(), self.store.as_ref()),
        )?;
        let reopen = self.navigator.current().clone();
        self.navigate(Route::Home)?;
        if reopen.is_page() {
            self.navigate(reopen)?;
        }
        Ok(())
    }

    pub fn flush(&self) -> Result<(), ApiError> {
        logged("flush", self.store.flush())
    }
}
