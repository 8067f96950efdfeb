//! Navigation
//!
//! Routes and the guard that sequences the page tree and the document store when the
//! current route changes.

use crate::document::DocumentStore;
use crate::error::ApiError;
use crate::tree::PageTree;
use crate::types::PageId;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

const PAGE_PREFIX: &str = "/page/";

/// Client-side route
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Route {
    /// `/`: the page tree
    #[default]
    Home,
    /// `/page/:id`: one document
    Page(PageId),
}

impl Route {
    /// Parse a path. A trailing slash is allowed, a query or fragment is ignored.
    pub fn parse(path: &str) -> Result<Route, ApiError> {
        let trimmed = path
            .split(|c: char| c == '?' || c == '#')
            .next()
            .unwrap_or_default();

        if trimmed.is_empty() || trimmed == "/" {
            return Ok(Route::Home);
        }

        let id = trimmed
            .strip_prefix(PAGE_PREFIX)
            .map(|rest| rest.strip_suffix('/').unwrap_or(rest))
            .filter(|id| !id.is_empty() && !id.contains('/'))
            .ok_or_else(|| ApiError::InvalidRoute(path.to_string()))?;
        Ok(Route::Page(id.to_string()))
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Page(id) => format!("{}{}", PAGE_PREFIX, id),
        }
    }

    pub fn page_id(&self) -> Option<&str> {
        match self {
            Route::Page(id) => Some(id.as_str()),
            Route::Home => None,
        }
    }

    pub fn is_page(&self) -> bool {
        matches!(self, Route::Page(_))
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

impl FromStr for Route {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Route::parse(s)
    }
}

/// Tracks the current route and runs the load sequence on every change
#[derive(Debug, Default)]
pub struct Navigator {
    current: Route,
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &Route {
        &self.current
    }

    /// Parse and navigate. Unparseable paths land on Home.
    pub fn navigate_path(
        &mut self,
        path: &str,
        tree: &mut PageTree,
        docs: &mut DocumentStore,
    ) -> Result<Route, ApiError> {
        match Route::parse(path) {
            Ok(route) => self.navigate(route, tree, docs),
            Err(err) => {
                warn!(path, error = %err, "Unknown route, redirecting home");
                self.navigate(Route::Home, tree, docs)
            }
        }
    }

    /// Navigate to `to` and return the route actually reached.
    ///
    /// A page that cannot be resolved or loaded redirects to Home; a failure while
    /// loading Home itself is returned.
    pub fn navigate(
        &mut self,
        to: Route,
        tree: &mut PageTree,
        docs: &mut DocumentStore,
    ) -> Result<Route, ApiError> {
        match to {
            Route::Page(id) => {
                if self.current.page_id() == Some(id.as_str()) {
                    debug!(page_id = %id, "Already on page");
                    return Ok(self.current.clone());
                }
                match self.enter_page(&id, tree, docs) {
                    Ok(()) => {
                        self.current = Route::Page(id);
                        info!(route = %self.current, "Navigated");
                        Ok(self.current.clone())
                    }
                    Err(err) if err.is_not_found() => {
                        info!(page_id = %id, "Page not found, redirecting home");
                        self.navigate(Route::Home, tree, docs)
                    }
                    Err(err) => {
                        warn!(page_id = %id, error = %err, "Failed to open page, redirecting home");
                        self.navigate(Route::Home, tree, docs)
                    }
                }
            }
            Route::Home => {
                if self.current.is_page() {
                    docs.clear_document();
                }
                self.current = Route::Home;
                tree.load_all_pages()?;
                info!(route = %self.current, "Navigated");
                Ok(Route::Home)
            }
        }
    }

    fn enter_page(
        &mut self,
        id: &str,
        tree: &mut PageTree,
        docs: &mut DocumentStore,
    ) -> Result<(), ApiError> {
        if self.current.is_page() {
            docs.clear_document();
        }
        tree.load_all_pages()?;

        if tree.get_page(id).is_none() {
            match tree.fetch_page(id)? {
                Some(_) => {
                    debug!(page_id = id, "Page missing from cache, reloading tree");
                    tree.load_all_pages()?;
                }
                None => return Err(ApiError::PageNotFound(id.to_string())),
            }
        }

        docs.load_document(id)
    }
}
