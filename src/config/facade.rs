//! ConfigLoader facade delegating to the merge service.

use super::merge::service::MergeService;
use super::NextNodeConfig;
use config::ConfigError;
use std::path::Path;

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from the global file, the workspace file and environment.
    pub fn load(workspace_root: &Path) -> Result<NextNodeConfig, ConfigError> {
        MergeService::load(workspace_root)
    }

    /// Load configuration from a specific file (plus environment).
    pub fn load_from_file(path: &Path) -> Result<NextNodeConfig, ConfigError> {
        MergeService::load_from_file(path)
    }

    /// Create default configuration.
    pub fn default() -> NextNodeConfig {
        NextNodeConfig::default()
    }
}
