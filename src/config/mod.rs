//! Configuration
//!
//! Layered configuration for the note store: built-in defaults, the global file under
//! `$XDG_CONFIG_HOME/nextnode/`, the workspace `nextnode.toml`, then `NEXTNODE__*`
//! environment variables.

mod facade;
pub mod merge;
pub mod paths;
pub mod sources;
pub mod workspace;

pub use facade::ConfigLoader;
pub use paths::xdg_root as xdg;
pub use workspace::storage_paths::StorageConfig;

use crate::document::DocumentSettings;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};

/// Name of the per-workspace config file
pub const WORKSPACE_CONFIG_FILE: &str = "nextnode.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextNodeConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub document: DocumentConfig,
}

impl NextNodeConfig {
    /// Render as TOML, as written in config files.
    pub fn to_toml(&self) -> Result<String, crate::error::ApiError> {
        toml::to_string_pretty(self)
            .map_err(|e| crate::error::ApiError::ConfigError(format!("Failed to render config: {}", e)))
    }
}

fn default_code_language() -> String {
    "javascript".to_string()
}

fn default_recent_limit() -> usize {
    10
}

/// Document editing defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentConfig {
    /// Language for new code blocks
    #[serde(default = "default_code_language")]
    pub default_code_language: String,

    /// Rows shown by `recent` when no limit is given
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            default_code_language: default_code_language(),
            recent_limit: default_recent_limit(),
        }
    }
}

impl DocumentConfig {
    pub fn settings(&self) -> DocumentSettings {
        DocumentSettings {
            default_code_language: self.default_code_language.clone(),
        }
    }
}
