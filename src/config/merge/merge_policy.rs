//! Base layer every load starts from.

use crate::config::NextNodeConfig;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

/// Builder seeded with the built-in defaults, so partial files only override what they set.
pub(crate) fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let defaults = Config::try_from(&NextNodeConfig::default())?;
    Ok(Config::builder().add_source(defaults))
}
