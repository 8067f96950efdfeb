//! Logging System
//!
//! Structured logging on top of `tracing`. Level, format and destination come from
//! `LoggingConfig` and can be overridden through `NEXTNODE_LOG*` environment variables.

use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Resolve the log file path with precedence: CLI, NEXTNODE_LOG_FILE env, config file, default.
pub fn resolve_log_file_path(
    cli_file: Option<&Path>,
    config_file: Option<&Path>,
) -> Result<PathBuf, ApiError> {
    let env_file = std::env::var("NEXTNODE_LOG_FILE").ok().map(PathBuf::from);
    match pick_log_file(cli_file, env_file.as_deref(), config_file) {
        Some(path) => Ok(path),
        None => default_log_file_path(),
    }
}

fn pick_log_file(
    cli_file: Option<&Path>,
    env_file: Option<&Path>,
    config_file: Option<&Path>,
) -> Option<PathBuf> {
    [cli_file, env_file, config_file]
        .into_iter()
        .flatten()
        .find(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

/// `nextnode.log` in the platform state directory.
fn default_log_file_path() -> Result<PathBuf, ApiError> {
    let project_dirs = directories::ProjectDirs::from("", "nextnode", "nextnode").ok_or_else(|| {
        ApiError::ConfigError("Could not determine platform state directory for log file".to_string())
    })?;
    let dir = project_dirs.state_dir().ok_or_else(|| {
        ApiError::ConfigError("Platform state directory not available for log file".to_string())
    })?;
    Ok(dir.join("nextnode.log"))
}

/// Logging settings given as command-line flags. They beat both the environment and the config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogOverrides {
    pub level: Option<String>,
    pub format: Option<String>,
    pub output: Option<String>,
    pub file: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Whether logging is enabled (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log level: trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json, text (default: text)
    #[serde(default = "default_format")]
    pub format: String,

    /// Output destination: stdout, stderr, file, file+stderr, both
    #[serde(default = "default_output")]
    pub output: String,

    /// Log file path when output includes file; None means use runtime default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,

    /// Colored output (text format, terminal destinations only)
    #[serde(default = "default_true")]
    pub color: bool,

    /// Per-module levels, e.g. `nextnode::store = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_output() -> String {
    "file".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            level: default_log_level(),
            format: default_format(),
            output: default_output(),
            file: None,
            color: default_true(),
            modules: HashMap::new(),
        }
    }
}

/// Install the global subscriber.
///
/// Precedence per setting: command-line flags, then `NEXTNODE_LOG*` variables,
/// then the given config, then defaults.
pub fn init_logging(
    config: Option<&LoggingConfig>,
    overrides: &LogOverrides,
) -> Result<(), ApiError> {
    if config.map(|c| !c.enabled).unwrap_or(false) {
        return Registry::default()
            .with(EnvFilter::new("off"))
            .try_init()
            .map_err(install_failed);
    }

    let filter = build_env_filter(config, overrides.level.as_deref())?;
    let format: LogFormat = layered(
        overrides.format.as_deref(),
        env_value("NEXTNODE_LOG_FORMAT"),
        config.map(|c| c.format.as_str()),
    )?;
    let output: OutputDestinations = layered(
        overrides.output.as_deref(),
        env_value("NEXTNODE_LOG_OUTPUT"),
        config.map(|c| c.output.as_str()),
    )?;
    let ansi = config.map(|c| c.color).unwrap_or(true) && !output.file;
    let log_file = if output.file {
        Some(resolve_log_file_path(
            overrides.file.as_deref(),
            config.and_then(|c| c.file.as_deref()),
        )?)
    } else {
        None
    };
    let writer = output.make_writer(log_file.as_deref())?;

    let registry = Registry::default().with(filter);
    let layer = fmt::layer().with_target(true).with_timer(ChronoUtc::rfc_3339());
    let installed = match format {
        LogFormat::Json => registry.with(layer.json().with_writer(writer)).try_init(),
        LogFormat::Text => registry.with(layer.with_ansi(ansi).with_writer(writer)).try_init(),
    };
    installed.map_err(install_failed)
}

fn install_failed(e: impl std::fmt::Display) -> ApiError {
    ApiError::ConfigError(format!("Failed to install logger: {}", e))
}

fn env_value(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.is_empty())
}

/// First of flag, environment and config that is set, parsed; the type's default otherwise.
fn layered<T>(cli: Option<&str>, env: Option<String>, configured: Option<&str>) -> Result<T, ApiError>
where
    T: FromStr<Err = ApiError> + Default,
{
    match cli.or(env.as_deref()).or(configured) {
        Some(value) => value.parse(),
        None => Ok(T::default()),
    }
}

/// Level filter: `--log-level`, else NEXTNODE_LOG, else the configured level; module
/// directives from config and NEXTNODE_LOG_MODULES are added on top.
fn build_env_filter(
    config: Option<&LoggingConfig>,
    cli_level: Option<&str>,
) -> Result<EnvFilter, ApiError> {
    if cli_level.is_none() {
        if let Ok(filter) = EnvFilter::try_from_env("NEXTNODE_LOG") {
            return Ok(filter);
        }
    }

    let level = cli_level
        .or(config.map(|c| c.level.as_str()))
        .unwrap_or("info");
    if level == "off" {
        return Ok(EnvFilter::new("off"));
    }

    let env_modules = std::env::var("NEXTNODE_LOG_MODULES").unwrap_or_default();
    let configured = config
        .into_iter()
        .flat_map(|c| c.modules.iter().map(|(m, l)| (m.as_str(), l.as_str())));

    configured
        .chain(parse_module_levels(&env_modules))
        .try_fold(EnvFilter::new(level), |filter, (module, module_level)| -> Result<EnvFilter, ApiError> {
            let directive = format!("{}={}", module, module_level)
                .parse()
                .map_err(|e| ApiError::ConfigError(format!("Invalid log directive: {}", e)))?;
            Ok(filter.add_directive(directive))
        })
}

/// `a=debug,b=warn` -> pairs; malformed entries are skipped.
fn parse_module_levels(directives: &str) -> Vec<(&str, &str)> {
    directives
        .split(',')
        .filter_map(|entry| {
            let (module, level) = entry.split_once('=')?;
            let (module, level) = (module.trim(), level.trim());
            (!module.is_empty() && !level.is_empty()).then_some((module, level))
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(ApiError::ConfigError(format!(
                "Invalid log format: {} (must be 'json' or 'text')",
                other
            ))),
        }
    }
}

/// Where log lines go.
#[derive(Debug, PartialEq, Eq)]
struct OutputDestinations {
    stdout: bool,
    stderr: bool,
    file: bool,
}

impl Default for OutputDestinations {
    fn default() -> Self {
        Self {
            stdout: false,
            stderr: false,
            file: true,
        }
    }
}

impl FromStr for OutputDestinations {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (stdout, stderr, file) = match s {
            "stdout" => (true, false, false),
            "stderr" => (false, true, false),
            "file" => (false, false, true),
            "file+stderr" => (false, true, true),
            "both" => (true, true, false),
            other => {
                return Err(ApiError::ConfigError(format!(
                    "Invalid log output: {} (must be 'stdout', 'stderr', 'file', 'file+stderr', or 'both')",
                    other
                )))
            }
        };
        Ok(Self {
            stdout,
            stderr,
            file,
        })
    }
}

impl OutputDestinations {
    fn make_writer(&self, log_file: Option<&Path>) -> Result<BoxMakeWriter, ApiError> {
        if let Some(path) = log_file.filter(|_| self.file) {
            let file = Mutex::new(open_log_file(path)?);
            return Ok(if self.stderr {
                BoxMakeWriter::new(file.and(std::io::stderr))
            } else {
                BoxMakeWriter::new(file)
            });
        }
        Ok(match (self.stdout, self.stderr) {
            (true, true) => BoxMakeWriter::new(std::io::stdout.and(std::io::stderr)),
            (false, true) => BoxMakeWriter::new(std::io::stderr),
            _ => BoxMakeWriter::new(std::io::stdout),
        })
    }
}

/// Append-mode handle on `path`; parent directories are created.
fn open_log_file(path: &Path) -> Result<std::fs::File, ApiError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| ApiError::ConfigError(format!("Failed to create log directory: {}", e)))?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| ApiError::ConfigError(format!("Failed to open log file {}: {}", path.display(), e)))
}
