//! CLI Tooling
//!
//! Command-line interface over a workspace session. Every command returns its output
//! as a string; the binary decides where it goes.

use crate::backup::ExportBundle;
use crate::block::{BlockContent, BlockType, BlockUpdate, CodeContent, TextContent};
use crate::config::{ConfigLoader, NextNodeConfig};
use crate::error::ApiError;
use crate::format::{format_document, format_page, format_recent_pages, format_tree};
use crate::logging::LogOverrides;
use crate::navigation::Route;
use crate::page::PageUpdate;
use crate::session::Session;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

/// NextNode CLI - hierarchical notes in a local store
#[derive(Parser, Debug)]
#[command(name = "nextnode")]
#[command(about = "Hierarchical pages and block documents in a local embedded store")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Logging flags as the top-precedence layer.
    pub fn logging_overrides(&self) -> LogOverrides {
        LogOverrides {
            level: self.log_level.clone(),
            format: self.log_format.clone(),
            output: self.log_output.clone(),
            file: self.log_file.clone(),
        }
    }
}

fn parse_block_type(s: &str) -> Result<BlockType, String> {
    BlockType::from_str(s)
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the page tree
    Tree,
    /// List recently updated pages
    Recent {
        /// Number of pages to show
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Manage pages
    Page {
        #[command(subcommand)]
        command: PageCommands,
    },
    /// Navigate to a route (`/` or `/page/<id>`) and print what is there
    Open { route: String },
    /// Edit the blocks of a page
    Block {
        #[command(subcommand)]
        command: BlockCommands,
    },
    /// Export every page and block as JSON
    Export {
        /// Write to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Import a JSON export, merging into the store
    Import { file: PathBuf },
    /// Print the effective configuration
    Config,
}

#[derive(Subcommand, Debug)]
pub enum PageCommands {
    /// Create a page with a default block
    Create {
        title: String,
        /// Parent page id (root when omitted)
        #[arg(long)]
        parent: Option<String>,
    },
    /// Update page metadata; an empty value clears emoji, cover or icon
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        emoji: Option<String>,
        #[arg(long)]
        cover: Option<String>,
        #[arg(long)]
        icon: Option<String>,
    },
    /// Delete a page and everything under it
    Delete { id: String },
    /// Move a page under another parent (root when omitted)
    Move {
        id: String,
        #[arg(long)]
        parent: Option<String>,
        #[arg(long, default_value = "0")]
        index: usize,
    },
}

#[derive(Subcommand, Debug)]
pub enum BlockCommands {
    /// Add a block to a page
    Add {
        page: String,
        #[arg(long = "type", default_value = "paragraph", value_parser = parse_block_type)]
        block_type: BlockType,
        #[arg(long)]
        parent: Option<String>,
        #[arg(long)]
        after: Option<String>,
        /// Initial text (text and code blocks)
        #[arg(long)]
        text: Option<String>,
    },
    /// Delete a block and its children
    Delete { page: String, block: String },
    /// Move a block within its page
    Move {
        page: String,
        block: String,
        #[arg(long)]
        parent: Option<String>,
        #[arg(long, default_value = "0")]
        index: usize,
    },
}

fn clearable(value: &Option<String>) -> Option<Option<String>> {
    value
        .as_ref()
        .map(|v| if v.is_empty() { None } else { Some(v.clone()) })
}

/// Content for a new block seeded with `text`, when the block type carries text.
fn content_with_text(content: &BlockContent, text: &str) -> Option<BlockContent> {
    match content {
        BlockContent::Text(_) => Some(BlockContent::Text(TextContent::plain(text))),
        BlockContent::Code(code) => Some(BlockContent::Code(CodeContent {
            language: code.language.clone(),
            code: text.to_string(),
        })),
        _ => None,
    }
}

/// CLI context for one workspace session
pub struct CliContext {
    workspace_root: PathBuf,
    config: NextNodeConfig,
    session: Session,
}

impl CliContext {
    /// Load config from an explicit file, or from the workspace's standard sources.
    pub fn load_config(
        workspace_root: &Path,
        config_path: Option<&Path>,
    ) -> Result<NextNodeConfig, ApiError> {
        let config = match config_path {
            Some(path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(workspace_root)?,
        };
        Ok(config)
    }

    /// Create a new CLI context
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = Self::load_config(&workspace_root, config_path.as_deref())?;
        Self::with_config(workspace_root, config)
    }

    pub fn with_config(workspace_root: PathBuf, config: NextNodeConfig) -> Result<Self, ApiError> {
        let session = Session::open(&workspace_root, &config)?;
        Ok(Self {
            workspace_root,
            config,
            session,
        })
    }

    /// Context over a throwaway store.
    pub fn in_memory(config: NextNodeConfig) -> Result<Self, ApiError> {
        let session = Session::in_memory(&config)?;
        Ok(Self {
            workspace_root: PathBuf::from("."),
            config,
            session,
        })
    }

    /// Execute a CLI command
    pub fn execute(&mut self, command: &Commands) -> Result<String, ApiError> {
        let output = match command {
            Commands::Tree => self.handle_tree()?,
            Commands::Recent { limit } => {
                let limit = limit.unwrap_or(self.config.document.recent_limit);
                let pages = self.session.tree().recently_updated(limit)?;
                format_recent_pages(&pages)
            }
            Commands::Page { command } => self.handle_page_command(command)?,
            Commands::Open { route } => {
                let reached = self.session.navigate_path(route)?;
                match reached {
                    Route::Page(_) => format_document(self.session.documents()),
                    Route::Home => format_tree(&self.session.tree().tree()),
                }
            }
            Commands::Block { command } => self.handle_block_command(command)?,
            Commands::Export { output } => self.handle_export(output.as_deref())?,
            Commands::Import { file } => {
                let bundle = ExportBundle::read_from(file)?;
                self.session.import(&bundle)?;
                format!(
                    "Imported {} pages and {} blocks from {}",
                    bundle.pages.len(),
                    bundle.blocks.len(),
                    file.display()
                )
            }
            Commands::Config => self.config.to_toml()?,
        };
        self.session.flush()?;
        Ok(output)
    }

    fn handle_tree(&mut self) -> Result<String, ApiError> {
        self.session.navigate(Route::Home)?;
        Ok(format_tree(&self.session.tree().tree()))
    }

    fn handle_page_command(&mut self, command: &PageCommands) -> Result<String, ApiError> {
        self.session.navigate(Route::Home)?;
        match command {
            PageCommands::Create { title, parent } => {
                let page = self
                    .session
                    .documents_mut()
                    .create_document(title.clone(), parent.as_deref())?;
                info!(workspace = %self.workspace_root.display(), page_id = %page.id, "Page created from CLI");
                Ok(format!("Created page\n{}", format_page(&page)))
            }
            PageCommands::Update {
                id,
                title,
                emoji,
                cover,
                icon,
            } => {
                let update = PageUpdate {
                    title: title.clone(),
                    emoji: clearable(emoji),
                    cover: clearable(cover),
                    icon: clearable(icon),
                    ..Default::default()
                };
                if update.is_empty() {
                    return Err(ApiError::InvalidArgument(
                        "Nothing to update: pass --title, --emoji, --cover or --icon".to_string(),
                    ));
                }
                let page = self.session.tree_mut().update_page(id, update)?;
                Ok(format!("Updated page\n{}", format_page(&page)))
            }
            PageCommands::Delete { id } => {
                if self.session.tree().get_page(id).is_none() {
                    return Err(ApiError::PageNotFound(id.clone()));
                }
                self.session.tree_mut().delete_page(id)?;
                Ok(format!("Deleted page {}", id))
            }
            PageCommands::Move { id, parent, index } => {
                self.session
                    .tree_mut()
                    .move_page(id, parent.as_deref(), *index)?;
                let target = parent.as_deref().unwrap_or("root");
                Ok(format!("Moved page {} under {} at {}", id, target, index))
            }
        }
    }

    /// Open `page_id`; a redirect means the page does not exist.
    fn open_page(&mut self, page_id: &str) -> Result<(), ApiError> {
        let reached = self.session.navigate(Route::Page(page_id.to_string()))?;
        if reached.page_id() != Some(page_id) {
            return Err(ApiError::PageNotFound(page_id.to_string()));
        }
        Ok(())
    }

    fn handle_block_command(&mut self, command: &BlockCommands) -> Result<String, ApiError> {
        match command {
            BlockCommands::Add {
                page,
                block_type,
                parent,
                after,
                text,
            } => {
                self.open_page(page)?;
                let docs = self.session.documents_mut();
                let mut block = docs.add_block(*block_type, parent.as_deref(), after.as_deref())?;
                if let Some(content) = text
                    .as_deref()
                    .and_then(|text| content_with_text(&block.content, text))
                {
                    block = docs.update_block(&block.id, BlockUpdate::content(content))?;
                }
                Ok(format!("Added {} block {}", block.block_type, block.id))
            }
            BlockCommands::Delete { page, block } => {
                self.open_page(page)?;
                if self.session.documents().get_block(block).is_none() {
                    return Err(ApiError::BlockNotFound(block.clone()));
                }
                self.session.documents_mut().delete_block(block)?;
                Ok(format!("Deleted block {}", block))
            }
            BlockCommands::Move {
                page,
                block,
                parent,
                index,
            } => {
                self.open_page(page)?;
                self.session
                    .documents_mut()
                    .move_block(block, parent.as_deref(), *index)?;
                Ok(format_document(self.session.documents()))
            }
        }
    }

    fn handle_export(&self, output: Option<&Path>) -> Result<String, ApiError> {
        let bundle = self.session.export()?;
        match output {
            Some(path) => {
                bundle.write_to(path)?;
                Ok(format!(
                    "Exported {} pages and {} blocks to {}",
                    bundle.pages.len(),
                    bundle.blocks.len(),
                    path.display()
                ))
            }
            None => Ok(bundle.to_json()?),
        }
    }
}
