//! Command-line interface for todo
//!
//! This module defines the CLI structure using clap derive macros.
//! Task commands live in `task`, tag registry commands in `tag`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::error::Result;
use crate::output::OutputOptions;
use crate::storage::FileStorage;
use crate::store::TaskStore;

mod tag;
mod task;

/// todo - a prioritized, tagged to-do list
///
/// Tasks and tags are stored as JSON in a local data directory and
/// rewritten after every change.
#[derive(Parser, Debug)]
#[command(name = "todo")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory holding tasks.json and tags.json
    #[arg(long, global = true, env = "TODO_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Path to config.toml (defaults to the platform config dir)
    #[arg(long, global = true, env = "TODO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add a task
    Add {
        /// Task text (words are joined with spaces)
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        /// Priority: high, medium, low
        #[arg(short, long)]
        priority: Option<String>,

        /// Registered tag to attach (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },

    /// Edit a task's text, priority or tags
    Edit {
        /// Task ID
        id: String,

        /// New text
        #[arg(long)]
        text: Option<String>,

        /// New priority: high, medium, low
        #[arg(short, long)]
        priority: Option<String>,

        /// Replace the task's tags (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        /// Remove every tag from the task
        #[arg(long, conflicts_with = "tags")]
        clear_tags: bool,
    },

    /// Mark a task done, or not done again
    Toggle {
        /// Task ID
        id: String,
    },

    /// Delete a task
    Rm {
        /// Task ID
        id: String,
    },

    /// Show tasks sorted by priority and grouped by tag
    List,

    /// Tag registry management
    #[command(subcommand)]
    Tag(TagCommands),
}

/// Tag subcommands
#[derive(Subcommand, Debug)]
pub enum TagCommands {
    /// Register a tag
    Add {
        /// Tag name
        name: String,
    },

    /// Unregister a tag and strip it from every task
    Rm {
        /// Tag name
        name: String,
    },

    /// List registered tags
    Ls,
}

/// Flags shared by every command.
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    pub data_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

impl GlobalOptions {
    pub fn output(&self) -> OutputOptions {
        OutputOptions {
            json: self.json,
            quiet: self.quiet,
        }
    }
}

/// Everything a command needs: the resolved config and the loaded store.
pub(crate) struct CommandContext {
    pub config: Config,
    pub store: TaskStore<FileStorage>,
}

pub(crate) fn load_context(globals: &GlobalOptions) -> Result<CommandContext> {
    let config = Config::resolve(globals.config.as_deref())?;
    let data_dir = config.data_dir(globals.data_dir.as_deref())?;
    tracing::debug!(data_dir = %data_dir.display(), "opening task store");
    let store = TaskStore::load(FileStorage::new(data_dir))?;
    Ok(CommandContext { config, store })
}

impl Cli {
    fn globals(&self) -> GlobalOptions {
        GlobalOptions {
            data_dir: self.data_dir.clone(),
            config: self.config.clone(),
            json: self.json,
            quiet: self.quiet,
        }
    }

    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let globals = self.globals();
        match self.command {
            Commands::Add { text, priority, tags } => task::run_add(task::AddOptions {
                text: text.join(" "),
                priority,
                tags,
                globals,
            }),
            Commands::Edit {
                id,
                text,
                priority,
                tags,
                clear_tags,
            } => task::run_edit(task::EditOptions {
                id,
                text,
                priority,
                tags,
                clear_tags,
                globals,
            }),
            Commands::Toggle { id } => task::run_toggle(task::ToggleOptions { id, globals }),
            Commands::Rm { id } => task::run_rm(task::RmOptions { id, globals }),
            Commands::List => task::run_list(task::ListOptions { globals }),
            Commands::Tag(cmd) => match cmd {
                TagCommands::Add { name } => tag::run_add(tag::AddOptions { name, globals }),
                TagCommands::Rm { name } => tag::run_rm(tag::RmOptions { name, globals }),
                TagCommands::Ls => tag::run_ls(tag::LsOptions { globals }),
            },
        }
    }
}
