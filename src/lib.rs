//! todo - Task Store Library
//!
//! This library provides the core of the `todo` CLI: a list of prioritized,
//! tagged tasks plus a registry of known tags, persisted to key-value
//! storage after every change.
//!
//! # Core Concepts
//!
//! - **Tasks**: text, completion flag, priority (`HIGH`/`MEDIUM`/`LOW`), tags
//! - **Tag registry**: every tag a task may carry; removing a tag strips it
//!   from all tasks
//! - **Derived view**: tasks sorted by priority, then grouped by tag with an
//!   `Others` group for untagged tasks
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `config.toml`
//! - `error`: Error types and result aliases
//! - `lock`: Data directory locking and atomic writes
//! - `output`: Human and JSON output envelopes
//! - `storage`: Key-value storage backends (files, memory)
//! - `store`: The task store and its persistence
//! - `task`: Task model, priority sorting and tag grouping
//!
//! ```
//! use todo::storage::MemoryStorage;
//! use todo::store::TaskStore;
//! use todo::task::{NewTask, Priority};
//!
//! let mut store = TaskStore::load(MemoryStorage::new())?;
//! store.add_tag("home")?;
//! store.add_task(NewTask::new("Buy milk").priority(Priority::High).tags(["home"]))?;
//!
//! let groups = store.sorted_and_grouped();
//! assert_eq!(groups[0].name, "home");
//! # Ok::<(), todo::Error>(())
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod lock;
pub mod output;
pub mod storage;
pub mod store;
pub mod task;

pub use error::{Error, Result};
