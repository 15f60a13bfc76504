//! Hierarchical content store holding processor configurations.
//!
//! # Data Flow
//! ```text
//! ConfigManager
//!     → ContentStore::list_children / properties
//!         → memory.rs (in-process tree, embedders and tests)
//!         → fs.rs (directories and TOML files under a base dir)
//!
//! Change feed:
//!     memory.rs listener / watcher.rs (notify)
//!     → ChangeEvent { path, change }
//!     → manager worker
//! ```
//!
//! # Design Decisions
//! - Paths are absolute, `/`-separated, without a trailing slash
//! - A missing node has no properties (`Ok(None)`), listing it is `NotFound`
//! - Property values are JSON values so stores agree on one type

pub mod fs;
pub mod memory;
pub mod watcher;

pub use fs::FsStore;
pub use memory::MemoryStore;
pub use watcher::StoreWatcher;

use std::fmt;

use thiserror::Error;

pub use crate::components::Properties;

/// Errors raised by a content store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("no node at {0}")]
    NotFound(String),
}

/// Read access to the configuration tree.
pub trait ContentStore: Send + Sync {
    /// Absolute paths of the direct children of `path`, in a stable order.
    fn list_children(&self, path: &str) -> Result<Vec<String>, StoreError>;

    /// Properties of the node at `path`, `None` if there is no such node.
    fn properties(&self, path: &str) -> Result<Option<Properties>, StoreError>;
}

/// What happened to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeType {
    Added,
    Changed,
    Removed,
}

impl ChangeType {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeType::Added => "added",
            ChangeType::Changed => "changed",
            ChangeType::Removed => "removed",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A change notification for one store path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: String,
    pub change: ChangeType,
}

impl ChangeEvent {
    pub fn new(path: impl Into<String>, change: ChangeType) -> Self {
        Self {
            path: path.into(),
            change,
        }
    }

    pub fn added(path: impl Into<String>) -> Self {
        Self::new(path, ChangeType::Added)
    }

    pub fn changed(path: impl Into<String>) -> Self {
        Self::new(path, ChangeType::Changed)
    }

    pub fn removed(path: impl Into<String>) -> Self {
        Self::new(path, ChangeType::Removed)
    }
}

/// Normalise a path: leading `/`, no trailing or doubled separators.
pub fn normalize(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

/// Join a child name onto a parent path.
pub fn join(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// Last segment of a path.
pub fn name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Whether `path` equals `ancestor` or lies beneath it.
pub fn is_within(path: &str, ancestor: &str) -> bool {
    if ancestor == "/" {
        return true;
    }
    path == ancestor
        || (path.starts_with(ancestor) && path.as_bytes().get(ancestor.len()) == Some(&b'/'))
}
