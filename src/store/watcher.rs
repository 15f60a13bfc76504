//! File-system watcher feeding store change events.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::event::{CreateKind, EventKind, ModifyKind, RemoveKind};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::store::{ChangeEvent, ChangeType, FsStore};

/// Watches the search path directories of an [`FsStore`].
pub struct StoreWatcher {
    store: FsStore,
    roots: Vec<PathBuf>,
    poll_interval: Duration,
    tx: mpsc::UnboundedSender<ChangeEvent>,
}

impl StoreWatcher {
    /// Create a watcher for `search_paths` (store paths).
    ///
    /// Returns the watcher and a receiver for change events.
    pub fn new(
        store: FsStore,
        search_paths: &[String],
        poll_interval: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<ChangeEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let roots = search_paths.iter().map(|p| store.dir_path(p)).collect();
        (
            Self {
                store,
                roots,
                poll_interval,
                tx,
            },
            rx,
        )
    }

    /// Start watching. Dropping the returned watcher stops it.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.tx.clone();
        let store = self.store.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    for change in translate(&store, &event) {
                        tracing::debug!(path = %change.path, change = %change.change, "store change detected");
                        if tx.send(change).is_err() {
                            tracing::debug!("store change receiver closed");
                            return;
                        }
                    }
                }
                Err(e) => tracing::error!(error = ?e, "watch error"),
            },
            Config::default().with_poll_interval(self.poll_interval),
        )?;

        for root in &self.roots {
            if root.is_dir() {
                watcher.watch(root, RecursiveMode::Recursive)?;
                tracing::info!(path = ?root, "store watcher started");
            } else {
                tracing::warn!(path = ?root, "search path directory missing, not watched");
            }
        }
        Ok(watcher)
    }
}

fn classify(kind: &EventKind, path: &Path) -> Option<ChangeType> {
    match kind {
        EventKind::Create(_) => Some(ChangeType::Added),
        EventKind::Remove(_) => Some(ChangeType::Removed),
        EventKind::Modify(ModifyKind::Name(_)) => Some(if path.exists() {
            ChangeType::Added
        } else {
            ChangeType::Removed
        }),
        EventKind::Modify(_) => Some(ChangeType::Changed),
        _ => None,
    }
}

/// Turn a notify event into store change events.
fn translate(store: &FsStore, event: &Event) -> Vec<ChangeEvent> {
    event
        .paths
        .iter()
        .filter(|p| is_relevant(&event.kind, p))
        .filter_map(|p| {
            let change = classify(&event.kind, p)?;
            let path = store.store_path(p)?;
            Some(ChangeEvent::new(path, change))
        })
        .collect()
}

/// Directories and TOML files; hidden entries such as editor swap files are
/// ignored. A path that vanished may have been a directory, so removals and
/// renames of any non-hidden name pass.
fn is_relevant(kind: &EventKind, path: &Path) -> bool {
    let hidden = path
        .file_name()
        .map(|n| n.to_string_lossy().starts_with('.'))
        .unwrap_or(false);
    if hidden {
        return false;
    }
    match path.extension() {
        None => true,
        Some(ext) if ext == "toml" => true,
        Some(_) => match kind {
            EventKind::Create(CreateKind::Folder) | EventKind::Remove(RemoveKind::Folder) => true,
            EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(_)) => {
                path.is_dir() || !path.exists()
            }
            _ => path.is_dir(),
        },
    }
}
