//! Configuration manager.
//!
//! # Data Flow
//! ```text
//! activate()
//!     → for each search path (priority = position)
//!         → {root}/{app}/config/rewriter/{key} (loader.rs)
//!         → entries.rs (per-key entries ordered by root, active list)
//!
//! ChangeEvent (memory store listener, notify watcher)
//!     → worker.rs (sequential, off the notifier's thread)
//!     → filter.rs (update / remove / cascade / rescan)
//!     → entries.rs under the state mutex
//!     → publish snapshot (ArcSwap)
//!
//! Request
//!     → find_processor_config (first match in the snapshot)
//!     → get_processor → pipeline::assemble
//! ```
//!
//! # Design Decisions
//! - All mutation happens under one mutex; readers only see published snapshots
//! - Store reads happen outside the lock; a failing read leaves the state unchanged
//! - Invalid entries are kept (and dumped) but never become active

pub mod dump;
pub mod entries;
pub mod filter;
pub mod loader;
pub mod worker;

pub use entries::{ConfigEntry, EntryTable};
pub use filter::{classify, Action};
pub use worker::ChangeWorker;

use std::sync::{Arc, Mutex, MutexGuard};

use arc_swap::ArcSwap;

use crate::components::{Processor, ProcessingContext};
use crate::error::{Result, RewriterError};
use crate::matcher::{ProcessorConfig, RequestContext};
use crate::observability::metrics;
use crate::pipeline;
use crate::registry::ComponentRegistry;
use crate::store::{join, name, ChangeEvent, ContentStore, StoreError};

use filter::{root_index, CONFIG_REL_PATH};

/// Ordered view of the active processor configurations.
pub type ProcessorList = Arc<Vec<Arc<ProcessorConfig>>>;

/// Tracks processor configurations across the search paths.
pub struct ConfigManager {
    store: Arc<dyn ContentStore>,
    registry: Arc<ComponentRegistry>,
    search_paths: Vec<String>,
    state: Mutex<EntryTable>,
    snapshot: ArcSwap<Vec<Arc<ProcessorConfig>>>,
}

impl ConfigManager {
    /// Create a manager; nothing is read until [`ConfigManager::activate`].
    pub fn new(
        store: Arc<dyn ContentStore>,
        registry: Arc<ComponentRegistry>,
        search_paths: Vec<String>,
    ) -> Self {
        Self {
            store,
            registry,
            search_paths,
            state: Mutex::new(EntryTable::new()),
            snapshot: ArcSwap::from_pointee(Vec::new()),
        }
    }

    pub fn search_paths(&self) -> &[String] {
        &self.search_paths
    }

    pub fn registry(&self) -> &Arc<ComponentRegistry> {
        &self.registry
    }

    fn lock(&self) -> MutexGuard<'_, EntryTable> {
        self.state.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("configuration state mutex poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Publish the active list. Called with the state lock held.
    fn publish(&self, table: &EntryTable) {
        let active = table.active();
        metrics::record_active_processors(active.len());
        self.snapshot.store(Arc::new(active));
    }

    /// Scan every search path and load all configurations found.
    pub fn activate(&self) {
        let mut loaded = Vec::new();
        for (root, search_path) in self.search_paths.iter().enumerate() {
            match self.key_paths(search_path, 0) {
                Ok(paths) => loaded.extend(paths.into_iter().map(|path| (root, path))),
                Err(e) => {
                    tracing::error!(path = %search_path, error = %e, "failed to scan search path");
                }
            }
        }

        let mut table = self.lock();
        table.clear();
        for (root, path) in loaded {
            match loader::load_processor_config(self.store.as_ref(), &path) {
                Ok(Some(config)) => insert(&mut table, &path, root, config),
                Ok(None) => {}
                Err(e) => log_store_error(&path, e),
            }
        }
        self.publish(&table);
        tracing::info!(
            keys = table.len(),
            active = table.active().len(),
            "configuration manager activated"
        );
    }

    /// Drop all configuration state.
    pub fn deactivate(&self) {
        let mut table = self.lock();
        table.clear();
        self.publish(&table);
        tracing::info!("configuration manager deactivated");
    }

    /// Apply one store change notification.
    pub fn handle_event(&self, event: &ChangeEvent) {
        let Some(action) = classify(&self.search_paths, event) else {
            tracing::trace!(path = %event.path, "ignoring unrelated change");
            return;
        };
        tracing::debug!(path = %event.path, change = %event.change, ?action, "applying configuration change");
        match action {
            Action::Update { path } => self.update(&path),
            Action::Remove { path } => self.remove(&path),
            Action::Cascade { path } => self.cascade(&path),
            Action::Rescan { path } => self.rescan(&path),
        }
        metrics::record_config_reload(event.change.as_str());
    }

    /// Reload the configuration stored at `path`.
    pub fn update(&self, path: &str) {
        let Some(root) = root_index(&self.search_paths, path) else {
            tracing::debug!(path, "path outside of search paths");
            return;
        };
        match loader::load_processor_config(self.store.as_ref(), path) {
            Ok(Some(config)) => {
                let mut table = self.lock();
                insert(&mut table, path, root, config);
                self.publish(&table);
            }
            // the node vanished before it could be read
            Ok(None) => self.remove(path),
            Err(e) => log_store_error(path, e),
        }
    }

    /// Forget the configuration read from `path`.
    pub fn remove(&self, path: &str) {
        let mut table = self.lock();
        if table.remove(path) {
            tracing::info!(path, "configuration removed");
            self.publish(&table);
        }
    }

    /// Forget every configuration at or beneath `ancestor`.
    pub fn cascade(&self, ancestor: &str) {
        let mut table = self.lock();
        let paths = table.paths_within(ancestor);
        if paths.is_empty() {
            return;
        }
        for path in &paths {
            table.remove(path);
        }
        tracing::info!(path = ancestor, removed = paths.len(), "configurations removed");
        self.publish(&table);
    }

    /// Discover the keys at or beneath `path` again.
    ///
    /// Known entries under `path` that no longer exist are removed.
    pub fn rescan(&self, path: &str) {
        let Some(root) = root_index(&self.search_paths, path) else {
            return;
        };
        let depth = path[self.search_paths[root].len()..]
            .split('/')
            .filter(|s| !s.is_empty())
            .count();
        let found = match self.key_paths(path, depth) {
            Ok(found) => found,
            Err(e) => {
                log_store_error(path, e);
                return;
            }
        };

        let mut loaded = Vec::with_capacity(found.len());
        for key_path in &found {
            match loader::load_processor_config(self.store.as_ref(), key_path) {
                Ok(config) => loaded.push((key_path.as_str(), config)),
                Err(e) => log_store_error(key_path, e),
            }
        }

        let mut table = self.lock();
        for stale in table.paths_within(path) {
            if !found.contains(&stale) {
                table.remove(&stale);
            }
        }
        for (key_path, config) in loaded {
            match config {
                Some(config) => insert(&mut table, key_path, root, config),
                None => {
                    table.remove(key_path);
                }
            }
        }
        self.publish(&table);
    }

    /// Key paths at or beneath `path`, which sits `depth` levels below its
    /// search path. A missing node contributes nothing.
    fn key_paths(&self, path: &str, depth: usize) -> std::result::Result<Vec<String>, StoreError> {
        let key_depth = 1 + CONFIG_REL_PATH.len();
        match depth {
            0 => {
                let mut keys = Vec::new();
                for app in self.children(path)? {
                    keys.extend(self.key_paths(&app, 1)?);
                }
                Ok(keys)
            }
            d if d < key_depth => self.key_paths(&join(path, CONFIG_REL_PATH[d - 1]), d + 1),
            d if d == key_depth => self.children(path),
            _ => Ok(vec![path.to_string()]),
        }
    }

    fn children(&self, path: &str) -> std::result::Result<Vec<String>, StoreError> {
        match self.store.list_children(path) {
            Ok(children) => Ok(children),
            Err(StoreError::NotFound(_)) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    /// Build the processor for a request.
    pub fn get_processor(
        &self,
        config: &ProcessorConfig,
        ctx: &ProcessingContext,
    ) -> Result<Box<dyn Processor>> {
        if let Err(reason) = config.validate() {
            return Err(RewriterError::ConfigurationInvalid {
                path: ctx.request().path().to_string(),
                reason,
            });
        }
        pipeline::assemble(Arc::clone(&self.registry), ctx, config)
    }

    /// The active configurations, highest order first.
    pub fn processor_configurations(&self) -> ProcessorList {
        self.snapshot.load_full()
    }

    /// The first active configuration matching the request.
    pub fn find_processor_config(&self, ctx: &dyn RequestContext) -> Option<Arc<ProcessorConfig>> {
        self.snapshot
            .load()
            .iter()
            .find(|config| config.matches(ctx))
            .cloned()
    }

    /// Diagnostic dump of every known key.
    pub fn print_configuration(&self) -> String {
        dump::render(&self.lock(), &self.search_paths)
    }

    /// Paths of the entries currently known under `ancestor`.
    pub fn known_paths(&self, ancestor: &str) -> Vec<String> {
        self.lock().paths_within(ancestor)
    }
}

fn insert(table: &mut EntryTable, path: &str, root: usize, config: ProcessorConfig) {
    if let Err(reason) = config.validate() {
        tracing::warn!(path, %reason, "invalid processor configuration");
    }
    let key = name(path);
    tracing::debug!(path, key, root, order = config.order(), "configuration loaded");
    table.upsert(
        key,
        ConfigEntry {
            path: path.to_string(),
            root,
            config: Arc::new(config),
        },
    );
}

fn log_store_error(path: &str, e: StoreError) {
    let err = RewriterError::storage(path, e);
    metrics::record_pipeline_error(err.kind_label());
    tracing::error!(error = %err, "keeping previous configuration");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::RequestInfo;
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::io::Write;

    fn pipeline_props(order: i64) -> serde_json::Value {
        json!({
            "generatorType": "html-generator",
            "serializerType": "html-serializer",
            "order": order,
        })
    }

    fn manager(store: Arc<MemoryStore>) -> ConfigManager {
        ConfigManager::new(
            store,
            Arc::new(ComponentRegistry::with_defaults()),
            vec!["/apps".to_string(), "/libs".to_string()],
        )
    }

    fn orders(manager: &ConfigManager) -> Vec<i64> {
        manager
            .processor_configurations()
            .iter()
            .map(|c| c.order())
            .collect()
    }

    #[test]
    fn test_override_replacement() {
        let store = Arc::new(MemoryStore::new());
        store.put_json("/apps/site/config/rewriter/rewrite-1", pipeline_props(10));
        store.put_json("/libs/site/config/rewriter/rewrite-1", pipeline_props(2));
        store.put_json("/libs/core/config/rewriter/other", pipeline_props(5));
        let manager = manager(Arc::clone(&store));
        manager.activate();
        assert_eq!(orders(&manager), vec![10, 5]);

        store.remove("/apps/site/config/rewriter/rewrite-1");
        manager.handle_event(&ChangeEvent::removed("/apps/site/config/rewriter/rewrite-1"));
        assert_eq!(orders(&manager), vec![5, 2]);

        store.put_json("/apps/site/config/rewriter/rewrite-1", pipeline_props(1));
        manager.handle_event(&ChangeEvent::added("/apps/site/config/rewriter/rewrite-1"));
        assert_eq!(orders(&manager), vec![5, 1]);
    }

    #[test]
    fn test_cascade_delete() {
        let store = Arc::new(MemoryStore::new());
        store.put_json("/apps/site/config/rewriter/a", pipeline_props(1));
        store.put_json("/apps/site/config/rewriter/b", pipeline_props(2));
        store.put_json("/libs/site/config/rewriter/a", pipeline_props(3));
        let manager = manager(Arc::clone(&store));
        manager.activate();
        assert_eq!(manager.known_paths("/").len(), 3);

        store.remove("/apps/site");
        manager.handle_event(&ChangeEvent::removed("/apps/site"));
        assert!(manager.known_paths("/apps").is_empty());
        assert_eq!(orders(&manager), vec![3]);
    }

    #[test]
    fn test_snapshot_complete_while_changes_apply() {
        const WRITERS: i64 = 4;
        const KEYS: i64 = 5;

        let store = Arc::new(MemoryStore::new());
        for w in 0..WRITERS {
            for k in 0..KEYS {
                store.put_json(
                    &format!("/libs/site{w}/config/rewriter/k{k}"),
                    pipeline_props(w * 1000 + 500 + k),
                );
            }
        }
        let manager = manager(Arc::clone(&store));
        manager.activate();
        let done = std::sync::atomic::AtomicBool::new(false);

        std::thread::scope(|scope| {
            let reader = scope.spawn(|| {
                while !done.load(std::sync::atomic::Ordering::Acquire) {
                    let list = orders(&manager);
                    assert_eq!(list.len(), (WRITERS * KEYS) as usize);
                    assert!(list.windows(2).all(|pair| pair[0] > pair[1]));
                    let mut keys: Vec<i64> =
                        list.iter().map(|o| (o / 1000) * 1000 + o % 500).collect();
                    keys.sort_unstable();
                    keys.dedup();
                    assert_eq!(keys.len(), list.len());
                }
            });

            let writers: Vec<_> = (0..WRITERS)
                .map(|w| {
                    let store = &store;
                    let manager = &manager;
                    scope.spawn(move || {
                        for i in 0..100 {
                            let k = i % KEYS;
                            let path = format!("/apps/site{w}/config/rewriter/k{k}");
                            if (i / KEYS) % 2 == 0 {
                                store.put_json(&path, pipeline_props(w * 1000 + k));
                                manager.handle_event(&ChangeEvent::added(path.as_str()));
                            } else {
                                store.remove(&path);
                                manager.handle_event(&ChangeEvent::removed(path.as_str()));
                            }
                        }
                    })
                })
                .collect();
            for writer in writers {
                writer.join().unwrap();
            }
            done.store(true, std::sync::atomic::Ordering::Release);
            reader.join().unwrap();
        });

        // 100 iterations over 5 keys leave every app entry removed
        let expected: Vec<i64> = (0..WRITERS)
            .rev()
            .flat_map(|w| (0..KEYS).rev().map(move |k| w * 1000 + 500 + k))
            .collect();
        assert_eq!(orders(&manager), expected);
    }

    #[test]
    fn test_rescan_discovers_new_app() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager(Arc::clone(&store));
        manager.activate();
        assert!(manager.processor_configurations().is_empty());

        store.put_json("/apps/new/config/rewriter/k", pipeline_props(4));
        manager.handle_event(&ChangeEvent::added("/apps/new"));
        assert_eq!(orders(&manager), vec![4]);
    }

    #[test]
    fn test_invalid_config_is_kept_but_inactive() {
        let store = Arc::new(MemoryStore::new());
        store.put_json("/apps/site/config/rewriter/broken", json!({"generatorType": "x"}));
        let manager = manager(Arc::clone(&store));
        manager.activate();
        assert!(manager.processor_configurations().is_empty());
        assert!(manager.print_configuration().contains("Configuration broken"));
    }

    #[test]
    fn test_component_child_change_reloads_key() {
        let store = Arc::new(MemoryStore::new());
        let key = "/apps/site/config/rewriter/links";
        store.put_json(
            key,
            json!({
                "generatorType": "html-generator",
                "transformerTypes": "link-rewriter",
                "serializerType": "html-serializer",
            }),
        );
        let manager = manager(Arc::clone(&store));
        manager.activate();
        assert!(manager.processor_configurations()[0].transformers()[0]
            .get_str("from")
            .is_none());

        store.put_json(&format!("{key}/transformer-link-rewriter"), json!({"from": "/a"}));
        manager.handle_event(&ChangeEvent::added(format!("{key}/transformer-link-rewriter")));
        assert_eq!(
            manager.processor_configurations()[0].transformers()[0].get_str("from"),
            Some("/a")
        );
    }

    #[test]
    fn test_find_and_get_processor() {
        let store = Arc::new(MemoryStore::new());
        store.put_json(
            "/apps/site/config/rewriter/html",
            json!({
                "generatorType": "html-generator",
                "serializerType": "html-serializer",
                "paths": "/content",
                "extensions": "html",
            }),
        );
        let manager = manager(Arc::clone(&store));
        manager.activate();

        let hit = RequestInfo::new("/content/x").with_extension("html");
        let miss = RequestInfo::new("/other").with_extension("html");
        assert!(manager.find_processor_config(&miss).is_none());
        let config = manager.find_processor_config(&hit).unwrap();

        let buffer = crate::components::SharedBuffer::new();
        let ctx = ProcessingContext::new(
            Arc::new(hit),
            crate::components::OutputSink::new(buffer.clone()),
        );
        let mut processor = manager.get_processor(&config, &ctx).unwrap();
        processor.writer().write_all(b"<p>hi</p>").unwrap();
        processor.finished(false).unwrap();
        assert_eq!(buffer.contents(), "<p>hi</p>");

        let invalid = ProcessorConfig::default();
        assert!(matches!(
            manager.get_processor(&invalid, &ctx),
            Err(RewriterError::ConfigurationInvalid { .. })
        ));
    }

    #[test]
    fn test_deactivate_clears() {
        let store = Arc::new(MemoryStore::new());
        store.put_json("/apps/site/config/rewriter/a", pipeline_props(1));
        let manager = manager(Arc::clone(&store));
        manager.activate();
        manager.deactivate();
        assert!(manager.processor_configurations().is_empty());
        assert!(manager.known_paths("/").is_empty());
    }
}
