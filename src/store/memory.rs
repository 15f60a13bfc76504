//! In-memory content store.

use std::collections::BTreeMap;
use std::sync::{Mutex, RwLock};

use serde_json::Value;
use tokio::sync::mpsc;

use crate::store::{is_within, normalize, ChangeEvent, ContentStore, Properties, StoreError};

/// A tree of nodes kept in a sorted map keyed by path.
///
/// Intermediate nodes are created on demand without properties. When a
/// listener is attached, every mutation is reported as a [`ChangeEvent`].
#[derive(Debug)]
pub struct MemoryStore {
    nodes: RwLock<BTreeMap<String, Properties>>,
    listener: Mutex<Option<mpsc::UnboundedSender<ChangeEvent>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), Properties::new());
        Self {
            nodes: RwLock::new(nodes),
            listener: Mutex::new(None),
        }
    }

    /// Report mutations to `tx`.
    pub fn set_listener(&self, tx: mpsc::UnboundedSender<ChangeEvent>) {
        *self.listener.lock().unwrap_or_else(|p| p.into_inner()) = Some(tx);
    }

    /// Create or replace a node. Missing ancestors are created empty.
    pub fn put(&self, path: &str, properties: Properties) {
        let path = normalize(path);
        let mut created = Vec::new();
        let existed = {
            let mut nodes = self.write_nodes();
            let mut ancestor = String::new();
            for segment in path.split('/').filter(|s| !s.is_empty()) {
                ancestor.push('/');
                ancestor.push_str(segment);
                if ancestor != path && !nodes.contains_key(&ancestor) {
                    nodes.insert(ancestor.clone(), Properties::new());
                    created.push(ancestor.clone());
                }
            }
            nodes.insert(path.clone(), properties).is_some()
        };

        for ancestor in created {
            self.notify(ChangeEvent::added(ancestor));
        }
        self.notify(if existed {
            ChangeEvent::changed(path)
        } else {
            ChangeEvent::added(path)
        });
    }

    /// Create or replace a node from a JSON object.
    pub fn put_json(&self, path: &str, value: Value) {
        let properties = match value {
            Value::Object(map) => map.into_iter().collect(),
            _ => Properties::new(),
        };
        self.put(path, properties);
    }

    /// Remove a node and everything beneath it. Returns whether it existed.
    pub fn remove(&self, path: &str) -> bool {
        let path = normalize(path);
        let removed = {
            let mut nodes = self.write_nodes();
            let before = nodes.len();
            nodes.retain(|p, _| !is_within(p, &path));
            nodes.len() != before
        };
        if removed {
            self.notify(ChangeEvent::removed(path));
        }
        removed
    }

    fn notify(&self, event: ChangeEvent) {
        let listener = self.listener.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(tx) = listener.as_ref() {
            if tx.send(event).is_err() {
                tracing::debug!("store listener closed");
            }
        }
    }

    fn read_nodes(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, Properties>> {
        self.nodes.read().unwrap_or_else(|p| {
            tracing::warn!("memory store lock poisoned, recovering");
            p.into_inner()
        })
    }

    fn write_nodes(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, Properties>> {
        self.nodes.write().unwrap_or_else(|p| {
            tracing::warn!("memory store lock poisoned, recovering");
            p.into_inner()
        })
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentStore for MemoryStore {
    fn list_children(&self, path: &str) -> Result<Vec<String>, StoreError> {
        let path = normalize(path);
        let nodes = self.read_nodes();
        if !nodes.contains_key(&path) {
            return Err(StoreError::NotFound(path));
        }
        let prefix = if path == "/" { "/".to_string() } else { format!("{path}/") };
        Ok(nodes
            .range(prefix.clone()..)
            .take_while(|(p, _)| p.starts_with(&prefix))
            .filter(|(p, _)| !p[prefix.len()..].contains('/') && p.len() > prefix.len())
            .map(|(p, _)| p.clone())
            .collect())
    }

    fn properties(&self, path: &str) -> Result<Option<Properties>, StoreError> {
        Ok(self.read_nodes().get(&normalize(path)).cloned())
    }
}
