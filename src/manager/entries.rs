//! Per-key configuration entries and the active processor list.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::matcher::ProcessorConfig;
use crate::store::is_within;

/// One configuration root's definition of a key.
#[derive(Debug, Clone)]
pub struct ConfigEntry {
    /// Store path the configuration was read from.
    pub path: String,
    /// Index of the search path the entry lives under; 0 wins.
    pub root: usize,
    pub config: Arc<ProcessorConfig>,
}

#[derive(Debug, Clone)]
struct ActiveItem {
    key: String,
    seq: u64,
    config: Arc<ProcessorConfig>,
}

/// All known entries plus the ordered list of active configurations.
///
/// Every key whose top entry is active contributes exactly that entry to
/// the active list. The list is sorted by descending `order`; equal orders
/// keep the sequence in which they became active.
#[derive(Debug, Default)]
pub struct EntryTable {
    keys: BTreeMap<String, Vec<ConfigEntry>>,
    active: Vec<ActiveItem>,
    next_seq: u64,
}

impl EntryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry at `entry.path` under `key`.
    ///
    /// Entries stay ordered by root; a new entry goes after existing
    /// entries of the same root.
    pub fn upsert(&mut self, key: &str, entry: ConfigEntry) {
        let entries = self.keys.entry(key.to_string()).or_default();
        match entries.iter().position(|e| e.path == entry.path) {
            Some(index) => entries[index] = entry,
            None => {
                let index = entries
                    .iter()
                    .position(|e| e.root > entry.root)
                    .unwrap_or(entries.len());
                entries.insert(index, entry);
            }
        }
        self.refresh(key);
    }

    /// Remove the entry read from `path`. Returns whether it existed.
    pub fn remove(&mut self, path: &str) -> bool {
        let Some(key) = self.key_of(path) else {
            return false;
        };
        if let Some(entries) = self.keys.get_mut(&key) {
            entries.retain(|e| e.path != path);
            if entries.is_empty() {
                self.keys.remove(&key);
            }
        }
        self.refresh(&key);
        true
    }

    /// Paths of every entry at or beneath `ancestor`.
    pub fn paths_within(&self, ancestor: &str) -> Vec<String> {
        self.keys
            .values()
            .flatten()
            .filter(|e| is_within(&e.path, ancestor))
            .map(|e| e.path.clone())
            .collect()
    }

    fn key_of(&self, path: &str) -> Option<String> {
        self.keys
            .iter()
            .find(|(_, entries)| entries.iter().any(|e| e.path == path))
            .map(|(key, _)| key.clone())
    }

    /// Re-derive the active list contribution of `key`.
    fn refresh(&mut self, key: &str) {
        let top = self
            .keys
            .get(key)
            .and_then(|entries| entries.first())
            .filter(|e| e.config.is_active())
            .map(|e| Arc::clone(&e.config));

        if let Some(pos) = self.active.iter().position(|a| a.key == key) {
            if let Some(config) = &top {
                if Arc::ptr_eq(&self.active[pos].config, config) {
                    return;
                }
            }
            self.active.remove(pos);
        }

        if let Some(config) = top {
            let seq = self.next_seq;
            self.next_seq += 1;
            self.active.push(ActiveItem {
                key: key.to_string(),
                seq,
                config,
            });
            self.active
                .sort_by(|a, b| b.config.order().cmp(&a.config.order()).then(a.seq.cmp(&b.seq)));
        }
    }

    /// Active configurations, highest order first.
    pub fn active(&self) -> Vec<Arc<ProcessorConfig>> {
        self.active.iter().map(|a| Arc::clone(&a.config)).collect()
    }

    /// Keys of the active configurations, in list order.
    pub fn active_keys(&self) -> impl Iterator<Item = &str> {
        self.active.iter().map(|a| a.key.as_str())
    }

    pub fn entries(&self, key: &str) -> &[ConfigEntry] {
        self.keys.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Every key with its entries, ordered by key.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ConfigEntry])> {
        self.keys.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn clear(&mut self) {
        self.keys.clear();
        self.active.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{ComponentConfig, ComponentKind};

    fn config(order: i64) -> Arc<ProcessorConfig> {
        Arc::new(
            ProcessorConfig::pipeline(
                ComponentConfig::of(ComponentKind::Generator, "g"),
                vec![],
                ComponentConfig::of(ComponentKind::Serializer, "s"),
            )
            .with_order(order),
        )
    }

    fn entry(path: &str, root: usize, order: i64) -> ConfigEntry {
        ConfigEntry {
            path: path.to_string(),
            root,
            config: config(order),
        }
    }

    fn orders(table: &EntryTable) -> Vec<i64> {
        table.active().iter().map(|c| c.order()).collect()
    }

    #[test]
    fn test_override_and_promotion() {
        let mut table = EntryTable::new();
        table.upsert("rewrite-1", entry("/libs/a/config/rewriter/rewrite-1", 1, 3));
        table.upsert("rewrite-1", entry("/apps/a/config/rewriter/rewrite-1", 0, 7));
        table.upsert("other", entry("/apps/a/config/rewriter/other", 0, 5));

        assert_eq!(table.entries("rewrite-1")[0].root, 0);
        assert_eq!(orders(&table), vec![7, 5]);

        assert!(table.remove("/apps/a/config/rewriter/rewrite-1"));
        assert_eq!(orders(&table), vec![5, 3]);
        assert_eq!(table.entries("rewrite-1").len(), 1);

        assert!(table.remove("/libs/a/config/rewriter/rewrite-1"));
        assert!(table.entries("rewrite-1").is_empty());
        assert_eq!(orders(&table), vec![5]);
        assert!(!table.remove("/libs/a/config/rewriter/rewrite-1"));
    }

    #[test]
    fn test_lower_root_does_not_touch_active() {
        let mut table = EntryTable::new();
        table.upsert("k", entry("/apps/a/config/rewriter/k", 0, 1));
        let before = table.active();
        table.upsert("k", entry("/libs/a/config/rewriter/k", 1, 9));
        let after = table.active();
        assert_eq!(after.len(), 1);
        assert!(Arc::ptr_eq(&before[0], &after[0]));
    }

    #[test]
    fn test_inactive_top_hides_key() {
        let mut table = EntryTable::new();
        table.upsert("k", entry("/libs/a/config/rewriter/k", 1, 1));
        let disabled = ConfigEntry {
            path: "/apps/a/config/rewriter/k".into(),
            root: 0,
            config: Arc::new(ProcessorConfig::default().with_active(false)),
        };
        table.upsert("k", disabled);
        assert!(table.active().is_empty());
    }

    #[test]
    fn test_equal_orders_keep_activation_sequence() {
        let mut table = EntryTable::new();
        table.upsert("b", entry("/apps/x/config/rewriter/b", 0, 0));
        table.upsert("a", entry("/apps/x/config/rewriter/a", 0, 0));
        assert_eq!(table.active_keys().collect::<Vec<_>>(), vec!["b", "a"]);
    }

    #[test]
    fn test_paths_within() {
        let mut table = EntryTable::new();
        table.upsert("a", entry("/apps/x/config/rewriter/a", 0, 0));
        table.upsert("b", entry("/apps/y/config/rewriter/b", 0, 0));
        assert_eq!(table.paths_within("/apps/x"), vec!["/apps/x/config/rewriter/a".to_string()]);
        assert_eq!(table.paths_within("/apps").len(), 2);
    }
}
