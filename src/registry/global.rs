//! Cache of transformers injected into every pipeline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use dashmap::DashMap;

use crate::components::TransformerFactory;
use crate::matcher::{ProcessorConfig, RequestContext};
use crate::observability::metrics;
use crate::registry::RegistrationId;

#[derive(Clone)]
pub(crate) struct GlobalEntry {
    pub id: RegistrationId,
    pub priority: i32,
    pub factory: Arc<dyn TransformerFactory>,
    pub matcher: Option<Arc<ProcessorConfig>>,
}

impl GlobalEntry {
    fn applies_to(&self, ctx: &dyn RequestContext) -> bool {
        self.matcher.as_ref().map_or(true, |m| m.matches(ctx))
    }
}

/// Pre and post partitions, each sorted by ascending priority.
#[derive(Default)]
struct Partition {
    pre: Vec<GlobalEntry>,
    post: Vec<GlobalEntry>,
}

/// Global transformers resolved for one request. `None` marks a transformer
/// whose matcher rejected the request.
pub type GlobalSlots = Vec<Option<Arc<dyn TransformerFactory>>>;

/// Registered global transformers plus a lazily rebuilt partition.
pub(crate) struct GlobalTransformers {
    entries: DashMap<RegistrationId, GlobalEntry>,
    partition: ArcSwap<Partition>,
    stale: AtomicBool,
    rebuild: Mutex<()>,
}

impl Default for GlobalTransformers {
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
            partition: ArcSwap::from_pointee(Partition::default()),
            stale: AtomicBool::new(false),
            rebuild: Mutex::new(()),
        }
    }
}

impl GlobalTransformers {
    pub fn insert(&self, entry: GlobalEntry) {
        self.entries.insert(entry.id, entry);
        self.invalidate();
    }

    pub fn remove(&self, id: RegistrationId) -> bool {
        let removed = self.entries.remove(&id).is_some();
        if removed {
            self.invalidate();
        }
        removed
    }

    pub fn invalidate(&self) {
        self.stale.store(true, Ordering::Release);
    }

    pub fn clear(&self) {
        self.entries.clear();
        self.partition.store(Arc::new(Partition::default()));
        self.stale.store(false, Ordering::Release);
    }

    /// Pre and post slots for `ctx`, rebuilding the partition first if needed.
    pub fn resolve(&self, ctx: &dyn RequestContext) -> (GlobalSlots, GlobalSlots) {
        if self.stale.load(Ordering::Acquire) {
            let _guard = self.rebuild.lock().unwrap_or_else(|p| p.into_inner());
            if self.stale.load(Ordering::Acquire) {
                // clear first so invalidations during the rebuild are not lost
                self.stale.store(false, Ordering::Release);
                self.partition.store(Arc::new(self.build()));
                metrics::record_registry_rebuild();
            }
        }

        let partition = self.partition.load();
        let slots = |entries: &[GlobalEntry]| -> GlobalSlots {
            entries
                .iter()
                .map(|e| e.applies_to(ctx).then(|| Arc::clone(&e.factory)))
                .collect()
        };
        (slots(&partition.pre), slots(&partition.post))
    }

    fn build(&self) -> Partition {
        let mut all: Vec<GlobalEntry> = self.entries.iter().map(|e| e.value().clone()).collect();
        all.sort_by_key(|e| (e.priority, e.id));
        let (pre, post): (Vec<_>, Vec<_>) = all.into_iter().partition(|e| e.priority < 0);
        tracing::debug!(pre = pre.len(), post = post.len(), "global transformers rebuilt");
        Partition { pre, post }
    }
}
