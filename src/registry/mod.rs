//! Component registry.
//!
//! # Data Flow
//! ```text
//! register(type, factory, priority)
//!     → factories.rs (per (kind, type) candidates, best first)
//!     → lookup(kind, type) returns the winner
//!
//! register_global_transformer(factory, priority, matcher)
//!     → global.rs (invalidate cache)
//!     → global_transformers(ctx) rebuilds lazily, then matches per request
//! ```
//!
//! # Design Decisions
//! - Per-type entries live in a `DashMap`, so registering one type never
//!   blocks lookups of another
//! - Removing a winner promotes the next candidate of the same type only
//! - The global partition is invalidated on change and rebuilt on the next
//!   read behind a double-checked flag

pub mod factories;
pub mod global;

pub use factories::{Factory, RegistrationId};
pub use global::GlobalSlots;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::components::link_rewriter::LinkRewriterFactory;
use crate::components::{
    ComponentKind, GeneratorFactory, ProcessorFactory, SerializerFactory, TransformerFactory,
};
use crate::generator::HtmlGeneratorFactory;
use crate::matcher::{ProcessorConfig, RequestContext};
use crate::serializer::{HtmlSerializerFactory, XmlSerializerFactory};

use factories::{Candidate, FactoryEntry};
use global::{GlobalEntry, GlobalTransformers};

type Key = (ComponentKind, String);

/// Live factories for generators, transformers, serializers and processors.
#[derive(Default)]
pub struct ComponentRegistry {
    entries: DashMap<Key, FactoryEntry>,
    /// Which key each registration lives under.
    owners: DashMap<RegistrationId, Key>,
    globals: GlobalTransformers,
    next_id: AtomicU64,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in components at priority 0.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register("html-generator", Factory::generator(HtmlGeneratorFactory), 0);
        registry.register("html-serializer", Factory::serializer(HtmlSerializerFactory), 0);
        registry.register("xml-serializer", Factory::serializer(XmlSerializerFactory), 0);
        registry.register("link-rewriter", Factory::transformer(LinkRewriterFactory), 0);
        registry
    }

    fn allocate_id(&self) -> RegistrationId {
        RegistrationId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Publish a factory for `component_type`. Higher priority wins.
    pub fn register(
        &self,
        component_type: impl Into<String>,
        factory: Factory,
        priority: i32,
    ) -> RegistrationId {
        let id = self.allocate_id();
        let key = (factory.kind(), component_type.into());
        tracing::debug!(kind = %key.0, component_type = %key.1, priority, id = %id, "factory registered");

        self.entries.entry(key.clone()).or_default().insert(Candidate {
            id,
            priority,
            factory,
        });
        self.owners.insert(id, key);
        id
    }

    /// Publish a transformer added to every matching pipeline.
    ///
    /// Negative priorities run before the configured transformers, the rest
    /// after them; within each group lower priorities come first.
    pub fn register_global_transformer(
        &self,
        factory: Arc<dyn TransformerFactory>,
        priority: i32,
        matcher: Option<ProcessorConfig>,
    ) -> RegistrationId {
        let id = self.allocate_id();
        tracing::debug!(priority, id = %id, "global transformer registered");
        self.globals.insert(GlobalEntry {
            id,
            priority,
            factory,
            matcher: matcher.map(Arc::new),
        });
        id
    }

    /// Withdraw a registration. Returns whether it was known.
    pub fn unregister(&self, id: RegistrationId) -> bool {
        if self.globals.remove(id) {
            tracing::debug!(id = %id, "global transformer unregistered");
            return true;
        }
        let Some((_, key)) = self.owners.remove(&id) else {
            return false;
        };
        let removed = match self.entries.get_mut(&key) {
            Some(mut entry) => entry.remove(id),
            None => false,
        };
        self.entries.remove_if(&key, |_, entry| entry.is_empty());
        tracing::debug!(kind = %key.0, component_type = %key.1, id = %id, "factory unregistered");
        removed
    }

    /// The winning factory of `kind` for `component_type`.
    pub fn lookup(&self, kind: ComponentKind, component_type: &str) -> Option<Factory> {
        self.entries
            .get(&(kind, component_type.to_string()))
            .and_then(|entry| entry.winner().map(|c| c.factory.clone()))
    }

    pub fn generator(&self, component_type: &str) -> Option<Arc<dyn GeneratorFactory>> {
        match self.lookup(ComponentKind::Generator, component_type)? {
            Factory::Generator(f) => Some(f),
            _ => None,
        }
    }

    pub fn transformer(&self, component_type: &str) -> Option<Arc<dyn TransformerFactory>> {
        match self.lookup(ComponentKind::Transformer, component_type)? {
            Factory::Transformer(f) => Some(f),
            _ => None,
        }
    }

    pub fn serializer(&self, component_type: &str) -> Option<Arc<dyn SerializerFactory>> {
        match self.lookup(ComponentKind::Serializer, component_type)? {
            Factory::Serializer(f) => Some(f),
            _ => None,
        }
    }

    pub fn processor(&self, component_type: &str) -> Option<Arc<dyn ProcessorFactory>> {
        match self.lookup(ComponentKind::Processor, component_type)? {
            Factory::Processor(f) => Some(f),
            _ => None,
        }
    }

    /// Pre and post global transformers for a request, holes included.
    pub fn global_transformers(&self, ctx: &dyn RequestContext) -> (GlobalSlots, GlobalSlots) {
        self.globals.resolve(ctx)
    }

    /// Drop every registration.
    pub fn clear(&self) {
        self.entries.clear();
        self.owners.clear();
        self.globals.clear();
    }
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("types", &self.entries.len())
            .field("registrations", &self.owners.len())
            .finish()
    }
}
