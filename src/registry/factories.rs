//! Candidate factories for one `(kind, type)` key.

use std::fmt;
use std::sync::Arc;

use crate::components::{
    ComponentKind, GeneratorFactory, ProcessorFactory, SerializerFactory, TransformerFactory,
};

/// Handle returned by registration, used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistrationId(pub(crate) u64);

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A factory of any component kind.
#[derive(Clone)]
pub enum Factory {
    Generator(Arc<dyn GeneratorFactory>),
    Transformer(Arc<dyn TransformerFactory>),
    Serializer(Arc<dyn SerializerFactory>),
    Processor(Arc<dyn ProcessorFactory>),
}

impl Factory {
    pub fn generator(factory: impl GeneratorFactory + 'static) -> Self {
        Self::Generator(Arc::new(factory))
    }

    pub fn transformer(factory: impl TransformerFactory + 'static) -> Self {
        Self::Transformer(Arc::new(factory))
    }

    pub fn serializer(factory: impl SerializerFactory + 'static) -> Self {
        Self::Serializer(Arc::new(factory))
    }

    pub fn processor(factory: impl ProcessorFactory + 'static) -> Self {
        Self::Processor(Arc::new(factory))
    }

    pub fn kind(&self) -> ComponentKind {
        match self {
            Factory::Generator(_) => ComponentKind::Generator,
            Factory::Transformer(_) => ComponentKind::Transformer,
            Factory::Serializer(_) => ComponentKind::Serializer,
            Factory::Processor(_) => ComponentKind::Processor,
        }
    }

    /// Whether two handles point at the same factory instance.
    pub fn same_as(&self, other: &Factory) -> bool {
        match (self, other) {
            (Factory::Generator(a), Factory::Generator(b)) => Arc::ptr_eq(a, b),
            (Factory::Transformer(a), Factory::Transformer(b)) => Arc::ptr_eq(a, b),
            (Factory::Serializer(a), Factory::Serializer(b)) => Arc::ptr_eq(a, b),
            (Factory::Processor(a), Factory::Processor(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Factory({})", self.kind())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub id: RegistrationId,
    pub priority: i32,
    pub factory: Factory,
}

/// Live candidates for one type, best first.
///
/// Ordered by descending priority; among equal priorities the earlier
/// registration stays ahead.
#[derive(Debug, Default)]
pub(crate) struct FactoryEntry {
    candidates: Vec<Candidate>,
}

impl FactoryEntry {
    pub fn insert(&mut self, candidate: Candidate) {
        let pos = self
            .candidates
            .iter()
            .position(|c| c.priority < candidate.priority)
            .unwrap_or(self.candidates.len());
        self.candidates.insert(pos, candidate);
    }

    /// Remove a candidate. Returns whether it was present.
    pub fn remove(&mut self, id: RegistrationId) -> bool {
        let before = self.candidates.len();
        self.candidates.retain(|c| c.id != id);
        before != self.candidates.len()
    }

    pub fn winner(&self) -> Option<&Candidate> {
        self.candidates.first()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }
}
