//! Pipeline component contracts.
//!
//! # Data Flow
//! ```text
//! ComponentRegistry (factories by type)
//!     → factory.create_*()            one instance per request
//!     → init(ProcessingContext, ComponentConfig)
//!     → events flow generator → transformers → serializer
//!     → dispose()                     exactly once, even after errors
//! ```
//!
//! # Design Decisions
//! - Transformers never own their successor; each callback receives the
//!   downstream handler, so the pipeline can own every stage in one place
//!   and dispose them all
//! - Factories are shared (`Arc`) and must be `Send + Sync`; instances are
//!   per request and only `Send`

pub mod config;
pub mod context;
pub mod link_rewriter;

pub use config::{ComponentConfig, Properties};
pub use context::{OutputSink, ProcessingContext, SharedBuffer};

use std::fmt;
use std::io::Write;

use crate::error::Result;
use crate::events::{Attributes, ContentHandler};
use crate::matcher::ProcessorConfig;

/// The four kinds of pluggable components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ComponentKind {
    Generator,
    Transformer,
    Serializer,
    Processor,
}

impl ComponentKind {
    /// Prefix used for component option nodes, e.g. `transformer-1`.
    pub fn prefix(self) -> &'static str {
        match self {
            ComponentKind::Generator => "generator",
            ComponentKind::Transformer => "transformer",
            ComponentKind::Serializer => "serializer",
            ComponentKind::Processor => "processor",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Turns raw text into structured events.
pub trait Generator: Send {
    fn init(&mut self, ctx: &ProcessingContext, config: &ComponentConfig) -> Result<()>;

    /// Feed a chunk. Chunks may split tags, attributes and characters
    /// arbitrarily; an empty chunk is an explicit flush request.
    fn write(&mut self, buf: &[u8], out: &mut dyn ContentHandler) -> Result<()>;

    /// Flush buffered text and signal end of document.
    fn finished(&mut self, out: &mut dyn ContentHandler) -> Result<()>;

    fn dispose(&mut self) {}
}

/// Filters structured events. Every callback forwards unchanged by default.
pub trait Transformer: Send {
    fn init(&mut self, _ctx: &ProcessingContext, _config: &ComponentConfig) -> Result<()> {
        Ok(())
    }

    fn start_document(&mut self, next: &mut dyn ContentHandler) -> Result<()> {
        next.start_document()
    }

    fn start_element(
        &mut self,
        name: &str,
        attrs: &Attributes,
        next: &mut dyn ContentHandler,
    ) -> Result<()> {
        next.start_element(name, attrs)
    }

    fn end_element(&mut self, name: &str, next: &mut dyn ContentHandler) -> Result<()> {
        next.end_element(name)
    }

    fn characters(&mut self, text: &str, next: &mut dyn ContentHandler) -> Result<()> {
        next.characters(text)
    }

    fn end_document(&mut self, next: &mut dyn ContentHandler) -> Result<()> {
        next.end_document()
    }

    fn dispose(&mut self) {}
}

/// Renders structured events as text into the request's output sink.
pub trait Serializer: ContentHandler {
    fn init(&mut self, ctx: &ProcessingContext, config: &ComponentConfig) -> Result<()>;

    fn dispose(&mut self) {}
}

/// An opaque processor handling a whole response, or an assembled pipeline.
pub trait Processor: Send {
    fn init(&mut self, ctx: &ProcessingContext, config: &ProcessorConfig) -> Result<()>;

    /// Byte sink that replaces the response writer.
    fn writer(&mut self) -> &mut dyn Write;

    /// Event sink for producers that already emit structured events.
    fn content_handler(&mut self) -> &mut dyn ContentHandler;

    /// Complete processing. On success the end of stream is signalled;
    /// resources are released in every case.
    fn finished(&mut self, error_occurred: bool) -> Result<()>;
}

pub trait GeneratorFactory: Send + Sync {
    fn create_generator(&self) -> Box<dyn Generator>;
}

pub trait TransformerFactory: Send + Sync {
    fn create_transformer(&self) -> Box<dyn Transformer>;
}

pub trait SerializerFactory: Send + Sync {
    fn create_serializer(&self) -> Box<dyn Serializer>;
}

pub trait ProcessorFactory: Send + Sync {
    fn create_processor(&self) -> Box<dyn Processor>;
}

impl<F> GeneratorFactory for F
where
    F: Fn() -> Box<dyn Generator> + Send + Sync,
{
    fn create_generator(&self) -> Box<dyn Generator> {
        self()
    }
}

impl<F> TransformerFactory for F
where
    F: Fn() -> Box<dyn Transformer> + Send + Sync,
{
    fn create_transformer(&self) -> Box<dyn Transformer> {
        self()
    }
}

impl<F> SerializerFactory for F
where
    F: Fn() -> Box<dyn Serializer> + Send + Sync,
{
    fn create_serializer(&self) -> Box<dyn Serializer> {
        self()
    }
}

impl<F> ProcessorFactory for F
where
    F: Fn() -> Box<dyn Processor> + Send + Sync,
{
    fn create_processor(&self) -> Box<dyn Processor> {
        self()
    }
}
