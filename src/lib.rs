//! Streaming content rewriter.
//!
//! Markup flows through a pipeline assembled per response: a generator
//! scans the text into element and character events, transformers rewrite
//! the events, and a serializer renders them back. Pipelines are described
//! by processor configurations read from a layered content store and are
//! built from factories registered in a [`ComponentRegistry`].

pub mod components;
pub mod config;
pub mod error;
pub mod events;
pub mod generator;
pub mod lifecycle;
pub mod manager;
pub mod matcher;
pub mod observability;
pub mod pipeline;
pub mod registry;
pub mod response;
pub mod serializer;
pub mod store;

pub use config::RewriterSettings;
pub use error::{Result, RewriterError};
pub use lifecycle::Shutdown;
pub use manager::ConfigManager;
pub use registry::ComponentRegistry;
pub use response::ResponseAdapter;
