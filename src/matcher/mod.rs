//! Processor configuration matching.
//!
//! # Data Flow
//! ```text
//! Incoming request (content type, path, extension, selectors, resource)
//!     → context.rs (RequestContext view of the request)
//!     → processor_config.rs (ProcessorConfig::matches)
//!     → first matching config in the ordered active list wins
//! ```
//!
//! # Design Decisions
//! - Every dimension is checked with AND semantics
//! - An absent or empty list for a dimension matches everything
//! - Path matching is a plain prefix check, `*` matches all
//! - Configs are immutable once read; changes produce new values

pub mod context;
pub mod processor_config;

pub use context::{RequestContext, RequestInfo, Resource, ResourceInfo};
pub use processor_config::{ProcessorConfig, ProcessorMode, MIME_TYPE_HTML};
