//! Streaming markup tokenizer.
//!
//! # Data Flow
//! ```text
//! response bytes (arbitrary chunks)
//!     → html.rs (UTF-8 decoding across chunk edges, document start/end)
//!     → scanner.rs (finite-state scan: outside / tag / comment / script / string)
//!     → tag.rs (decompose a recognised tag into name + attributes)
//!     → ContentHandler events
//! ```
//!
//! # Design Decisions
//! - Only tags in the inclusion set become element events; everything else
//!   passes through verbatim as character data
//! - Character data is emitted at markup starts, element boundaries, explicit
//!   flushes and end of stream, never at chunk edges, so the event sequence
//!   does not depend on how the input was split
//! - `<script>` bodies are opaque until the closing sequence is seen
//! - Quote characters and `/>` are preserved via synthetic attributes

pub mod html;
pub mod scanner;
pub mod tag;

pub use html::{HtmlGenerator, HtmlGeneratorFactory, DEFAULT_INCLUDE_TAGS, INCLUDE_TAGS_PROPERTY};
pub use scanner::TagScanner;
pub use tag::ParsedTag;
