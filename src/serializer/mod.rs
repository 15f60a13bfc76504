//! Event serializers.
//!
//! # Data Flow
//! ```text
//! ContentHandler events (from the last transformer)
//!     → html.rs (markup as received, quotes restored, void tags unclosed)
//!     → xml.rs  (well-formed output, escaped values)
//!     → OutputSink (the response's original writer)
//! ```
//!
//! # Design Decisions
//! - Serializers keep no document state beyond the open sink
//! - A zero-length `characters` call and `end_document` both flush the sink
//! - Without a recorded quote character an attribute value is written in `"`

pub mod html;
pub mod xml;

pub use html::{HtmlSerializer, HtmlSerializerFactory, VOID_ELEMENTS};
pub use xml::{XmlSerializer, XmlSerializerFactory};

use std::io::Write;

use crate::components::OutputSink;
use crate::error::{Result, RewriterError};

/// Elements that never have a closing tag.
pub fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(name))
}

/// Sink slot shared by both serializers; empty until `init`.
#[derive(Debug, Default)]
pub(crate) struct SinkSlot {
    sink: Option<OutputSink>,
}

impl SinkSlot {
    pub(crate) fn new(sink: Option<OutputSink>) -> Self {
        Self { sink }
    }

    pub(crate) fn set(&mut self, sink: OutputSink) {
        self.sink = Some(sink);
    }

    pub(crate) fn write_str(&mut self, s: &str) -> Result<()> {
        self.get()?.write_all(s.as_bytes())?;
        Ok(())
    }

    pub(crate) fn flush(&mut self) -> Result<()> {
        self.get()?.flush()?;
        Ok(())
    }

    pub(crate) fn release(&mut self) {
        self.sink = None;
    }

    fn get(&mut self) -> Result<&mut OutputSink> {
        self.sink
            .as_mut()
            .ok_or_else(|| RewriterError::InvalidArgument("serializer used before init".into()))
    }
}
