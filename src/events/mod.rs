//! Structured markup events.
//!
//! # Data Flow
//! ```text
//! generator (text → events)
//!     → ContentHandler::start_element / end_element / characters
//!     → transformer chain (each stage forwards to the next handler)
//!     → serializer (events → text)
//! ```
//!
//! # Design Decisions
//! - The event contract only carries element names, attributes and text
//! - Lexical details the serializer needs (original quote characters, the
//!   `/>` self-closing form) travel as synthetic attributes in [`NAMESPACE`]
//! - A zero-length `characters` call is an explicit flush request

pub mod attributes;

pub use attributes::{Attribute, Attributes, Quote, END_SLASH_ATTR, NAMESPACE, QUOTES_ATTR};

use crate::error::Result;

/// Receiver of structured markup events.
pub trait ContentHandler: Send {
    /// Called once before the first event of a document.
    fn start_document(&mut self) -> Result<()> {
        Ok(())
    }

    /// An opening tag.
    fn start_element(&mut self, name: &str, attrs: &Attributes) -> Result<()>;

    /// A closing tag.
    fn end_element(&mut self, name: &str) -> Result<()>;

    /// Character data. An empty `text` asks downstream writers to flush.
    fn characters(&mut self, text: &str) -> Result<()>;

    /// End of the document; flushes any remaining output.
    fn end_document(&mut self) -> Result<()>;
}

/// An owned markup event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    StartDocument,
    StartElement { name: String, attrs: Attributes },
    EndElement { name: String },
    Characters(String),
    EndDocument,
}

impl Event {
    /// Deliver this event to a handler.
    pub fn replay(&self, handler: &mut dyn ContentHandler) -> Result<()> {
        match self {
            Event::StartDocument => handler.start_document(),
            Event::StartElement { name, attrs } => handler.start_element(name, attrs),
            Event::EndElement { name } => handler.end_element(name),
            Event::Characters(text) => handler.characters(text),
            Event::EndDocument => handler.end_document(),
        }
    }
}

/// A handler that keeps every event it receives.
#[derive(Debug, Default, Clone)]
pub struct EventRecorder {
    events: Vec<Event>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events
    }
}

impl ContentHandler for EventRecorder {
    fn start_document(&mut self) -> Result<()> {
        self.events.push(Event::StartDocument);
        Ok(())
    }

    fn start_element(&mut self, name: &str, attrs: &Attributes) -> Result<()> {
        self.events.push(Event::StartElement {
            name: name.to_string(),
            attrs: attrs.clone(),
        });
        Ok(())
    }

    fn end_element(&mut self, name: &str) -> Result<()> {
        self.events.push(Event::EndElement {
            name: name.to_string(),
        });
        Ok(())
    }

    fn characters(&mut self, text: &str) -> Result<()> {
        self.events.push(Event::Characters(text.to_string()));
        Ok(())
    }

    fn end_document(&mut self) -> Result<()> {
        self.events.push(Event::EndDocument);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_into_recorder() {
        let mut attrs = Attributes::new();
        attrs.push_quoted("href", Some("/x"), Quote::Single);
        let events = vec![
            Event::StartDocument,
            Event::StartElement { name: "a".into(), attrs },
            Event::Characters("hi".into()),
            Event::EndElement { name: "a".into() },
            Event::EndDocument,
        ];

        let mut recorder = EventRecorder::new();
        for event in &events {
            event.replay(&mut recorder).unwrap();
        }
        assert_eq!(recorder.into_events(), events);
    }
}
