//! The `html-generator` component.

use std::collections::HashSet;

use crate::components::{ComponentConfig, Generator, GeneratorFactory, ProcessingContext};
use crate::error::Result;
use crate::events::ContentHandler;
use crate::generator::scanner::TagScanner;

/// Option listing the tags to emit as elements.
pub const INCLUDE_TAGS_PROPERTY: &str = "includeTags";

/// Tags emitted as elements unless configured otherwise.
pub const DEFAULT_INCLUDE_TAGS: &[&str] = &[
    "A", "/A", "IMG", "AREA", "FORM", "BASE", "LINK", "SCRIPT", "/BODY",
];

/// Always emitted so transformers can inject content before the body ends.
const BODY_END: &str = "/BODY";

fn default_include() -> HashSet<String> {
    DEFAULT_INCLUDE_TAGS.iter().map(|t| t.to_string()).collect()
}

/// On-the-fly HTML tokenizer, the usual head of an HTML pipeline.
#[derive(Debug)]
pub struct HtmlGenerator {
    scanner: TagScanner,
    /// Bytes of a UTF-8 sequence split across chunks.
    carry: Vec<u8>,
    started: bool,
}

impl Default for HtmlGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl HtmlGenerator {
    pub fn new() -> Self {
        Self {
            scanner: TagScanner::new(Some(default_include())),
            carry: Vec::new(),
            started: false,
        }
    }

    /// Restrict element events to `tags`; the closing body tag is always included.
    pub fn with_include_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set: HashSet<String> = tags.into_iter().map(Into::into).collect();
        set.insert(BODY_END.to_string());
        self.scanner.set_include(Some(set));
        self
    }

    /// Whether characters are still buffered.
    pub fn is_empty(&self) -> bool {
        self.scanner.is_empty() && self.carry.is_empty()
    }

    fn decode(&mut self, buf: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.carry);
        bytes.extend_from_slice(buf);

        let mut out = String::with_capacity(bytes.len());
        let mut rest = bytes.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(e) => {
                    let (valid, invalid) = rest.split_at(e.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &invalid[len..];
                        }
                        None => {
                            self.carry = invalid.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }
}

impl Generator for HtmlGenerator {
    fn init(&mut self, _ctx: &ProcessingContext, config: &ComponentConfig) -> Result<()> {
        if let Some(tags) = config.get_strings(INCLUDE_TAGS_PROPERTY) {
            if !tags.is_empty() {
                tracing::debug!(tags = ?tags, "html generator tag inclusion configured");
                let mut set: HashSet<String> = tags.into_iter().collect();
                set.insert(BODY_END.to_string());
                self.scanner.set_include(Some(set));
            }
        }
        Ok(())
    }

    fn write(&mut self, buf: &[u8], out: &mut dyn ContentHandler) -> Result<()> {
        if !self.started {
            out.start_document()?;
            self.started = true;
        }
        if buf.is_empty() {
            self.scanner.flush(out)?;
            // zero-length characters let the serializer flush its writer
            return out.characters("");
        }
        let text = self.decode(buf);
        self.scanner.feed(&text, out)
    }

    fn finished(&mut self, out: &mut dyn ContentHandler) -> Result<()> {
        if !self.carry.is_empty() {
            self.carry.clear();
            self.scanner.feed("\u{FFFD}", out)?;
        }
        self.scanner.finish(out)?;
        if self.started {
            out.end_document()?;
        }
        Ok(())
    }
}

/// Factory registered as `html-generator`.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlGeneratorFactory;

impl GeneratorFactory for HtmlGeneratorFactory {
    fn create_generator(&self) -> Box<dyn Generator> {
        Box::new(HtmlGenerator::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Event, EventRecorder, Quote};

    fn run(generator: &mut HtmlGenerator, chunks: &[&[u8]]) -> Vec<Event> {
        let mut out = EventRecorder::new();
        for chunk in chunks {
            generator.write(chunk, &mut out).unwrap();
        }
        generator.finished(&mut out).unwrap();
        out.into_events()
    }

    #[test]
    fn test_chunk_boundary_invariance() {
        let input = b"<a href=\"x\">text</a>";
        let whole = run(&mut HtmlGenerator::new(), &[input]);

        for split in 1..input.len() {
            let (head, tail) = input.split_at(split);
            let events = run(&mut HtmlGenerator::new(), &[head, tail]);
            assert_eq!(events, whole, "split at {split}");
        }

        let bytewise: Vec<&[u8]> = input.chunks(1).collect();
        assert_eq!(run(&mut HtmlGenerator::new(), &bytewise), whole);
    }

    #[test]
    fn test_document_framing() {
        let events = run(&mut HtmlGenerator::new(), &[b"<a href='x'>"]);
        assert_eq!(events.first(), Some(&Event::StartDocument));
        assert_eq!(events.last(), Some(&Event::EndDocument));
        match &events[1] {
            Event::StartElement { attrs, .. } => assert_eq!(attrs.quote_at(0), Quote::Single),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_no_end_document_without_input() {
        let mut generator = HtmlGenerator::new();
        let mut out = EventRecorder::new();
        generator.finished(&mut out).unwrap();
        assert!(out.events().is_empty());
    }

    #[test]
    fn test_zero_length_write_is_flush() {
        let mut generator = HtmlGenerator::new();
        let mut out = EventRecorder::new();
        generator.write(b"hello", &mut out).unwrap();
        assert_eq!(out.events(), &[Event::StartDocument]);

        generator.write(b"", &mut out).unwrap();
        assert_eq!(
            out.events(),
            &[
                Event::StartDocument,
                Event::Characters("hello".into()),
                Event::Characters(String::new()),
            ]
        );
    }

    #[test]
    fn test_utf8_split_across_chunks() {
        let input = "<a>é</a>".as_bytes();
        let split = input.iter().position(|b| *b >= 0x80).unwrap() + 1;
        let (head, tail) = input.split_at(split);
        let events = run(&mut HtmlGenerator::new(), &[head, tail]);
        assert!(events.contains(&Event::Characters("é".into())));
    }

    #[test]
    fn test_configured_tags_always_include_body_end() {
        let mut generator = HtmlGenerator::new().with_include_tags(["DIV"]);
        let events = run(&mut generator, &[b"<div><a href='x'></a></div></body>"]);
        let elements: Vec<&Event> = events
            .iter()
            .filter(|e| !matches!(e, Event::Characters(_)))
            .collect();
        assert_eq!(
            elements,
            vec![
                &Event::StartDocument,
                &Event::StartElement {
                    name: "div".into(),
                    attrs: Default::default()
                },
                &Event::EndElement {
                    name: "body".into()
                },
                &Event::EndDocument,
            ]
        );
    }
}
