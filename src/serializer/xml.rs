//! The `xml-serializer` component.

use crate::components::{ComponentConfig, OutputSink, ProcessingContext, Serializer, SerializerFactory};
use crate::error::Result;
use crate::events::{Attributes, ContentHandler};
use crate::serializer::{is_void_element, SinkSlot};

/// Writes events as well-formed XML: attribute values always double quoted
/// and escaped, void elements self-closed, every other element closed.
#[derive(Debug, Default)]
pub struct XmlSerializer {
    sink: SinkSlot,
}

impl XmlSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(sink: OutputSink) -> Self {
        Self {
            sink: SinkSlot::new(Some(sink)),
        }
    }
}

/// Escape an attribute value. Existing entity references are kept.
fn escape_attribute(value: &str, out: &mut String) {
    for (i, c) in value.char_indices() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '&' if !starts_entity(&value[i + 1..]) => out.push_str("&amp;"),
            c => out.push(c),
        }
    }
}

fn starts_entity(rest: &str) -> bool {
    let Some(end) = rest.find(';') else {
        return false;
    };
    let name = &rest[..end];
    if let Some(num) = name.strip_prefix('#') {
        return match num.strip_prefix(['x', 'X']) {
            Some(hex) => !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit()),
            None => !num.is_empty() && num.chars().all(|c| c.is_ascii_digit()),
        };
    }
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric())
}

impl ContentHandler for XmlSerializer {
    fn start_element(&mut self, name: &str, attrs: &Attributes) -> Result<()> {
        let mut tag = String::with_capacity(name.len() + 2 + attrs.len() * 16);
        tag.push('<');
        tag.push_str(name);
        for attr in attrs.regular() {
            tag.push(' ');
            tag.push_str(&attr.name);
            tag.push_str("=\"");
            // bare attributes get their own name as value
            escape_attribute(attr.value.as_deref().unwrap_or(&attr.name), &mut tag);
            tag.push('"');
        }
        if is_void_element(name) || attrs.has_end_slash() {
            tag.push('/');
        }
        tag.push('>');
        self.sink.write_str(&tag)
    }

    fn end_element(&mut self, name: &str) -> Result<()> {
        if is_void_element(name) {
            return Ok(());
        }
        self.sink.write_str(&format!("</{name}>"))
    }

    fn characters(&mut self, text: &str) -> Result<()> {
        if text.is_empty() {
            return self.sink.flush();
        }
        self.sink.write_str(text)
    }

    fn end_document(&mut self) -> Result<()> {
        self.sink.flush()
    }
}

impl Serializer for XmlSerializer {
    fn init(&mut self, ctx: &ProcessingContext, _config: &ComponentConfig) -> Result<()> {
        self.sink.set(ctx.output());
        Ok(())
    }

    fn dispose(&mut self) {
        self.sink.release();
    }
}

/// Factory registered as `xml-serializer`.
#[derive(Debug, Default, Clone, Copy)]
pub struct XmlSerializerFactory;

impl SerializerFactory for XmlSerializerFactory {
    fn create_serializer(&self) -> Box<dyn Serializer> {
        Box::new(XmlSerializer::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::SharedBuffer;
    use crate::events::Quote;

    #[test]
    fn test_well_formed_output() {
        let buffer = SharedBuffer::new();
        let mut serializer = XmlSerializer::with_sink(OutputSink::new(buffer.clone()));

        let mut attrs = Attributes::new();
        attrs.push_quoted("href", Some("/a?x=1&y=\"2\"&amp;z"), Quote::Single);
        attrs.push_quoted("download", None, Quote::Double);
        serializer.start_element("a", &attrs).unwrap();
        serializer.characters("go").unwrap();
        serializer.end_element("a").unwrap();

        serializer.start_element("br", &Attributes::new()).unwrap();
        serializer.end_element("br").unwrap();
        serializer.end_document().unwrap();

        assert_eq!(
            buffer.contents(),
            "<a href=\"/a?x=1&amp;y=&quot;2&quot;&amp;z\" download=\"download\">go</a><br/>"
        );
        assert_eq!(buffer.flush_count(), 1);
    }

    #[test]
    fn test_entity_detection() {
        assert!(starts_entity("amp;rest"));
        assert!(starts_entity("#38;"));
        assert!(starts_entity("#x26;"));
        assert!(!starts_entity(" nope;"));
        assert!(!starts_entity("amp"));
    }
}
