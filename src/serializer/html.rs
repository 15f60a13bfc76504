//! The `html-serializer` component.

use crate::components::{ComponentConfig, OutputSink, ProcessingContext, Serializer, SerializerFactory};
use crate::error::Result;
use crate::events::{Attributes, ContentHandler, Quote};
use crate::serializer::{is_void_element, SinkSlot};

/// Elements rendered without a closing tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "br", "area", "link", "img", "param", "hr", "input", "col", "base", "meta",
];

/// Writes events back as HTML. Text and attribute values are written as
/// received, since unrecognised markup travels as character data.
#[derive(Debug, Default)]
pub struct HtmlSerializer {
    sink: SinkSlot,
}

impl HtmlSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A serializer already bound to `sink`.
    pub fn with_sink(sink: OutputSink) -> Self {
        Self {
            sink: SinkSlot::new(Some(sink)),
        }
    }
}

/// Render an opening tag the way the generator saw it.
pub(crate) fn render_start_tag(name: &str, attrs: &Attributes) -> String {
    let mut out = String::with_capacity(name.len() + 2 + attrs.len() * 16);
    out.push('<');
    out.push_str(name);
    for (index, attr) in attrs.regular().enumerate() {
        out.push(' ');
        out.push_str(&attr.name);
        let Some(value) = &attr.value else {
            continue;
        };
        out.push('=');
        match attrs.quote_at(index) {
            Quote::Unquoted => out.push_str(value),
            quote => {
                out.push(quote.as_char());
                out.push_str(value);
                out.push(quote.as_char());
            }
        }
    }
    if attrs.has_end_slash() {
        out.push('/');
    }
    out.push('>');
    out
}

impl ContentHandler for HtmlSerializer {
    fn start_element(&mut self, name: &str, attrs: &Attributes) -> Result<()> {
        self.sink.write_str(&render_start_tag(name, attrs))
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

impl Serializer for HtmlSerializer {
    fn init(&mut self, ctx: &ProcessingContext, _config: &ComponentConfig) -> Result<()> {
        self.sink.set(ctx.output());
        Ok(())
    }

    fn dispose(&mut self) {
        self.sink.release();
    }
}

/// Factory registered as `html-serializer`.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlSerializerFactory;

impl SerializerFactory for HtmlSerializerFactory {
    fn create_serializer(&self) -> Box<dyn Serializer> {
        Box::new(HtmlSerializer::new())
    }
}
