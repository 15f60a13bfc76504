//! Event dispatch through the transformer stages into the serializer.

use crate::components::{Serializer, Transformer};
use crate::error::{Result, RewriterError};
use crate::events::{Attributes, ContentHandler};

/// A transformer instance with the name it was configured under.
pub(crate) struct TransformerStage {
    pub name: String,
    pub transformer: Box<dyn Transformer>,
}

pub(crate) struct SerializerStage {
    pub name: String,
    pub serializer: Box<dyn Serializer>,
}

/// Owns every stage after the generator.
#[derive(Default)]
pub(crate) struct Chain {
    pub transformers: Vec<TransformerStage>,
    pub serializer: Option<SerializerStage>,
}

impl Chain {
    fn downstream(&mut self) -> Downstream<'_> {
        Downstream {
            transformers: &mut self.transformers,
            serializer: self.serializer.as_mut(),
        }
    }

    /// Dispose every stage, transformers first.
    pub fn dispose(&mut self) {
        for stage in &mut self.transformers {
            stage.transformer.dispose();
        }
        if let Some(stage) = &mut self.serializer {
            stage.serializer.dispose();
        }
    }
}

/// The stages from some position to the end of the chain.
struct Downstream<'a> {
    transformers: &'a mut [TransformerStage],
    serializer: Option<&'a mut SerializerStage>,
}

/// Route one event either to the head transformer, which receives the
/// rest of the chain as its successor, or to the serializer.
macro_rules! dispatch {
    ($self:ident, |$t:ident, $next:ident| $to_transformer:expr, |$s:ident| $to_serializer:expr) => {
        match $self.transformers.split_first_mut() {
            Some((head, rest)) => {
                let mut tail = Downstream {
                    transformers: rest,
                    serializer: $self.serializer.as_deref_mut(),
                };
                let $t = &mut head.transformer;
                let $next: &mut dyn ContentHandler = &mut tail;
                $to_transformer.map_err(|e: RewriterError| e.in_component(&head.name))
            }
            None => match $self.serializer.as_deref_mut() {
                Some(stage) => {
                    let $s = &mut stage.serializer;
                    $to_serializer.map_err(|e: RewriterError| e.in_component(&stage.name))
                }
                None => Err(RewriterError::InvalidArgument(
                    "pipeline has no serializer".into(),
                )),
            },
        }
    };
}

impl ContentHandler for Downstream<'_> {
    fn start_document(&mut self) -> Result<()> {
        dispatch!(self, |t, next| t.start_document(next), |s| s.start_document())
    }

    fn start_element(&mut self, name: &str, attrs: &Attributes) -> Result<()> {
        dispatch!(
            self,
            |t, next| t.start_element(name, attrs, next),
            |s| s.start_element(name, attrs)
        )
    }

    fn end_element(&mut self, name: &str) -> Result<()> {
        dispatch!(self, |t, next| t.end_element(name, next), |s| s.end_element(name))
    }

    fn characters(&mut self, text: &str) -> Result<()> {
        dispatch!(self, |t, next| t.characters(text, next), |s| s.characters(text))
    }

    fn end_document(&mut self) -> Result<()> {
        dispatch!(self, |t, next| t.end_document(next), |s| s.end_document())
    }
}

impl ContentHandler for Chain {
    fn start_document(&mut self) -> Result<()> {
        self.downstream().start_document()
    }

    fn start_element(&mut self, name: &str, attrs: &Attributes) -> Result<()> {
        self.downstream().start_element(name, attrs)
    }

    fn end_element(&mut self, name: &str) -> Result<()> {
        self.downstream().end_element(name)
    }

    fn characters(&mut self, text: &str) -> Result<()> {
        self.downstream().characters(text)
    }

    fn end_document(&mut self) -> Result<()> {
        self.downstream().end_document()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{OutputSink, SharedBuffer};
    use crate::serializer::HtmlSerializer;

    /// Upper-cases character data.
    struct Shout;

    impl Transformer for Shout {
        fn characters(&mut self, text: &str, next: &mut dyn ContentHandler) -> Result<()> {
            next.characters(&text.to_uppercase())
        }
    }

    /// Wraps character data in brackets.
    struct Bracket;

    impl Transformer for Bracket {
        fn characters(&mut self, text: &str, next: &mut dyn ContentHandler) -> Result<()> {
            if text.is_empty() {
                return next.characters(text);
            }
            next.characters(&format!("[{text}]"))
        }
    }

    struct Broken;

    impl Transformer for Broken {
        fn end_element(&mut self, _name: &str, _next: &mut dyn ContentHandler) -> Result<()> {
            Err(RewriterError::InvalidArgument("unbalanced".into()))
        }
    }

    fn chain(stages: Vec<(&str, Box<dyn Transformer>)>, buffer: &SharedBuffer) -> Chain {
        Chain {
            transformers: stages
                .into_iter()
                .map(|(name, transformer)| TransformerStage {
                    name: name.to_string(),
                    transformer,
                })
                .collect(),
            serializer: Some(SerializerStage {
                name: "html-serializer".into(),
                serializer: Box::new(HtmlSerializer::with_sink(OutputSink::new(buffer.clone()))),
            }),
        }
    }

    #[test]
    fn test_stages_apply_in_order() {
        let buffer = SharedBuffer::new();
        let mut chain = chain(
            vec![("shout", Box::new(Shout)), ("bracket", Box::new(Bracket))],
            &buffer,
        );
        chain.characters("hi").unwrap();
        assert_eq!(buffer.contents(), "[HI]");
    }

    #[test]
    fn test_error_names_offending_stage() {
        let buffer = SharedBuffer::new();
        let mut chain = chain(
            vec![("shout", Box::new(Shout)), ("broken", Box::new(Broken))],
            &buffer,
        );
        match chain.end_element("a") {
            Err(RewriterError::StreamingParse { component, .. }) => assert_eq!(component, "broken"),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_missing_serializer_is_an_error() {
        let mut chain = Chain::default();
        assert!(chain.characters("x").is_err());
    }
}
