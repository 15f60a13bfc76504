//! The `link-rewriter` transformer: rewrites link prefixes in place.

use crate::components::{ComponentConfig, ProcessingContext, Transformer, TransformerFactory};
use crate::error::{Result, RewriterError};
use crate::events::{Attributes, ContentHandler};

/// Attributes that carry links.
const LINK_ATTRIBUTES: &[&str] = &["href", "src", "action"];

/// Replaces the `from` prefix of link attributes with `to`.
#[derive(Debug, Default)]
pub struct LinkRewriter {
    from: String,
    to: String,
    rewritten: usize,
}

impl LinkRewriter {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            rewritten: 0,
        }
    }

    fn rewrite(&self, value: &str) -> Option<String> {
        value
            .strip_prefix(self.from.as_str())
            .map(|rest| format!("{}{}", self.to, rest))
    }
}

impl Transformer for LinkRewriter {
    fn init(&mut self, _ctx: &ProcessingContext, config: &ComponentConfig) -> Result<()> {
        let from = config.get_str("from").unwrap_or_default();
        if from.is_empty() {
            return Err(RewriterError::InvalidArgument(
                "link-rewriter requires a non-empty 'from' option".into(),
            ));
        }
        self.from = from.to_string();
        self.to = config.get_str("to").unwrap_or_default().to_string();
        Ok(())
    }

    fn start_element(
        &mut self,
        name: &str,
        attrs: &Attributes,
        next: &mut dyn ContentHandler,
    ) -> Result<()> {
        let mut updated: Option<Attributes> = None;
        for attr in LINK_ATTRIBUTES {
            let Some(value) = attrs.get(attr) else {
                continue;
            };
            if let Some(new_value) = self.rewrite(value) {
                updated
                    .get_or_insert_with(|| attrs.clone())
                    .set(attr, &new_value);
                self.rewritten += 1;
            }
        }
        next.start_element(name, updated.as_ref().unwrap_or(attrs))
    }

    fn dispose(&mut self) {
        if self.rewritten > 0 {
            tracing::debug!(count = self.rewritten, from = %self.from, "links rewritten");
        }
    }
}

/// Factory registered as `link-rewriter`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinkRewriterFactory;

impl TransformerFactory for LinkRewriterFactory {
    fn create_transformer(&self) -> Box<dyn Transformer> {
        Box::new(LinkRewriter::default())
    }
}
