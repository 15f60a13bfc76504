//! Writer substitution for one response.

use std::io::Write;
use std::sync::Arc;

use crate::components::{OutputSink, Processor, ProcessingContext};
use crate::error::Result;
use crate::events::ContentHandler;
use crate::manager::ConfigManager;
use crate::matcher::RequestContext;

enum State {
    Unresolved,
    Rewriting(Box<dyn Processor>),
    Passthrough,
    Finished,
}

/// Routes a response body through the first matching processor.
pub struct ResponseAdapter {
    manager: Arc<ConfigManager>,
    request: Arc<dyn RequestContext>,
    output: OutputSink,
    state: State,
}

impl ResponseAdapter {
    pub fn new(
        manager: Arc<ConfigManager>,
        request: Arc<dyn RequestContext>,
        output: OutputSink,
    ) -> Self {
        Self {
            manager,
            request,
            output,
            state: State::Unresolved,
        }
    }

    fn resolve(&mut self) -> Result<()> {
        if !matches!(self.state, State::Unresolved) {
            return Ok(());
        }
        self.state = State::Passthrough;

        let Some(config) = self.manager.find_processor_config(self.request.as_ref()) else {
            tracing::debug!(path = %self.request.path(), "no processor configuration matches");
            return Ok(());
        };
        let ctx = ProcessingContext::new(Arc::clone(&self.request), self.output.clone());
        let processor = self.manager.get_processor(&config, &ctx).map_err(|e| {
            tracing::warn!(path = %self.request.path(), error = %e, "response left unrewritten");
            e
        })?;
        self.state = State::Rewriting(processor);
        Ok(())
    }

    /// Whether a processor was found for this response.
    pub fn is_rewriting(&mut self) -> Result<bool> {
        self.resolve()?;
        Ok(matches!(self.state, State::Rewriting(_)))
    }

    /// The writer the response body should go to.
    pub fn writer(&mut self) -> Result<&mut dyn Write> {
        self.resolve()?;
        match &mut self.state {
            State::Rewriting(processor) => Ok(processor.writer()),
            _ => Ok(&mut self.output),
        }
    }

    /// The processor's event input, if the response is being rewritten.
    pub fn content_handler(&mut self) -> Result<Option<&mut dyn ContentHandler>> {
        self.resolve()?;
        match &mut self.state {
            State::Rewriting(processor) => Ok(Some(processor.content_handler())),
            _ => Ok(None),
        }
    }

    /// Finish the response. Runs at most once.
    pub fn finished(&mut self, error_occurred: bool) -> Result<()> {
        match std::mem::replace(&mut self.state, State::Finished) {
            State::Rewriting(mut processor) => processor.finished(error_occurred),
            State::Passthrough if !error_occurred => Ok(self.output.flush()?),
            _ => Ok(()),
        }
    }
}

impl Drop for ResponseAdapter {
    fn drop(&mut self) {
        if let State::Rewriting(_) = self.state {
            if let Err(e) = self.finished(true) {
                tracing::debug!(error = %e, "unfinished response failed to clean up");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::SharedBuffer;
    use crate::error::RewriterError;
    use crate::matcher::RequestInfo;
    use crate::registry::ComponentRegistry;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn manager(generator: &str) -> Arc<ConfigManager> {
        let store = Arc::new(MemoryStore::new());
        store.put_json(
            "/apps/site/config/rewriter/links",
            json!({
                "generatorType": generator,
                "transformerTypes": "link-rewriter",
                "serializerType": "html-serializer",
                "paths": "/content",
            }),
        );
        store.put_json(
            "/apps/site/config/rewriter/links/transformer-link-rewriter",
            json!({"from": "/content/site", "to": "/site"}),
        );
        let manager = Arc::new(ConfigManager::new(
            store,
            Arc::new(ComponentRegistry::with_defaults()),
            vec!["/apps".to_string()],
        ));
        manager.activate();
        manager
    }

    fn adapter(manager: Arc<ConfigManager>, path: &str, buffer: &SharedBuffer) -> ResponseAdapter {
        ResponseAdapter::new(
            manager,
            Arc::new(RequestInfo::new(path).with_content_type("text/html; charset=utf-8")),
            OutputSink::new(buffer.clone()),
        )
    }

    #[test]
    fn test_matching_response_is_rewritten() {
        let buffer = SharedBuffer::new();
        let mut response = adapter(manager("html-generator"), "/content/site/page", &buffer);
        assert!(response.is_rewriting().unwrap());
        response
            .writer()
            .unwrap()
            .write_all(b"<a href=\"/content/site/x\">x</a>")
            .unwrap();
        response.finished(false).unwrap();
        assert_eq!(buffer.contents(), "<a href=\"/site/x\">x</a>");
    }

    #[test]
    fn test_unmatched_response_passes_through() {
        let buffer = SharedBuffer::new();
        let mut response = adapter(manager("html-generator"), "/other", &buffer);
        assert!(!response.is_rewriting().unwrap());
        assert!(response.content_handler().unwrap().is_none());
        response
            .writer()
            .unwrap()
            .write_all(b"<a href=\"/content/site/x\">")
            .unwrap();
        response.finished(false).unwrap();
        assert_eq!(buffer.contents(), "<a href=\"/content/site/x\">");
        assert_eq!(buffer.flush_count(), 1);
    }

    #[test]
    fn test_assembly_failure_then_fallback() {
        let buffer = SharedBuffer::new();
        let mut response = adapter(manager("missing-generator"), "/content/site/page", &buffer);
        assert!(matches!(
            response.writer(),
            Err(RewriterError::ComponentResolution { .. })
        ));
        response.writer().unwrap().write_all(b"raw").unwrap();
        assert_eq!(buffer.contents(), "raw");
    }

    #[test]
    fn test_drop_discards_pending_output() {
        let buffer = SharedBuffer::new();
        {
            let mut response = adapter(manager("html-generator"), "/content/site/page", &buffer);
            response.writer().unwrap().write_all(b"pending text").unwrap();
        }
        assert!(!buffer.contents().contains("pending"));
    }
}
