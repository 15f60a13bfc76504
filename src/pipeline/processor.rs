//! Opaque processors resolved from the registry.

use std::io::{self, Write};
use std::sync::Arc;

use crate::components::{ComponentKind, Processor, ProcessingContext};
use crate::error::{Result, RewriterError};
use crate::events::{Attributes, ContentHandler};
use crate::matcher::ProcessorConfig;
use crate::registry::ComponentRegistry;

/// Looks up the configured processor type and delegates to it.
///
/// Guarantees `finished` reaches the delegate at most once, and at all if the
/// wrapper is dropped unfinished.
pub struct ProcessorWrapper {
    registry: Arc<ComponentRegistry>,
    name: String,
    delegate: Option<Box<dyn Processor>>,
    detached: Detached,
    finished: bool,
}

impl ProcessorWrapper {
    pub fn new(registry: Arc<ComponentRegistry>) -> Self {
        Self {
            registry,
            name: String::new(),
            delegate: None,
            detached: Detached,
            finished: false,
        }
    }

    /// Type of the wrapped processor, empty before `init`.
    pub fn processor_type(&self) -> &str {
        &self.name
    }
}

impl Processor for ProcessorWrapper {
    fn init(&mut self, ctx: &ProcessingContext, config: &ProcessorConfig) -> Result<()> {
        let component = config.processor_config().ok_or_else(|| {
            RewriterError::ConfigurationInvalid {
                path: ctx.request().path().to_string(),
                reason: "processor has no processor type".to_string(),
            }
        })?;
        let factory = self
            .registry
            .processor(component.component_type())
            .ok_or_else(|| RewriterError::missing(ComponentKind::Processor, component.component_type()))?;

        self.name = component.component_type().to_string();
        let delegate = self.delegate.insert(factory.create_processor());
        delegate
            .init(ctx, config)
            .map_err(|e| e.in_component(&self.name))?;
        tracing::debug!(pipeline = %ctx.id(), processor = %self.name, "processor initialised");
        Ok(())
    }

    fn writer(&mut self) -> &mut dyn Write {
        match &mut self.delegate {
            Some(delegate) => delegate.writer(),
            None => &mut self.detached,
        }
    }

    fn content_handler(&mut self) -> &mut dyn ContentHandler {
        match &mut self.delegate {
            Some(delegate) => delegate.content_handler(),
            None => &mut self.detached,
        }
    }

    fn finished(&mut self, error_occurred: bool) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        match &mut self.delegate {
            Some(delegate) => delegate
                .finished(error_occurred)
                .map_err(|e| e.in_component(&self.name)),
            None => Ok(()),
        }
    }
}

/// Sink handed out before a delegate exists; rejects all input.
#[derive(Debug, Default)]
struct Detached;

impl Detached {
    fn error() -> RewriterError {
        RewriterError::InvalidArgument("processor not initialised".into())
    }
}

impl Write for Detached {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(Self::error().into())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ContentHandler for Detached {
    fn start_element(&mut self, _name: &str, _attrs: &Attributes) -> Result<()> {
        Err(Self::error())
    }

    fn end_element(&mut self, _name: &str) -> Result<()> {
        Err(Self::error())
    }

    fn characters(&mut self, _text: &str) -> Result<()> {
        Err(Self::error())
    }

    fn end_document(&mut self) -> Result<()> {
        Err(Self::error())
    }
}

impl Drop for ProcessorWrapper {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.finished(true) {
                tracing::warn!(processor = %self.name, error = %e, "processor teardown failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::components::{ComponentConfig, OutputSink, SharedBuffer};
    use crate::matcher::RequestInfo;
    use crate::pipeline::assemble;
    use crate::registry::Factory;

    /// Copies the response upper-cased.
    struct Upper {
        out: Option<OutputSink>,
        finishes: Arc<AtomicUsize>,
    }

    impl Processor for Upper {
        fn init(&mut self, ctx: &ProcessingContext, _config: &ProcessorConfig) -> Result<()> {
            self.out = Some(ctx.output());
            Ok(())
        }

        fn writer(&mut self) -> &mut dyn Write {
            self
        }

        fn content_handler(&mut self) -> &mut dyn ContentHandler {
            unimplemented!("byte-only processor")
        }

        fn finished(&mut self, _error_occurred: bool) -> Result<()> {
            self.finishes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    impl Write for Upper {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let out = self.out.as_mut().ok_or_else(|| io::Error::other("no sink"))?;
            out.write_all(&buf.to_ascii_uppercase())?;
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn registry(finishes: &Arc<AtomicUsize>) -> Arc<ComponentRegistry> {
        let registry = ComponentRegistry::new();
        let finishes = Arc::clone(finishes);
        registry.register(
            "upper",
            Factory::processor(move || -> Box<dyn Processor> {
                Box::new(Upper {
                    out: None,
                    finishes: Arc::clone(&finishes),
                })
            }),
            0,
        );
        Arc::new(registry)
    }

    fn context(buffer: &SharedBuffer) -> ProcessingContext {
        ProcessingContext::new(Arc::new(RequestInfo::new("/a")), OutputSink::new(buffer.clone()))
    }

    #[test]
    fn test_delegates_and_finishes_once() {
        let finishes = Arc::new(AtomicUsize::new(0));
        let buffer = SharedBuffer::new();
        let config = ProcessorConfig::processor(ComponentConfig::of(ComponentKind::Processor, "upper"));

        let mut processor = assemble(registry(&finishes), &context(&buffer), &config).unwrap();
        processor.writer().write_all(b"hello").unwrap();
        processor.finished(false).unwrap();
        drop(processor);

        assert_eq!(buffer.contents(), "HELLO");
        assert_eq!(finishes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unknown_processor_type() {
        let finishes = Arc::new(AtomicUsize::new(0));
        let buffer = SharedBuffer::new();
        let config = ProcessorConfig::processor(ComponentConfig::of(ComponentKind::Processor, "pdf"));
        assert!(matches!(
            assemble(registry(&finishes), &context(&buffer), &config),
            Err(RewriterError::ComponentResolution { kind: ComponentKind::Processor, .. })
        ));
    }

    #[test]
    fn test_uninitialised_wrapper_rejects_input() {
        let finishes = Arc::new(AtomicUsize::new(0));
        let mut wrapper = ProcessorWrapper::new(registry(&finishes));
        assert!(wrapper.writer().write(b"x").is_err());
        assert!(wrapper.content_handler().characters("x").is_err());
        assert!(wrapper.finished(false).is_ok());
    }
}
