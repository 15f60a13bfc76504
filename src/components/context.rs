//! Per-request processing context and output sink.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};

use uuid::Uuid;

use crate::matcher::RequestContext;

/// Shared handle to the response's character sink.
///
/// The serializer of a pipeline (or an opaque processor) clones this handle
/// during `init` and writes the rewritten output through it.
#[derive(Clone)]
pub struct OutputSink {
    inner: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl OutputSink {
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Box<dyn Write + Send>> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("output sink mutex poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

impl Write for OutputSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock().write(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.lock().write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock().flush()
    }
}

impl std::fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputSink").finish_non_exhaustive()
    }
}

/// An in-memory writer whose contents stay readable after it was handed out.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
    flushes: Arc<Mutex<usize>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        let bytes = self.bytes.lock().unwrap_or_else(|p| p.into_inner());
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// How often `flush` was called.
    pub fn flush_count(&self) -> usize {
        *self.flushes.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        *self.flushes.lock().unwrap_or_else(|p| p.into_inner()) += 1;
        Ok(())
    }
}

/// Everything a component may inspect about the request it serves.
#[derive(Clone)]
pub struct ProcessingContext {
    id: Uuid,
    request: Arc<dyn RequestContext>,
    output: OutputSink,
}

impl ProcessingContext {
    pub fn new(request: Arc<dyn RequestContext>, output: OutputSink) -> Self {
        Self {
            id: Uuid::new_v4(),
            request,
            output,
        }
    }

    /// Identifier used to correlate log lines of one pipeline run.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn request(&self) -> &dyn RequestContext {
        self.request.as_ref()
    }

    /// The response content type, if the request declared one.
    pub fn content_type(&self) -> Option<&str> {
        self.request.content_type()
    }

    /// A handle to the original response sink.
    pub fn output(&self) -> OutputSink {
        self.output.clone()
    }
}

impl std::fmt::Debug for ProcessingContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessingContext")
            .field("id", &self.id)
            .field("path", &self.request.path())
            .field("content_type", &self.request.content_type())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_writes_through_to_buffer() {
        let buffer = SharedBuffer::new();
        let mut sink = OutputSink::new(buffer.clone());
        let mut clone = sink.clone();

        sink.write_all(b"<a>").unwrap();
        clone.write_all(b"text").unwrap();
        clone.flush().unwrap();

        assert_eq!(buffer.contents(), "<a>text");
        assert_eq!(buffer.flush_count(), 1);
    }
}
