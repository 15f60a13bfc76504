//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use content_rewriter::components::{
    OutputSink, Processor, ProcessingContext, SharedBuffer, Transformer, TransformerFactory,
};
use content_rewriter::events::{ContentHandler, EventRecorder};
use content_rewriter::matcher::{ProcessorConfig, RequestInfo};
use content_rewriter::store::FsStore;
use content_rewriter::{ComponentRegistry, ConfigManager, ResponseAdapter, Result};

pub const SEARCH_PATHS: [&str; 2] = ["/apps", "/libs"];

/// A temporary file-system content store.
pub struct StoreFixture {
    dir: tempfile::TempDir,
}

impl StoreFixture {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn base(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    pub fn store(&self) -> FsStore {
        FsStore::new(self.dir.path())
    }

    fn file(&self, store_path: &str) -> PathBuf {
        self.dir
            .path()
            .join(format!("{}.toml", store_path.trim_start_matches('/')))
    }

    /// Write the node at `store_path` as a TOML file.
    pub fn write(&self, store_path: &str, toml: &str) {
        let file = self.file(store_path);
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(file, toml).unwrap();
    }

    /// Create the directory for `store_path` and its ancestors.
    pub fn mkdir(&self, store_path: &str) {
        fs::create_dir_all(self.dir.path().join(store_path.trim_start_matches('/'))).unwrap();
    }

    /// Remove the node file at `store_path`.
    pub fn remove_node(&self, store_path: &str) {
        fs::remove_file(self.file(store_path)).unwrap();
    }

    /// Remove the directory at `store_path` with everything below it.
    pub fn remove_dir(&self, store_path: &str) {
        fs::remove_dir_all(self.dir.path().join(store_path.trim_start_matches('/'))).unwrap();
    }

    pub fn manager(&self, registry: ComponentRegistry) -> Arc<ConfigManager> {
        let manager = Arc::new(ConfigManager::new(
            Arc::new(self.store()),
            Arc::new(registry),
            SEARCH_PATHS.iter().map(|s| s.to_string()).collect(),
        ));
        manager.activate();
        manager
    }
}

/// TOML for an html pipeline with the given extra lines.
pub fn html_pipeline(extra: &str) -> String {
    format!(
        "generatorType = \"html-generator\"\nserializerType = \"html-serializer\"\n{extra}\n"
    )
}

/// Send `input` through the response adapter and return what reached the sink.
pub fn rewrite(manager: &Arc<ConfigManager>, request: RequestInfo, input: &str) -> Result<String> {
    let buffer = SharedBuffer::new();
    let mut response = ResponseAdapter::new(
        Arc::clone(manager),
        Arc::new(request),
        OutputSink::new(buffer.clone()),
    );
    response.writer()?.write_all(input.as_bytes())?;
    response.finished(false)?;
    Ok(buffer.contents())
}

pub fn orders(manager: &ConfigManager) -> Vec<i64> {
    manager
        .processor_configurations()
        .iter()
        .map(|c| c.order())
        .collect()
}

/// Appends `[mark]` as text right before the end of the document.
pub struct Marker(pub &'static str);

impl Transformer for Marker {
    fn end_document(&mut self, next: &mut dyn ContentHandler) -> Result<()> {
        next.characters(&format!("[{}]", self.0))?;
        next.end_document()
    }
}

pub fn marker(mark: &'static str) -> Arc<dyn TransformerFactory> {
    Arc::new(move || Box::new(Marker(mark)) as Box<dyn Transformer>)
}

/// Opaque processor upper-casing everything written to it.
#[derive(Default)]
pub struct UpperProcessor {
    input: Vec<u8>,
    output: Option<OutputSink>,
    events: EventRecorder,
}

impl Processor for UpperProcessor {
    fn init(&mut self, ctx: &ProcessingContext, _config: &ProcessorConfig) -> Result<()> {
        self.output = Some(ctx.output());
        Ok(())
    }

    fn writer(&mut self) -> &mut dyn Write {
        &mut self.input
    }

    fn content_handler(&mut self) -> &mut dyn ContentHandler {
        &mut self.events
    }

    fn finished(&mut self, error_occurred: bool) -> Result<()> {
        if error_occurred {
            return Ok(());
        }
        if let Some(output) = self.output.as_mut() {
            let text = String::from_utf8_lossy(&self.input).to_uppercase();
            output.write_all(text.as_bytes())?;
        }
        Ok(())
    }
}
