//! Pipeline assembly.
//!
//! # Data Flow
//! ```text
//! assemble(registry, ctx, config)
//!     → ProcessorMode::Pipeline
//!         → resolve generator, declared transformers, serializer
//!         → registry.global_transformers(ctx) (pre, post)
//!         → chain: pre → declared → post → serializer
//!     → ProcessorMode::Processor
//!         → processor.rs (ProcessorWrapper around the opaque processor)
//!
//! response bytes → Pipeline (io::Write) → generator → chain.rs → sink
//! ```
//!
//! # Design Decisions
//! - The pipeline owns every stage, so `finished` can dispose each exactly once
//! - Errors are tagged with the failing component's type
//! - Dropping an unfinished pipeline finishes it as failed

pub mod chain;
pub mod processor;

pub use processor::ProcessorWrapper;

use std::io::{self, Write};
use std::sync::Arc;

use crate::components::{
    ComponentConfig, ComponentKind, Generator, Processor, ProcessingContext, TransformerFactory,
};
use crate::error::{Result, RewriterError};
use crate::events::ContentHandler;
use crate::matcher::{ProcessorConfig, ProcessorMode};
use crate::observability::metrics;
use crate::registry::ComponentRegistry;

use chain::{Chain, SerializerStage, TransformerStage};

/// Name global transformer stages are reported under.
pub const GLOBAL_TRANSFORMER: &str = "global-transformer";

/// Build and initialise the processor `config` describes.
pub fn assemble(
    registry: Arc<ComponentRegistry>,
    ctx: &ProcessingContext,
    config: &ProcessorConfig,
) -> Result<Box<dyn Processor>> {
    let mut processor: Box<dyn Processor> = match config.mode() {
        ProcessorMode::Pipeline { .. } => Box::new(Pipeline::new(registry)),
        ProcessorMode::Processor(_) => Box::new(ProcessorWrapper::new(registry)),
    };
    if let Err(e) = processor.init(ctx, config) {
        metrics::record_pipeline_error(e.kind_label());
        return Err(e);
    }
    metrics::record_pipeline(if config.is_pipeline() { "pipeline" } else { "processor" });
    Ok(processor)
}

struct GeneratorStage {
    name: String,
    generator: Box<dyn Generator>,
}

/// generator → transformers → serializer, fed through [`Write`].
pub struct Pipeline {
    registry: Arc<ComponentRegistry>,
    generator: Option<GeneratorStage>,
    chain: Chain,
    id: Option<uuid::Uuid>,
    finished: bool,
}

impl Pipeline {
    pub fn new(registry: Arc<ComponentRegistry>) -> Self {
        Self {
            registry,
            generator: None,
            chain: Chain::default(),
            id: None,
            finished: false,
        }
    }

    fn resolve_transformers(
        &self,
        ctx: &ProcessingContext,
        declared: &[ComponentConfig],
    ) -> Result<Vec<(ComponentConfig, Arc<dyn TransformerFactory>)>> {
        let (pre, post) = self.registry.global_transformers(ctx.request());
        let global = |factory: Arc<dyn TransformerFactory>| {
            (ComponentConfig::of(ComponentKind::Transformer, GLOBAL_TRANSFORMER), factory)
        };

        let mut resolved: Vec<_> = pre.into_iter().flatten().map(global).collect();
        for config in declared {
            match self.registry.transformer(config.component_type()) {
                Some(factory) => resolved.push((config.clone(), factory)),
                None if config.is_optional() => {
                    tracing::debug!(
                        transformer = config.component_type(),
                        "optional transformer not registered, skipping"
                    );
                }
                None => {
                    return Err(RewriterError::missing(
                        ComponentKind::Transformer,
                        config.component_type(),
                    ))
                }
            }
        }
        resolved.extend(post.into_iter().flatten().map(global));
        Ok(resolved)
    }

    fn feed(&mut self, buf: &[u8]) -> Result<()> {
        if self.finished {
            return Err(RewriterError::InvalidArgument("pipeline already finished".into()));
        }
        let stage = self
            .generator
            .as_mut()
            .ok_or_else(|| RewriterError::InvalidArgument("pipeline not initialised".into()))?;
        stage
            .generator
            .write(buf, &mut self.chain)
            .map_err(|e| e.in_component(&stage.name))
    }

    fn dispose(&mut self) {
        if let Some(stage) = &mut self.generator {
            stage.generator.dispose();
        }
        self.chain.dispose();
    }
}

impl Processor for Pipeline {
    fn init(&mut self, ctx: &ProcessingContext, config: &ProcessorConfig) -> Result<()> {
        let ProcessorMode::Pipeline {
            generator,
            transformers,
            serializer,
        } = config.mode()
        else {
            return Err(RewriterError::InvalidArgument(
                "pipeline requires a pipeline configuration".into(),
            ));
        };
        let (Some(generator_config), Some(serializer_config)) = (generator, serializer) else {
            return Err(RewriterError::ConfigurationInvalid {
                path: ctx.request().path().to_string(),
                reason: config.validate().err().unwrap_or_default(),
            });
        };
        self.id = Some(ctx.id());

        let generator_factory = self
            .registry
            .generator(generator_config.component_type())
            .ok_or_else(|| {
                RewriterError::missing(ComponentKind::Generator, generator_config.component_type())
            })?;
        let serializer_factory = self
            .registry
            .serializer(serializer_config.component_type())
            .ok_or_else(|| {
                RewriterError::missing(ComponentKind::Serializer, serializer_config.component_type())
            })?;
        let transformers = self.resolve_transformers(ctx, transformers)?;

        // every created stage is stored before init so teardown reaches it
        let stage = self.generator.insert(GeneratorStage {
            name: generator_config.component_type().to_string(),
            generator: generator_factory.create_generator(),
        });
        stage
            .generator
            .init(ctx, generator_config)
            .map_err(|e| e.in_component(&stage.name))?;

        for (config, factory) in transformers {
            self.chain.transformers.push(TransformerStage {
                name: config.component_type().to_string(),
                transformer: factory.create_transformer(),
            });
            if let Some(stage) = self.chain.transformers.last_mut() {
                stage
                    .transformer
                    .init(ctx, &config)
                    .map_err(|e| e.in_component(&stage.name))?;
            }
        }

        let stage = self.chain.serializer.insert(SerializerStage {
            name: serializer_config.component_type().to_string(),
            serializer: serializer_factory.create_serializer(),
        });
        stage
            .serializer
            .init(ctx, serializer_config)
            .map_err(|e| e.in_component(&stage.name))?;

        tracing::debug!(
            pipeline = %ctx.id(),
            generator = generator_config.component_type(),
            transformers = self.chain.transformers.len(),
            serializer = serializer_config.component_type(),
            "pipeline assembled"
        );
        Ok(())
    }

    fn writer(&mut self) -> &mut dyn Write {
        self
    }

    fn content_handler(&mut self) -> &mut dyn ContentHandler {
        &mut self.chain
    }

    fn finished(&mut self, error_occurred: bool) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        let result = match (&mut self.generator, error_occurred) {
            (Some(stage), false) => stage
                .generator
                .finished(&mut self.chain)
                .map_err(|e| e.in_component(&stage.name)),
            _ => Ok(()),
        };
        self.dispose();

        match &result {
            Ok(()) => tracing::debug!(pipeline = ?self.id, error_occurred, "pipeline finished"),
            Err(e) => {
                metrics::record_pipeline_error(e.kind_label());
                tracing::warn!(pipeline = ?self.id, error = %e, "pipeline failed to finish");
            }
        }
        result
    }
}

impl Write for Pipeline {
    /// Feed a chunk to the generator. An empty chunk is a flush request.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.feed(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.feed(&[])?;
        Ok(())
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.finished(true) {
                tracing::warn!(error = %e, "pipeline teardown failed");
            }
        }
    }
}
