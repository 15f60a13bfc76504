//! Pipeline and processor descriptors.

use std::collections::HashSet;
use std::fmt;

use crate::components::ComponentConfig;
use crate::matcher::context::{unwrap_resource, RequestContext};

/// Content type assumed when a request declares none.
pub const MIME_TYPE_HTML: &str = "text/html";

/// What a configuration instantiates when it matches.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessorMode {
    /// generator → transformers → serializer
    Pipeline {
        generator: Option<ComponentConfig>,
        transformers: Vec<ComponentConfig>,
        serializer: Option<ComponentConfig>,
    },
    /// A single component handling the whole response.
    Processor(Option<ComponentConfig>),
}

/// Immutable description of one pipeline or processor and when it applies.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessorConfig {
    content_types: Option<Vec<String>>,
    paths: Option<Vec<String>>,
    extensions: Option<Vec<String>>,
    resource_types: Option<Vec<String>>,
    unwrap_resources: bool,
    selectors: Option<Vec<String>>,
    order: i64,
    active: bool,
    process_error_responses: bool,
    mode: ProcessorMode,
}

impl Default for ProcessorConfig {
    /// A pipeline without components that matches every request.
    fn default() -> Self {
        Self {
            content_types: None,
            paths: None,
            extensions: None,
            resource_types: None,
            unwrap_resources: false,
            selectors: None,
            order: 0,
            active: true,
            process_error_responses: true,
            mode: ProcessorMode::Pipeline {
                generator: None,
                transformers: Vec::new(),
                serializer: None,
            },
        }
    }
}

impl ProcessorConfig {
    /// A pipeline configuration.
    pub fn pipeline(
        generator: ComponentConfig,
        transformers: Vec<ComponentConfig>,
        serializer: ComponentConfig,
    ) -> Self {
        Self {
            mode: ProcessorMode::Pipeline {
                generator: Some(generator),
                transformers,
                serializer: Some(serializer),
            },
            ..Default::default()
        }
    }

    /// An opaque processor configuration.
    pub fn processor(processor: ComponentConfig) -> Self {
        Self {
            mode: ProcessorMode::Processor(Some(processor)),
            ..Default::default()
        }
    }

    pub fn with_mode(mut self, mode: ProcessorMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_content_types(mut self, values: Option<Vec<String>>) -> Self {
        self.content_types = values;
        self
    }

    pub fn with_paths(mut self, values: Option<Vec<String>>) -> Self {
        self.paths = values;
        self
    }

    pub fn with_extensions(mut self, values: Option<Vec<String>>) -> Self {
        self.extensions = values;
        self
    }

    pub fn with_resource_types(mut self, values: Option<Vec<String>>) -> Self {
        self.resource_types = values;
        self
    }

    pub fn with_unwrap_resources(mut self, unwrap: bool) -> Self {
        self.unwrap_resources = unwrap;
        self
    }

    pub fn with_selectors(mut self, values: Option<Vec<String>>) -> Self {
        self.selectors = values;
        self
    }

    pub fn with_order(mut self, order: i64) -> Self {
        self.order = order;
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn with_process_error_responses(mut self, process: bool) -> Self {
        self.process_error_responses = process;
        self
    }

    pub fn order(&self) -> i64 {
        self.order
    }

    pub fn mode(&self) -> &ProcessorMode {
        &self.mode
    }

    pub fn is_pipeline(&self) -> bool {
        matches!(self.mode, ProcessorMode::Pipeline { .. })
    }

    pub fn process_error_responses(&self) -> bool {
        self.process_error_responses
    }

    /// `{pipeline}` for pipelines, the processor type otherwise.
    pub fn processor_type(&self) -> &str {
        match &self.mode {
            ProcessorMode::Pipeline { .. } => "{pipeline}",
            ProcessorMode::Processor(config) => {
                config.as_ref().map_or("", |c| c.component_type())
            }
        }
    }

    pub fn generator(&self) -> Option<&ComponentConfig> {
        match &self.mode {
            ProcessorMode::Pipeline { generator, .. } => generator.as_ref(),
            ProcessorMode::Processor(_) => None,
        }
    }

    pub fn transformers(&self) -> &[ComponentConfig] {
        match &self.mode {
            ProcessorMode::Pipeline { transformers, .. } => transformers,
            ProcessorMode::Processor(_) => &[],
        }
    }

    pub fn serializer(&self) -> Option<&ComponentConfig> {
        match &self.mode {
            ProcessorMode::Pipeline { serializer, .. } => serializer.as_ref(),
            ProcessorMode::Processor(_) => None,
        }
    }

    pub fn processor_config(&self) -> Option<&ComponentConfig> {
        match &self.mode {
            ProcessorMode::Processor(config) => config.as_ref(),
            ProcessorMode::Pipeline { .. } => None,
        }
    }

    /// Check the validity invariant; the error names what is missing.
    pub fn validate(&self) -> Result<(), String> {
        fn has_type(config: Option<&ComponentConfig>) -> bool {
            config.is_some_and(|c| !c.component_type().is_empty())
        }
        match &self.mode {
            ProcessorMode::Pipeline {
                generator,
                serializer,
                ..
            } => {
                if !has_type(generator.as_ref()) {
                    return Err("pipeline has no generator type".to_string());
                }
                if !has_type(serializer.as_ref()) {
                    return Err("pipeline has no serializer type".to_string());
                }
                Ok(())
            }
            ProcessorMode::Processor(config) => {
                if has_type(config.as_ref()) {
                    Ok(())
                } else {
                    Err("processor has no processor type".to_string())
                }
            }
        }
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Enabled and valid; only such configs enter the active list.
    pub fn is_active(&self) -> bool {
        self.active && self.is_valid()
    }

    /// Whether this configuration applies to the request.
    pub fn matches(&self, ctx: &dyn RequestContext) -> bool {
        if !self.process_error_responses && ctx.is_error_response() {
            return false;
        }

        if let Some(content_types) = non_empty(&self.content_types) {
            let content_type = ctx
                .content_type()
                .map(|ct| ct.split(';').next().unwrap_or(ct).trim())
                .unwrap_or(MIME_TYPE_HTML);
            if !content_types
                .iter()
                .any(|ct| ct == "*" || ct == content_type)
            {
                return false;
            }
        }

        if let Some(extensions) = non_empty(&self.extensions) {
            let Some(extension) = ctx.extension() else {
                return false;
            };
            if !extensions.iter().any(|e| e == extension) {
                return false;
            }
        }

        if let Some(resource_types) = non_empty(&self.resource_types) {
            let Some(resource) = ctx.resource() else {
                return false;
            };
            let found = resource_types.iter().any(|rt| {
                if resource.is_resource_type(rt) {
                    return true;
                }
                self.unwrap_resources
                    && resource.wrapped().is_some()
                    && unwrap_resource(resource).is_resource_type(rt)
            });
            if !found {
                return false;
            }
        }

        if let Some(paths) = non_empty(&self.paths) {
            let path = ctx.path();
            if !paths.iter().any(|p| p == "*" || path.starts_with(p.as_str())) {
                return false;
            }
        }

        if let Some(selectors) = non_empty(&self.selectors) {
            let requested: HashSet<&str> = match ctx.selector_string() {
                Some(s) if !s.is_empty() => s.split('.').collect(),
                _ => return false,
            };
            if !selectors.iter().any(|s| requested.contains(s.as_str())) {
                return false;
            }
        }

        true
    }

    /// Multi-line rendering used by the administrative dump.
    pub(crate) fn print(&self, out: &mut String) {
        let dims = [
            ("Content Types", &self.content_types),
            ("Resource Types", &self.resource_types),
            ("Selectors", &self.selectors),
            ("Paths", &self.paths),
            ("Extensions", &self.extensions),
        ];
        for (label, values) in dims {
            if let Some(values) = values {
                out.push_str(&format!("{label} : {values:?}\n"));
            }
        }
        out.push_str(&format!("Order : {}\n", self.order));
        out.push_str(&format!("Active : {}\n", self.active));
        out.push_str(&format!("Valid : {}\n", self.is_valid()));
        out.push_str(&format!(
            "Process Error Response : {}\n",
            self.process_error_responses
        ));
        match &self.mode {
            ProcessorMode::Pipeline {
                generator,
                transformers,
                serializer,
            } => {
                out.push_str("Pipeline : \n");
                print_component(out, "Generator", generator.iter());
                print_component(out, "Transformers", transformers.iter());
                print_component(out, "Serializer", serializer.iter());
            }
            ProcessorMode::Processor(config) => {
                out.push_str("Configuration : ");
                match config {
                    Some(config) => config.print(out),
                    None => out.push_str("-\n"),
                }
            }
        }
    }
}

fn non_empty(values: &Option<Vec<String>>) -> Option<&[String]> {
    values.as_deref().filter(|v| !v.is_empty())
}

fn print_component<'a>(
    out: &mut String,
    label: &str,
    configs: impl Iterator<Item = &'a ComponentConfig>,
) {
    out.push_str(&format!("    {label} : \n"));
    for config in configs {
        out.push_str("        ");
        config.print(out);
    }
}

impl fmt::Display for ProcessorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProcessorConfiguration: {{")?;
        let dims = [
            ("contentTypes", &self.content_types),
            ("resourceTypes", &self.resource_types),
            ("selectors", &self.selectors),
            ("paths", &self.paths),
            ("extensions", &self.extensions),
        ];
        for (label, values) in dims {
            if let Some(values) = values {
                write!(f, "{label}={values:?}, ")?;
            }
        }
        write!(
            f,
            "order={}, active={}, valid={}, processErrorResponse={}",
            self.order,
            self.active,
            self.is_valid(),
            self.process_error_responses
        )?;
        match &self.mode {
            ProcessorMode::Pipeline {
                generator,
                transformers,
                serializer,
            } => {
                let render = |c: &Option<ComponentConfig>| {
                    c.as_ref().map_or_else(|| "-".to_string(), |c| c.to_string())
                };
                let transformers: Vec<String> =
                    transformers.iter().map(ToString::to_string).collect();
                write!(
                    f,
                    ", pipeline=(generator={}, transformers=({}), serializer={})",
                    render(generator),
                    transformers.join(", "),
                    render(serializer)
                )?;
            }
            ProcessorMode::Processor(config) => {
                match config {
                    Some(config) => write!(f, ", config={config}")?,
                    None => write!(f, ", config=-")?,
                }
            }
        }
        write!(f, "}}")
    }
}
