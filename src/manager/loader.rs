//! Reading a [`ProcessorConfig`] from a content store node.

use crate::components::config::{value_to_bool, value_to_i64, value_to_strings};
use crate::components::{ComponentConfig, ComponentKind, Properties};
use crate::matcher::{ProcessorConfig, ProcessorMode};
use crate::store::{join, ContentStore, StoreError};

pub const PROPERTY_CONTENT_TYPES: &str = "contentTypes";
pub const PROPERTY_PATHS: &str = "paths";
pub const PROPERTY_EXTENSIONS: &str = "extensions";
pub const PROPERTY_RESOURCE_TYPES: &str = "resourceTypes";
pub const PROPERTY_UNWRAP_RESOURCES: &str = "unwrapResources";
pub const PROPERTY_SELECTORS: &str = "selectors";
pub const PROPERTY_ORDER: &str = "order";
pub const PROPERTY_ACTIVE: &str = "enabled";
pub const PROPERTY_PROCESS_ERROR: &str = "processError";
pub const PROPERTY_PROCESSOR_TYPE: &str = "processorType";
pub const PROPERTY_GENERATOR: &str = "generatorType";
pub const PROPERTY_TRANSFORMERS: &str = "transformerTypes";
pub const PROPERTY_SERIALIZER: &str = "serializerType";

fn strings(props: &Properties, key: &str) -> Option<Vec<String>> {
    props.get(key).and_then(value_to_strings)
}

/// Load the configuration stored at `path`; `None` if the node is gone.
pub fn load_processor_config(
    store: &dyn ContentStore,
    path: &str,
) -> Result<Option<ProcessorConfig>, StoreError> {
    let Some(props) = store.properties(path)? else {
        return Ok(None);
    };

    let components = |key: &str, kind: ComponentKind| component_configs(store, path, &props, key, kind);
    let processor = components(PROPERTY_PROCESSOR_TYPE, ComponentKind::Processor)?;

    let mode = match processor {
        Some(mut processors) if !processors.is_empty() => {
            ProcessorMode::Processor(Some(processors.swap_remove(0)))
        }
        _ => ProcessorMode::Pipeline {
            generator: first(components(PROPERTY_GENERATOR, ComponentKind::Generator)?),
            transformers: components(PROPERTY_TRANSFORMERS, ComponentKind::Transformer)?
                .unwrap_or_default(),
            serializer: first(components(PROPERTY_SERIALIZER, ComponentKind::Serializer)?),
        },
    };

    let flag = |key: &str, default: bool| props.get(key).map_or(default, |v| value_to_bool(v, default));

    Ok(Some(
        ProcessorConfig::default()
            .with_mode(mode)
            .with_content_types(strings(&props, PROPERTY_CONTENT_TYPES))
            .with_paths(strings(&props, PROPERTY_PATHS))
            .with_extensions(strings(&props, PROPERTY_EXTENSIONS))
            .with_resource_types(strings(&props, PROPERTY_RESOURCE_TYPES))
            .with_unwrap_resources(flag(PROPERTY_UNWRAP_RESOURCES, false))
            .with_selectors(strings(&props, PROPERTY_SELECTORS))
            .with_order(props.get(PROPERTY_ORDER).map_or(0, |v| value_to_i64(v, 0)))
            .with_active(flag(PROPERTY_ACTIVE, true))
            .with_process_error_responses(flag(PROPERTY_PROCESS_ERROR, true)),
    ))
}

fn first(configs: Option<Vec<ComponentConfig>>) -> Option<ComponentConfig> {
    configs.and_then(|c| c.into_iter().next())
}

/// Component configs for the types listed under `key`.
///
/// Options come from the child node `{prefix}-{type}`, or `{prefix}-{n}`
/// (1-based position) so one type can appear twice with different options.
fn component_configs(
    store: &dyn ContentStore,
    path: &str,
    props: &Properties,
    key: &str,
    kind: ComponentKind,
) -> Result<Option<Vec<ComponentConfig>>, StoreError> {
    let Some(types) = strings(props, key) else {
        return Ok(None);
    };
    if types.is_empty() {
        return Ok(None);
    }

    let mut configs = Vec::with_capacity(types.len());
    for (index, component_type) in types.into_iter().enumerate() {
        let by_type = join(path, &format!("{}-{}", kind.prefix(), component_type));
        let options = match store.properties(&by_type)? {
            Some(options) => options,
            None => {
                let by_index = join(path, &format!("{}-{}", kind.prefix(), index + 1));
                store.properties(&by_index)?.unwrap_or_default()
            }
        };
        configs.push(ComponentConfig::new(kind, component_type, options));
    }
    Ok(Some(configs))
}
