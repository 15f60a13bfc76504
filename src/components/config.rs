//! Per-component configuration values.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

use super::ComponentKind;

/// Property map of a content store node.
pub type Properties = BTreeMap<String, Value>;

/// Option key that marks a declared transformer as optional.
pub const OPTIONAL_PROPERTY: &str = "component.optional";

/// Configuration of one generator, transformer, serializer or processor.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentConfig {
    kind: ComponentKind,
    component_type: String,
    options: Properties,
}

impl ComponentConfig {
    pub fn new(kind: ComponentKind, component_type: impl Into<String>, options: Properties) -> Self {
        Self {
            kind,
            component_type: component_type.into(),
            options,
        }
    }

    /// A configuration without options.
    pub fn of(kind: ComponentKind, component_type: impl Into<String>) -> Self {
        Self::new(kind, component_type, Properties::new())
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    pub fn component_type(&self) -> &str {
        &self.component_type
    }

    pub fn options(&self) -> &Properties {
        &self.options
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.options.get(key).map_or(default, |v| value_to_bool(v, default))
    }

    pub fn get_strings(&self, key: &str) -> Option<Vec<String>> {
        self.options.get(key).and_then(value_to_strings)
    }

    /// Optional transformers are skipped when their factory is missing.
    pub fn is_optional(&self) -> bool {
        self.get_bool(OPTIONAL_PROPERTY, false)
    }

    pub(crate) fn print(&self, out: &mut String) {
        out.push_str(&self.component_type);
        if !self.options.is_empty() {
            out.push_str(" : ");
            let rendered: Vec<String> = self
                .options
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            out.push_str(&rendered.join(", "));
        }
        out.push('\n');
    }
}

impl fmt::Display for ComponentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.component_type)?;
        if !self.options.is_empty() {
            let rendered: Vec<String> = self
                .options
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            write!(f, "({})", rendered.join(", "))?;
        }
        Ok(())
    }
}

/// Read a string array, accepting a single string as a one-element array.
pub fn value_to_strings(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::String(s) => Some(vec![s.clone()]),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s.clone()),
                    Value::Null => None,
                    other => Some(other.to_string()),
                })
                .collect(),
        ),
        Value::Null => None,
        other => Some(vec![other.to_string()]),
    }
}

pub fn value_to_bool(value: &Value, default: bool) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.parse().unwrap_or(default),
        _ => default,
    }
}

pub fn value_to_i64(value: &Value, default: i64) -> i64 {
    match value {
        Value::Number(n) => n.as_i64().unwrap_or(default),
        Value::String(s) => s.trim().parse().unwrap_or(default),
        _ => default,
    }
}
