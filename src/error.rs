//! Error types shared by the rewriting pipeline.

use thiserror::Error;

use crate::components::ComponentKind;
use crate::store::StoreError;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RewriterError>;

/// Errors that can occur while configuring or running a pipeline.
#[derive(Debug, Error)]
pub enum RewriterError {
    /// A configuration entry failed its validity check.
    #[error("invalid configuration at {path}: {reason}")]
    ConfigurationInvalid { path: String, reason: String },

    /// A required generator, transformer, serializer or processor is not registered.
    #[error("missing required {kind} component '{component_type}'")]
    ComponentResolution {
        kind: ComponentKind,
        component_type: String,
    },

    /// A component failed while handling the event stream.
    #[error("component '{component}' failed: {source}")]
    StreamingParse {
        component: String,
        #[source]
        source: Box<RewriterError>,
    },

    /// The content store could not be read.
    #[error("content store access failed at {path}: {source}")]
    StorageAccess {
        path: String,
        #[source]
        source: StoreError,
    },

    /// A caller passed an argument the operation cannot work with.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Writing to the output sink failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RewriterError {
    /// Create a component resolution error.
    pub fn missing(kind: ComponentKind, component_type: impl Into<String>) -> Self {
        Self::ComponentResolution {
            kind,
            component_type: component_type.into(),
        }
    }

    /// Wrap an error with the identity of the component that raised it.
    ///
    /// Errors that already carry a component identity are returned as-is so the
    /// innermost (offending) component is reported.
    pub fn in_component(self, component: &str) -> Self {
        match self {
            wrapped @ Self::StreamingParse { .. } => wrapped,
            other => Self::StreamingParse {
                component: component.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// Create a storage access error.
    pub fn storage(path: impl Into<String>, source: StoreError) -> Self {
        Self::StorageAccess {
            path: path.into(),
            source,
        }
    }

    /// Short label used for metrics.
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::ConfigurationInvalid { .. } => "configuration_invalid",
            Self::ComponentResolution { .. } => "component_resolution",
            Self::StreamingParse { .. } => "streaming_parse",
            Self::StorageAccess { .. } => "storage_access",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::Io(_) => "io",
        }
    }
}

impl From<RewriterError> for std::io::Error {
    fn from(err: RewriterError) -> Self {
        match err {
            RewriterError::Io(e) => e,
            other => std::io::Error::other(other),
        }
    }
}
