//! The request as seen by matchers and components.

/// Read-only view of the request being rewritten.
pub trait RequestContext: Send + Sync {
    /// Response content type, possibly with parameters (`text/html;charset=utf-8`).
    fn content_type(&self) -> Option<&str>;

    /// Resource path of the request.
    fn path(&self) -> &str;

    fn extension(&self) -> Option<&str>;

    /// Dot-separated selector string, e.g. `print.a4`.
    fn selector_string(&self) -> Option<&str>;

    fn resource(&self) -> Option<&dyn Resource>;

    /// Whether the response being produced is an error response.
    fn is_error_response(&self) -> bool;
}

/// The resource a request addresses.
pub trait Resource: Send + Sync {
    fn resource_type(&self) -> &str;

    /// Type check honouring the resource's type hierarchy.
    fn is_resource_type(&self, resource_type: &str) -> bool;

    /// The resource this one wraps, if it is a wrapper.
    fn wrapped(&self) -> Option<&dyn Resource> {
        None
    }
}

/// Follow wrapper links down to the innermost resource.
pub fn unwrap_resource(resource: &dyn Resource) -> &dyn Resource {
    let mut current = resource;
    while let Some(inner) = current.wrapped() {
        current = inner;
    }
    current
}

/// Plain resource description.
#[derive(Debug, Clone, Default)]
pub struct ResourceInfo {
    pub resource_type: String,
    /// Super types, nearest first.
    pub super_types: Vec<String>,
    pub wrapped: Option<Box<ResourceInfo>>,
}

impl ResourceInfo {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            ..Default::default()
        }
    }

    pub fn with_super_type(mut self, super_type: impl Into<String>) -> Self {
        self.super_types.push(super_type.into());
        self
    }

    /// Wrap `inner`, overriding its type with this one.
    pub fn wrapping(mut self, inner: ResourceInfo) -> Self {
        self.wrapped = Some(Box::new(inner));
        self
    }
}

impl Resource for ResourceInfo {
    fn resource_type(&self) -> &str {
        &self.resource_type
    }

    fn is_resource_type(&self, resource_type: &str) -> bool {
        self.resource_type == resource_type || self.super_types.iter().any(|t| t == resource_type)
    }

    fn wrapped(&self) -> Option<&dyn Resource> {
        self.wrapped.as_deref().map(|r| r as &dyn Resource)
    }
}

/// Plain request description, built field by field.
#[derive(Debug, Clone, Default)]
pub struct RequestInfo {
    pub content_type: Option<String>,
    pub path: String,
    pub extension: Option<String>,
    pub selectors: Option<String>,
    pub resource: Option<ResourceInfo>,
    pub error_response: bool,
}

impl RequestInfo {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    pub fn with_selectors(mut self, selectors: impl Into<String>) -> Self {
        self.selectors = Some(selectors.into());
        self
    }

    pub fn with_resource(mut self, resource: ResourceInfo) -> Self {
        self.resource = Some(resource);
        self
    }

    pub fn with_error_response(mut self, error_response: bool) -> Self {
        self.error_response = error_response;
        self
    }
}

impl RequestContext for RequestInfo {
    fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }

    fn selector_string(&self) -> Option<&str> {
        self.selectors.as_deref()
    }

    fn resource(&self) -> Option<&dyn Resource> {
        self.resource.as_ref().map(|r| r as &dyn Resource)
    }

    fn is_error_response(&self) -> bool {
        self.error_response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unwrap_resource() {
        let inner = ResourceInfo::new("app/page").with_super_type("foundation/page");
        let outer = ResourceInfo::new("app/override").wrapping(inner);

        assert!(!outer.is_resource_type("app/page"));
        let unwrapped = unwrap_resource(&outer);
        assert_eq!(unwrapped.resource_type(), "app/page");
        assert!(unwrapped.is_resource_type("foundation/page"));
    }
}
