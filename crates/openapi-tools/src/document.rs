//! The raw `OpenAPI` document the transformation passes operate on.
//!
//! The document is kept as a `serde_json::Value` rather than a typed model: the passes need to
//! preserve every key they don't understand (vendor extensions, sibling keys next to `$ref`,
//! `anyOf` metadata), and a typed model would drop them on the way through.

use crate::error::{OpenApiToolsError, Result};
use serde_json::{Map, Value};

/// Operation keys a path item may carry.
pub const HTTP_METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

const SCHEMAS_POINTER: &str = "/components/schemas";

#[derive(Debug, Clone, PartialEq)]
pub struct ApiSpecification {
    document: Value,
}

/// Borrowed view of one (path, method) operation.
#[derive(Debug, Clone, Copy)]
pub struct OperationRef<'a> {
    pub path: &'a str,
    pub method: &'a str,
    pub path_item: &'a Map<String, Value>,
    pub operation: &'a Map<String, Value>,
}

impl OperationRef<'_> {
    #[must_use]
    pub fn operation_id(&self) -> Option<&str> {
        self.operation.get("operationId").and_then(Value::as_str)
    }

    #[must_use]
    pub fn summary(&self) -> Option<&str> {
        self.operation.get("summary").and_then(Value::as_str)
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.operation.get("description").and_then(Value::as_str)
    }
}

impl ApiSpecification {
    /// Wrap a parsed document.
    ///
    /// # Errors
    ///
    /// Returns [`OpenApiToolsError::InvalidSpec`] if the root is not an object or `paths` is
    /// missing or not an object.
    pub fn from_value(document: Value) -> Result<Self> {
        let Some(root) = document.as_object() else {
            return Err(OpenApiToolsError::InvalidSpec(
                "document root must be an object".to_string(),
            ));
        };
        match root.get("paths") {
            Some(Value::Object(_)) => {}
            Some(_) => {
                return Err(OpenApiToolsError::InvalidSpec(
                    "'paths' must be an object".to_string(),
                ));
            }
            None => {
                return Err(OpenApiToolsError::InvalidSpec(
                    "missing 'paths'".to_string(),
                ));
            }
        }
        if let Some(version) = root.get("openapi").and_then(Value::as_str)
            && !version.starts_with("3.")
        {
            tracing::warn!(version = %version, "unexpected OpenAPI version, continuing");
        }
        Ok(Self { document })
    }

    /// Parse JSON, falling back to YAML.
    ///
    /// # Errors
    ///
    /// Returns [`OpenApiToolsError::SpecParse`] if the content is neither, or the errors of
    /// [`ApiSpecification::from_value`].
    pub fn parse(content: &str, location: &str) -> Result<Self> {
        let value: Value = match serde_json::from_str(content) {
            Ok(v) => v,
            Err(json_err) => serde_yaml::from_str(content).map_err(|yaml_err| {
                OpenApiToolsError::SpecParse {
                    location: location.to_string(),
                    message: format!("not JSON ({json_err}) and not YAML ({yaml_err})"),
                }
            })?,
        };
        Self::from_value(value)
    }

    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.document
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        self.document
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.document.pointer("/info/title").and_then(Value::as_str)
    }

    #[must_use]
    pub fn paths(&self) -> Option<&Map<String, Value>> {
        self.document.get("paths").and_then(Value::as_object)
    }

    #[must_use]
    pub fn path_count(&self) -> usize {
        self.paths().map_or(0, Map::len)
    }

    /// Named reusable schemas (`components.schemas`).
    #[must_use]
    pub fn schemas(&self) -> Option<&Map<String, Value>> {
        self.document.pointer(SCHEMAS_POINTER).and_then(Value::as_object)
    }

    pub(crate) fn schemas_mut(&mut self) -> Option<&mut Map<String, Value>> {
        self.document
            .pointer_mut(SCHEMAS_POINTER)
            .and_then(Value::as_object_mut)
    }

    /// Look up a local JSON pointer such as `/components/parameters/Limit`.
    #[must_use]
    pub fn pointer(&self, pointer: &str) -> Option<&Value> {
        self.document.pointer(pointer)
    }

    /// All operations in document order.
    #[must_use]
    pub fn operations(&self) -> Vec<OperationRef<'_>> {
        let Some(paths) = self.paths() else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for (path, item) in paths {
            let Some(path_item) = item.as_object() else {
                continue;
            };
            for (method, op) in path_item {
                if !HTTP_METHODS.contains(&method.as_str()) {
                    continue;
                }
                if let Some(operation) = op.as_object() {
                    out.push(OperationRef {
                        path,
                        method,
                        path_item,
                        operation,
                    });
                }
            }
        }
        out
    }

    #[must_use]
    pub fn operation(&self, path: &str, method: &str) -> Option<&Map<String, Value>> {
        self.paths()?
            .get(path)?
            .as_object()?
            .get(method)?
            .as_object()
    }

    /// Visit every operation mutably. The path item itself is not reachable from the callback.
    pub(crate) fn for_each_operation_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(&str, &str, &mut Map<String, Value>),
    {
        let Some(paths) = self.document.get_mut("paths").and_then(Value::as_object_mut) else {
            return;
        };
        for (path, item) in paths.iter_mut() {
            let Some(path_item) = item.as_object_mut() else {
                continue;
            };
            for (method, op) in path_item.iter_mut() {
                if !HTTP_METHODS.contains(&method.as_str()) {
                    continue;
                }
                if let Some(operation) = op.as_object_mut() {
                    f(path, method, operation);
                }
            }
        }
    }

    /// Visit every path item mutably.
    pub(crate) fn for_each_path_item_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(&str, &mut Map<String, Value>),
    {
        let Some(paths) = self.document.get_mut("paths").and_then(Value::as_object_mut) else {
            return;
        };
        for (path, item) in paths.iter_mut() {
            if let Some(path_item) = item.as_object_mut() {
                f(path, path_item);
            }
        }
    }
}
