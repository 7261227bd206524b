//! Build tool definitions from the transformed document.

use crate::catalog::CatalogReport;
use crate::document::{ApiSpecification, OperationRef};
use reqwest::Method;
use rmcp::model::{JsonObject, Meta, Tool, ToolAnnotations};
use serde_json::{Map, Value, json};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParamLocation {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "path" => Some(Self::Path),
            "query" => Some(Self::Query),
            "header" => Some(Self::Header),
            "cookie" => Some(Self::Cookie),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolParameter {
    pub name: String,
    pub location: ParamLocation,
    pub required: bool,
    pub schema: Value,
    pub default: Option<Value>,
}

/// What a tool dispatches to.
#[derive(Debug, Clone)]
pub struct OperationBinding {
    pub method: Method,
    pub path: String,
    pub parameters: Vec<ToolParameter>,
    /// JSON request body schema, exposed to callers as the `body` argument.
    pub request_body: Option<Value>,
    pub body_required: bool,
}

/// One callable tool. Immutable once built.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub output_schema: Option<Arc<JsonObject>>,
    pub tags: BTreeSet<String>,
    pub binding: OperationBinding,
}

impl ToolDefinition {
    /// The advertised protocol shape. Tags travel in `_meta.tags`.
    #[must_use]
    pub fn to_tool(&self) -> Tool {
        let schema_obj = self
            .input_schema
            .as_object()
            .cloned()
            .unwrap_or_else(JsonObject::new);
        let mut tool = Tool::new(self.name.clone(), self.description.clone(), Arc::new(schema_obj));
        tool.output_schema.clone_from(&self.output_schema);
        tool.annotations = Some(annotations_for_method(&self.binding.method));
        if !self.tags.is_empty() {
            let mut meta = Meta::new();
            meta.0.insert("tags".to_string(), json!(self.tags));
            tool.meta = Some(meta);
        }
        tool
    }
}

/// Tool annotations from HTTP method semantics. `openWorldHint` is always set: every tool
/// reaches the upstream API.
#[must_use]
pub fn annotations_for_method(method: &Method) -> ToolAnnotations {
    let (read_only, destructive, idempotent) = match method.as_str() {
        "GET" | "HEAD" | "OPTIONS" => (Some(true), Some(false), Some(true)),
        "POST" => (Some(false), Some(false), Some(false)),
        "PUT" | "DELETE" => (Some(false), Some(true), Some(true)),
        // PATCH may or may not be idempotent; do not guess.
        "PATCH" => (Some(false), Some(true), None),
        _ => (None, None, None),
    };
    ToolAnnotations {
        title: None,
        read_only_hint: read_only,
        destructive_hint: destructive,
        idempotent_hint: idempotent,
        open_world_hint: Some(true),
    }
}

/// Turns catalogued operations into [`ToolDefinition`]s.
#[derive(Debug, Clone, Default)]
pub struct ToolBuilder {
    hidden_parameters: Vec<String>,
}

impl ToolBuilder {
    /// Parameters with these names never appear in a tool's input schema or binding.
    #[must_use]
    pub fn hide_parameter(mut self, name: impl Into<String>) -> Self {
        self.hidden_parameters.push(name.into());
        self
    }

    #[must_use]
    pub fn build(&self, spec: &ApiSpecification, catalog: &CatalogReport) -> Vec<ToolDefinition> {
        let mut names: HashSet<String> = HashSet::new();
        let mut tools = Vec::new();

        for op in spec.operations() {
            let Some(entry) = catalog.entry(op.path, op.method) else {
                tracing::debug!(path = %op.path, method = %op.method, "operation not catalogued, skipping");
                continue;
            };
            if entry.excluded {
                tracing::debug!(path = %op.path, method = %op.method, "excluded from tools");
                continue;
            }
            let Ok(method) = Method::from_bytes(op.method.to_uppercase().as_bytes()) else {
                continue;
            };

            let name = reserve_unique_tool_name(&mut names, &entry.operation_id);
            if name != entry.operation_id {
                tracing::warn!(
                    operation_id = %entry.operation_id,
                    tool = %name,
                    path = %op.path,
                    "duplicate identifier, tool registered under a suffixed name"
                );
            }

            let parameters: Vec<ToolParameter> = merge_parameters(spec, &op)
                .into_iter()
                .filter(|p| !self.hidden_parameters.iter().any(|h| *h == p.name))
                .collect();
            let (request_body, body_required) = request_body_schema(spec, op.operation);

            let input_schema = build_input_schema(&parameters, request_body.as_ref(), body_required);
            let output_schema = derive_body_schema(op.operation).map(|s| wrap_envelope_output_schema(&s));

            tools.push(ToolDefinition {
                name,
                description: tool_description(&op),
                input_schema,
                output_schema,
                tags: entry.tags.clone(),
                binding: OperationBinding {
                    method,
                    path: op.path.to_string(),
                    parameters,
                    request_body,
                    body_required,
                },
            });
        }

        tracing::info!(count = tools.len(), "built tool definitions");
        tools
    }
}

fn tool_description(op: &OperationRef<'_>) -> String {
    match (op.summary(), op.description()) {
        (Some(s), Some(d)) if !d.trim().is_empty() && d != s => format!("{s}\n\n{d}"),
        (Some(s), _) => s.to_string(),
        (None, Some(d)) => d.to_string(),
        (None, None) => format!("Calls {} {}", op.method.to_uppercase(), op.path),
    }
}

fn reserve_unique_tool_name(tool_names: &mut HashSet<String>, base: &str) -> String {
    let base = base.to_string();
    if tool_names.insert(base.clone()) {
        return base;
    }

    let mut counter = 1;
    loop {
        let candidate = format!("{base}_{counter}");
        if tool_names.insert(candidate.clone()) {
            return candidate;
        }
        counter += 1;
    }
}

/// Follow a local `#/...` parameter reference.
fn deref_local<'a>(spec: &'a ApiSpecification, value: &'a Value) -> Option<&'a Map<String, Value>> {
    match value.get("$ref").and_then(Value::as_str) {
        Some(reference) => spec.pointer(reference.strip_prefix('#')?)?.as_object(),
        None => value.as_object(),
    }
}

fn parse_parameter(raw: &Map<String, Value>) -> Option<ToolParameter> {
    let name = raw.get("name")?.as_str()?.to_string();
    let location = ParamLocation::parse(raw.get("in")?.as_str()?)?;
    let mut schema = raw
        .get("schema")
        .cloned()
        .unwrap_or_else(|| json!({"type": "string"}));
    if let (Some(desc), Some(obj)) = (raw.get("description"), schema.as_object_mut())
        && !obj.contains_key("description")
    {
        obj.insert("description".to_string(), desc.clone());
    }
    let default = schema.get("default").cloned();
    let required = location == ParamLocation::Path
        || raw.get("required").and_then(Value::as_bool).unwrap_or(false);
    Some(ToolParameter {
        name,
        location,
        required,
        schema,
        default,
    })
}

/// Path-item parameters overridden by operation parameters with the same (location, name).
fn merge_parameters(spec: &ApiSpecification, op: &OperationRef<'_>) -> Vec<ToolParameter> {
    let mut merged: Vec<ToolParameter> = Vec::new();
    let mut index: HashMap<(ParamLocation, String), usize> = HashMap::new();

    let sources = [op.path_item.get("parameters"), op.operation.get("parameters")];
    for list in sources.into_iter().flatten().filter_map(Value::as_array) {
        for raw in list {
            let Some(param) = deref_local(spec, raw).and_then(parse_parameter) else {
                tracing::debug!(path = %op.path, "skipping unreadable parameter");
                continue;
            };
            let key = (param.location, param.name.clone());
            if let Some(i) = index.get(&key).copied() {
                merged[i] = param;
            } else {
                index.insert(key, merged.len());
                merged.push(param);
            }
        }
    }
    merged
}

fn json_media_schema(content: &Map<String, Value>) -> Option<&Value> {
    let media = content.get("application/json").or_else(|| {
        content.iter().find_map(|(k, v)| {
            let lower = k.to_ascii_lowercase();
            lower.contains("json").then_some(v)
        })
    })?;
    media.get("schema")
}

fn request_body_schema(spec: &ApiSpecification, op: &Map<String, Value>) -> (Option<Value>, bool) {
    let Some(body) = op.get("requestBody").and_then(|b| deref_local(spec, b)) else {
        return (None, false);
    };
    let required = body.get("required").and_then(Value::as_bool).unwrap_or(false);
    let schema = body
        .get("content")
        .and_then(Value::as_object)
        .and_then(json_media_schema)
        .cloned();
    (schema, required)
}

/// Lowest explicit 2xx JSON response schema, else `2XX`.
fn derive_body_schema(op: &Map<String, Value>) -> Option<Value> {
    let responses = op.get("responses")?.as_object()?;

    let explicit = responses
        .iter()
        .filter_map(|(code, resp)| {
            let n: u16 = code.parse().ok()?;
            (200..300).contains(&n).then_some((n, resp))
        })
        .min_by_key(|(n, _)| *n)
        .map(|(_, r)| r);
    let resp = explicit.or_else(|| responses.get("2XX").or_else(|| responses.get("2xx")))?;

    let schema = json_media_schema(resp.get("content")?.as_object()?)?;
    schema.is_object().then(|| schema.clone())
}

/// Build the input schema for a tool from its parameters.
fn build_input_schema(
    parameters: &[ToolParameter],
    request_body: Option<&Value>,
    body_required: bool,
) -> Value {
    let mut properties = Map::new();
    let mut required: Vec<String> = Vec::new();

    for param in parameters {
        properties.insert(param.name.clone(), param.schema.clone());
        if param.required && param.default.is_none() {
            required.push(param.name.clone());
        }
    }

    if let Some(body) = request_body {
        properties.insert("body".to_string(), body.clone());
        if body_required {
            required.push("body".to_string());
        }
    }

    let mut schema = json!({
        "type": "object",
        "properties": properties,
    });
    if !required.is_empty() {
        schema["required"] = json!(required);
    }
    schema
}

/// Output schema of the success envelope wrapping the upstream body.
fn wrap_envelope_output_schema(body_schema: &Value) -> Arc<JsonObject> {
    let wrapped = json!({
        "type": "object",
        "required": ["status", "result"],
        "properties": {
            "status": {"type": "string", "const": "success"},
            "result": body_schema.clone(),
            "count": {"type": "integer", "minimum": 0}
        }
    });
    Arc::new(wrapped.as_object().cloned().unwrap_or_else(JsonObject::new))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::OperationCatalog;

    fn build(doc: Value, hidden: &[&str]) -> Vec<ToolDefinition> {
        let spec = ApiSpecification::from_value(doc).unwrap();
        let (spec, report) = OperationCatalog::hdx().unwrap().apply(&spec);
        let builder = hidden
            .iter()
            .fold(ToolBuilder::default(), |b, h| b.hide_parameter(*h));
        builder.build(&spec, &report)
    }

    #[test]
    fn merges_path_item_parameters_and_overrides() {
        let tools = build(
            json!({
                "openapi": "3.1.0",
                "paths": {
                    "/api/v2/metadata/admin1": {
                        "parameters": [
                            {"name": "location_code", "in": "query", "schema": {"type": "string"}},
                            {"name": "limit", "in": "query", "schema": {"type": "integer"}}
                        ],
                        "get": {
                            "summary": "Admin1",
                            "parameters": [
                                {"name": "limit", "in": "query", "required": true, "schema": {"type": "integer", "maximum": 100}},
                                {"$ref": "#/components/parameters/Offset"}
                            ]
                        }
                    }
                },
                "components": {"parameters": {"Offset": {"name": "offset", "in": "query", "schema": {"type": "integer", "default": 0}}}}
            }),
            &[],
        );
        assert_eq!(tools.len(), 1);
        let t = &tools[0];
        assert_eq!(t.name, "metadata_admin1_get");
        let names: Vec<_> = t.binding.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["location_code", "limit", "offset"]);
        assert_eq!(t.input_schema["properties"]["limit"]["maximum"], 100);
        assert_eq!(t.input_schema["properties"]["offset"]["default"], 0);
        assert_eq!(t.input_schema["required"], json!(["limit"]));
    }

    #[test]
    fn hidden_parameters_never_appear() {
        let tools = build(
            json!({
                "openapi": "3.1.0",
                "paths": {
                    "/api/v2/metadata/location": {
                        "get": {
                            "parameters": [
                                {"name": "app_identifier", "in": "query", "required": true, "schema": {"type": "string"}},
                                {"name": "name", "in": "query", "schema": {"type": "string"}}
                            ]
                        }
                    }
                }
            }),
            &["app_identifier"],
        );
        let t = &tools[0];
        assert!(t.input_schema["properties"].get("app_identifier").is_none());
        assert!(t.input_schema.get("required").is_none());
        assert!(t.binding.parameters.iter().all(|p| p.name != "app_identifier"));
    }

    #[test]
    fn excluded_operations_are_not_tools() {
        let tools = build(
            json!({
                "openapi": "3.1.0",
                "paths": {
                    "/api/v2/encode_app_identifier": {"get": {"operationId": "encode"}},
                    "/api/v2/util/version": {"get": {"summary": "Version"}}
                }
            }),
            &[],
        );
        let names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["util_version_get"]);
        assert!(tools[0].tags.contains("utility"));
    }

    #[test]
    fn colliding_identifiers_get_suffixed() {
        let tools = build(
            json!({
                "openapi": "3.1.0",
                "paths": {
                    "/api/v2/climate/rainfall": {"get": {}, "post": {}}
                }
            }),
            &[],
        );
        let names: BTreeSet<_> = tools.iter().map(|t| t.name.clone()).collect();
        assert!(names.contains("climate_rainfall_get"));
        assert!(names.contains("climate_rainfall_get_1"));
    }

    #[test]
    fn output_schema_wraps_lowest_2xx_json_body() {
        let tools = build(
            json!({
                "openapi": "3.1.0",
                "paths": {
                    "/api/v2/util/version": {
                        "get": {
                            "responses": {
                                "404": {"content": {"application/json": {"schema": {"type": "string"}}}},
                                "201": {"content": {"application/problem+json": {"schema": {"type": "number"}}}},
                                "200": {"content": {"application/json": {"schema": {"type": "object"}}}}
                            }
                        }
                    }
                }
            }),
            &[],
        );
        let out = tools[0].output_schema.as_ref().unwrap();
        assert_eq!(out["properties"]["result"], json!({"type": "object"}));
        assert_eq!(out["required"], json!(["status", "result"]));
    }

    #[test]
    fn advertised_tool_carries_annotations() {
        let tools = build(
            json!({"openapi": "3.1.0", "paths": {"/api/v2/util/version": {"get": {"summary": "V"}}}}),
            &[],
        );
        let tool = tools[0].to_tool();
        let ann = tool.annotations.unwrap();
        assert_eq!(ann.read_only_hint, Some(true));
        assert_eq!(ann.open_world_hint, Some(true));
        assert_eq!(tool.description.as_deref(), Some("V"));
    }

    #[test]
    fn annotations_follow_method_semantics() {
        assert_eq!(annotations_for_method(&Method::DELETE).destructive_hint, Some(true));
        assert_eq!(annotations_for_method(&Method::POST).idempotent_hint, Some(false));
        assert_eq!(annotations_for_method(&Method::PATCH).idempotent_hint, None);
    }

    #[test]
    fn advertised_tool_carries_tags_in_meta() {
        let tools = build(
            json!({
                "openapi": "3.1.0",
                "paths": {
                    "/api/v2/metadata/location": {"get": {"summary": "Locations"}}
                }
            }),
            &[],
        );
        let tool = tools[0].to_tool();
        let tags = tool
            .meta
            .as_ref()
            .and_then(|m| m.0.get("tags"))
            .and_then(Value::as_array)
            .unwrap();
        let tags: Vec<&str> = tags.iter().filter_map(Value::as_str).collect();
        assert_eq!(tags.len(), tools[0].tags.len());
        assert!(tags.contains(&"hdx"));
        assert!(tags.contains(&"metadata"));
    }
}
