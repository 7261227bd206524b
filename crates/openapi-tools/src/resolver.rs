//! Inline `#/components/schemas/...` references into self-contained schema trees.
//!
//! Every parameter schema, request-body schema and response-body schema is rewritten so that
//! downstream consumers (tool input/output schemas, argument validation) never need the
//! `components` section.
//!
//! - A `$ref` is replaced by a deep copy of its target. Sibling keys written next to the `$ref`
//!   win over the same keys in the target.
//! - `anyOf` / `oneOf` / `allOf` stay composites; each branch is resolved on its own so enum
//!   variants remain visible.
//! - The depth bound counts reference substitutions along one chain. Past the bound the node is
//!   left as-is and a diagnostic is recorded, which is what stops self-referencing schemas.
//! - Missing or non-local targets are left in place and reported, never fatal.

use crate::document::ApiSpecification;
use serde_json::{Map, Value, json};
use std::fmt;

pub const DEFAULT_MAX_DEPTH: usize = 10;

const SCHEMA_REF_PREFIX: &str = "#/components/schemas/";
const PARAMETER_REF_PREFIX: &str = "#/components/parameters/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    DepthExceeded,
    MissingTarget,
    /// Not a `#/components/schemas/` (or, for parameters, `#/components/parameters/`) reference,
    /// or the target is not a schema object.
    Unsupported,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::DepthExceeded => "max reference depth exceeded",
            Self::MissingTarget => "reference target not found",
            Self::Unsupported => "unsupported reference",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionDiagnostic {
    /// e.g. `GET /api/v2/metadata/location parameter 'limit'`
    pub location: String,
    pub reference: String,
    pub kind: DiagnosticKind,
}

#[derive(Debug, Clone, Default)]
pub struct ResolutionReport {
    pub schemas_processed: usize,
    pub defaults_applied: usize,
    pub diagnostics: Vec<ResolutionDiagnostic>,
}

#[derive(Debug, Clone)]
pub struct SchemaResolver {
    max_depth: usize,
    parameter_defaults: Vec<(String, Value)>,
}

impl Default for SchemaResolver {
    /// Depth bound of 10 and the anti-over-fetch defaults for the HDX API.
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            parameter_defaults: vec![
                ("limit".to_string(), json!(10)),
                ("age_range".to_string(), json!("all")),
                ("gender".to_string(), json!("all")),
            ],
        }
    }
}

struct Context<'a> {
    definitions: &'a Map<String, Value>,
    location: &'a str,
    diagnostics: &'a mut Vec<ResolutionDiagnostic>,
}

impl Context<'_> {
    fn flag(&mut self, reference: &str, kind: DiagnosticKind) {
        tracing::warn!(
            location = %self.location,
            reference = %reference,
            "schema resolution: {kind}, leaving node unresolved"
        );
        self.diagnostics.push(ResolutionDiagnostic {
            location: self.location.to_string(),
            reference: reference.to_string(),
            kind,
        });
    }
}

impl SchemaResolver {
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Resolve a single schema tree against `definitions`.
    #[must_use]
    pub fn resolve_schema(
        &self,
        schema: &Value,
        definitions: &Map<String, Value>,
        location: &str,
        diagnostics: &mut Vec<ResolutionDiagnostic>,
    ) -> Value {
        let mut ctx = Context {
            definitions,
            location,
            diagnostics,
        };
        self.resolve_node(schema, 0, &mut ctx)
    }

    fn resolve_node(&self, node: &Value, depth: usize, ctx: &mut Context<'_>) -> Value {
        match node {
            Value::Object(obj) => {
                if let Some(reference) = obj.get("$ref").and_then(Value::as_str) {
                    return self.substitute(obj, reference, depth, ctx);
                }
                // Composites fall through here too: branches are array items, resolved
                // independently and kept under the same key.
                let resolved = obj
                    .iter()
                    .map(|(k, v)| (k.clone(), self.resolve_node(v, depth, ctx)))
                    .collect();
                Value::Object(resolved)
            }
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.resolve_node(item, depth, ctx))
                    .collect(),
            ),
            _ => node.clone(),
        }
    }

    fn substitute(
        &self,
        obj: &Map<String, Value>,
        reference: &str,
        depth: usize,
        ctx: &mut Context<'_>,
    ) -> Value {
        if depth >= self.max_depth {
            ctx.flag(reference, DiagnosticKind::DepthExceeded);
            return Value::Object(obj.clone());
        }

        let Some(name) = reference.strip_prefix(SCHEMA_REF_PREFIX) else {
            ctx.flag(reference, DiagnosticKind::Unsupported);
            return Value::Object(obj.clone());
        };
        let name = unescape_pointer_token(name);

        let target = match ctx.definitions.get(&name) {
            Some(Value::Object(target)) => target,
            Some(_) => {
                ctx.flag(reference, DiagnosticKind::Unsupported);
                return Value::Object(obj.clone());
            }
            None => {
                ctx.flag(reference, DiagnosticKind::MissingTarget);
                return Value::Object(obj.clone());
            }
        };

        let mut inline = target.clone();
        for (k, v) in obj {
            if k != "$ref" {
                inline.insert(k.clone(), v.clone());
            }
        }
        if inline.contains_key("enum") {
            tracing::debug!(schema = %name, "inlined enum schema");
        }

        self.resolve_node(&Value::Object(inline), depth + 1, ctx)
    }

    /// Resolve every parameter, request-body and response-body schema in the document.
    ///
    /// Named parameter defaults are written before resolution, so they land as sibling keys
    /// and survive the merge with the referenced definition.
    #[must_use]
    pub fn resolve_specification(
        &self,
        spec: &ApiSpecification,
    ) -> (ApiSpecification, ResolutionReport) {
        let definitions = spec.schemas().cloned().unwrap_or_default();
        let shared_params = spec
            .pointer("/components/parameters")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let mut out = spec.clone();
        let mut report = ResolutionReport::default();

        out.for_each_path_item_mut(|path, item| {
            if let Some(Value::Array(params)) = item.get_mut("parameters") {
                let location = format!("{path} (path item)");
                self.resolve_parameters(params, &definitions, &shared_params, &location, &mut report);
            }
        });

        out.for_each_operation_mut(|path, method, op| {
            let location = format!("{} {path}", method.to_uppercase());

            if let Some(Value::Array(params)) = op.get_mut("parameters") {
                self.resolve_parameters(params, &definitions, &shared_params, &location, &mut report);
            }

            if let Some(Value::Object(responses)) = op.get_mut("responses") {
                for (code, response) in responses.iter_mut() {
                    let loc = format!("{location} response {code}");
                    self.resolve_content(response, &definitions, &loc, &mut report);
                }
            }

            if let Some(body) = op.get_mut("requestBody") {
                let loc = format!("{location} request body");
                self.resolve_content(body, &definitions, &loc, &mut report);
            }
        });

        tracing::info!(
            schemas = report.schemas_processed,
            defaults = report.defaults_applied,
            unresolved = report.diagnostics.len(),
            "resolved schema references inline"
        );
        (out, report)
    }

    fn resolve_parameters(
        &self,
        params: &mut [Value],
        definitions: &Map<String, Value>,
        shared_params: &Map<String, Value>,
        location: &str,
        report: &mut ResolutionReport,
    ) {
        for param in params.iter_mut() {
            if let Some(inline) = inline_parameter(param, shared_params, location, report) {
                *param = inline;
            }
            let Some(param) = param.as_object_mut() else {
                continue;
            };
            let name = param
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string();
            let Some(schema) = param.get_mut("schema") else {
                continue;
            };

            if let Some((_, default)) = self.parameter_defaults.iter().find(|(n, _)| *n == name)
                && let Some(schema_obj) = schema.as_object_mut()
            {
                schema_obj.insert("default".to_string(), default.clone());
                report.defaults_applied += 1;
                tracing::debug!(location = %location, parameter = %name, default = %default, "overrode parameter default");
            }

            let loc = format!("{location} parameter '{name}'");
            *schema = self.resolve_schema(schema, definitions, &loc, &mut report.diagnostics);
            report.schemas_processed += 1;
        }
    }

    fn resolve_content(
        &self,
        holder: &mut Value,
        definitions: &Map<String, Value>,
        location: &str,
        report: &mut ResolutionReport,
    ) {
        let Some(Value::Object(content)) = holder.get_mut("content") else {
            return;
        };
        for (media_type, media) in content.iter_mut() {
            let Some(schema) = media.get_mut("schema") else {
                continue;
            };
            let loc = format!("{location} {media_type}");
            *schema = self.resolve_schema(schema, definitions, &loc, &mut report.diagnostics);
            report.schemas_processed += 1;
        }
    }
}

/// Replace a `#/components/parameters/` reference with a copy of its target, sibling keys
/// winning. `None` leaves the parameter as it is.
fn inline_parameter(
    param: &Value,
    shared_params: &Map<String, Value>,
    location: &str,
    report: &mut ResolutionReport,
) -> Option<Value> {
    let obj = param.as_object()?;
    let reference = obj.get("$ref")?.as_str()?;
    let flag = |report: &mut ResolutionReport, kind: DiagnosticKind| {
        tracing::warn!(
            location = %location,
            reference = %reference,
            "parameter resolution: {kind}, leaving parameter unresolved"
        );
        report.diagnostics.push(ResolutionDiagnostic {
            location: format!("{location} parameter"),
            reference: reference.to_string(),
            kind,
        });
    };

    let Some(name) = reference.strip_prefix(PARAMETER_REF_PREFIX) else {
        flag(report, DiagnosticKind::Unsupported);
        return None;
    };
    let Some(Value::Object(target)) = shared_params.get(&unescape_pointer_token(name)) else {
        flag(report, DiagnosticKind::MissingTarget);
        return None;
    };

    let mut inline = target.clone();
    for (k, v) in obj {
        if k != "$ref" {
            inline.insert(k.clone(), v.clone());
        }
    }
    Some(Value::Object(inline))
}

/// RFC 6901 token unescaping.
fn unescape_pointer_token(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

/// Whether any `$ref` remains anywhere under `value`.
#[must_use]
pub fn contains_reference(value: &Value) -> bool {
    match value {
        Value::Object(obj) => obj.contains_key("$ref") || obj.values().any(contains_reference),
        Value::Array(items) => items.iter().any(contains_reference),
        _ => false,
    }
}
