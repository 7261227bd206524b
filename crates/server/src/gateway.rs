//! Tool registry and dispatch.
//!
//! The [`Gateway`] owns the one [`RateLimitedTransport`] every tool shares. A call never fails
//! from the caller's point of view: success becomes
//! `{"status": "success", "result": …, "count": …}` and any failure becomes
//! `{"error": …, "filters_applied": {…}}`.

use crate::config::ServerConfig;
use crate::custom_tools;
use crate::error::{GatewayError, Result};
use crate::identity::{self, IDENTITY_PARAMETER};
use crate::validation::validate_arguments;
use async_trait::async_trait;
use hdx_http_tools::{
    BaseClient, RateLimitedTransport, RateLimiter, RequestOptions, TransportError, json_body,
};
use hdx_openapi_tools::loader::load_specification;
use hdx_openapi_tools::tools::{OperationBinding, ParamLocation};
use hdx_openapi_tools::{ToolDefinition, TransformPipeline};
use rmcp::model::{CallToolResult, Content, Tool};
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::Arc;

pub const SERVER_NAME: &str = "HDX MCP Server";

/// Facts about this server instance, shared with custom tools.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    pub server_name: String,
    pub version: String,
    pub base_url: String,
    /// Number of paths in the upstream document.
    pub total_endpoints: usize,
    pub tool_count: usize,
}

/// What a custom tool may use while handling a call.
pub struct ToolContext<'a> {
    pub transport: &'a RateLimitedTransport,
    pub info: &'a ServerInfo,
}

/// A hand-written tool registered beside the document-derived ones.
///
/// Handlers return a JSON envelope and never fail; upstream errors are folded into the value.
#[async_trait]
pub trait CustomTool: Send + Sync {
    fn definition(&self) -> Tool;

    async fn call(&self, ctx: &ToolContext<'_>, args: &Map<String, Value>) -> Value;
}

enum Registered {
    Spec(ToolDefinition),
    Custom {
        tool: Tool,
        handler: Arc<dyn CustomTool>,
    },
}

impl Registered {
    fn tool(&self) -> Tool {
        match self {
            Self::Spec(def) => def.to_tool(),
            Self::Custom { tool, .. } => tool.clone(),
        }
    }

    fn input_schema(&self) -> Value {
        match self {
            Self::Spec(def) => def.input_schema.clone(),
            Self::Custom { tool, .. } => Value::Object((*tool.input_schema).clone()),
        }
    }

    fn has_output_schema(&self) -> bool {
        match self {
            Self::Spec(def) => def.output_schema.is_some(),
            Self::Custom { tool, .. } => tool.output_schema.is_some(),
        }
    }
}

pub struct Gateway {
    transport: RateLimitedTransport,
    info: ServerInfo,
    tools: Vec<Registered>,
    index: HashMap<String, usize>,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("info", &self.info)
            .field("tools", &self.index.len())
            .finish_non_exhaustive()
    }
}

impl Gateway {
    /// Register document-derived tools followed by custom tools.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::DuplicateTool`] if two tools share a name.
    pub fn new(
        transport: RateLimitedTransport,
        spec_tools: Vec<ToolDefinition>,
        custom: Vec<Arc<dyn CustomTool>>,
        total_endpoints: usize,
    ) -> Result<Self> {
        let mut tools: Vec<Registered> = Vec::with_capacity(spec_tools.len() + custom.len());
        let mut index = HashMap::new();

        let entries = spec_tools
            .into_iter()
            .map(Registered::Spec)
            .chain(custom.into_iter().map(|handler| Registered::Custom {
                tool: handler.definition(),
                handler,
            }));
        for entry in entries {
            let name = entry.tool().name.to_string();
            if index.insert(name.clone(), tools.len()).is_some() {
                return Err(GatewayError::DuplicateTool(name));
            }
            tools.push(entry);
        }

        let info = ServerInfo {
            server_name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            base_url: transport.client().base_url().to_string(),
            total_endpoints,
            tool_count: tools.len(),
        };
        tracing::info!(tools = tools.len(), "tools registered");

        Ok(Self {
            transport,
            info,
            tools,
            index,
        })
    }

    /// Load the upstream document, run the transformation pipeline, and register every tool.
    ///
    /// # Errors
    ///
    /// Returns an error if the limiter or client configuration is invalid, the document
    /// cannot be loaded, or tool names collide.
    pub async fn bootstrap(config: &ServerConfig) -> Result<Self> {
        let limiter = Arc::new(RateLimiter::new(
            config.rate_limit_requests,
            config.rate_limit_period,
        )?);
        let client = BaseClient::new(identity::client_config(config))?;
        let transport = RateLimitedTransport::new(client, limiter);

        let fetcher = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(TransportError::from)?;
        let spec = load_specification(&config.openapi_url, &fetcher).await?;

        let pipeline = TransformPipeline::hdx(config.max_ref_depth, &[IDENTITY_PARAMETER])?;
        let output = pipeline.run(&spec);
        tracing::info!(
            paths = spec.path_count(),
            diagnostics = output.resolution.diagnostics.len(),
            renamed = output.catalog.renamed,
            annotated = output.operations_annotated,
            "specification transformed"
        );

        Self::new(
            transport,
            output.tools,
            custom_tools::builtin(),
            spec.path_count(),
        )
    }

    #[must_use]
    pub fn info(&self) -> &ServerInfo {
        &self.info
    }

    #[must_use]
    pub fn transport(&self) -> &RateLimitedTransport {
        &self.transport
    }

    /// The advertised tool surface, in registration order.
    #[must_use]
    pub fn list_tools(&self) -> Vec<Tool> {
        self.tools.iter().map(Registered::tool).collect()
    }

    /// Invoke a tool and return its JSON envelope.
    pub async fn call_tool(&self, name: &str, args: Value) -> Value {
        let mut args = match args {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return error_envelope(
                    format!("arguments must be a JSON object, got {}", json_type(&other)),
                    &Map::new(),
                );
            }
        };
        // The identity is attached by the client; a caller-supplied one is never forwarded.
        if args.remove(IDENTITY_PARAMETER).is_some() {
            tracing::debug!(tool = %name, "dropped caller-supplied identity parameter");
        }

        let Some(entry) = self.index.get(name).and_then(|i| self.tools.get(*i)) else {
            return error_envelope(format!("Unknown tool '{name}'"), &args);
        };

        let as_value = Value::Object(args.clone());
        if let Err(rejection) = validate_arguments(&entry.input_schema(), &as_value) {
            tracing::warn!(tool = %name, error = %rejection.message, "rejected tool arguments");
            let mut envelope = error_envelope(rejection.message, &args);
            envelope["violations"] = Value::Array(rejection.violations);
            return envelope;
        }

        match entry {
            Registered::Spec(def) => self.dispatch(def, &args).await,
            Registered::Custom { handler, .. } => {
                let ctx = ToolContext {
                    transport: &self.transport,
                    info: &self.info,
                };
                handler.call(&ctx, &args).await
            }
        }
    }

    /// [`Gateway::call_tool`] framed as a protocol tool result.
    pub async fn call_tool_result(&self, name: &str, args: Value) -> CallToolResult {
        let envelope = self.call_tool(name, args).await;
        let is_error = envelope.get("error").is_some();
        let structured = !is_error
            && self
                .index
                .get(name)
                .and_then(|i| self.tools.get(*i))
                .is_some_and(Registered::has_output_schema);

        CallToolResult {
            content: vec![Content::text(envelope.to_string())],
            structured_content: structured.then_some(envelope),
            is_error: Some(is_error),
            meta: None,
        }
    }

    async fn dispatch(&self, def: &ToolDefinition, args: &Map<String, Value>) -> Value {
        let (path, options) = match build_request(&def.binding, args) {
            Ok(parts) => parts,
            Err(message) => return error_envelope(message, args),
        };

        let result = match self
            .transport
            .request(def.binding.method.clone(), &path, options)
            .await
        {
            Ok(response) => json_body(response).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(payload) => success_envelope(payload),
            Err(e) => {
                tracing::warn!(tool = %def.name, error = %e, "tool call failed");
                error_envelope(e.to_string(), args)
            }
        }
    }
}

/// `{"status": "success", "result": payload}` plus `count` for list-shaped payloads.
#[must_use]
pub fn success_envelope(payload: Value) -> Value {
    let count = match &payload {
        Value::Array(items) => Some(items.len()),
        Value::Object(obj) => obj.get("data").and_then(Value::as_array).map(Vec::len),
        _ => None,
    };
    let mut envelope = json!({"status": "success", "result": payload});
    if let Some(count) = count {
        envelope["count"] = json!(count);
    }
    envelope
}

#[must_use]
pub fn error_envelope(message: impl Into<String>, filters: &Map<String, Value>) -> Value {
    json!({
        "error": message.into(),
        "filters_applied": filters,
    })
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Turn validated arguments into a path and request options.
///
/// Absent arguments fall back to the parameter's schema default, so defaults such as
/// `limit = 10` reach the upstream even when the caller omits them.
fn build_request(
    binding: &OperationBinding,
    args: &Map<String, Value>,
) -> std::result::Result<(String, RequestOptions), String> {
    let mut path = binding.path.clone();
    let mut options = RequestOptions::new();

    for param in &binding.parameters {
        let value = args
            .get(&param.name)
            .or(param.default.as_ref())
            .filter(|v| !v.is_null());

        match param.location {
            ParamLocation::Path => {
                let Some(value) = value else {
                    return Err(format!("missing path parameter '{}'", param.name));
                };
                path = path.replace(
                    &format!("{{{}}}", param.name),
                    &encode_path_segment(&value_to_string(value)),
                );
            }
            ParamLocation::Query => match value {
                Some(Value::Array(items)) => {
                    for item in items.iter().filter(|v| !v.is_null()) {
                        options = options.query(param.name.clone(), value_to_string(item));
                    }
                }
                Some(value) => options = options.query(param.name.clone(), value_to_string(value)),
                None => {}
            },
            ParamLocation::Header => {
                if let Some(value) = value {
                    options = options.header(param.name.clone(), value_to_string(value));
                }
            }
            ParamLocation::Cookie => {
                if value.is_some() {
                    tracing::debug!(parameter = %param.name, "cookie parameters are not forwarded");
                }
            }
        }
    }

    if binding.request_body.is_some()
        && let Some(body) = args.get("body")
    {
        options = options.json(body.clone());
    }

    Ok((path, options))
}

/// Percent-encode everything outside the RFC 3986 unreserved set.
fn encode_path_segment(s: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = String::with_capacity(s.len());
    for &b in s.as_bytes() {
        if is_unreserved(b) {
            out.push(b as char);
        } else {
            out.push('%');
            out.push(HEX[(b >> 4) as usize] as char);
            out.push(HEX[(b & 0x0F) as usize] as char);
        }
    }
    out
}

fn is_unreserved(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~')
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => value.to_string(),
    }
}
