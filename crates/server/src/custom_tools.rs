//! Built-in tools that sit beside the document-derived ones.

use crate::gateway::{CustomTool, ToolContext};
use async_trait::async_trait;
use hdx_http_tools::{RequestOptions, json_body};
use hdx_openapi_tools::tools::annotations_for_method;
use reqwest::Method;
use rmcp::model::{JsonObject, Tool};
use serde_json::{Map, Value, json};
use std::sync::Arc;

/// Every built-in tool, in registration order.
#[must_use]
pub fn builtin() -> Vec<Arc<dyn CustomTool>> {
    vec![
        Arc::new(ServerInfoTool),
        Arc::new(DatasetInfoTool),
        Arc::new(SearchLocationsTool),
    ]
}

fn tool(name: &'static str, description: &'static str, input_schema: Value) -> Tool {
    let schema = input_schema
        .as_object()
        .cloned()
        .unwrap_or_else(JsonObject::new);
    let mut tool = Tool::new(name, description, Arc::new(schema));
    tool.annotations = Some(annotations_for_method(&Method::GET));
    tool
}

/// `hdx_server_info`: static facts about this instance. Makes no upstream call.
pub struct ServerInfoTool;

#[async_trait]
impl CustomTool for ServerInfoTool {
    fn definition(&self) -> Tool {
        tool(
            "hdx_server_info",
            "Get information about the HDX MCP server instance.",
            json!({"type": "object", "properties": {}}),
        )
    }

    async fn call(&self, ctx: &ToolContext<'_>, _args: &Map<String, Value>) -> Value {
        json!({
            "server_name": ctx.info.server_name,
            "version": ctx.info.version,
            "base_url": ctx.info.base_url,
            "total_endpoints": ctx.info.total_endpoints,
            "tool_count": ctx.info.tool_count,
            "available_tools": "Multiple tools available (see tools/list)",
            "description": "MCP server for Humanitarian Data Exchange API",
        })
    }
}

/// `hdx_get_dataset_info`: one dataset's metadata by HDX id.
pub struct DatasetInfoTool;

#[async_trait]
impl CustomTool for DatasetInfoTool {
    fn definition(&self) -> Tool {
        tool(
            "hdx_get_dataset_info",
            "Get detailed information about a specific HDX dataset.",
            json!({
                "type": "object",
                "properties": {
                    "dataset_hdx_id": {"type": "string", "description": "The HDX dataset identifier"}
                },
                "required": ["dataset_hdx_id"]
            }),
        )
    }

    async fn call(&self, ctx: &ToolContext<'_>, args: &Map<String, Value>) -> Value {
        let id = args
            .get("dataset_hdx_id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let result = match ctx
            .transport
            .get(
                "/metadata/dataset",
                RequestOptions::new().query("dataset_hdx_id", id.clone()),
            )
            .await
        {
            Ok(response) => json_body(response).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(payload) => {
                let first = payload
                    .get("data")
                    .and_then(Value::as_array)
                    .and_then(|data| data.first())
                    .cloned();
                match first {
                    Some(dataset) => json!({
                        "status": "success",
                        "dataset": dataset,
                        "dataset_hdx_id": id,
                    }),
                    None => json!({"error": "Dataset not found", "dataset_hdx_id": id}),
                }
            }
            Err(e) => {
                tracing::warn!(dataset_hdx_id = %id, error = %e, "dataset lookup failed");
                json!({
                    "error": "Failed to fetch dataset information",
                    "dataset_hdx_id": id,
                })
            }
        }
    }
}

/// `hdx_search_locations`: filter the location catalogue by name and HRP status.
pub struct SearchLocationsTool;

#[async_trait]
impl CustomTool for SearchLocationsTool {
    fn definition(&self) -> Tool {
        tool(
            "hdx_search_locations",
            "Search for locations (countries) in the HDX system.",
            json!({
                "type": "object",
                "properties": {
                    "name_pattern": {
                        "type": ["string", "null"],
                        "description": "Optional pattern to match location names"
                    },
                    "has_hrp": {
                        "type": ["boolean", "null"],
                        "description": "Optional filter for locations with Humanitarian Response Plans"
                    }
                }
            }),
        )
    }

    async fn call(&self, ctx: &ToolContext<'_>, args: &Map<String, Value>) -> Value {
        let name_pattern = args
            .get("name_pattern")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty());
        let has_hrp = args.get("has_hrp").and_then(Value::as_bool);
        let filters = json!({"name_pattern": name_pattern, "has_hrp": has_hrp});

        let mut options = RequestOptions::new();
        if let Some(name) = name_pattern {
            options = options.query("name", name);
        }
        if let Some(flag) = has_hrp {
            options = options.query("has_hrp", flag.to_string());
        }

        let result = match ctx.transport.get("/metadata/location", options).await {
            Ok(response) => json_body(response).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(payload) => {
                let locations = payload
                    .get("data")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                json!({
                    "status": "success",
                    "count": locations.len(),
                    "locations": locations,
                    "filters_applied": filters,
                })
            }
            Err(e) => {
                tracing::warn!(error = %e, "location search failed");
                json!({"error": "Failed to search locations", "filters_applied": filters})
            }
        }
    }
}
