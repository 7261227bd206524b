#![allow(dead_code)]

use anyhow::Context as _;
use hdx_mcp_server::{Gateway, ServerConfig};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::io::Write as _;
use tempfile::NamedTempFile;

pub use hdx_test_support::{MockUpstream, RecordedRequest, unreachable_base_url};

pub const API_KEY: &str = "test-api-key";

/// A trimmed-down HAPI document: three data paths plus the excluded identifier endpoint.
pub fn hapi_document() -> Value {
    json!({
        "openapi": "3.1.0",
        "info": {"title": "HDX HAPI", "version": "2.0.0"},
        "paths": {
            "/api/v2/metadata/location": {
                "get": {
                    "operationId": "get_locations_api_v2_metadata_location_get",
                    "summary": "Get the list of locations",
                    "parameters": [
                        {"name": "name", "in": "query", "schema": {"type": "string"}},
                        {"name": "has_hrp", "in": "query", "schema": {"anyOf": [{"type": "boolean"}, {"type": "null"}]}},
                        {"name": "app_identifier", "in": "query", "required": true, "schema": {"type": "string"}},
                        {"name": "limit", "in": "query", "schema": {"type": "integer", "minimum": 1, "maximum": 10000, "default": 10000}},
                        {"name": "offset", "in": "query", "schema": {"type": "integer", "minimum": 0, "default": 0}}
                    ],
                    "responses": {
                        "200": {"content": {"application/json": {"schema": {"$ref": "#/components/schemas/LocationPage"}}}}
                    }
                }
            },
            "/api/v2/affected-people/idps": {
                "get": {
                    "operationId": "get_idps_api_v2_affected_people_idps_get",
                    "summary": "Get internally displaced persons",
                    "parameters": [
                        {"name": "location_code", "in": "query", "schema": {"type": "string"}},
                        {"name": "gender", "in": "query", "schema": {"$ref": "#/components/schemas/Gender"}},
                        {"name": "app_identifier", "in": "query", "required": true, "schema": {"type": "string"}}
                    ]
                }
            },
            "/api/v2/metadata/dataset": {
                "get": {
                    "summary": "Get datasets",
                    "parameters": [
                        {"name": "dataset_hdx_id", "in": "query", "schema": {"type": "string"}},
                        {"name": "app_identifier", "in": "query", "required": true, "schema": {"type": "string"}}
                    ]
                }
            },
            "/api/v2/encode_app_identifier": {
                "get": {
                    "summary": "Encode an app identifier",
                    "parameters": [
                        {"name": "application", "in": "query", "required": true, "schema": {"type": "string"}},
                        {"name": "email", "in": "query", "required": true, "schema": {"type": "string"}}
                    ]
                }
            }
        },
        "components": {
            "schemas": {
                "Gender": {"type": "string", "enum": ["f", "m", "x", "u", "o", "all"]},
                "Location": {
                    "type": "object",
                    "properties": {"code": {"type": "string"}, "name": {"type": "string"}}
                },
                "LocationPage": {
                    "type": "object",
                    "properties": {"data": {"type": "array", "items": {"$ref": "#/components/schemas/Location"}}}
                }
            }
        }
    })
}

/// Write `doc` to a temporary `.json` file. Keep the handle alive for the test's duration.
pub fn write_document(doc: &Value) -> anyhow::Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .suffix(".json")
        .tempfile()
        .context("create spec file")?;
    file.write_all(doc.to_string().as_bytes())?;
    file.flush()?;
    Ok(file)
}

pub fn config(base_url: &str, spec: &NamedTempFile, extra: &[(&str, &str)]) -> anyhow::Result<ServerConfig> {
    let mut env: HashMap<String, String> = HashMap::from([
        ("HDX_API_KEY".to_string(), API_KEY.to_string()),
        ("HDX_BASE_URL".to_string(), base_url.to_string()),
        ("HDX_OPENAPI_URL".to_string(), spec.path().display().to_string()),
        ("HDX_RATE_LIMIT_REQUESTS".to_string(), "100".to_string()),
        ("HDX_RATE_LIMIT_PERIOD".to_string(), "1".to_string()),
        ("HDX_TIMEOUT".to_string(), "5".to_string()),
    ]);
    for (k, v) in extra {
        env.insert((*k).to_string(), (*v).to_string());
    }
    Ok(ServerConfig::from_lookup(|k| env.get(k).cloned())?)
}

pub async fn gateway(base_url: &str, spec: &NamedTempFile) -> anyhow::Result<Gateway> {
    gateway_with(base_url, spec, &[]).await
}

pub async fn gateway_with(
    base_url: &str,
    spec: &NamedTempFile,
    extra: &[(&str, &str)],
) -> anyhow::Result<Gateway> {
    let cfg = config(base_url, spec, extra)?;
    Ok(Gateway::bootstrap(&cfg).await?)
}

pub fn locations_page() -> Value {
    json!({"data": [
        {"code": "AFG", "name": "Afghanistan"},
        {"code": "SDN", "name": "Sudan"}
    ]})
}
