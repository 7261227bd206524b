mod common;

use common::{MockUpstream, config, hapi_document, write_document};
use hdx_mcp_server::{ConfigError, Gateway, GatewayError, ServerConfig};
use hdx_openapi_tools::OpenApiToolsError;
use serde_json::json;
use std::io::Write as _;

#[test]
fn blank_api_key_is_fatal_and_names_the_key() {
    let err = ServerConfig::from_lookup(|k| (k == "HDX_API_KEY").then(|| "   ".to_string()))
        .unwrap_err();
    assert_eq!(
        err,
        ConfigError::Missing {
            key: "HDX_API_KEY".to_string()
        }
    );
}

#[tokio::test]
async fn unparseable_document_aborts_startup() -> anyhow::Result<()> {
    let mut spec = tempfile::Builder::new().suffix(".json").tempfile()?;
    spec.write_all(b"{ this is: [not json")?;
    spec.flush()?;

    let cfg = config("http://127.0.0.1:9/api/v2", &spec, &[])?;
    let err = Gateway::bootstrap(&cfg).await.unwrap_err();
    assert!(matches!(err, GatewayError::OpenApi(_)), "{err}");
    Ok(())
}

#[tokio::test]
async fn document_without_paths_aborts_startup() -> anyhow::Result<()> {
    let spec = write_document(&json!({"openapi": "3.1.0", "info": {"title": "x"}}))?;
    let cfg = config("http://127.0.0.1:9/api/v2", &spec, &[])?;
    let err = Gateway::bootstrap(&cfg).await.unwrap_err();
    assert!(matches!(
        err,
        GatewayError::OpenApi(OpenApiToolsError::InvalidSpec(_))
    ));
    Ok(())
}

#[tokio::test]
async fn document_fetch_status_is_fatal() -> anyhow::Result<()> {
    let upstream = MockUpstream::builder().spawn().await?;
    let spec = write_document(&hapi_document())?;
    let spec_url = upstream.url("/openapi.json");
    let cfg = config(
        &upstream.base_url(),
        &spec,
        &[("HDX_OPENAPI_URL", spec_url.as_str())],
    )?;

    let err = Gateway::bootstrap(&cfg).await.unwrap_err();
    assert!(matches!(
        err,
        GatewayError::OpenApi(OpenApiToolsError::SpecStatus { status: 404, .. })
    ));
    Ok(())
}

#[tokio::test]
async fn document_can_be_fetched_over_http() -> anyhow::Result<()> {
    let upstream = MockUpstream::builder()
        .route("/openapi.json", 200, hapi_document())
        .spawn()
        .await?;
    let spec = write_document(&hapi_document())?;
    let spec_url = upstream.url("/openapi.json");
    let cfg = config(
        &upstream.base_url(),
        &spec,
        &[("HDX_OPENAPI_URL", spec_url.as_str())],
    )?;

    let gw = Gateway::bootstrap(&cfg).await?;
    assert_eq!(gw.info().total_endpoints, 4);
    assert_eq!(gw.list_tools().len(), 6);
    Ok(())
}

#[tokio::test]
async fn advertised_tools_carry_domain_tags() -> anyhow::Result<()> {
    let spec = write_document(&hapi_document())?;
    let cfg = config("http://127.0.0.1:9/api/v2", &spec, &[])?;
    let gw = Gateway::bootstrap(&cfg).await?;

    let tools = gw.list_tools();
    let location = tools
        .iter()
        .find(|t| t.name == "metadata_location_get")
        .ok_or_else(|| anyhow::anyhow!("location tool missing"))?;
    let tags = location
        .meta
        .as_ref()
        .and_then(|m| m.0.get("tags"))
        .cloned()
        .unwrap_or_default();
    assert!(tags.as_array().is_some_and(|t| t.contains(&json!("hdx"))), "{tags}");
    assert!(tags.as_array().is_some_and(|t| t.contains(&json!("metadata"))), "{tags}");

    let custom = tools
        .iter()
        .find(|t| t.name == "hdx_server_info")
        .ok_or_else(|| anyhow::anyhow!("server info tool missing"))?;
    assert!(custom.meta.is_none());
    Ok(())
}

#[tokio::test]
async fn yaml_document_from_file() -> anyhow::Result<()> {
    let mut spec = tempfile::Builder::new().suffix(".yaml").tempfile()?;
    spec.write_all(
        br#"openapi: 3.0.3
info:
  title: HAPI
  version: "2"
paths:
  /api/v2/util/version:
    get:
      summary: Get the API version
"#,
    )?;
    spec.flush()?;

    let cfg = config("http://127.0.0.1:9/api/v2", &spec, &[])?;
    let gw = Gateway::bootstrap(&cfg).await?;
    assert!(gw.list_tools().iter().any(|t| t.name == "util_version_get"));
    Ok(())
}
