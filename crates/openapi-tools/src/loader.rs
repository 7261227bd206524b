//! Load the `OpenAPI` document once at startup, from an http(s) URL or a local file.

use crate::document::ApiSpecification;
use crate::error::{OpenApiToolsError, Result};
use hdx_http_tools::safety::{redact_url, sanitize_reqwest_error};
use reqwest::Client;
use std::path::PathBuf;
use url::Url;

/// Where the document lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecSource {
    Url(Url),
    File(PathBuf),
}

impl SpecSource {
    /// # Errors
    ///
    /// Returns [`OpenApiToolsError::Config`] for malformed http(s) or `file://` URLs.
    pub fn parse(location: &str) -> Result<Self> {
        if location.starts_with("http://") || location.starts_with("https://") {
            let url = Url::parse(location).map_err(|e| {
                OpenApiToolsError::Config(format!("Invalid OpenAPI spec URL '{location}': {e}"))
            })?;
            Ok(Self::Url(url))
        } else if location.starts_with("file://") {
            let url = Url::parse(location).map_err(|e| {
                OpenApiToolsError::Config(format!(
                    "Invalid OpenAPI spec file URL '{location}': {e}"
                ))
            })?;
            let path = url.to_file_path().map_err(|()| {
                OpenApiToolsError::Config(format!(
                    "Invalid file URL (cannot convert to path): {location}"
                ))
            })?;
            Ok(Self::File(path))
        } else {
            Ok(Self::File(PathBuf::from(location)))
        }
    }

    /// Location safe to log.
    #[must_use]
    pub fn display(&self) -> String {
        match self {
            Self::Url(u) => redact_url(u),
            Self::File(p) => p.display().to_string(),
        }
    }
}

/// Fetch (or read) and parse the document.
///
/// # Errors
///
/// Every failure here is fatal to startup: fetch/transport failures, non-success statuses,
/// unreadable files and unparseable or mis-shaped documents.
pub async fn load_specification(location: &str, client: &Client) -> Result<ApiSpecification> {
    let source = SpecSource::parse(location)?;
    let shown = source.display();

    let content = match &source {
        SpecSource::Url(url) => {
            tracing::info!(location = %shown, "fetching OpenAPI spec");
            let resp = client.get(url.clone()).send().await.map_err(|e| {
                OpenApiToolsError::SpecFetch {
                    location: shown.clone(),
                    message: sanitize_reqwest_error(&e),
                }
            })?;
            let status = resp.status();
            if !status.is_success() {
                return Err(OpenApiToolsError::SpecStatus {
                    location: shown,
                    status: status.as_u16(),
                });
            }
            resp.text()
                .await
                .map_err(|e| OpenApiToolsError::SpecReadBody {
                    location: shown.clone(),
                    message: sanitize_reqwest_error(&e),
                })?
        }
        SpecSource::File(path) => {
            tracing::info!(location = %shown, "loading OpenAPI spec from file");
            std::fs::read_to_string(path).map_err(|e| OpenApiToolsError::SpecReadFile {
                path: shown.clone(),
                source: e,
            })?
        }
    };

    let spec = ApiSpecification::parse(&content, &shown)?;
    tracing::info!(
        location = %shown,
        title = spec.title().unwrap_or("untitled"),
        paths = spec.path_count(),
        "loaded OpenAPI spec"
    );
    Ok(spec)
}
