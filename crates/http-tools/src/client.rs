//! The concrete HTTP client wrapped by the rate-limited transport.
//!
//! `reqwest::Client` carries default headers and the per-request timeout natively. Base URL and
//! default query parameters are not client-level concepts in `reqwest`, so `BaseClient` owns
//! them and applies them to every request it builds.

use crate::error::{Result, TransportError};
use crate::safety::redact_url;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, Response};
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Static HTTP configuration for the upstream API.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Absolute http(s) base URL, e.g. `https://hapi.humdata.org/api/v2`.
    pub base_url: String,
    /// Headers sent with every request.
    pub default_headers: Vec<(String, String)>,
    /// Query parameters appended to every request, ahead of per-call parameters.
    pub default_query: Vec<(String, String)>,
    /// Per-request timeout. Starts when the request is sent, not when it is queued.
    pub timeout: Duration,
}

/// Per-call request parts.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub json: Option<Value>,
}

impl RequestOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.json = Some(body);
        self
    }
}

#[derive(Debug, Clone)]
pub struct BaseClient {
    client: Client,
    base_url: Url,
    default_query: Vec<(String, String)>,
    timeout: Duration,
}

impl BaseClient {
    /// Build the client from its static configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Config`] if the base URL is not an absolute http(s) URL or
    /// carries a query or fragment, if a default header is not a valid header name/value, or if the TLS backend fails to
    /// initialize.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            TransportError::Config(format!("Invalid base URL '{}': {e}", config.base_url))
        })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(TransportError::Config(format!(
                "Invalid base URL '{}': scheme must be http or https",
                config.base_url
            )));
        }
        if base_url.query().is_some() || base_url.fragment().is_some() {
            return Err(TransportError::Config(format!(
                "Invalid base URL '{}': query and fragment are not allowed",
                config.base_url
            )));
        }

        let mut headers = HeaderMap::new();
        for (name, value) in &config.default_headers {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                TransportError::Config(format!("Invalid default header name '{name}': {e}"))
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|e| {
                TransportError::Config(format!("Invalid value for default header '{name}': {e}"))
            })?;
            headers.insert(header_name, header_value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| TransportError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            default_query: config.default_query,
            timeout: config.timeout,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn default_query(&self) -> &[(String, String)] {
        &self.default_query
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Join an API path onto the base URL.
    ///
    /// Paths that already start with the base URL's own path prefix (e.g. `/api/v2/...` against
    /// a base of `https://host/api/v2`) are joined against the origin instead. Document paths
    /// and base-relative paths both land on the same endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidUrl`] if the base URL cannot take a path.
    pub fn url_for(&self, path: &str) -> Result<Url> {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };

        let base_path = self.base_url.path().trim_end_matches('/');
        let full_path = if !base_path.is_empty()
            && (path == base_path || path.starts_with(&format!("{base_path}/")))
        {
            path
        } else {
            format!("{base_path}{path}")
        };

        if self.base_url.cannot_be_a_base() {
            return Err(TransportError::InvalidUrl(format!(
                "{} cannot carry the path {full_path}",
                self.base_url
            )));
        }
        let mut url = self.base_url.clone();
        url.set_path(&full_path);
        Ok(url)
    }

    /// Send one request. No admission control happens here.
    ///
    /// # Errors
    ///
    /// Returns an error for URL construction failures and for transport-level failures
    /// (timeouts, connection errors). Non-success statuses are returned as a normal response.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<Response> {
        let url = self.url_for(path)?;
        tracing::debug!(%method, url = %redact_url(&url), "sending upstream request");

        let mut request = self.client.request(method, url);
        if !self.default_query.is_empty() {
            request = request.query(&self.default_query);
        }
        if !options.query.is_empty() {
            request = request.query(&options.query);
        }
        for (name, value) in &options.headers {
            request = request.header(name, value);
        }
        if let Some(body) = &options.json {
            request = request.json(body);
        }

        request.send().await.map_err(TransportError::from)
    }
}
