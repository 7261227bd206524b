//! The admission-controlled wrapper every outbound call goes through.

use crate::client::{BaseClient, RequestOptions};
use crate::error::{Result, TransportError};
use crate::limiter::RateLimiter;
use reqwest::{Method, Response};
use serde_json::Value;
use std::sync::Arc;

/// One method per HTTP verb, each admitted by the shared limiter before delegating to the owned
/// client.
///
/// Responses come back untouched. Status handling belongs to the caller; see [`json_body`].
#[derive(Debug, Clone)]
pub struct RateLimitedTransport {
    client: BaseClient,
    limiter: Arc<RateLimiter>,
}

impl RateLimitedTransport {
    #[must_use]
    pub fn new(client: BaseClient, limiter: Arc<RateLimiter>) -> Self {
        Self { client, limiter }
    }

    #[must_use]
    pub fn client(&self) -> &BaseClient {
        &self.client
    }

    #[must_use]
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Generic verb-parameterized request.
    ///
    /// Admission is accounted for when granted. The client's timeout only starts once the
    /// request is actually sent, so queueing delay never eats into it.
    ///
    /// # Errors
    ///
    /// Passes through the underlying client's errors unchanged.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<Response> {
        self.limiter.acquire().await;
        self.client.send(method, path, options).await
    }

    /// # Errors
    ///
    /// See [`RateLimitedTransport::request`].
    pub async fn get(&self, path: &str, options: RequestOptions) -> Result<Response> {
        self.request(Method::GET, path, options).await
    }

    /// # Errors
    ///
    /// See [`RateLimitedTransport::request`].
    pub async fn post(&self, path: &str, options: RequestOptions) -> Result<Response> {
        self.request(Method::POST, path, options).await
    }

    /// # Errors
    ///
    /// See [`RateLimitedTransport::request`].
    pub async fn put(&self, path: &str, options: RequestOptions) -> Result<Response> {
        self.request(Method::PUT, path, options).await
    }

    /// # Errors
    ///
    /// See [`RateLimitedTransport::request`].
    pub async fn patch(&self, path: &str, options: RequestOptions) -> Result<Response> {
        self.request(Method::PATCH, path, options).await
    }

    /// # Errors
    ///
    /// See [`RateLimitedTransport::request`].
    pub async fn delete(&self, path: &str, options: RequestOptions) -> Result<Response> {
        self.request(Method::DELETE, path, options).await
    }

    /// # Errors
    ///
    /// See [`RateLimitedTransport::request`].
    pub async fn head(&self, path: &str, options: RequestOptions) -> Result<Response> {
        self.request(Method::HEAD, path, options).await
    }

    /// # Errors
    ///
    /// See [`RateLimitedTransport::request`].
    pub async fn options(&self, path: &str, options: RequestOptions) -> Result<Response> {
        self.request(Method::OPTIONS, path, options).await
    }
}

/// Read a response as JSON, turning non-success statuses into [`TransportError::Status`].
///
/// A success body that is not JSON comes back as a JSON string; an empty body as `null`.
///
/// # Errors
///
/// Returns [`TransportError::Status`] for non-2xx responses and [`TransportError::Transport`]
/// if the body cannot be read.
pub async fn json_body(response: Response) -> Result<Value> {
    let status = response.status();
    let text = response.text().await.map_err(TransportError::from)?;

    if !status.is_success() {
        return Err(TransportError::Status {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            body: text,
        });
    }

    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
}
