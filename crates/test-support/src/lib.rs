use anyhow::Context as _;
use axum::Router;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use std::collections::HashMap;
use std::net::{SocketAddr, TcpListener};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

/// Pick an unused TCP port on localhost.
///
/// Note: this does not reserve the port; it's still possible for another process to bind it
/// before you do.
///
/// # Errors
///
/// Returns an error if binding an ephemeral localhost port fails or if the bound socket's
/// local address cannot be read.
pub fn pick_unused_port() -> anyhow::Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0").context("bind ephemeral port")?;
    Ok(listener.local_addr()?.port())
}

/// A base URL nothing listens on, for connection-failure tests.
///
/// # Errors
///
/// See [`pick_unused_port`].
pub fn unreachable_base_url() -> anyhow::Result<String> {
    Ok(format!("http://127.0.0.1:{}/api/v2", pick_unused_port()?))
}

/// One request as the mock upstream saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl RecordedRequest {
    #[must_use]
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

#[derive(Debug, Clone)]
struct CannedResponse {
    status: u16,
    body: Value,
    delay: Duration,
}

#[derive(Default)]
struct Shared {
    routes: HashMap<String, CannedResponse>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// Builder for a [`MockUpstream`]. Routes match on the exact request path; unmatched paths
/// answer 404.
#[derive(Default)]
pub struct MockUpstreamBuilder {
    routes: HashMap<String, CannedResponse>,
}

impl MockUpstreamBuilder {
    #[must_use]
    pub fn route(self, path: &str, status: u16, body: Value) -> Self {
        self.delayed_route(path, status, body, Duration::ZERO)
    }

    #[must_use]
    pub fn delayed_route(mut self, path: &str, status: u16, body: Value, delay: Duration) -> Self {
        self.routes.insert(
            path.to_string(),
            CannedResponse {
                status,
                body,
                delay,
            },
        );
        self
    }

    /// Bind to an ephemeral localhost port and start serving.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn spawn(self) -> anyhow::Result<MockUpstream> {
        let shared = Arc::new(Shared {
            routes: self.routes,
            requests: Mutex::new(Vec::new()),
        });
        let app = Router::new()
            .fallback(record_and_respond)
            .with_state(shared.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("bind mock upstream")?;
        let addr = listener.local_addr()?;
        let (tx, rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = rx.await;
                })
                .await;
        });

        Ok(MockUpstream {
            addr,
            shared,
            shutdown: Some(tx),
        })
    }
}

/// Local HTTP server standing in for the upstream API.
pub struct MockUpstream {
    addr: SocketAddr,
    shared: Arc<Shared>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl MockUpstream {
    #[must_use]
    pub fn builder() -> MockUpstreamBuilder {
        MockUpstreamBuilder::default()
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Base URL shaped like the real API's versioned root.
    #[must_use]
    pub fn base_url(&self) -> String {
        self.url("/api/v2")
    }

    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.shared
            .requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

async fn record_and_respond(State(shared): State<Arc<Shared>>, req: Request) -> Response {
    let (parts, body) = req.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX)
        .await
        .map(|b| String::from_utf8_lossy(&b).into_owned())
        .unwrap_or_default();
    let query = parts
        .uri
        .query()
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect()
        })
        .unwrap_or_default();
    let headers = parts
        .headers
        .iter()
        .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
        .collect();
    let path = parts.uri.path().to_string();

    if let Ok(mut requests) = shared.requests.lock() {
        requests.push(RecordedRequest {
            method: parts.method.to_string(),
            path: path.clone(),
            query,
            headers,
            body,
        });
    }

    let Some(canned) = shared.routes.get(&path).cloned() else {
        return (StatusCode::NOT_FOUND, "no such route").into_response();
    };
    if !canned.delay.is_zero() {
        tokio::time::sleep(canned.delay).await;
    }
    let status = StatusCode::from_u16(canned.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, axum::Json(canned.body)).into_response()
}
