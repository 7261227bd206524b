//! Redaction helpers for outbound request diagnostics.
//!
//! Every outbound call carries the application identity in its query string, so URLs are
//! stripped of query and credentials before they reach logs or error envelopes.

use url::Url;

#[must_use]
pub fn redact_url(url: &Url) -> String {
    let mut u = url.clone();
    let _ = u.set_username("");
    let _ = u.set_password(None);
    u.set_query(None);
    u.set_fragment(None);
    u.to_string()
}

/// Render a `reqwest` error with any embedded URL redacted.
#[must_use]
pub fn sanitize_reqwest_error(e: &reqwest::Error) -> String {
    let msg = e.to_string();
    match e.url() {
        Some(u) => msg.replace(u.as_str(), &redact_url(u)),
        None => msg,
    }
}
