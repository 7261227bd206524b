//! Rate-limited outbound HTTP for the HDX tool gateway.
//!
//! Every upstream call, whichever tool issued it, goes through one [`RateLimitedTransport`]
//! sharing one [`RateLimiter`]. The transport does no retrying and no status interpretation;
//! it only decides *when* a request may leave.

pub mod client;
pub mod error;
pub mod limiter;
pub mod safety;
pub mod transport;

pub use client::{BaseClient, ClientConfig, RequestOptions};
pub use error::{Result, TransportError};
pub use limiter::RateLimiter;
pub use transport::{RateLimitedTransport, json_body};
