//! Error types for `hdx-mcp-server`.

use hdx_http_tools::TransportError;
use hdx_openapi_tools::OpenApiToolsError;
use thiserror::Error;

/// Startup configuration problems. Always fatal.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Required environment variable {key} is not set")]
    Missing { key: String },

    #[error("Invalid value for {key} ('{value}'): {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}

/// Failures while assembling the gateway. Per-call failures never use this type; they become
/// error envelopes.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("tool '{0}' is registered more than once")]
    DuplicateTool(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    OpenApi(#[from] OpenApiToolsError),
}

pub type Result<T> = std::result::Result<T, GatewayError>;
