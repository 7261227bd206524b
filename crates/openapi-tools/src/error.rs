//! Error types for `hdx-openapi-tools`.

use thiserror::Error;

/// Main error type for specification loading and transformation.
#[derive(Error, Debug)]
pub enum OpenApiToolsError {
    /// Invalid pipeline configuration (bad rule pattern, zero depth bound).
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("OpenAPI error: failed to fetch spec from '{location}': {message}")]
    SpecFetch { location: String, message: String },

    #[error("OpenAPI error: spec request to '{location}' returned HTTP {status}")]
    SpecStatus { location: String, status: u16 },

    #[error("OpenAPI error: failed to read spec body from '{location}': {message}")]
    SpecReadBody { location: String, message: String },

    #[error("OpenAPI error: failed to read spec file '{path}': {source}")]
    SpecReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Neither JSON nor YAML.
    #[error("OpenAPI error: failed to parse OpenAPI spec from '{location}': {message}")]
    SpecParse { location: String, message: String },

    /// Parsed, but not shaped like an `OpenAPI` 3.x document.
    #[error("OpenAPI error: invalid spec: {0}")]
    InvalidSpec(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for `OpenAPI` tooling operations.
pub type Result<T> = std::result::Result<T, OpenApiToolsError>;
