//! HDX tool gateway: configuration, identity, tool registry and dispatch.
//!
//! [`Gateway::bootstrap`] loads the upstream `OpenAPI` document, runs it through
//! [`hdx_openapi_tools::TransformPipeline`], and registers the resulting tools beside the
//! built-in ones. All of them share one rate-limited transport.

pub mod config;
pub mod custom_tools;
pub mod error;
pub mod gateway;
pub mod identity;
pub mod prompts;
pub mod validation;

pub use config::ServerConfig;
pub use error::{ConfigError, GatewayError, Result};
pub use gateway::{CustomTool, Gateway, ServerInfo, ToolContext};
