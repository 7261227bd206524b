//! `OpenAPI` → tool transformation for the HDX gateway.
//!
//! The crate takes the upstream document through a fixed pipeline (see [`pipeline`]) and
//! produces immutable [`tools::ToolDefinition`]s. It performs no dispatch of its own; calling
//! a tool is the gateway's job.

pub mod catalog;
pub mod descriptions;
pub mod document;
pub mod error;
pub mod guidance;
pub mod loader;
pub mod pipeline;
pub mod resolver;
pub mod tools;

pub use document::ApiSpecification;
pub use error::{OpenApiToolsError, Result};
pub use pipeline::{TransformOutput, TransformPipeline};
pub use tools::ToolDefinition;
