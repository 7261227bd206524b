//! The fixed sequence of transformation passes, from raw document to tool definitions.
//!
//! Resolve references, canonicalize identifiers and tags, rewrite doc links, inject guidance,
//! then build tools. Each pass takes the previous document by reference and returns a new one.

use crate::catalog::{CatalogReport, OperationCatalog};
use crate::descriptions::DescriptionRewriter;
use crate::document::ApiSpecification;
use crate::error::{OpenApiToolsError, Result};
use crate::guidance::GuidanceInjector;
use crate::resolver::{ResolutionReport, SchemaResolver};
use crate::tools::{ToolBuilder, ToolDefinition};

#[derive(Debug, Clone)]
pub struct TransformPipeline {
    resolver: SchemaResolver,
    catalog: OperationCatalog,
    rewriter: DescriptionRewriter,
    guidance: GuidanceInjector,
    builder: ToolBuilder,
}

/// Everything the pipeline produced, including non-fatal findings.
#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub spec: ApiSpecification,
    pub resolution: ResolutionReport,
    pub catalog: CatalogReport,
    pub descriptions_rewritten: usize,
    pub operations_annotated: usize,
    pub tools: Vec<ToolDefinition>,
}

impl TransformPipeline {
    /// The HDX pipeline with the given reference depth bound and hidden parameters.
    ///
    /// # Errors
    ///
    /// Returns [`OpenApiToolsError::Config`] for a zero depth bound.
    pub fn hdx(max_ref_depth: usize, hidden_parameters: &[&str]) -> Result<Self> {
        if max_ref_depth == 0 {
            return Err(OpenApiToolsError::Config(
                "max reference depth must be at least 1".to_string(),
            ));
        }
        let catalog = OperationCatalog::hdx()
            .map_err(|e| OpenApiToolsError::Config(format!("invalid catalog rule: {e}")))?;
        let builder = hidden_parameters
            .iter()
            .fold(ToolBuilder::default(), |b, name| b.hide_parameter(*name));
        Ok(Self::new(
            SchemaResolver::new(max_ref_depth),
            catalog,
            GuidanceInjector::default(),
            builder,
        ))
    }

    #[must_use]
    pub(crate) fn new(
        resolver: SchemaResolver,
        catalog: OperationCatalog,
        guidance: GuidanceInjector,
        builder: ToolBuilder,
    ) -> Self {
        Self {
            resolver,
            catalog,
            rewriter: DescriptionRewriter,
            guidance,
            builder,
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &OperationCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn run(&self, raw: &ApiSpecification) -> TransformOutput {
        let (resolved, resolution) = self.resolver.resolve_specification(raw);
        let (canonical, catalog) = self.catalog.apply(&resolved);
        let (rewritten, descriptions_rewritten) = self.rewriter.apply(&canonical);
        let (annotated, operations_annotated) = self.guidance.apply(&rewritten, &self.catalog);
        let tools = self.builder.build(&annotated, &catalog);

        TransformOutput {
            spec: annotated,
            resolution,
            catalog,
            descriptions_rewritten,
            operations_annotated,
            tools,
        }
    }
}
