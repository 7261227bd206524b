//! Append usage advisories to operation summaries.
//!
//! Each operation gets at most one class advisory, chosen by the first class whose path
//! patterns match, followed by the pagination advisory every operation gets. Text goes on the
//! summary, or on the description when there is no summary. An advisory already present is
//! never appended again, so the pass can run repeatedly over the same document.

use crate::catalog::OperationCatalog;
use crate::document::ApiSpecification;
use serde_json::Value;

pub const ADMIN_LEVEL_GUIDANCE: &str = "\n\n🎯 **CRITICAL - Data Coverage Warning**: \
Data coverage is only determined by the metadata_data_availability_get tool. \
Just because a country is in the system doesn't mean it has data. \
ALWAYS verify data availability before making data queries. \
\n\n🎯 **CRITICAL - Administrative Level Efficiency**: \
Before making aggregate queries (totals, country-wide statistics), \
ALWAYS check data availability using metadata_data_availability_get for the target country. \
Use the LOWEST available admin level (0=country, 1=state, \
2=district) to avoid downloading excessive granular data. \
For country totals, use admin level 0 if available, \
otherwise level 1. \
Never query admin level 2 for simple aggregations when level 0/1 is sufficient.";

pub const LOCATION_GUIDANCE: &str = "\n\n⚠️ **CRITICAL - Data Coverage Warning**: \
Data coverage is only determined by the metadata_data_availability_get tool. \
Just because a country appears in location metadata doesn't mean it has actual data. \
ALWAYS verify data availability using metadata_data_availability_get before making data queries.";

pub const PAGINATION_GUIDANCE: &str = "\n\n🔄 **Pagination**: You can page through results using `limit` and `offset` parameters \
(limit=records per page, offset=starting position).";

const AGGREGATION_PATTERNS: &[&str] = &[
    "affected-people",
    "baseline-population",
    "humanitarian-needs",
    "refugees",
    "idps",
    "returnees",
    "population",
    "food-security",
    "nutrition",
    "poverty",
    "conflict",
    "funding",
];

const LOCATION_PATTERNS: &[&str] = &["location", "admin1", "admin2"];

#[derive(Debug, Clone)]
pub struct GuidanceClass {
    pub name: String,
    /// Substrings of the path; any match selects the class.
    pub patterns: Vec<String>,
    pub text: String,
}

impl GuidanceClass {
    #[must_use]
    pub fn new(name: &str, patterns: &[&str], text: &str) -> Self {
        Self {
            name: name.to_string(),
            patterns: patterns.iter().map(ToString::to_string).collect(),
            text: text.to_string(),
        }
    }

    fn matches(&self, path: &str) -> bool {
        self.patterns.iter().any(|p| path.contains(p.as_str()))
    }
}

#[derive(Debug, Clone)]
pub struct GuidanceInjector {
    classes: Vec<GuidanceClass>,
    universal: String,
}

impl Default for GuidanceInjector {
    fn default() -> Self {
        Self::new(
            vec![
                GuidanceClass::new(
                    "aggregation-efficiency",
                    AGGREGATION_PATTERNS,
                    ADMIN_LEVEL_GUIDANCE,
                ),
                GuidanceClass::new("location-coverage", LOCATION_PATTERNS, LOCATION_GUIDANCE),
            ],
            PAGINATION_GUIDANCE,
        )
    }
}

impl GuidanceInjector {
    /// Classes are evaluated in the order given.
    #[must_use]
    pub(crate) fn new(classes: Vec<GuidanceClass>, universal: impl Into<String>) -> Self {
        Self {
            classes,
            universal: universal.into(),
        }
    }

    #[must_use]
    pub fn classify(&self, path: &str) -> Option<&GuidanceClass> {
        self.classes.iter().find(|c| c.matches(path))
    }

    /// Append advisories to `text` unless already present. Returns whether anything changed.
    fn annotate(&self, class: Option<&GuidanceClass>, text: &mut String) -> bool {
        let mut changed = false;
        for advisory in class.map(|c| c.text.as_str()).into_iter().chain([self.universal.as_str()]) {
            if !text.contains(advisory) {
                text.push_str(advisory);
                changed = true;
            }
        }
        changed
    }

    /// Annotate every operation; excluded paths are left alone.
    #[must_use]
    pub fn apply(
        &self,
        spec: &ApiSpecification,
        catalog: &OperationCatalog,
    ) -> (ApiSpecification, usize) {
        let mut out = spec.clone();
        let mut annotated = 0;

        out.for_each_operation_mut(|path, method, op| {
            if catalog.is_excluded(path) {
                return;
            }
            let class = self.classify(path);
            let field = if matches!(op.get("summary"), Some(Value::String(_))) {
                "summary"
            } else if matches!(op.get("description"), Some(Value::String(_))) {
                "description"
            } else {
                tracing::debug!(path = %path, method = %method, "no summary or description to annotate");
                return;
            };
            if let Some(Value::String(text)) = op.get_mut(field)
                && self.annotate(class, text)
            {
                annotated += 1;
                tracing::debug!(
                    path = %path,
                    method = %method,
                    class = class.map_or("none", |c| c.name.as_str()),
                    field,
                    "added guidance"
                );
            }
        });

        tracing::info!(count = annotated, "added usage guidance to operations");
        (out, annotated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(paths: Value) -> ApiSpecification {
        ApiSpecification::from_value(json!({"openapi": "3.1.0", "paths": paths})).unwrap()
    }

    fn catalog() -> OperationCatalog {
        OperationCatalog::hdx().unwrap()
    }

    #[test]
    fn aggregation_wins_over_location() {
        let g = GuidanceInjector::default();
        // "population" and "location" both appear; aggregation is evaluated first.
        let class = g.classify("/api/v2/geography-infrastructure/baseline-population/location").unwrap();
        assert_eq!(class.name, "aggregation-efficiency");
        assert_eq!(
            g.classify("/api/v2/metadata/admin2").unwrap().name,
            "location-coverage"
        );
        assert!(g.classify("/api/v2/util/version").is_none());
    }

    #[test]
    fn appends_class_then_pagination_to_summary() {
        let (out, n) = GuidanceInjector::default().apply(
            &spec(json!({
                "/api/v2/affected-people/idps": {"get": {"summary": "IDPs", "description": "d"}},
                "/api/v2/util/version": {"get": {"summary": "Version"}}
            })),
            &catalog(),
        );
        assert_eq!(n, 2);

        let idps = out.operation("/api/v2/affected-people/idps", "get").unwrap();
        assert_eq!(
            idps["summary"],
            format!("IDPs{ADMIN_LEVEL_GUIDANCE}{PAGINATION_GUIDANCE}")
        );
        assert_eq!(idps["description"], "d");

        let version = out.operation("/api/v2/util/version", "get").unwrap();
        assert_eq!(version["summary"], format!("Version{PAGINATION_GUIDANCE}"));
    }

    #[test]
    fn falls_back_to_description() {
        let (out, _) = GuidanceInjector::default().apply(
            &spec(json!({"/api/v2/metadata/location": {"get": {"description": "Locations"}}})),
            &catalog(),
        );
        let op = out.operation("/api/v2/metadata/location", "get").unwrap();
        assert_eq!(
            op["description"],
            format!("Locations{LOCATION_GUIDANCE}{PAGINATION_GUIDANCE}")
        );
        assert!(op.get("summary").is_none());
    }

    #[test]
    fn injection_is_idempotent() {
        let g = GuidanceInjector::default();
        let input = spec(json!({
            "/api/v2/coordination-context/funding": {"get": {"summary": "Funding"}},
            "/api/v2/metadata/admin1": {"get": {"description": "Admin1"}},
            "/api/v2/climate/rainfall": {"get": {"summary": "Rain"}}
        }));

        let (once, first) = g.apply(&input, &catalog());
        let (twice, second) = g.apply(&once, &catalog());
        assert_eq!(first, 3);
        assert_eq!(second, 0);
        assert_eq!(
            serde_json::to_string(once.as_value()).unwrap(),
            serde_json::to_string(twice.as_value()).unwrap()
        );
    }

    #[test]
    fn excluded_path_is_skipped() {
        let (out, n) = GuidanceInjector::default().apply(
            &spec(json!({"/api/v2/encode_app_identifier": {"get": {"summary": "Encode"}}})),
            &catalog(),
        );
        assert_eq!(n, 0);
        assert_eq!(
            out.operation("/api/v2/encode_app_identifier", "get").unwrap()["summary"],
            "Encode"
        );
    }
}
