//! Canonical tool identifiers and domain tags for every operation.
//!
//! Two fixed tables drive this pass: an explicit path → identifier map, and an ordered list of
//! path rules assigning domain tags (or excluding a path from the tool surface entirely).
//! Neither is inferred; both are data.

use crate::document::ApiSpecification;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Known HDX paths and the identifier each becomes.
pub const CANONICAL_OPERATION_IDS: &[(&str, &str)] = &[
    ("/api/v2/affected-people/refugees-persons-of-concern", "affected_people_refugees_get"),
    ("/api/v2/affected-people/humanitarian-needs", "affected_people_humanitarian_needs_get"),
    ("/api/v2/affected-people/idps", "affected_people_idps_get"),
    ("/api/v2/affected-people/returnees", "affected_people_returnees_get"),
    ("/api/v2/coordination-context/operational-presence", "coordination_operational_presence_get"),
    ("/api/v2/coordination-context/funding", "coordination_funding_get"),
    ("/api/v2/coordination-context/conflict-events", "coordination_conflict_events_get"),
    ("/api/v2/coordination-context/national-risk", "coordination_national_risk_get"),
    ("/api/v2/food-security-nutrition-poverty/food-security", "food_security_get"),
    ("/api/v2/food-security-nutrition-poverty/food-prices-market-monitor", "food_prices_get"),
    ("/api/v2/food-security-nutrition-poverty/poverty-rate", "poverty_rate_get"),
    ("/api/v2/geography-infrastructure/baseline-population", "baseline_population_get"),
    ("/api/v2/climate/rainfall", "climate_rainfall_get"),
    ("/api/v2/metadata/dataset", "metadata_dataset_get"),
    ("/api/v2/metadata/resource", "metadata_resource_get"),
    ("/api/v2/metadata/location", "metadata_location_get"),
    ("/api/v2/metadata/admin1", "metadata_admin1_get"),
    ("/api/v2/metadata/admin2", "metadata_admin2_get"),
    ("/api/v2/metadata/currency", "metadata_currency_get"),
    ("/api/v2/metadata/org", "metadata_org_get"),
    ("/api/v2/metadata/org-type", "metadata_org_type_get"),
    ("/api/v2/metadata/sector", "metadata_sector_get"),
    ("/api/v2/metadata/wfp-commodity", "metadata_wfp_commodity_get"),
    ("/api/v2/metadata/wfp-market", "metadata_wfp_market_get"),
    ("/api/v2/metadata/data-availability", "metadata_data_availability_get"),
    ("/api/v2/util/version", "util_version_get"),
];

/// Tags every tool carries regardless of family.
pub const GLOBAL_TAGS: &[&str] = &["hdx", "humanitarian", "data"];

/// Paths that never become tools.
pub const EXCLUDED_PATH_PATTERN: &str = r".*/encode_app_identifier$";

/// Ordered domain families. The first matching rule wins.
pub const DOMAIN_RULES: &[(&str, &[&str])] = &[
    (r".*/metadata/.*", &["metadata", "reference"]),
    (r".*/affected-people/.*", &["affected-people", "humanitarian"]),
    (r".*/climate/.*", &["climate", "environmental"]),
    (r".*/coordination-context/.*", &["coordination", "humanitarian"]),
    (
        r".*/food-security-nutrition-poverty/.*",
        &["food-security", "nutrition", "poverty"],
    ),
    (
        r".*/geography-infrastructure/.*",
        &["geography", "infrastructure", "population"],
    ),
    (r".*/util/.*", &["utility", "system"]),
];

#[derive(Debug, Clone)]
pub struct DomainRule {
    pattern: Regex,
    tags: Vec<String>,
}

impl DomainRule {
    /// # Errors
    ///
    /// Returns the regex error for an invalid pattern.
    pub fn new(pattern: &str, tags: &[&str]) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            tags: tags.iter().map(ToString::to_string).collect(),
        })
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }
}

/// Catalog decision for one (path, method).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub path: String,
    pub method: String,
    pub operation_id: String,
    pub tags: BTreeSet<String>,
    pub excluded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdCollision {
    pub operation_id: String,
    /// `METHOD path` of every operation sharing the identifier.
    pub operations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AmbiguousTagMatch {
    pub path: String,
    /// Every matching rule pattern, winner first.
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CatalogReport {
    pub entries: Vec<CatalogEntry>,
    pub renamed: usize,
    /// Paths absent from the identifier table; they keep their identifier.
    pub unmapped_paths: Vec<String>,
    pub collisions: Vec<IdCollision>,
    pub ambiguous: Vec<AmbiguousTagMatch>,
}

impl CatalogReport {
    #[must_use]
    pub fn entry(&self, path: &str, method: &str) -> Option<&CatalogEntry> {
        self.entries
            .iter()
            .find(|e| e.path == path && e.method == method)
    }
}

#[derive(Debug, Clone)]
pub struct OperationCatalog {
    ids: BTreeMap<String, String>,
    excluded: Regex,
    rules: Vec<DomainRule>,
    global_tags: Vec<String>,
}

impl OperationCatalog {
    /// # Errors
    ///
    /// Returns the regex error for an invalid exclusion pattern.
    pub fn new(
        ids: &[(&str, &str)],
        excluded_pattern: &str,
        rules: Vec<DomainRule>,
        global_tags: &[&str],
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            ids: ids
                .iter()
                .map(|(p, id)| ((*p).to_string(), (*id).to_string()))
                .collect(),
            excluded: Regex::new(excluded_pattern)?,
            rules,
            global_tags: global_tags.iter().map(ToString::to_string).collect(),
        })
    }

    /// The HDX tables.
    ///
    /// # Errors
    ///
    /// Only fails if a built-in pattern is invalid.
    pub fn hdx() -> Result<Self, regex::Error> {
        let rules = DOMAIN_RULES
            .iter()
            .map(|(pattern, tags)| DomainRule::new(pattern, tags))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(CANONICAL_OPERATION_IDS, EXCLUDED_PATH_PATTERN, rules, GLOBAL_TAGS)
    }

    #[must_use]
    pub fn is_excluded(&self, path: &str) -> bool {
        self.excluded.is_match(path)
    }

    #[must_use]
    pub fn canonical_id(&self, path: &str) -> Option<&str> {
        self.ids.get(path).map(String::as_str)
    }

    /// Tags for a path plus every matching rule pattern (winner first).
    #[must_use]
    pub fn tags_for(&self, path: &str) -> (BTreeSet<String>, Vec<String>) {
        let matching: Vec<&DomainRule> =
            self.rules.iter().filter(|r| r.pattern.is_match(path)).collect();
        let mut tags: BTreeSet<String> = self.global_tags.iter().cloned().collect();
        if let Some(winner) = matching.first() {
            tags.extend(winner.tags.iter().cloned());
        }
        let patterns = matching.iter().map(|r| r.pattern().to_string()).collect();
        (tags, patterns)
    }

    /// Rename operations from the identifier table, tag them, and report collisions.
    #[must_use]
    pub fn apply(&self, spec: &ApiSpecification) -> (ApiSpecification, CatalogReport) {
        let mut out = spec.clone();
        let mut report = CatalogReport::default();
        let mut unmapped: BTreeSet<String> = BTreeSet::new();

        out.for_each_operation_mut(|path, method, op| {
            let excluded = self.is_excluded(path);
            let previous = op.get("operationId").and_then(Value::as_str).map(str::to_string);

            let operation_id = match self.canonical_id(path) {
                Some(id) => {
                    if previous.as_deref() != Some(id) {
                        tracing::debug!(
                            path = %path,
                            method = %method,
                            from = previous.as_deref().unwrap_or("<none>"),
                            to = %id,
                            "canonicalized operation id"
                        );
                        report.renamed += 1;
                    }
                    id.to_string()
                }
                None => {
                    if !excluded {
                        unmapped.insert(path.to_string());
                    }
                    previous.unwrap_or_else(|| generate_canonical_name(method, path))
                }
            };
            op.insert("operationId".to_string(), Value::String(operation_id.clone()));

            let (tags, patterns) = self.tags_for(path);
            if patterns.len() > 1 {
                tracing::warn!(
                    path = %path,
                    winner = %patterns[0],
                    matches = patterns.len(),
                    "path matches several domain families; first rule wins"
                );
                if !report.ambiguous.iter().any(|a| a.path == path) {
                    report.ambiguous.push(AmbiguousTagMatch {
                        path: path.to_string(),
                        patterns,
                    });
                }
            }

            report.entries.push(CatalogEntry {
                path: path.to_string(),
                method: method.to_string(),
                operation_id,
                tags,
                excluded,
            });
        });

        for path in &unmapped {
            tracing::warn!(path = %path, "path not in canonical id table, keeping its identifier");
        }
        report.unmapped_paths = unmapped.into_iter().collect();

        let mut by_id: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for entry in report.entries.iter().filter(|e| !e.excluded) {
            by_id
                .entry(entry.operation_id.as_str())
                .or_default()
                .push(format!("{} {}", entry.method.to_uppercase(), entry.path));
        }
        let collisions: Vec<IdCollision> = by_id
            .into_iter()
            .filter(|(_, ops)| ops.len() > 1)
            .map(|(id, operations)| IdCollision {
                operation_id: id.to_string(),
                operations,
            })
            .collect();
        for c in &collisions {
            tracing::warn!(
                operation_id = %c.operation_id,
                operations = ?c.operations,
                "canonical identifier collision"
            );
        }
        report.collisions = collisions;

        tracing::info!(
            renamed = report.renamed,
            unmapped = report.unmapped_paths.len(),
            collisions = report.collisions.len(),
            "canonicalized operation ids"
        );
        (out, report)
    }
}

/// Identifier for an operation without one: `get_api_v2_metadata_location`.
#[must_use]
pub fn generate_canonical_name(method: &str, path: &str) -> String {
    let raw = format!("{}_{}", method.to_lowercase(), path.replace(['{', '}'], ""));

    let mut name = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            name.push(c);
        } else if !name.ends_with('_') {
            name.push('_');
        }
    }

    let mut name = name.trim_matches('_').to_string();
    name.truncate(64);
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(paths: Value) -> ApiSpecification {
        ApiSpecification::from_value(json!({"openapi": "3.1.0", "paths": paths})).unwrap()
    }

    #[test]
    fn test_generate_canonical_name() {
        assert_eq!(generate_canonical_name("GET", "/users"), "get_users");
        assert_eq!(
            generate_canonical_name("get", "/users/{id}/posts"),
            "get_users_id_posts"
        );
        assert_eq!(
            generate_canonical_name("post", "/api/v2/org-type//x"),
            "post_api_v2_org_type_x"
        );
        assert!(generate_canonical_name("get", &"/a".repeat(100)).len() <= 64);
    }

    #[test]
    fn maps_every_table_path_to_its_identifier() {
        let mut paths = serde_json::Map::new();
        for (path, _) in CANONICAL_OPERATION_IDS {
            paths.insert(
                (*path).to_string(),
                json!({"get": {"operationId": format!("generated{}", path.replace('/', "_"))}}),
            );
        }
        let catalog = OperationCatalog::hdx().unwrap();
        let (out, report) = catalog.apply(&spec(Value::Object(paths)));

        for (path, id) in CANONICAL_OPERATION_IDS {
            assert_eq!(out.operation(path, "get").unwrap()["operationId"], *id);
        }
        assert_eq!(report.renamed, CANONICAL_OPERATION_IDS.len());
        assert!(report.unmapped_paths.is_empty());
        assert!(report.collisions.is_empty());
    }

    #[test]
    fn unmapped_paths_keep_their_identifier() {
        let catalog = OperationCatalog::hdx().unwrap();
        let (out, report) = catalog.apply(&spec(json!({
            "/api/v2/affected-people/new-thing": {"get": {"operationId": "new_thing_upstream"}},
            "/api/v2/other": {"get": {}}
        })));
        assert_eq!(
            out.operation("/api/v2/affected-people/new-thing", "get").unwrap()["operationId"],
            "new_thing_upstream"
        );
        assert_eq!(
            out.operation("/api/v2/other", "get").unwrap()["operationId"],
            "get_api_v2_other"
        );
        assert_eq!(
            report.unmapped_paths,
            vec!["/api/v2/affected-people/new-thing", "/api/v2/other"]
        );
    }

    #[test]
    fn collisions_are_flagged_not_dropped() {
        let catalog = OperationCatalog::hdx().unwrap();
        let (_, report) = catalog.apply(&spec(json!({
            "/api/v2/climate/rainfall": {
                "get": {"operationId": "a"},
                "post": {"operationId": "b"}
            },
            "/api/v2/legacy/rainfall": {"get": {"operationId": "climate_rainfall_get"}}
        })));

        assert_eq!(report.entries.len(), 3);
        assert_eq!(report.collisions.len(), 1);
        assert_eq!(report.collisions[0].operation_id, "climate_rainfall_get");
        assert_eq!(report.collisions[0].operations.len(), 3);
    }

    #[test]
    fn tags_come_from_the_first_matching_family() {
        let catalog = OperationCatalog::hdx().unwrap();
        let (tags, patterns) = catalog.tags_for("/api/v2/metadata/location");
        assert_eq!(patterns.len(), 1);
        for t in ["hdx", "humanitarian", "data", "metadata", "reference"] {
            assert!(tags.contains(t), "missing {t}");
        }

        let (tags, patterns) = catalog.tags_for("/api/v2/unknown/x");
        assert!(patterns.is_empty());
        assert_eq!(tags.len(), 3);
    }

    #[test]
    fn multi_family_paths_are_reported() {
        let catalog = OperationCatalog::hdx().unwrap();
        let (_, report) = catalog.apply(&spec(json!({
            "/api/v2/metadata/climate/stations": {"get": {}, "post": {}}
        })));
        assert_eq!(report.ambiguous.len(), 1);
        assert_eq!(report.ambiguous[0].patterns[0], r".*/metadata/.*");
        let entry = report.entry("/api/v2/metadata/climate/stations", "get").unwrap();
        assert!(entry.tags.contains("metadata"));
        assert!(!entry.tags.contains("climate"));
    }

    #[test]
    fn identifier_endpoint_is_excluded() {
        let catalog = OperationCatalog::hdx().unwrap();
        let (_, report) = catalog.apply(&spec(json!({
            "/api/v2/encode_app_identifier": {"get": {"operationId": "encode"}},
            "/api/v2/util/version": {"get": {}}
        })));
        assert!(report.entry("/api/v2/encode_app_identifier", "get").unwrap().excluded);
        assert!(!report.entry("/api/v2/util/version", "get").unwrap().excluded);
        assert!(report.unmapped_paths.is_empty());
    }
}
