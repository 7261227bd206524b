//! Rewrite upstream documentation links into references to the generated tools.
//!
//! The upstream API documents filter parameters with HTML links into its own docs UI ("See the
//! <a href=...>location endpoint</a> for details."). Those links mean nothing to a tool caller,
//! so they are rewritten to name the metadata tool that lists valid codes. The rules are data:
//! one ordered table of (pattern, replacement) pairs, compiled once.
//!
//! No replacement text matches any pattern, so a second pass is a no-op.

use crate::document::ApiSpecification;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// HTML doc links first, then bare "<x> endpoint" mentions left over.
const DESCRIPTION_REWRITES: &[(&str, &str)] = &[
    (
        r#"See the <a href="/docs#/Metadata/get_locations?_api_v[12]_metadata_location_get" target="_blank">location endpoint</a> for details\.?"#,
        "Use the metadata_location_get tool to get available location codes and names.",
    ),
    (
        r#"See the <a href="/docs#/Metadata/get_admin1_api_v[12]_metadata_admin1_get" target="_blank">admin1 endpoint</a> for details\.?"#,
        "Use the metadata_admin1_get tool to get available admin1 codes and names.",
    ),
    (
        r#"See the <a href="/docs#/Metadata/get_admin2_api_v[12]_metadata_admin2_get" target="_blank">admin2 endpoint</a> for details\.?"#,
        "Use the metadata_admin2_get tool to get available admin2 codes and names.",
    ),
    (
        r#"See the <a href="/docs#/Metadata/get_org_type_api_v[12]_metadata_org_type_get" target="_blank">org type endpoint</a> for details\.?"#,
        "Use the metadata_org_type_get tool to get available organization type codes and descriptions.",
    ),
    (
        r#"See the <a href="/docs#/Metadata/get_orgs?_api_v[12]_metadata_org_get" target="_blank">org endpoint</a> for details\.?"#,
        "Use the metadata_org_get tool to get available organization codes and names.",
    ),
    (
        r#"See the <a href="/docs#/Metadata/get_sectors?_api_v[12]_metadata_sector_get" target="_blank">sector endpoint</a> for details\.?"#,
        "Use the metadata_sector_get tool to get available sector codes and names.",
    ),
    (
        r#"See the <a href="/docs#/Metadata/get_currencies?_api_v[12]_metadata_currency_get" target="_blank">currency endpoint</a> for details\.?"#,
        "Use the metadata_currency_get tool to get available currency codes.",
    ),
    (
        r#"See the <a href="/docs#/Metadata/get_wfp_commodities?_api_v[12]_metadata_wfp_commodity_get" target="_blank">wfp commodity endpoint</a> for details\.?"#,
        "Use the metadata_wfp_commodity_get tool to get available WFP commodity codes and names.",
    ),
    (
        r#"See the <a href="/docs#/Metadata/get_wfp_markets?_api_v[12]_metadata_wfp_market_get" target="_blank">wfp market endpoint</a> for details\.?"#,
        "Use the metadata_wfp_market_get tool to get available WFP market codes and names.",
    ),
    (
        r#"See the <a href="/docs#/Metadata/get_datasets?_api_v[12]_metadata_dataset_get" target="_blank">dataset endpoint</a> for details\.?"#,
        "Use the metadata_dataset_get tool to get available dataset information.",
    ),
    (
        r#"See the <a href="/docs#/Metadata/get_resources?_api_v[12]_metadata_resource_get" target="_blank">resource endpoint</a> for details\.?"#,
        "Use the metadata_resource_get tool to get available resource information.",
    ),
    (r"location endpoint", "metadata_location_get tool"),
    (r"admin1 endpoint", "metadata_admin1_get tool"),
    (r"admin2 endpoint", "metadata_admin2_get tool"),
    (r"org type endpoint", "metadata_org_type_get tool"),
    (r"org endpoint", "metadata_org_get tool"),
    (r"sector endpoint", "metadata_sector_get tool"),
    (r"currency endpoint", "metadata_currency_get tool"),
    (r"wfp commodity endpoint", "metadata_wfp_commodity_get tool"),
    (r"wfp market endpoint", "metadata_wfp_market_get tool"),
    (r"dataset endpoint", "metadata_dataset_get tool"),
    (r"resource endpoint", "metadata_resource_get tool"),
];

static COMPILED_REWRITES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    DESCRIPTION_REWRITES
        .iter()
        .filter_map(|(pattern, replacement)| match Regex::new(pattern) {
            Ok(re) => Some((re, *replacement)),
            Err(e) => {
                tracing::error!(pattern = %pattern, error = %e, "invalid description rewrite pattern");
                None
            }
        })
        .collect()
});

#[derive(Debug, Clone, Default)]
pub struct DescriptionRewriter;

impl DescriptionRewriter {
    /// Apply every rule, in order, to one string. Returns `None` if nothing changed.
    #[must_use]
    pub fn rewrite(&self, text: &str) -> Option<String> {
        let mut current = text.to_string();
        let mut changed = false;
        for (re, replacement) in COMPILED_REWRITES.iter() {
            if re.is_match(&current) {
                current = re.replace_all(&current, *replacement).into_owned();
                changed = true;
            }
        }
        changed.then_some(current)
    }

    /// Rewrite every `description` string in operations and named schemas.
    #[must_use]
    pub fn apply(&self, spec: &ApiSpecification) -> (ApiSpecification, usize) {
        let mut out = spec.clone();
        let mut rewritten = 0;

        out.for_each_operation_mut(|path, method, op| {
            let before = rewritten;
            for value in op.values_mut() {
                self.rewrite_tree(value, &mut rewritten);
            }
            if let Some(Value::String(d)) = op.get_mut("description")
                && let Some(new) = self.rewrite(d)
            {
                *d = new;
                rewritten += 1;
            }
            if rewritten > before {
                tracing::debug!(path = %path, method = %method, count = rewritten - before, "rewrote descriptions");
            }
        });

        if let Some(schemas) = out.schemas_mut() {
            for value in schemas.values_mut() {
                self.rewrite_tree(value, &mut rewritten);
            }
        }

        tracing::info!(count = rewritten, "rewrote doc links to tool references");
        (out, rewritten)
    }

    fn rewrite_tree(&self, value: &mut Value, count: &mut usize) {
        match value {
            Value::Object(obj) => {
                if let Some(Value::String(d)) = obj.get_mut("description")
                    && let Some(new) = self.rewrite(d)
                {
                    *d = new;
                    *count += 1;
                }
                for (key, child) in obj.iter_mut() {
                    if key != "description" {
                        self.rewrite_tree(child, count);
                    }
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.rewrite_tree(item, count);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn all_patterns_compile() {
        assert_eq!(COMPILED_REWRITES.len(), DESCRIPTION_REWRITES.len());
    }

    #[test]
    fn rewrites_html_doc_links() {
        let input = r#"Filter by location code. See the <a href="/docs#/Metadata/get_locations_api_v1_metadata_location_get" target="_blank">location endpoint</a> for details."#;
        assert_eq!(
            DescriptionRewriter.rewrite(input).unwrap(),
            "Filter by location code. Use the metadata_location_get tool to get available location codes and names."
        );
    }

    #[test]
    fn org_type_is_not_mistaken_for_org() {
        assert_eq!(
            DescriptionRewriter
                .rewrite("Codes come from the org type endpoint.")
                .unwrap(),
            "Codes come from the metadata_org_type_get tool."
        );
    }

    #[test]
    fn rewrite_is_idempotent() {
        let once = DescriptionRewriter
            .rewrite("See the sector endpoint and the wfp market endpoint")
            .unwrap();
        assert_eq!(DescriptionRewriter.rewrite(&once), None);
    }

    #[test]
    fn applies_to_parameters_and_named_schemas() {
        let spec = ApiSpecification::from_value(json!({
            "openapi": "3.1.0",
            "paths": {
                "/api/v2/metadata/admin1": {
                    "get": {
                        "description": "Lists admin1 areas; see the location endpoint.",
                        "parameters": [
                            {"name": "location_code", "in": "query", "description": "From the location endpoint."}
                        ]
                    }
                }
            },
            "components": {"schemas": {"Admin1": {"description": "Admin2 children in the admin2 endpoint"}}}
        }))
        .unwrap();

        let (out, count) = DescriptionRewriter.apply(&spec);
        assert_eq!(count, 3);
        let op = out.operation("/api/v2/metadata/admin1", "get").unwrap();
        assert_eq!(op["description"], "Lists admin1 areas; see the metadata_location_get tool.");
        assert_eq!(
            op["parameters"][0]["description"],
            "From the metadata_location_get tool."
        );
        assert_eq!(
            out.schemas().unwrap()["Admin1"]["description"],
            "Admin2 children in the metadata_admin2_get tool"
        );

        let (_, again) = DescriptionRewriter.apply(&out);
        assert_eq!(again, 0);
    }
}
