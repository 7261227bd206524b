//! Caller argument validation against a tool's input schema.

use serde_json::{Value, json};

/// A rejected argument set: a one-line message plus the structured violation list.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentRejection {
    pub message: String,
    pub violations: Vec<Value>,
}

/// Validate `args` against `schema`.
///
/// Reports unknown parameters (with close-match suggestions), missing required parameters,
/// and JSON Schema constraint violations. A schema that does not compile only skips the
/// constraint check.
///
/// # Errors
///
/// Returns an [`ArgumentRejection`] if any violation was found.
pub fn validate_arguments(schema: &Value, args: &Value) -> Result<(), ArgumentRejection> {
    let props = schema
        .get("properties")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    let required: Vec<String> = schema
        .get("required")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();

    let args_obj = args.as_object().cloned().unwrap_or_default();
    let valid_params: Vec<String> = props.keys().cloned().collect();
    let valid_param_refs: Vec<&str> = valid_params.iter().map(String::as_str).collect();

    let mut violations: Vec<Value> = Vec::new();

    for k in args_obj.keys() {
        if props.contains_key(k) {
            continue;
        }
        let suggestions = find_similar_strings(k, &valid_param_refs);
        violations.push(json!({
            "type": "invalid-parameter",
            "parameter": k,
            "suggestions": suggestions,
            "validParameters": valid_params,
        }));
    }

    for r in &required {
        if !args_obj.contains_key(r) {
            violations.push(json!({
                "type": "missing-required-parameter",
                "parameter": r,
            }));
        }
    }

    match jsonschema::validator_for(schema) {
        Ok(compiled) => {
            for e in compiled.iter_errors(args) {
                // Reported above with a nicer shape.
                if matches!(
                    e.kind(),
                    jsonschema::error::ValidationErrorKind::Required { .. }
                ) {
                    continue;
                }
                violations.push(json!({
                    "type": "constraint-violation",
                    "message": e.to_string(),
                    "instancePath": e.instance_path().to_string(),
                }));
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "input schema does not compile, skipping constraint checks");
        }
    }

    if violations.is_empty() {
        return Ok(());
    }

    let message = if let Some(v) = violations
        .iter()
        .find(|v| v.get("type").and_then(Value::as_str) == Some("invalid-parameter"))
    {
        let p = v.get("parameter").and_then(Value::as_str).unwrap_or("?");
        let suggestion = v
            .get("suggestions")
            .and_then(Value::as_array)
            .and_then(|arr| arr.first())
            .and_then(Value::as_str);
        if let Some(s) = suggestion {
            format!("Invalid params: unknown parameter '{p}' (did you mean '{s}'?)")
        } else {
            format!("Invalid params: unknown parameter '{p}'")
        }
    } else {
        format!(
            "Invalid params: validation failed with {} error(s)",
            violations.len()
        )
    };

    Err(ArgumentRejection {
        message,
        violations,
    })
}

fn find_similar_strings(unknown: &str, known: &[&str]) -> Vec<String> {
    let mut candidates: Vec<(f64, String)> = Vec::new();
    for k in known {
        let score = strsim::jaro(unknown, k);
        if score > 0.7 {
            candidates.push((score, (*k).to_string()));
        }
    }
    candidates.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    candidates.into_iter().map(|(_, s)| s).collect()
}
