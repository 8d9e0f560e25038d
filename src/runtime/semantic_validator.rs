//! Post-response output validation: type category, confidence floor,
//! required fields, and numeric range, run in that order with violations
//! accumulated rather than short-circuited.

use serde_json::Value;

use crate::compiler::type_checker::ranged_type_bounds;
use crate::runtime::errors::{AxonRuntimeError, ErrorContext};

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub violations: Vec<String>,
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationSpec {
    pub expected_type: Option<String>,
    pub confidence_floor: Option<f64>,
    pub required_fields: Option<Vec<String>>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

const EPISTEMIC: &[&str] = &["FactualClaim", "Opinion", "Uncertainty", "Speculation"];

pub fn validate(output: &Value, spec: &ValidationSpec) -> ValidationResult {
    let mut violations = Vec::new();
    let mut confidence = None;

    // 1. Type category.
    if let Some(expected) = &spec.expected_type {
        if let Some(obj) = output.as_object() {
            let actual = obj
                .get("type")
                .or_else(|| obj.get("_type"))
                .and_then(Value::as_str);
            if let Some(actual) = actual {
                if actual != expected {
                    if EPISTEMIC.contains(&actual) && EPISTEMIC.contains(&expected.as_str()) {
                        violations.push("epistemic_exclusion".to_string());
                    } else {
                        violations.push("type_mismatch".to_string());
                    }
                }
            }
        }
    }

    // 2. Confidence.
    if let Some(obj) = output.as_object() {
        let raw = obj.get("confidence").or_else(|| obj.get("_confidence"));
        if let Some(raw) = raw {
            if let Some(value) = raw.as_f64() {
                confidence = Some(value);
                if let Some(floor) = spec.confidence_floor {
                    if value < floor {
                        violations.push("confidence_floor".to_string());
                    }
                }
            }
        }
    }

    // 3. Structured fields.
    if let Some(fields) = &spec.required_fields {
        match output.as_object() {
            Some(obj) => {
                if fields.iter().any(|f| !obj.contains_key(f)) {
                    violations.push("missing_fields".to_string());
                }
            }
            None => violations.push("structured_type".to_string()),
        }
    }

    // 4. Range.
    let numeric = output.as_f64().or_else(|| {
        output
            .as_object()
            .and_then(|o| o.get("value").or_else(|| o.get("score")))
            .and_then(Value::as_f64)
    });
    if let Some(value) = numeric {
        let (min, max) = effective_bounds(spec);
        if let Some(min) = min {
            if value < min {
                violations.push("range_below_min".to_string());
            }
        }
        if let Some(max) = max {
            if value > max {
                violations.push("range_above_max".to_string());
            }
        }
    }

    ValidationResult {
        is_valid: violations.is_empty(),
        violations,
        confidence,
    }
}

fn effective_bounds(spec: &ValidationSpec) -> (Option<f64>, Option<f64>) {
    let type_bounds = spec
        .expected_type
        .as_ref()
        .and_then(|expected| ranged_type_bounds().get(expected.as_str()).copied());

    let min = spec.min.or_else(|| type_bounds.map(|(lo, _)| lo));
    let max = spec.max.or_else(|| type_bounds.map(|(_, hi)| hi));
    (min, max)
}

/// Escalates a failed validation: the first confidence violation becomes a
/// `ConfidenceError`; any other violation set aggregates into a single
/// `ValidationError`.
pub fn validate_and_raise(
    output: &Value,
    spec: &ValidationSpec,
    context: ErrorContext,
) -> Result<ValidationResult, AxonRuntimeError> {
    let result = validate(output, spec);
    if result.is_valid {
        return Ok(result);
    }
    if result.violations.contains(&"confidence_floor".to_string()) {
        return Err(AxonRuntimeError::confidence(
            format!(
                "confidence {} below floor {}",
                result.confidence.unwrap_or_default(),
                spec.confidence_floor.unwrap_or_default()
            ),
            context,
        ));
    }
    Err(AxonRuntimeError::validation(
        result.violations.join(", "),
        context,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn epistemic_mismatch_flags_exclusion() {
        let output = json!({"type": "Opinion"});
        let spec = ValidationSpec {
            expected_type: Some("FactualClaim".to_string()),
            ..Default::default()
        };
        let result = validate(&output, &spec);
        assert!(result.violations.contains(&"epistemic_exclusion".to_string()));
    }

    #[test]
    fn confidence_below_floor_is_flagged_and_recorded() {
        let output = json!({"confidence": 0.2});
        let spec = ValidationSpec {
            confidence_floor: Some(0.5),
            ..Default::default()
        };
        let result = validate(&output, &spec);
        assert!(result.violations.contains(&"confidence_floor".to_string()));
        assert_eq!(result.confidence, Some(0.2));
    }

    #[test]
    fn missing_required_field_is_flagged() {
        let output = json!({"title": "x"});
        let spec = ValidationSpec {
            required_fields: Some(vec!["title".into(), "author".into()]),
            ..Default::default()
        };
        let result = validate(&output, &spec);
        assert!(result.violations.contains(&"missing_fields".to_string()));
    }

    #[test]
    fn non_object_output_with_required_fields_is_structured_type_violation() {
        let output = json!("just a string");
        let spec = ValidationSpec {
            required_fields: Some(vec!["title".into()]),
            ..Default::default()
        };
        let result = validate(&output, &spec);
        assert!(result.violations.contains(&"structured_type".to_string()));
    }

    #[test]
    fn ranged_type_default_bounds_apply_when_unspecified() {
        let output = json!(1.5);
        let spec = ValidationSpec {
            expected_type: Some("RiskScore".to_string()),
            ..Default::default()
        };
        let result = validate(&output, &spec);
        assert!(result.violations.contains(&"range_above_max".to_string()));
    }

    #[test]
    fn explicit_min_still_defaults_max_from_the_type() {
        let output = json!(1.5);
        let spec = ValidationSpec {
            expected_type: Some("RiskScore".to_string()),
            min: Some(0.2),
            ..Default::default()
        };
        let result = validate(&output, &spec);
        assert!(result.violations.contains(&"range_above_max".to_string()));

        let in_range = json!(0.1);
        let result = validate(&in_range, &spec);
        assert!(result.violations.contains(&"range_below_min".to_string()));
    }

    #[test]
    fn non_epistemic_type_mismatch_is_unconditional() {
        let output = json!({"type": "Uncertainty", "value": 0.5});
        let spec = ValidationSpec {
            expected_type: Some("RiskScore".to_string()),
            ..Default::default()
        };
        let result = validate(&output, &spec);
        assert!(result.violations.contains(&"type_mismatch".to_string()));
    }

    #[test]
    fn clean_output_is_valid() {
        let output = json!({"type": "FactualClaim", "confidence": 0.9});
        let spec = ValidationSpec {
            expected_type: Some("FactualClaim".to_string()),
            confidence_floor: Some(0.5),
            ..Default::default()
        };
        assert!(validate(&output, &spec).is_valid);
    }

    #[test]
    fn validate_and_raise_prioritizes_confidence_error() {
        let output = json!({"confidence": 0.1});
        let spec = ValidationSpec {
            confidence_floor: Some(0.9),
            required_fields: Some(vec!["x".into()]),
            ..Default::default()
        };
        let err = validate_and_raise(&output, &spec, ErrorContext::default()).unwrap_err();
        assert_eq!(err.level(), 2);
    }
}
