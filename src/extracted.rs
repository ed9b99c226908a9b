//! Validation of extracted data against the requested schema.

use serde_json::Value;

use crate::error::{ValidateError, Violation};
use crate::prepare::prepare_schema;
use crate::types::PrepareOptions;

/// Validate data returned by an extraction against the caller's schema.
///
/// The schema goes through [`prepare_schema`] first, so the data is checked
/// against exactly what the extraction was asked to produce.
///
/// # Errors
///
/// Returns `ValidateError::Prepare` if the schema cannot be prepared, or
/// `ValidateError::Invalid` with every violation found.
pub fn validate_extracted(schema: &Value, data: &Value) -> Result<(), ValidateError> {
    let prepared = prepare_schema(schema, &PrepareOptions::default())?;
    validate_against_schema(&prepared, data)
}

/// Validate data against a schema as-is, without preparation.
///
/// Local `$ref`s are resolved by the validator, so recursive schemas are fine.
pub fn validate_against_schema(schema: &Value, data: &Value) -> Result<(), ValidateError> {
    let validator = jsonschema::validator_for(schema).map_err(|e| ValidateError::InvalidSchema {
        message: e.to_string(),
    })?;

    let errors: Vec<Violation> = validator
        .iter_errors(data)
        .map(|e| Violation {
            path: e.instance_path.to_string(),
            message: e.to_string(),
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidateError::Invalid { errors })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PrepareError;
    use serde_json::json;

    fn product_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "price": { "type": "number" }
            },
            "required": ["name", "price", "sku"]
        })
    }

    #[test]
    fn valid_data() {
        let data = json!({ "name": "Lamp", "price": 19.5 });
        assert!(validate_extracted(&product_schema(), &data).is_ok());
    }

    #[test]
    fn pruned_required_not_enforced() {
        // "sku" is not a declared property, so preparation drops it.
        let data = json!({ "name": "Lamp", "price": 19.5 });
        assert!(validate_against_schema(&product_schema(), &data).is_err());
        assert!(validate_extracted(&product_schema(), &data).is_ok());
    }

    #[test]
    fn collects_all_violations() {
        let data = json!({ "name": 7, "price": "cheap" });
        match validate_extracted(&product_schema(), &data) {
            Err(ValidateError::Invalid { errors }) => {
                assert_eq!(errors.len(), 2);
                assert!(errors.iter().any(|e| e.path == "/name"));
                assert!(errors.iter().any(|e| e.path == "/price"));
            }
            other => panic!("expected two violations, got {:?}", other),
        }
    }

    #[test]
    fn recursive_schema_validates_nested_data() {
        let schema = json!({
            "type": "object",
            "properties": { "root": { "$ref": "#/$defs/TreeNode" } },
            "$defs": {
                "TreeNode": {
                    "type": "object",
                    "properties": {
                        "value": { "type": "string" },
                        "children": { "type": "array", "items": { "$ref": "#/$defs/TreeNode" } }
                    },
                    "required": ["value"]
                }
            }
        });
        let good = json!({ "root": { "value": "a", "children": [{ "value": "b", "children": [] }] } });
        assert!(validate_extracted(&schema, &good).is_ok());

        let bad = json!({ "root": { "value": "a", "children": [{ "children": [] }] } });
        assert!(matches!(
            validate_extracted(&schema, &bad),
            Err(ValidateError::Invalid { .. })
        ));
    }

    #[test]
    fn incompatible_schema_fails_preparation() {
        let schema = json!({ "type": "object", "additionalProperties": true });
        assert!(matches!(
            validate_extracted(&schema, &json!({})),
            Err(ValidateError::Prepare(PrepareError::Incompatible))
        ));
    }

    #[test]
    fn malformed_schema_reported() {
        let schema = json!({ "type": "not-a-type" });
        assert!(matches!(
            validate_against_schema(&schema, &json!({})),
            Err(ValidateError::InvalidSchema { .. })
        ));
    }
}
