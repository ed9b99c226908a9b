//! Request preparation - the single entry point the request builder calls
//! before a schema goes over the wire.
//!
//! Pipeline: cycle check → reference resolution (acyclic documents only) →
//! normalization → structural validation.

use serde_json::{Map, Value};
use tracing::debug;

use crate::cycles::any_definition_is_circular;
use crate::error::PrepareError;
use crate::normalizer::normalize;
use crate::resolver::{has_unresolved_refs, resolve_refs};
use crate::selector::has_recursive_structure;
use crate::types::{definitions, json_type_name, PrepareOptions};
use crate::validator::find_open_dictionary;

const JSON_FORMAT_SHAPE: &str =
    "json format must be an object with 'type', 'prompt', and 'schema' fields";
const JSON_FORMAT_TYPE: &str = "json format must have type='json'";

/// Prepare a caller schema for the structured-output consumer.
///
/// Local references are inlined only when no definition is circular and
/// every reference resolves; otherwise the document keeps its references.
///
/// # Errors
///
/// Returns `PrepareError::InvalidSchemaType` for non-object input and
/// `PrepareError::Incompatible` if the normalized schema still contains a
/// schema-less open dictionary.
pub fn prepare_schema(schema: &Value, options: &PrepareOptions) -> Result<Value, PrepareError> {
    if !schema.is_object() {
        return Err(PrepareError::InvalidSchemaType {
            actual: json_type_name(schema).to_string(),
        });
    }

    let expanded = if options.resolve_refs {
        expand_local_refs(schema)
    } else {
        schema.clone()
    };

    let normalized = normalize(&expanded);

    if options.validate {
        if let Some(pointer) = find_open_dictionary(&normalized) {
            debug!(pointer = %pointer, "schema-less open dictionary after normalization");
            return Err(PrepareError::Incompatible);
        }
    }

    Ok(normalized)
}

/// Prepare a `json` format object (`{"type": "json", "prompt": ..., "schema": ...}`).
///
/// An object schema is replaced with its prepared form. Any other `schema`
/// value, and every other field, is copied unchanged.
///
/// # Errors
///
/// Returns `PrepareError::InvalidJsonFormat` if the format is not an object
/// of type `json`, or any error from [`prepare_schema`].
pub fn prepare_json_format(format: &Value) -> Result<Value, PrepareError> {
    let Value::Object(map) = format else {
        return Err(PrepareError::InvalidJsonFormat {
            message: JSON_FORMAT_SHAPE.to_string(),
        });
    };
    if map.get("type").and_then(Value::as_str) != Some("json") {
        return Err(PrepareError::InvalidJsonFormat {
            message: JSON_FORMAT_TYPE.to_string(),
        });
    }

    let mut prepared = map.clone();
    if let Some(schema) = map.get("schema").filter(|s| s.is_object()) {
        let schema = prepare_schema(schema, &PrepareOptions::default())?;
        prepared.insert("schema".to_string(), schema);
    }
    Ok(Value::Object(prepared))
}

/// Prepare the schema stored under `key` in a request container.
///
/// Containers that are not objects, lack `key`, or hold a non-object value
/// under it are returned unchanged.
pub fn prepare_schema_field(container: &Value, key: &str) -> Result<Value, PrepareError> {
    let Some(schema) = container
        .as_object()
        .and_then(|map| map.get(key))
        .filter(|schema| schema.is_object())
    else {
        return Ok(container.clone());
    };

    let prepared = prepare_schema(schema, &PrepareOptions::default())?;
    let mut out = container.clone();
    out[key] = prepared;
    Ok(out)
}

fn expand_local_refs(schema: &Value) -> Value {
    if !has_recursive_structure(schema) {
        return schema.clone();
    }

    let empty = Map::new();
    let defs = definitions(schema).unwrap_or(&empty);

    if any_definition_is_circular(Some(defs)) {
        debug!("circular definitions; keeping references");
        return schema.clone();
    }

    let resolved = resolve_refs(schema, defs);
    if has_unresolved_refs(&resolved) {
        debug!("unresolvable references remain; keeping original document");
        return schema.clone();
    }
    resolved
}
