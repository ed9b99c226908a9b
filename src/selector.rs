//! Strategy selection from a cheap recursion scan.

use serde_json::Value;
use tracing::debug;

use crate::types::{is_present, Reason, Strategy, DEFINITIONS_KEYS};

/// Substrings of a serialized document that indicate pointer references.
const REF_MARKERS: &[&str] = &["\"$ref\"", "#/$defs/", "#/definitions/"];

/// Detect whether a schema document may contain recursive structure.
///
/// This is a presence scan, not a semantic analysis: any reference, or a
/// non-empty `$defs`/`definitions` table, counts.
pub fn has_recursive_structure(schema: &Value) -> bool {
    let Value::Object(map) = schema else {
        return false;
    };
    if map.is_empty() {
        return false;
    }

    let document = schema.to_string();
    let has_refs = REF_MARKERS.iter().any(|marker| document.contains(marker));
    let has_defs = DEFINITIONS_KEYS
        .iter()
        .any(|key| map.get(*key).is_some_and(is_present));

    has_refs || has_defs
}

/// Pick the downstream strategy for a request's schema.
pub fn select_strategy(schema: Option<&Value>) -> Strategy {
    let strategy = match schema {
        Some(schema) if is_present(schema) => {
            if has_recursive_structure(schema) {
                Strategy::recursive()
            } else {
                Strategy::baseline(Reason::SimpleSchema)
            }
        }
        _ => Strategy::baseline(Reason::NoSchema),
    };
    debug!(model = strategy.model, reason = %strategy.reason, "selected extraction strategy");
    strategy
}
