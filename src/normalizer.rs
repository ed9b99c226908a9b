//! Compatibility normalization for strict structured-output consumers.
//!
//! The rewrite is pure and idempotent. References are never expanded here,
//! so normalization terminates on any graph shape; expansion is the
//! resolver's job.

use serde_json::{Map, Value};
use tracing::trace;

use crate::types::{is_object_type, SchemaNode, DEFINITIONS_KEYS, MEMBER_MAP_KEYS};
use crate::visit::{node_id, ActivePath};

/// Normalize a schema for the target dialect.
///
/// On every object schema (`"type": "object"`):
/// - `additionalProperties: true` is dropped when `properties` is declared;
///   `false` is kept.
/// - `required` is filtered down to names present in `properties`, and
///   removed entirely when nothing is left.
///
/// `$ref` nodes are copied verbatim. A node holding a definitions table has
/// each definition normalized on its own and the table re-attached last;
/// the object rules above are not applied to that node itself.
///
/// Non-object and empty input is returned unchanged.
pub fn normalize(schema: &Value) -> Value {
    match schema {
        Value::Object(map) if !map.is_empty() => Normalizer::new().node(schema),
        other => other.clone(),
    }
}

/// What to do with an object's `required` keyword.
enum RequiredRule {
    Keep,
    Replace(Value),
    Drop,
}

struct Normalizer {
    path: ActivePath<usize>,
}

impl Normalizer {
    fn new() -> Self {
        Self {
            path: ActivePath::new(),
        }
    }

    fn node(&self, value: &Value) -> Value {
        match SchemaNode::classify(value) {
            SchemaNode::Reference(_) | SchemaNode::Scalar(_) => value.clone(),
            SchemaNode::Array(items) => Value::Array(items.iter().map(|item| self.node(item)).collect()),
            SchemaNode::Object(map) => {
                let Some(_guard) = self.path.enter(node_id(value)) else {
                    return value.clone();
                };
                if map.keys().any(|key| DEFINITIONS_KEYS.contains(&key.as_str())) {
                    self.with_definitions(map)
                } else {
                    self.object(map)
                }
            }
        }
    }

    /// Normalize a keyword value: objects recurse, arrays recurse one level
    /// into their object members, everything else is copied.
    fn child(&self, value: &Value) -> Value {
        match value {
            Value::Object(_) => self.node(value),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| if item.is_object() { self.node(item) } else { item.clone() })
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// Normalize the value of `key`. Name-to-schema maps normalize each
    /// member as a schema, so a member named like a keyword stays a member.
    fn keyword(&self, key: &str, value: &Value) -> Value {
        match value {
            Value::Object(members) if MEMBER_MAP_KEYS.contains(&key) => Value::Object(
                members
                    .iter()
                    .map(|(name, schema)| (name.clone(), self.node(schema)))
                    .collect(),
            ),
            other => self.child(other),
        }
    }

    fn with_definitions(&self, map: &Map<String, Value>) -> Value {
        let mut out = Map::new();
        let mut tables = Vec::new();

        for (key, value) in map {
            if DEFINITIONS_KEYS.contains(&key.as_str()) {
                tables.push((key, value));
            } else {
                out.insert(key.clone(), self.keyword(key, value));
            }
        }

        for (key, table) in tables {
            let normalized = match table {
                Value::Object(entries) => Value::Object(
                    entries
                        .iter()
                        .map(|(name, body)| (name.clone(), self.node(body)))
                        .collect(),
                ),
                other => other.clone(),
            };
            out.insert(key.clone(), normalized);
        }

        Value::Object(out)
    }

    fn object(&self, map: &Map<String, Value>) -> Value {
        let object_type = is_object_type(map);
        let drop_open_flag = object_type
            && map.contains_key("properties")
            && map.get("additionalProperties") == Some(&Value::Bool(true));
        let required = if object_type {
            required_rule(map)
        } else {
            RequiredRule::Keep
        };

        let mut out = Map::new();
        for (key, value) in map {
            match key.as_str() {
                "additionalProperties" if drop_open_flag => {
                    trace!("dropping additionalProperties: true next to declared properties");
                }
                "required" => match &required {
                    RequiredRule::Keep => {
                        out.insert(key.clone(), self.child(value));
                    }
                    RequiredRule::Replace(names) => {
                        out.insert(key.clone(), names.clone());
                    }
                    RequiredRule::Drop => trace!("dropping required: no declared property left"),
                },
                _ => {
                    out.insert(key.clone(), self.keyword(key, value));
                }
            }
        }
        Value::Object(out)
    }
}

fn required_rule(map: &Map<String, Value>) -> RequiredRule {
    let (Some(required), Some(properties)) = (map.get("required"), map.get("properties")) else {
        return RequiredRule::Keep;
    };
    let (Value::Array(names), Value::Object(props)) = (required, properties) else {
        return RequiredRule::Drop;
    };

    let kept: Vec<Value> = names
        .iter()
        .filter(|name| name.as_str().is_some_and(|n| props.contains_key(n)))
        .cloned()
        .collect();

    if kept.is_empty() {
        RequiredRule::Drop
    } else if kept.len() == names.len() {
        RequiredRule::Keep
    } else {
        RequiredRule::Replace(Value::Array(kept))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn removes_open_flag_next_to_properties() {
        let schema = json!({
            "type": "object",
            "properties": { "name": { "type": "string" } },
            "additionalProperties": true
        });
        let result = normalize(&schema);
        assert!(result.get("additionalProperties").is_none());
        assert_eq!(result["properties"]["name"]["type"], "string");
    }

    #[test]
    fn keeps_closed_flag() {
        let schema = json!({
            "type": "object",
            "properties": { "name": { "type": "string" } },
            "additionalProperties": false
        });
        assert_eq!(normalize(&schema), schema);
    }

    #[test]
    fn keeps_open_flag_without_properties() {
        // Nothing to normalize here; the validator rejects this shape.
        let schema = json!({ "type": "object", "additionalProperties": true });
        assert_eq!(normalize(&schema), schema);
    }

    #[test]
    fn filters_required_to_declared_properties() {
        let schema = json!({
            "type": "object",
            "properties": { "name": { "type": "string" } },
            "required": ["name", "age", "email"]
        });
        assert_eq!(normalize(&schema)["required"], json!(["name"]));
    }

    #[test]
    fn removes_required_when_nothing_left() {
        let schema = json!({
            "type": "object",
            "properties": { "name": { "type": "string" } },
            "required": ["age"]
        });
        assert!(normalize(&schema).get("required").is_none());
    }

    #[test]
    fn removes_required_with_wrong_shape() {
        let schema = json!({
            "type": "object",
            "properties": { "name": { "type": "string" } },
            "required": "name"
        });
        assert!(normalize(&schema).get("required").is_none());
    }

    #[test]
    fn required_untouched_without_object_type() {
        let schema = json!({
            "properties": { "name": { "type": "string" } },
            "required": ["name", "age"]
        });
        assert_eq!(normalize(&schema), schema);
    }

    #[test]
    fn preserves_reference_node() {
        let schema = json!({ "$ref": "#/$defs/Person", "additionalProperties": true });
        assert_eq!(normalize(&schema), schema);
    }

    #[test]
    fn normalizes_each_definition() {
        let schema = json!({
            "type": "object",
            "properties": { "data": { "$ref": "#/$defs/Node" } },
            "$defs": {
                "Node": {
                    "type": "object",
                    "properties": {
                        "value": { "type": "string" },
                        "nested": { "$ref": "#/$defs/Node" }
                    },
                    "required": ["value", "another_nonexistent"],
                    "additionalProperties": true
                }
            }
        });
        let result = normalize(&schema);
        let node = &result["$defs"]["Node"];
        assert_eq!(node["required"], json!(["value"]));
        assert!(node.get("additionalProperties").is_none());
        assert_eq!(node["properties"]["nested"], json!({ "$ref": "#/$defs/Node" }));
        assert_eq!(result["properties"]["data"], json!({ "$ref": "#/$defs/Node" }));
    }

    #[test]
    fn definitions_table_reattached_last() {
        let schema = json!({
            "$defs": { "A": { "type": "string" } },
            "type": "object",
            "properties": { "a": { "$ref": "#/$defs/A" } }
        });
        let result = normalize(&schema);
        let keys: Vec<&str> = result.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["type", "properties", "$defs"]);
    }

    #[test]
    fn root_required_kept_next_to_definitions() {
        let schema = json!({
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "child": { "$ref": "#/$defs/Node" }
            },
            "required": ["name", "child", "nonexistent_field"],
            "$defs": {
                "Node": { "type": "object", "properties": { "value": { "type": "string" } } }
            }
        });
        let result = normalize(&schema);
        assert_eq!(result["required"], json!(["name", "child", "nonexistent_field"]));
    }

    #[test]
    fn property_named_definitions_is_a_schema() {
        let schema = json!({
            "type": "object",
            "properties": {
                "definitions": {
                    "type": "object",
                    "properties": { "a": { "type": "string" } },
                    "required": ["a", "ghost"],
                    "additionalProperties": true
                }
            },
            "required": ["definitions"]
        });
        let result = normalize(&schema);
        let field = &result["properties"]["definitions"];
        assert_eq!(field["required"], json!(["a"]));
        assert!(field.get("additionalProperties").is_none());
        assert_eq!(result["required"], json!(["definitions"]));
    }

    #[test]
    fn normalizes_nested_objects_and_arrays() {
        let schema = json!({
            "type": "object",
            "properties": {
                "tags": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": { "label": { "type": "string" } },
                        "required": ["label", "weight"],
                        "additionalProperties": true
                    }
                },
                "choice": {
                    "anyOf": [
                        { "type": "object", "properties": { "x": {} }, "additionalProperties": true },
                        { "type": "null" }
                    ]
                }
            }
        });
        let result = normalize(&schema);
        let item = &result["properties"]["tags"]["items"];
        assert_eq!(item["required"], json!(["label"]));
        assert!(item.get("additionalProperties").is_none());
        assert!(result["properties"]["choice"]["anyOf"][0]
            .get("additionalProperties")
            .is_none());
        assert_eq!(result["properties"]["choice"]["anyOf"][1], json!({ "type": "null" }));
    }

    #[test]
    fn non_object_input_unchanged() {
        assert_eq!(normalize(&json!(null)), json!(null));
        assert_eq!(normalize(&json!("schema")), json!("schema"));
        assert_eq!(normalize(&json!({})), json!({}));
        assert_eq!(normalize(&json!([1, 2])), json!([1, 2]));
    }

    #[test]
    fn idempotent() {
        let schema = json!({
            "type": "object",
            "properties": {
                "a": { "type": "object", "properties": { "b": {} }, "required": ["b", "c"], "additionalProperties": true },
                "r": { "$ref": "#/$defs/R" }
            },
            "required": ["a", "zzz"],
            "$defs": {
                "R": { "type": "object", "properties": { "r": { "$ref": "#/$defs/R" } }, "required": ["q"] }
            }
        });
        let once = normalize(&schema);
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn does_not_mutate_input() {
        let schema = json!({
            "type": "object",
            "properties": { "name": { "type": "string" } },
            "required": ["name", "age"],
            "additionalProperties": true
        });
        let before = schema.clone();
        let _ = normalize(&schema);
        assert_eq!(schema, before);
    }
}
