//! Structural validation against the target dialect.

use serde_json::{Map, Value};

use crate::types::{escape_pointer_token, is_object_type, SchemaNode};
use crate::visit::{node_id, ActivePath};

/// Check whether a schema can be represented in the target dialect.
///
/// The one unsupported shape is a schema-less open dictionary: an object
/// schema with neither `properties` nor `patternProperties` that sets
/// `additionalProperties: true`. `$ref` nodes are not followed.
///
/// Non-object input is vacuously compatible.
pub fn is_compatible(schema: &Value) -> bool {
    find_open_dictionary(schema).is_none()
}

/// Returns the JSON Pointer of the first open dictionary in the schema,
/// in document order. The root is `""`.
pub fn find_open_dictionary(schema: &Value) -> Option<String> {
    let scan = Scan {
        path: ActivePath::new(),
    };
    scan.visit(schema, "")
}

/// Returns true if this object node is a schema-less open dictionary.
pub fn is_open_dictionary(map: &Map<String, Value>) -> bool {
    is_object_type(map)
        && !map.contains_key("properties")
        && !map.contains_key("patternProperties")
        && map.get("additionalProperties") == Some(&Value::Bool(true))
}

struct Scan {
    path: ActivePath<usize>,
}

impl Scan {
    fn visit(&self, value: &Value, pointer: &str) -> Option<String> {
        let SchemaNode::Object(map) = SchemaNode::classify(value) else {
            return None;
        };
        let _guard = self.path.enter(node_id(value))?;

        if is_open_dictionary(map) {
            return Some(pointer.to_string());
        }

        for (key, child) in map {
            let child_pointer = format!("{}/{}", pointer, escape_pointer_token(key));
            match child {
                Value::Object(_) => {
                    if let Some(found) = self.visit(child, &child_pointer) {
                        return Some(found);
                    }
                }
                Value::Array(items) => {
                    for (i, item) in items.iter().enumerate() {
                        let item_pointer = format!("{}/{}", child_pointer, i);
                        if let Some(found) = self.visit(item, &item_pointer) {
                            return Some(found);
                        }
                    }
                }
                _ => {}
            }
        }
        None
    }
}
