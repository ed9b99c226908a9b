//! Reference resolution - inlines local `$ref` pointers from a definitions table.

use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::types::{
    LocalRef, SchemaNode, DEFINITIONS_KEYS, MAX_REF_DEPTH, MEMBER_MAP_KEYS, REF_KEY,
};
use crate::visit::{node_id, ActivePath};

/// Resolve local references in `node` against `defs`.
///
/// Each `{"$ref": "#/$defs/Name"}` is replaced with a resolved copy of the
/// definition body. Definitions tables are dropped from the output.
///
/// `defs` is a single table looked up by name, so `#/$defs/Name` and
/// `#/definitions/Name` both resolve to its `Name` entry.
///
/// Resolution never fails. A reference is left as-is when:
/// - it is not a local definitions pointer, or names a missing definition
/// - following it would exceed [`MAX_REF_DEPTH`] pointer hops
/// - its target is already being expanded further up the path (a cycle)
pub fn resolve_refs(node: &Value, defs: &Map<String, Value>) -> Value {
    resolve_refs_at(node, defs, 0)
}

/// Like [`resolve_refs`], starting from `depth` pointer hops already taken.
pub fn resolve_refs_at(node: &Value, defs: &Map<String, Value>, depth: usize) -> Value {
    let walk = RefWalk {
        defs,
        path: ActivePath::new(),
    };
    walk.resolve(node, depth)
}

/// Returns true if any object in the tree still carries a `$ref`.
pub fn has_unresolved_refs(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.contains_key(REF_KEY) || map.values().any(has_unresolved_refs),
        Value::Array(items) => items.iter().any(has_unresolved_refs),
        _ => false,
    }
}

struct RefWalk<'d> {
    defs: &'d Map<String, Value>,
    path: ActivePath<usize>,
}

impl RefWalk<'_> {
    fn resolve(&self, node: &Value, hops: usize) -> Value {
        if hops > MAX_REF_DEPTH {
            return node.clone();
        }
        if let SchemaNode::Scalar(_) = SchemaNode::classify(node) {
            return node.clone();
        }

        let Some(_guard) = self.path.enter(node_id(node)) else {
            trace!("node revisited during resolution; leaving it unresolved");
            return node.clone();
        };

        match SchemaNode::classify(node) {
            SchemaNode::Reference(map) => match map.get(REF_KEY).and_then(Value::as_str) {
                Some(pointer) => self.follow(node, pointer, hops),
                None => self.resolve_object(map, hops),
            },
            SchemaNode::Object(map) => self.resolve_object(map, hops),
            SchemaNode::Array(items) => {
                Value::Array(items.iter().map(|item| self.resolve(item, hops)).collect())
            }
            SchemaNode::Scalar(value) => value.clone(),
        }
    }

    fn follow(&self, node: &Value, pointer: &str, hops: usize) -> Value {
        let Some(local) = LocalRef::parse(pointer) else {
            trace!(pointer, "not a local definitions pointer");
            return node.clone();
        };
        let Some(body) = self.defs.get(&local.name) else {
            debug!(pointer, "definition not found; leaving reference unresolved");
            return node.clone();
        };
        if hops >= MAX_REF_DEPTH {
            debug!(pointer, max = MAX_REF_DEPTH, "reference hop limit reached");
            return node.clone();
        }
        if self.path.contains(&node_id(body)) {
            trace!(pointer, "circular reference; keeping pointer");
            return node.clone();
        }
        self.resolve(body, hops + 1)
    }

    fn resolve_object(&self, map: &Map<String, Value>, hops: usize) -> Value {
        let resolved = map
            .iter()
            .filter(|(key, _)| !DEFINITIONS_KEYS.contains(&key.as_str()))
            .map(|(key, value)| {
                let value = match value {
                    Value::Object(members) if MEMBER_MAP_KEYS.contains(&key.as_str()) => {
                        self.resolve_members(members, hops)
                    }
                    _ => self.resolve(value, hops),
                };
                (key.clone(), value)
            })
            .collect();
        Value::Object(resolved)
    }

    /// Resolve each subschema of a name-to-schema map. Member names are
    /// kept as-is, even when they spell a keyword.
    fn resolve_members(&self, members: &Map<String, Value>, hops: usize) -> Value {
        let resolved = members
            .iter()
            .map(|(name, schema)| (name.clone(), self.resolve(schema, hops)))
            .collect();
        Value::Object(resolved)
    }
}
