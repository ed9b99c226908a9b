//! Cycle detection over a definitions table.
//!
//! A definition is circular when a reference reachable from its body points
//! back at the definition itself, directly or through other definitions.
//!
//! Re-entrancy is guarded by a key-sorted serialization of each visited node
//! rather than by node identity. Two structurally identical nodes on the
//! same path are therefore treated as one; the walk stays finite either way.
//! Within one query a definition body is searched at most once, so shared
//! sub-definitions do not multiply the work.

use std::cell::RefCell;
use std::collections::HashSet;

use serde_json::{Map, Value};
use tracing::debug;

use crate::types::{is_present, LocalRef, SchemaNode};
use crate::visit::ActivePath;

/// Check whether `node` contains a reference that reaches `target`,
/// following intermediate definitions in `defs`.
///
/// References are looked up by definition name alone: `#/$defs/X` and
/// `#/definitions/X` both name the entry `X` of `defs`.
pub fn contains_recursive_ref(node: &Value, target: &str, defs: &Map<String, Value>) -> bool {
    let search = CycleSearch {
        target,
        defs,
        path: ActivePath::new(),
        exhausted: RefCell::new(HashSet::new()),
    };
    search.reaches(node)
}

/// Check whether the definition `name` is reachable from its own body.
///
/// Returns false when `name` is not in `defs`.
pub fn reaches_self(name: &str, defs: &Map<String, Value>) -> bool {
    defs.get(name)
        .map(|body| contains_recursive_ref(body, name, defs))
        .unwrap_or(false)
}

/// Returns true if any definition in the table is self- or mutually recursive.
pub fn any_definition_is_circular(defs: Option<&Map<String, Value>>) -> bool {
    let Some(defs) = defs else {
        return false;
    };
    let circular = defs.keys().find(|name| reaches_self(name, defs));
    if let Some(name) = circular {
        debug!(definition = %name, "circular definition found");
    }
    circular.is_some()
}

/// Names of all circular definitions, in table order.
pub fn circular_definitions(defs: &Map<String, Value>) -> Vec<&str> {
    defs.keys()
        .filter(|name| reaches_self(name, defs))
        .map(String::as_str)
        .collect()
}

/// One reachability query for `target`.
struct CycleSearch<'a> {
    target: &'a str,
    defs: &'a Map<String, Value>,
    path: ActivePath<String>,
    /// Definitions whose bodies were searched without reaching `target`.
    exhausted: RefCell<HashSet<String>>,
}

impl CycleSearch<'_> {
    fn reaches(&self, node: &Value) -> bool {
        if !matches!(node, Value::Object(_) | Value::Array(_)) || !is_present(node) {
            return false;
        }

        let Some(_guard) = self.path.enter(canonical_key(node)) else {
            return false;
        };

        match SchemaNode::classify(node) {
            SchemaNode::Reference(map) => {
                if let Some(local) = LocalRef::of(map) {
                    if local.name == self.target {
                        return true;
                    }
                    if let Some(body) = self.defs.get(&local.name) {
                        return self.reaches_definition(&local.name, body);
                    }
                }
                // Dangling or malformed: look through the siblings instead.
                map.values().any(|child| self.reaches(child))
            }
            SchemaNode::Object(map) => map.values().any(|child| self.reaches(child)),
            SchemaNode::Array(items) => items.iter().any(|item| self.reaches(item)),
            SchemaNode::Scalar(_) => false,
        }
    }

    fn reaches_definition(&self, name: &str, body: &Value) -> bool {
        if self.exhausted.borrow().contains(name) {
            return false;
        }
        let found = self.reaches(body);
        if !found {
            self.exhausted.borrow_mut().insert(name.to_string());
        }
        found
    }
}

/// Serialize a value with object keys sorted, so equal values share a key
/// regardless of insertion order.
fn canonical_key(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        other => out.push_str(&other.to_string()),
    }
}
