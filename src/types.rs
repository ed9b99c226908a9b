//! Core types for schema normalization.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

/// Keyword holding a pointer reference.
pub const REF_KEY: &str = "$ref";

/// Keywords holding a definitions table, in lookup order.
pub const DEFINITIONS_KEYS: &[&str] = &["$defs", "definitions"];

/// Keywords whose value maps user-chosen names to subschemas. Member names
/// are data, never keywords.
pub const MEMBER_MAP_KEYS: &[&str] = &["properties", "patternProperties"];

/// Maximum number of pointer hops followed by the reference resolver.
pub const MAX_REF_DEPTH: usize = 10;

/// Model used when the schema is absent or has no recursive structure.
pub const BASELINE_MODEL: &str = "gpt-4o-mini";

/// Model used when the schema relies on references or definitions.
pub const RECURSIVE_MODEL: &str = "gpt-4o";

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Returns true if a value carries content: non-empty containers and strings,
/// `true`, non-zero numbers.
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Escape a key for use as a JSON Pointer (RFC 6901) token.
pub fn escape_pointer_token(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

/// Returns true if the object declares `"type": "object"`.
pub fn is_object_type(map: &Map<String, Value>) -> bool {
    map.get("type").and_then(Value::as_str) == Some("object")
}

/// Returns the definitions table embedded in a schema document, if any.
///
/// `$defs` wins over the older `definitions` keyword when both exist.
pub fn definitions(schema: &Value) -> Option<&Map<String, Value>> {
    let map = schema.as_object()?;
    DEFINITIONS_KEYS
        .iter()
        .find_map(|key| map.get(*key).and_then(Value::as_object))
}

/// A borrowed view of a schema value.
///
/// Walkers match on this instead of probing keys ad hoc, so the
/// "references are opaque" rule lives in one place.
#[derive(Debug, Clone, Copy)]
pub enum SchemaNode<'a> {
    /// An object carrying a `$ref` keyword.
    Reference(&'a Map<String, Value>),
    /// Any other object.
    Object(&'a Map<String, Value>),
    Array(&'a [Value]),
    Scalar(&'a Value),
}

impl<'a> SchemaNode<'a> {
    pub fn classify(value: &'a Value) -> Self {
        match value {
            Value::Object(map) if map.contains_key(REF_KEY) => SchemaNode::Reference(map),
            Value::Object(map) => SchemaNode::Object(map),
            Value::Array(items) => SchemaNode::Array(items),
            other => SchemaNode::Scalar(other),
        }
    }
}

/// A pointer into the document's definitions table, e.g. `#/$defs/Person`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalRef {
    /// Table keyword the pointer names (`$defs` or `definitions`).
    pub table: String,
    /// Definition name, unescaped.
    pub name: String,
}

impl LocalRef {
    /// Parse a pointer string.
    ///
    /// Returns `None` for anything other than exactly `#/<table>/<name>`;
    /// such references are opaque to every walker.
    pub fn parse(pointer: &str) -> Option<Self> {
        let mut parts = pointer.split('/');
        let (Some("#"), Some(table), Some(name), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return None;
        };
        if !DEFINITIONS_KEYS.contains(&table) || name.is_empty() {
            return None;
        }
        Some(LocalRef {
            table: table.to_string(),
            name: name.replace("~1", "/").replace("~0", "~"),
        })
    }

    /// Parse the `$ref` keyword of an object node.
    pub fn of(map: &Map<String, Value>) -> Option<Self> {
        map.get(REF_KEY)
            .and_then(Value::as_str)
            .and_then(LocalRef::parse)
    }
}

/// Why a strategy was selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    NoSchema,
    RecursiveSchemaDetected,
    SimpleSchema,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::NoSchema => "no_schema",
            Reason::RecursiveSchemaDetected => "recursive_schema_detected",
            Reason::SimpleSchema => "simple_schema",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Downstream processing strategy for an extraction request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Strategy {
    /// Model identifier sent with the request.
    pub model: &'static str,
    pub reason: Reason,
}

impl Strategy {
    pub(crate) fn baseline(reason: Reason) -> Self {
        Self {
            model: BASELINE_MODEL,
            reason,
        }
    }

    pub(crate) fn recursive() -> Self {
        Self {
            model: RECURSIVE_MODEL,
            reason: Reason::RecursiveSchemaDetected,
        }
    }
}

/// Options for schema preparation.
#[derive(Debug, Clone, Copy)]
pub struct PrepareOptions {
    /// Inline local references when no definition is circular.
    pub resolve_refs: bool,
    /// Reject schemas that still contain an open dictionary after
    /// normalization.
    pub validate: bool,
}

impl Default for PrepareOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl PrepareOptions {
    /// Resolution and validation both enabled.
    pub fn new() -> Self {
        Self {
            resolve_refs: true,
            validate: true,
        }
    }

    pub fn resolve_refs(mut self, resolve_refs: bool) -> Self {
        self.resolve_refs = resolve_refs;
        self
    }

    pub fn validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }
}
