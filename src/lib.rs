//! Structured-output schema compatibility
//!
//! Prepares caller-supplied JSON Schemas for a strict structured-output
//! consumer: one that rejects schema-less open objects and handles
//! self-referential types poorly.
//!
//! # Example
//!
//! ```
//! use schema_compat::{is_compatible, normalize};
//! use serde_json::json;
//!
//! let schema = json!({
//!     "type": "object",
//!     "properties": {
//!         "name": { "type": "string" }
//!     },
//!     "required": ["name", "age"],
//!     "additionalProperties": true
//! });
//!
//! let normalized = normalize(&schema);
//!
//! // "age" is not a declared property, and the open flag is redundant
//! assert_eq!(normalized["required"], json!(["name"]));
//! assert!(normalized.get("additionalProperties").is_none());
//! assert!(is_compatible(&normalized));
//! ```
//!
//! # Pipeline
//!
//! | Step | Function | On failure |
//! |------|----------|------------|
//! | Cycle check | [`any_definition_is_circular`] | keep `$ref`s |
//! | Resolution | [`resolve_refs`] | leave reference unresolved |
//! | Normalization | [`normalize`] | never fails |
//! | Validation | [`is_compatible`] | [`PrepareError::Incompatible`] |
//!
//! [`prepare_schema`] runs the whole pipeline. [`select_strategy`] picks the
//! downstream model from the same document independently.
//!
//! # Cycles
//!
//! Definitions may reference each other in cycles of any length. Every walk
//! tracks the nodes on its active path and stops on re-entry, so all
//! operations terminate with work bounded by the number of nodes.

mod cycles;
mod error;
mod extracted;
mod linter;
mod loader;
mod normalizer;
mod prepare;
mod resolver;
mod selector;
mod types;
mod validator;
mod visit;

pub use cycles::{
    any_definition_is_circular, circular_definitions, contains_recursive_ref, reaches_self,
};
pub use error::{LoadError, PrepareError, ValidateError, Violation, INCOMPATIBLE_SCHEMA_MESSAGE};
pub use extracted::{validate_against_schema, validate_extracted};
pub use linter::{lint, lint_file, Diagnostic, FileResult, FileStatus, LintResult, Severity};
pub use loader::{is_url, load_schema, load_schema_auto, load_schema_str, SchemaSource};
pub use normalizer::normalize;
pub use prepare::{prepare_json_format, prepare_schema, prepare_schema_field};
pub use resolver::{has_unresolved_refs, resolve_refs, resolve_refs_at};
pub use selector::{has_recursive_structure, select_strategy};
pub use types::{
    definitions, json_type_name, LocalRef, PrepareOptions, Reason, SchemaNode, Strategy,
    BASELINE_MODEL, MAX_REF_DEPTH, RECURSIVE_MODEL,
};
pub use validator::{find_open_dictionary, is_compatible, is_open_dictionary};

#[cfg(feature = "remote")]
pub use loader::load_schema_url;
