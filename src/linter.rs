//! Schema linting - static checks of structured-output schema files.
//!
//! Reports, per file:
//! - `E001` JSON syntax errors
//! - `E002` local references to a definition that does not exist
//! - `E003` schema-less open dictionaries left after normalization
//! - `W001` references that are not local definitions pointers
//! - `W002` `required` names with no matching property (pruned on prepare)

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::loader::load_schema;
use crate::normalizer::normalize;
use crate::types::{
    definitions, escape_pointer_token, is_object_type, json_type_name, LocalRef, REF_KEY,
};
use crate::validator::find_open_dictionary;

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic message from linting.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub file: PathBuf,
    /// JSON Pointer to the offending node ("/" for the root).
    pub path: String,
    pub message: String,
}

/// Result of linting a single file.
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub file: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Status of a linted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Ok,
    Error,
    Warning,
}

/// Result of linting a directory or set of files.
#[derive(Debug, Clone, Serialize)]
pub struct LintResult {
    pub path: PathBuf,
    pub files_checked: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub results: Vec<FileResult>,
}

impl LintResult {
    /// Returns true if no file produced an error.
    pub fn is_ok(&self) -> bool {
        self.errors == 0
    }
}

/// Lint a file or every `.json` file under a directory.
///
/// With `strict`, files with warnings count as failed.
pub fn lint(path: &Path, strict: bool) -> LintResult {
    let files = collect_schema_files(path);
    let results: Vec<FileResult> = files.iter().map(|file| lint_file(file, path)).collect();

    let count = |severity: Severity| {
        results
            .iter()
            .flat_map(|r| &r.diagnostics)
            .filter(|d| d.severity == severity)
            .count()
    };
    let errors = count(Severity::Error);
    let warnings = count(Severity::Warning);

    let failed = results
        .iter()
        .filter(|r| match r.status {
            FileStatus::Error => true,
            FileStatus::Warning => strict,
            FileStatus::Ok => false,
        })
        .count();

    LintResult {
        path: path.to_path_buf(),
        files_checked: files.len(),
        passed: files.len() - failed,
        failed,
        errors,
        warnings,
        results,
    }
}

/// Lint a single schema file. `base_path` is stripped from reported names.
pub fn lint_file(file: &Path, base_path: &Path) -> FileResult {
    let display = file.strip_prefix(base_path).unwrap_or(file).to_path_buf();
    let mut report = Report {
        file: file.to_path_buf(),
        diagnostics: Vec::new(),
    };

    match load_schema(file) {
        Ok(schema) => {
            let empty = Map::new();
            let defs = definitions(&schema).unwrap_or(&empty);
            report.check_refs(&schema, "", defs);
            report.check_required(&schema, "");

            if let Some(pointer) = find_open_dictionary(&normalize(&schema)) {
                report.push(
                    Severity::Error,
                    "E003",
                    &pointer,
                    "object has no properties but allows additionalProperties: true".to_string(),
                );
            }
        }
        Err(e) => report.push(Severity::Error, "E001", "", format!("syntax error: {}", e)),
    }

    let diagnostics = report.diagnostics;
    let status = if diagnostics.iter().any(|d| d.severity == Severity::Error) {
        FileStatus::Error
    } else if diagnostics.is_empty() {
        FileStatus::Ok
    } else {
        FileStatus::Warning
    };

    FileResult {
        file: display,
        status,
        diagnostics,
    }
}

struct Report {
    file: PathBuf,
    diagnostics: Vec<Diagnostic>,
}

impl Report {
    fn push(&mut self, severity: Severity, code: &str, path: &str, message: String) {
        self.diagnostics.push(Diagnostic {
            severity,
            code: code.to_string(),
            file: self.file.clone(),
            path: if path.is_empty() { "/".to_string() } else { path.to_string() },
            message,
        });
    }

    fn check_refs(&mut self, value: &Value, path: &str, defs: &Map<String, Value>) {
        match value {
            Value::Object(map) => {
                match map.get(REF_KEY) {
                    Some(Value::String(pointer)) => match LocalRef::parse(pointer) {
                        Some(local) if !defs.contains_key(&local.name) => self.push(
                            Severity::Error,
                            "E002",
                            path,
                            format!("definition not found: {}", pointer),
                        ),
                        Some(_) => {}
                        None => self.push(
                            Severity::Warning,
                            "W001",
                            path,
                            format!("not a local definitions pointer, left unresolved: {}", pointer),
                        ),
                    },
                    Some(other) => self.push(
                        Severity::Warning,
                        "W001",
                        path,
                        format!("$ref must be a string, got {}", json_type_name(other)),
                    ),
                    None => {}
                }

                for (key, child) in map {
                    let child_path = format!("{}/{}", path, escape_pointer_token(key));
                    self.check_refs(child, &child_path, defs);
                }
            }
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    self.check_refs(item, &format!("{}/{}", path, i), defs);
                }
            }
            _ => {}
        }
    }

    fn check_required(&mut self, value: &Value, path: &str) {
        match value {
            Value::Object(map) => {
                if is_object_type(map) {
                    if let (Some(Value::Array(names)), Some(Value::Object(props))) =
                        (map.get("required"), map.get("properties"))
                    {
                        for name in names {
                            let declared = name.as_str().is_some_and(|n| props.contains_key(n));
                            if !declared {
                                self.push(
                                    Severity::Warning,
                                    "W002",
                                    &format!("{}/required", path),
                                    format!("required field {} is not a declared property", name),
                                );
                            }
                        }
                    }
                }

                for (key, child) in map {
                    let child_path = format!("{}/{}", path, escape_pointer_token(key));
                    self.check_required(child, &child_path);
                }
            }
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    self.check_required(item, &format!("{}/{}", path, i));
                }
            }
            _ => {}
        }
    }
}

/// Collect all .json files in a path (file or directory), sorted.
fn collect_schema_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        return if is_json(path) {
            vec![path.to_path_buf()]
        } else {
            vec![]
        };
    }

    let mut files = Vec::new();
    collect_files_recursive(path, &mut files);
    files.sort();
    files
}

fn collect_files_recursive(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files_recursive(&path, files);
        } else if is_json(&path) {
            files.push(path);
        }
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().map(|e| e == "json").unwrap_or(false)
}
