//! Loading schemas and extracted payloads.
//!
//! Sources are local files or, with the `remote` feature, HTTP(S) URLs.
//! Loading never follows `$ref`s: a document is read exactly as written.

use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::error::LoadError;

#[cfg(feature = "remote")]
use std::time::Duration;

#[cfg(feature = "remote")]
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Where a JSON document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaSource {
    File(PathBuf),
    Url(String),
}

impl SchemaSource {
    /// Classify a command-line style argument. Anything starting with
    /// `http://` or `https://` is a URL; the rest are paths.
    pub fn parse(source: &str) -> Self {
        if is_url(source) {
            SchemaSource::Url(source.to_string())
        } else {
            SchemaSource::File(PathBuf::from(source))
        }
    }

    /// Load and parse the document.
    ///
    /// # Errors
    ///
    /// See [`load_schema`] and [`load_schema_url`]. Without the `remote`
    /// feature a URL source reports `LoadError::FileNotFound`.
    pub fn load(&self) -> Result<Value, LoadError> {
        debug!(source = %self, "loading document");
        match self {
            SchemaSource::File(path) => load_schema(path),
            #[cfg(feature = "remote")]
            SchemaSource::Url(url) => load_schema_url(url),
            #[cfg(not(feature = "remote"))]
            SchemaSource::Url(url) => Err(LoadError::FileNotFound {
                path: PathBuf::from(url),
            }),
        }
    }
}

impl fmt::Display for SchemaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaSource::File(path) => write!(f, "{}", path.display()),
            SchemaSource::Url(url) => f.write_str(url),
        }
    }
}

/// Load a JSON document from a file.
///
/// # Errors
///
/// `LoadError::FileNotFound` for a missing file, `LoadError::ReadError` if
/// it cannot be read, `LoadError::InvalidJson` if it does not parse.
pub fn load_schema(path: &Path) -> Result<Value, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    load_schema_str(&content)
}

/// Parse a JSON document from a string.
///
/// # Errors
///
/// Returns `LoadError::InvalidJson` if the string isn't valid JSON.
pub fn load_schema_str(content: &str) -> Result<Value, LoadError> {
    serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source })
}

/// Fetch a JSON document over HTTP(S).
///
/// # Errors
///
/// Returns `LoadError::NetworkError` on connection failures, non-success
/// status codes, or bodies that are not JSON.
#[cfg(feature = "remote")]
pub fn load_schema_url(url: &str) -> Result<Value, LoadError> {
    let network = |source| LoadError::NetworkError {
        url: url.to_string(),
        source,
    };

    let client = reqwest::blocking::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .build()
        .map_err(network)?;

    client
        .get(url)
        .send()
        .and_then(|response| response.error_for_status())
        .and_then(|response| response.json())
        .map_err(network)
}

/// Returns true for `http://` and `https://` sources.
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Load from a file path or URL, detected by [`SchemaSource::parse`].
///
/// # Errors
///
/// Returns the error of the underlying loader.
pub fn load_schema_auto(source: &str) -> Result<Value, LoadError> {
    SchemaSource::parse(source).load()
}
