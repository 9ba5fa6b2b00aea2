//! API description loading and lookups.
//!
//! This module loads OpenAPI / Swagger documents from files or URLs (YAML or
//! JSON) and provides the path and method lookups shared by both dialects.
//!
//! # Examples
//!
//! ```no_run
//! use gatedoc_core::spec::ApiSpec;
//! use gatedoc_core::error::Result;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<()> {
//! let spec = ApiSpec::from_file("openapi.yaml").await?;
//! if let Some(op) = spec.operation("widgets", "GET") {
//!     println!("GET /widgets: {}", op["summary"]);
//! }
//! # Ok(())
//! # }
//! ```

// Internal imports (std, crate)
use std::path::Path;

// External imports (alphabetized)
use serde_json::{Map as JsonMap, Value as JsonValue};
use tokio::fs;

/// A parsed API description document
#[derive(Debug, Clone, serde::Serialize)]
#[serde(transparent)]
pub struct ApiSpec {
    /// The raw JSON value of the document
    pub json: JsonValue,
}

impl ApiSpec {
    pub fn new(json: JsonValue) -> Self {
        Self { json }
    }

    /// Load a document from a file (supports both YAML and JSON)
    pub async fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await?;
        Self::parse_content(&content).map_err(|e| {
            crate::Error::openapi(format!(
                "Failed to parse API document at {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Load a document from a URL (supports both YAML and JSON)
    pub async fn from_url(url: &str) -> crate::Result<Self> {
        let response = reqwest::get(url).await.map_err(|e| {
            crate::Error::openapi(format!("Failed to fetch API document from {}: {}", url, e))
        })?;

        if !response.status().is_success() {
            return Err(crate::Error::openapi(format!(
                "Failed to fetch API document from {}: HTTP {}",
                url,
                response.status()
            )));
        }

        let content = response.text().await.map_err(|e| {
            crate::Error::openapi(format!("Failed to read response from {}: {}", url, e))
        })?;

        Self::parse_content(&content).map_err(|e| {
            crate::Error::openapi(format!("Failed to parse API document from {}: {}", url, e))
        })
    }

    /// Parse content as either JSON or YAML
    pub fn parse_content(content: &str) -> Result<Self, String> {
        let json: JsonValue = match serde_json::from_str(content) {
            Ok(json) => json,
            Err(_) => serde_yaml::from_str(content)
                .map_err(|_| "content is neither valid JSON nor YAML".to_string())?,
        };

        if !json.is_object() {
            return Err("document root is not a mapping".to_string());
        }
        Ok(Self { json })
    }

    /// The `paths` object
    pub fn paths(&self) -> Option<&JsonMap<String, JsonValue>> {
        self.json.get("paths").and_then(JsonValue::as_object)
    }

    /// Look up a method entry below `paths`
    pub fn operation(&self, path: &str, method: &str) -> Option<&JsonValue> {
        self.paths().and_then(|paths| lookup(paths, path, method).found())
    }
}

/// Outcome of matching an HTTP event against a `paths` object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathLookup<'a> {
    /// No entry for the path
    MissingPath,
    /// The path exists but does not declare the method
    MissingMethod,
    /// The method entry
    Found(&'a JsonValue),
}

impl<'a> PathLookup<'a> {
    pub fn found(self) -> Option<&'a JsonValue> {
        match self {
            Self::Found(op) => Some(op),
            _ => None,
        }
    }
}

/// Key a deployment event path is filed under in `paths`.
///
/// Event paths are written without the leading slash; one is tolerated.
pub fn path_key(event_path: &str) -> String {
    format!("/{}", event_path.trim_start_matches('/'))
}

/// Match an event path and method against a `paths` object
pub fn lookup<'a>(
    paths: &'a JsonMap<String, JsonValue>,
    event_path: &str,
    method: &str,
) -> PathLookup<'a> {
    let Some(item) = paths.get(&path_key(event_path)) else {
        return PathLookup::MissingPath;
    };
    match item.get(method.to_ascii_lowercase()) {
        Some(op) if op.is_object() => PathLookup::Found(op),
        _ => PathLookup::MissingMethod,
    }
}
