//! Configuration surface for documentation generation.
//!
//! This module defines the `documentation` block read from
//! `custom.documentation` of a service definition, and the per-run options
//! supplied by the host (stage and safe mode).
//!
//! # Examples
//!
//! ```
//! use gatedoc_core::config::{DialectKind, DocumentationConfig};
//!
//! let block: DocumentationConfig = serde_yaml::from_str("openapi: true\napi: {}\n").unwrap();
//! assert_eq!(block.dialect(), DialectKind::Component);
//! ```

// Internal imports (std, crate)
use std::path::Path;

use crate::models::{CollisionPolicy, ModelDefinition};
use crate::spec::ApiSpec;

// External imports (alphabetized)
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

/// Which description format the documentation block is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialectKind {
    /// OpenAPI 3: `components.schemas`, `requestBody`, `content` maps
    Component,
    /// Swagger 2 style: `definitions`, `in: body` parameters, `response.schema`
    Legacy,
    /// No description document; models and event documentation are written by hand
    Declared,
}

/// The `custom.documentation` block of a service definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentationConfig {
    /// Selects the component dialect; `api` holds the document
    #[serde(default, skip_serializing_if = "is_false")]
    pub openapi: bool,

    /// Selects the legacy dialect; `definitions` and `paths` hold the document
    #[serde(default, skip_serializing_if = "is_false")]
    pub swagger: bool,

    /// The component-dialect document, or API level documentation otherwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api: Option<JsonValue>,

    /// File path or URL the component-dialect document is loaded from when `api` is absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_file: Option<String>,

    /// Legacy-dialect schema root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definitions: Option<JsonMap<String, JsonValue>>,

    /// Legacy-dialect path entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paths: Option<JsonMap<String, JsonValue>>,

    /// Hand-written models (declared mode); replaced by the normalized collection otherwise
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<ModelDefinition>,

    /// Resource level documentation (`path` plus documentation properties)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<JsonValue>,

    /// Authorizer documentation (`name` plus documentation properties)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authorizers: Vec<JsonValue>,

    /// Explicit documentation version; a content hash is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// How colliding model names are handled
    #[serde(default)]
    pub model_collisions: CollisionPolicy,

    #[serde(flatten)]
    pub extra: IndexMap<String, JsonValue>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl DocumentationConfig {
    /// Dialect selected by the `openapi` / `swagger` flags
    pub fn dialect(&self) -> DialectKind {
        if self.openapi {
            DialectKind::Component
        } else if self.swagger {
            DialectKind::Legacy
        } else {
            DialectKind::Declared
        }
    }

    /// Load `api` from `api_file` when only the location was configured.
    ///
    /// Relative file paths are resolved against `base_dir`.
    pub async fn load_api_file(&mut self, base_dir: &Path) -> crate::Result<()> {
        if self.api.is_some() {
            return Ok(());
        }
        let Some(location) = self.api_file.as_deref() else {
            return Ok(());
        };
        let spec = if location.starts_with("http://") || location.starts_with("https://") {
            ApiSpec::from_url(location).await?
        } else {
            ApiSpec::from_file(base_dir.join(location)).await?
        };
        log::debug!("[gatedoc] loaded API document from {}", location);
        self.api = Some(spec.json);
        Ok(())
    }
}

/// Per-run options handed over by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginOptions {
    /// Deployment stage
    #[serde(default = "default_stage")]
    pub stage: String,

    /// Skip writing `RequestParameters` onto method resources
    #[serde(default)]
    pub safe_mode: bool,
}

impl Default for PluginOptions {
    fn default() -> Self {
        Self {
            stage: default_stage(),
            safe_mode: false,
        }
    }
}

fn default_stage() -> String {
    "dev".to_string()
}
