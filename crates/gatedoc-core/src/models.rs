//! Model definitions and the extractor that names request/response payloads.
//!
//! A payload schema is either a pointer to a declared schema (the declared
//! schema's name is reused) or an inline schema, in which case a new model is
//! minted under a caller-supplied candidate name.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::resolver::{self, PointerPattern, REF_KEY};
use crate::{Error, Result};

/// Content type every generated model is registered under
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// A named, reusable payload schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDefinition {
    /// Model name, unique within one run
    pub name: String,
    /// Optional human readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Content type of the payload
    #[serde(default = "default_content_type")]
    pub content_type: String,
    /// JSON schema of the payload, with internal pointers replaced by placeholders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<JsonValue>,
}

fn default_content_type() -> String {
    JSON_CONTENT_TYPE.to_string()
}

impl ModelDefinition {
    /// Create a JSON model from a schema and an optional description
    pub fn json(name: impl Into<String>, description: Option<String>, schema: JsonValue) -> Self {
        Self {
            name: name.into(),
            description,
            content_type: default_content_type(),
            schema: Some(schema),
        }
    }

    /// Mirror a declared schema (`definitions` / `components.schemas` entry) as a model
    pub fn from_declared(name: &str, schema: &JsonValue) -> Self {
        Self::json(name, description_of(schema), schema.clone())
    }
}

/// How a model registered under an already used name is handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Identical re-registration is a no-op, a differing one is an error
    #[default]
    Reject,
    /// The latest definition replaces the earlier one in place
    Overwrite,
}

/// Ordered, name-unique collection of models accumulated during one pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelCollection {
    models: Vec<ModelDefinition>,
    policy: CollisionPolicy,
}

impl ModelCollection {
    /// Create an empty collection using the given collision policy
    pub fn new(policy: CollisionPolicy) -> Self {
        Self {
            models: Vec::new(),
            policy,
        }
    }

    /// Seed a collection from already known models
    pub fn from_models(models: Vec<ModelDefinition>, policy: CollisionPolicy) -> Result<Self> {
        let mut collection = Self::new(policy);
        for model in models {
            collection.insert(model)?;
        }
        Ok(collection)
    }

    /// Add a model, honouring the collision policy
    pub fn insert(&mut self, model: ModelDefinition) -> Result<()> {
        let Some(index) = self.models.iter().position(|m| m.name == model.name) else {
            self.models.push(model);
            return Ok(());
        };
        match self.policy {
            CollisionPolicy::Overwrite => {
                log::debug!("[gatedoc] model '{}' overwritten", model.name);
                self.models[index] = model;
                Ok(())
            }
            CollisionPolicy::Reject if self.models[index] == model => Ok(()),
            CollisionPolicy::Reject => Err(Error::ModelCollision {
                name: model.name,
                function: None,
            }),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ModelDefinition> {
        self.models.iter().find(|m| m.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ModelDefinition> {
        self.models.iter()
    }
}

impl<'a> IntoIterator for &'a ModelCollection {
    type Item = &'a ModelDefinition;
    type IntoIter = std::slice::Iter<'a, ModelDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.models.iter()
    }
}

/// Result of naming the payload of a parameter, request body or response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted {
    /// The payload points at a declared schema with this name
    Referenced(String),
    /// A new model was registered under the candidate name
    Minted(String),
    /// The payload points somewhere the dialect cannot express as a model
    Unsupported(String),
}

impl Extracted {
    /// Model name usable in `requestModels` / `responseModels`
    pub fn model_name(&self) -> Option<&str> {
        match self {
            Self::Referenced(name) | Self::Minted(name) => Some(name),
            Self::Unsupported(_) => None,
        }
    }
}

/// Names the payload schema carried by `holder` (the object owning `schema`).
///
/// A pointer matching `pattern` returns the referenced name and leaves
/// `models` untouched. An inline schema is copied, resolved and appended under
/// `candidate`.
pub fn extract(
    holder: &JsonValue,
    candidate: &str,
    pattern: PointerPattern,
    models: &mut ModelCollection,
) -> Result<Extracted> {
    let schema = holder.get("schema").unwrap_or(&JsonValue::Null);

    if let Some(pointer) = schema.get(REF_KEY).and_then(JsonValue::as_str) {
        return Ok(match pattern.parse(pointer) {
            Some(name) => Extracted::Referenced(name.to_string()),
            None => Extracted::Unsupported(pointer.to_string()),
        });
    }

    let mut inline = schema.clone();
    resolver::resolve(&mut inline, pattern);
    models.insert(ModelDefinition::json(
        candidate,
        description_of(holder),
        inline,
    ))?;
    Ok(Extracted::Minted(candidate.to_string()))
}

fn description_of(value: &JsonValue) -> Option<String> {
    value
        .get("description")
        .and_then(JsonValue::as_str)
        .map(String::from)
}
