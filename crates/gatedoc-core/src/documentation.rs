//! Per-endpoint documentation records.
//!
//! A record is what ends up on `events[].http.documentation` of a function and
//! on the matching `AWS::ApiGateway::Method` resource.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Documentation attached to one endpoint-method pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentationRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub request_headers: Vec<ParameterDoc>,
    #[serde(default)]
    pub path_params: Vec<ParameterDoc>,
    #[serde(default)]
    pub query_params: Vec<ParameterDoc>,
    /// Content type to model name
    #[serde(default)]
    pub request_models: IndexMap<String, String>,
    /// Only present when the source method declares responses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method_responses: Option<Vec<MethodResponseDoc>>,
    /// Anything else written by hand on the event
    #[serde(flatten)]
    pub extra: IndexMap<String, JsonValue>,
}

/// A documented header, path or query parameter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterDoc {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
}

/// A documented response of a method.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodResponseDoc {
    pub status_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Content type to model name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_models: Option<IndexMap<String, String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub response_headers: Vec<ParameterDoc>,
}

impl MethodResponseDoc {
    pub fn new(status_code: impl Into<String>) -> Self {
        Self {
            status_code: status_code.into(),
            ..Default::default()
        }
    }
}

/// Where a parameter is carried in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterLocation {
    Header,
    Path,
    Query,
    Body,
}

impl ParameterLocation {
    /// Parse the `in` field of a parameter object.
    ///
    /// `cookie` and `formData` have no API Gateway counterpart and yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "header" => Some(Self::Header),
            "path" => Some(Self::Path),
            "query" => Some(Self::Query),
            "body" => Some(Self::Body),
            _ => None,
        }
    }
}

impl DocumentationRecord {
    /// Start a record from the `summary` / `description` of a method entry
    pub fn for_method(method: &JsonValue) -> Self {
        Self {
            description: string_field(method, "description"),
            summary: string_field(method, "summary"),
            ..Default::default()
        }
    }

    /// File a header, path or query parameter under its list.
    ///
    /// Returns `false` for locations that are not documented this way.
    pub fn push_parameter(&mut self, location: ParameterLocation, param: &JsonValue) -> bool {
        let target = match location {
            ParameterLocation::Header => &mut self.request_headers,
            ParameterLocation::Path => &mut self.path_params,
            ParameterLocation::Query => &mut self.query_params,
            ParameterLocation::Body => return false,
        };
        target.push(ParameterDoc {
            name: string_field(param, "name").unwrap_or_default(),
            description: string_field(param, "description"),
            required: param.get("required").and_then(JsonValue::as_bool),
        });
        true
    }

    /// Every model name referenced by the record
    pub fn model_names(&self) -> impl Iterator<Item = &str> {
        let responses = self
            .method_responses
            .iter()
            .flatten()
            .filter_map(|r| r.response_models.as_ref())
            .flat_map(|models| models.values());
        self.request_models
            .values()
            .chain(responses)
            .map(String::as_str)
    }
}

pub(crate) fn string_field(value: &JsonValue, key: &str) -> Option<String> {
    value.get(key).and_then(JsonValue::as_str).map(String::from)
}
