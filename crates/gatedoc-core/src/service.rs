//! The deployment unit: a `serverless.yml`-shaped service definition.
//!
//! Only the parts the documentation pipeline reads are typed; every other key
//! is carried through untouched so the definition can be written back out.
//!
//! # Examples
//!
//! ```
//! use gatedoc_core::service::ServiceDefinition;
//!
//! let service: ServiceDefinition = serde_yaml::from_str(
//!     "service: widgets\nfunctions:\n  list:\n    events:\n      - http: GET widgets\n",
//! )
//! .unwrap();
//! let (_, event) = service.functions["list"].http_events().next().unwrap();
//! assert_eq!(event.method, "get");
//! assert_eq!(event.path, "widgets");
//! ```

// Internal imports (std, crate)
use std::path::Path;

use crate::config::DocumentationConfig;
use crate::documentation::DocumentationRecord;
use crate::normalize::EndpointDocumentation;

// External imports (alphabetized)
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value as JsonValue};
use serde_value::Value as SerdeValue;
use tokio::fs;

/// A service definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceDefinition {
    /// Service name; `service: {name: ...}` is accepted too
    #[serde(deserialize_with = "deserialize_service_name")]
    pub service: String,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub custom: CustomConfig,

    /// Functions in declaration order
    #[serde(default)]
    pub functions: IndexMap<String, FunctionDefinition>,

    #[serde(flatten)]
    pub extra: IndexMap<String, JsonValue>,
}

/// The `provider` block
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_gateway: Option<ApiGatewayConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[serde(flatten)]
    pub extra: IndexMap<String, JsonValue>,
}

/// The `provider.apiGateway` block
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiGatewayConfig {
    /// Id of an externally managed REST API (string or CloudFormation intrinsic)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_api_id: Option<JsonValue>,

    #[serde(flatten)]
    pub extra: IndexMap<String, JsonValue>,
}

/// The `custom` block
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<DocumentationConfig>,

    #[serde(flatten)]
    pub extra: IndexMap<String, JsonValue>,
}

/// A declared function
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunctionDefinition {
    #[serde(default)]
    pub events: Vec<FunctionEvent>,

    #[serde(flatten)]
    pub extra: IndexMap<String, JsonValue>,
}

/// One trigger of a function; only `http` triggers are documented
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunctionEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpEvent>,

    #[serde(flatten)]
    pub extra: IndexMap<String, JsonValue>,
}

/// An HTTP trigger
#[derive(Debug, Clone, Default, Serialize)]
pub struct HttpEvent {
    pub path: String,

    pub method: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<DocumentationRecord>,

    #[serde(flatten)]
    pub extra: IndexMap<String, JsonValue>,
}

impl ServiceDefinition {
    /// Load a service definition from a YAML or JSON file.
    ///
    /// A component-dialect document referenced through `apiFile` is loaded
    /// relative to the definition's directory.
    pub async fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await?;
        let mut service: Self = serde_yaml::from_str(&content)?;

        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        if let Some(documentation) = service.custom.documentation.as_mut() {
            documentation.load_api_file(base_dir).await?;
        }
        Ok(service)
    }

    /// Save the service definition as YAML (or JSON for a `.json` path)
    pub async fn save<P: AsRef<Path>>(&self, path: P) -> crate::Result<()> {
        let path = path.as_ref();
        let content = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::to_string_pretty(self)?
        } else {
            serde_yaml::to_string(self)?
        };
        fs::write(path, content).await?;
        Ok(())
    }

    /// The `custom.documentation` block
    pub fn documentation(&self) -> Option<&DocumentationConfig> {
        self.custom.documentation.as_ref()
    }

    /// REST API the documentation belongs to.
    ///
    /// An explicitly configured `provider.apiGateway.restApiId` wins over the
    /// REST API generated by the deployment.
    pub fn rest_api_id(&self) -> JsonValue {
        self.provider
            .api_gateway
            .as_ref()
            .and_then(|gateway| gateway.rest_api_id.clone())
            .unwrap_or_else(|| json!({"Ref": "ApiGatewayRestApi"}))
    }

    /// Write each record onto `events[event_index].http.documentation`.
    ///
    /// Records naming an unknown function or a non-HTTP event are ignored.
    pub fn attach_documentation(&mut self, records: &[EndpointDocumentation]) {
        for endpoint in records {
            let http = self
                .functions
                .get_mut(&endpoint.function)
                .and_then(|function| function.events.get_mut(endpoint.event_index))
                .and_then(|event| event.http.as_mut());
            if let Some(http) = http {
                http.documentation = Some(endpoint.record.clone());
            }
        }
    }
}

impl FunctionDefinition {
    /// HTTP triggers with their index in `events`
    pub fn http_events(&self) -> impl Iterator<Item = (usize, &HttpEvent)> {
        self.events
            .iter()
            .enumerate()
            .filter_map(|(index, event)| event.http.as_ref().map(|http| (index, http)))
    }
}

/// Raw field layout of an HTTP trigger written as a mapping
#[derive(Deserialize)]
struct HttpEventFields {
    path: String,
    method: String,
    #[serde(default)]
    documentation: Option<DocumentationRecord>,
    #[serde(flatten)]
    extra: IndexMap<String, JsonValue>,
}

impl<'de> Deserialize<'de> for HttpEvent {
    /// Accepts the mapping form and the `"<METHOD> <path>"` shorthand
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = SerdeValue::deserialize(deserializer)?;

        match value {
            SerdeValue::String(s) => {
                let mut parts = s.split_whitespace();
                match (parts.next(), parts.next(), parts.next()) {
                    (Some(method), Some(path), None) => Ok(Self {
                        path: path.to_string(),
                        method: method.to_ascii_lowercase(),
                        documentation: None,
                        extra: IndexMap::new(),
                    }),
                    _ => Err(serde::de::Error::custom(format!(
                        "Expected '<METHOD> <path>' for http event, got '{s}'"
                    ))),
                }
            }
            SerdeValue::Map(_) => {
                let fields: HttpEventFields = value
                    .deserialize_into()
                    .map_err(<D::Error as serde::de::Error>::custom)?;
                Ok(Self {
                    path: fields.path,
                    method: fields.method.to_ascii_lowercase(),
                    documentation: fields.documentation,
                    extra: fields.extra,
                })
            }
            _ => Err(serde::de::Error::custom(
                "Expected string or mapping for http event",
            )),
        }
    }
}

/// Helper function to deserialize either a plain name or a `{name: ...}` mapping
fn deserialize_service_name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = SerdeValue::deserialize(deserializer)?;

    match value {
        SerdeValue::String(s) => Ok(s),
        SerdeValue::Map(map) => map
            .get(&SerdeValue::String("name".to_string()))
            .and_then(|name| match name {
                SerdeValue::String(s) => Some(s.clone()),
                _ => None,
            })
            .ok_or_else(|| serde::de::Error::custom("Expected service.name to be a string")),
        _ => Err(serde::de::Error::custom(
            "Expected string or mapping for service",
        )),
    }
}
