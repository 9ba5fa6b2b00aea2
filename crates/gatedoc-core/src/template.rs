//! Synthesis of model resources and method documentation into the generated
//! CloudFormation template.
//!
//! Merging is additive: unrelated resources, outputs and top-level keys are
//! carried through untouched, and running the synthesizer twice over the same
//! template yields the same model resources.

// Internal imports (std, crate)
use std::path::Path;

use crate::documentation::{DocumentationRecord, ParameterDoc};
use crate::models::{ModelCollection, ModelDefinition};
use crate::naming::ResourceNaming;
use crate::resolver::{self, REF_KEY};
use crate::service::ServiceDefinition;
use crate::{Error, Result};

// External imports (alphabetized)
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map as JsonMap, Value as JsonValue};
use tokio::fs;

const MODEL_RESOURCE_TYPE: &str = "AWS::ApiGateway::Model";
const REST_APIS_URL: &str = "https://apigateway.amazonaws.com/restapis";

/// Output carrying the documented REST API id
pub const API_ID_OUTPUT: &str = "AwsDocApiId";

/// A CloudFormation template
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CloudFormationTemplate {
    #[serde(rename = "Resources", default)]
    pub resources: JsonMap<String, JsonValue>,

    #[serde(rename = "Outputs", default)]
    pub outputs: JsonMap<String, JsonValue>,

    #[serde(flatten)]
    pub extra: IndexMap<String, JsonValue>,
}

impl CloudFormationTemplate {
    /// Load a template from a JSON file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await?;
        serde_json::from_str(&content).map_err(|e| {
            Error::template(format!("Failed to parse template {}: {}", path.display(), e))
        })
    }

    /// Save the template as pretty printed JSON
    pub async fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).await?;
        Ok(())
    }
}

/// Writes models, method documentation and the API id output into a template.
pub struct TemplateSynthesizer<'a, N: ResourceNaming> {
    naming: &'a N,
    rest_api_id: JsonValue,
    safe_mode: bool,
}

impl<'a, N: ResourceNaming> TemplateSynthesizer<'a, N> {
    pub fn new(naming: &'a N, rest_api_id: JsonValue) -> Self {
        Self {
            naming,
            rest_api_id,
            safe_mode: false,
        }
    }

    /// Leave `RequestParameters` of method resources alone
    pub fn with_safe_mode(mut self, safe_mode: bool) -> Self {
        self.safe_mode = safe_mode;
        self
    }

    /// Run every step over `template`
    pub fn synthesize(
        &self,
        template: &mut CloudFormationTemplate,
        models: &ModelCollection,
        service: &ServiceDefinition,
    ) -> Result<()> {
        self.merge_models(template, models);

        for (function, definition) in &service.functions {
            for (_, http) in definition.http_events() {
                let Some(record) = http.documentation.as_ref() else {
                    continue;
                };
                log::debug!(
                    "[gatedoc] documenting {} {} of function {}",
                    http.method,
                    http.path,
                    function
                );
                self.attach_method(template, &http.path, &http.method, record)?;
            }
        }

        self.add_api_id_output(template);
        Ok(())
    }

    /// The `AWS::ApiGateway::Model` resource of one model
    pub fn model_resource(&self, model: &ModelDefinition) -> JsonValue {
        let mut schema = model.schema.clone().unwrap_or_else(|| json!({}));
        let mut depends_on = Vec::new();
        self.link_placeholders(&mut schema, &mut depends_on);

        let mut properties = JsonMap::new();
        properties.insert("RestApiId".into(), self.rest_api_id.clone());
        properties.insert("ContentType".into(), json!(model.content_type));
        properties.insert("Name".into(), json!(model.name));
        properties.insert("Schema".into(), schema);
        if let Some(description) = &model.description {
            properties.insert("Description".into(), json!(description));
        }

        let mut resource = json!({
            "Type": MODEL_RESOURCE_TYPE,
            "Properties": properties,
        });
        if !depends_on.is_empty() {
            resource["DependsOn"] = json!(depends_on);
        }
        resource
    }

    /// Add one `<name>Model` resource per model, replacing same-named keys
    pub fn merge_models(&self, template: &mut CloudFormationTemplate, models: &ModelCollection) {
        for model in models {
            template
                .resources
                .insert(model_resource_id(&model.name), self.model_resource(model));
        }
    }

    /// Graft a documentation record onto the method resource of `path` / `method`
    pub fn attach_method(
        &self,
        template: &mut CloudFormationTemplate,
        path: &str,
        method: &str,
        record: &DocumentationRecord,
    ) -> Result<()> {
        let resource_name = self.naming.normalize_path(path);
        let logical_id = self.naming.method_logical_id(&resource_name, method);
        let resource = template
            .resources
            .get_mut(&logical_id)
            .and_then(JsonValue::as_object_mut)
            .ok_or_else(|| {
                Error::template(format!(
                    "Method resource {logical_id} for {method} {path} not found in template"
                ))
            })?;

        let mut depends_on = existing_dependencies(resource);
        let properties = resource
            .entry("Properties")
            .or_insert_with(|| json!({}))
            .as_object_mut()
            .ok_or_else(|| Error::template(format!("{logical_id}.Properties is not a mapping")))?;

        if let Some(responses) = &record.method_responses {
            let method_responses = properties
                .entry("MethodResponses")
                .or_insert_with(|| json!([]));
            let Some(method_responses) = method_responses.as_array_mut() else {
                return Err(Error::template(format!(
                    "{logical_id}.Properties.MethodResponses is not a list"
                )));
            };

            for response in responses {
                let index = match method_responses
                    .iter()
                    .position(|r| status_code_of(r).as_deref() == Some(response.status_code.as_str()))
                {
                    Some(index) => index,
                    None => {
                        let mut entry = json!({"StatusCode": response.status_code});
                        if !response.response_headers.is_empty() {
                            entry["ResponseParameters"] =
                                flags("method.response.header", &response.response_headers);
                        }
                        method_responses.push(entry);
                        method_responses.len() - 1
                    }
                };
                if let Some(response_models) = &response.response_models {
                    if let Some(entry) = method_responses[index].as_object_mut() {
                        entry.insert("ResponseModels".into(), json!(response_models));
                    }
                }
            }
        }

        if !record.request_models.is_empty() {
            properties.insert("RequestModels".into(), json!(record.request_models));
        }

        if !self.safe_mode {
            let parameters = properties
                .entry("RequestParameters")
                .or_insert_with(|| json!({}));
            if let Some(parameters) = parameters.as_object_mut() {
                for (prefix, params) in [
                    ("method.request.header", &record.request_headers),
                    ("method.request.querystring", &record.query_params),
                    ("method.request.path", &record.path_params),
                ] {
                    for param in params {
                        let key = format!("{prefix}.{}", param.name);
                        let existing = parameters.get(&key) == Some(&JsonValue::Bool(true));
                        let required = param.required.unwrap_or(false) || existing;
                        parameters.insert(key, JsonValue::Bool(required));
                    }
                }
            }
        }

        depends_on.extend(record.model_names().map(model_resource_id));
        let mut merged: Vec<String> = Vec::with_capacity(depends_on.len());
        for dependency in depends_on {
            if !merged.contains(&dependency) {
                merged.push(dependency);
            }
        }
        if merged.is_empty() {
            resource.remove("DependsOn");
        } else {
            resource.insert("DependsOn".into(), json!(merged));
        }
        Ok(())
    }

    /// Add the output exposing the documented REST API id
    pub fn add_api_id_output(&self, template: &mut CloudFormationTemplate) {
        template.outputs.insert(
            API_ID_OUTPUT.into(),
            json!({"Description": "API ID", "Value": self.rest_api_id}),
        );
    }

    /// Turn placeholders into model URLs, collecting the models depended on
    fn link_placeholders(&self, node: &mut JsonValue, depends_on: &mut Vec<String>) {
        match node {
            JsonValue::Object(map) => {
                for (key, value) in map.iter_mut() {
                    if key == REF_KEY {
                        let name = value.as_str().and_then(resolver::parse_placeholder);
                        if let Some(name) = name.map(String::from) {
                            let dependency = model_resource_id(&name);
                            if !depends_on.contains(&dependency) {
                                depends_on.push(dependency);
                            }
                            *value = json!({
                                "Fn::Join": ["/", [REST_APIS_URL, self.rest_api_id, "models", name]]
                            });
                        }
                    } else {
                        self.link_placeholders(value, depends_on);
                    }
                }
            }
            JsonValue::Array(items) => {
                for item in items {
                    self.link_placeholders(item, depends_on);
                }
            }
            _ => {}
        }
    }
}

/// Template key of a model resource
pub fn model_resource_id(name: &str) -> String {
    format!("{name}Model")
}

fn existing_dependencies(resource: &JsonMap<String, JsonValue>) -> Vec<String> {
    match resource.get("DependsOn") {
        Some(JsonValue::String(single)) => vec![single.clone()],
        Some(JsonValue::Array(items)) => items
            .iter()
            .filter_map(JsonValue::as_str)
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    }
}

fn status_code_of(response: &JsonValue) -> Option<String> {
    match response.get("StatusCode")? {
        JsonValue::String(code) => Some(code.clone()),
        JsonValue::Number(code) => Some(code.to_string()),
        _ => None,
    }
}

fn flags(prefix: &str, params: &[ParameterDoc]) -> JsonValue {
    let map: JsonMap<String, JsonValue> = params
        .iter()
        .map(|p| (format!("{prefix}.{}", p.name), JsonValue::Bool(true)))
        .collect();
    JsonValue::Object(map)
}
