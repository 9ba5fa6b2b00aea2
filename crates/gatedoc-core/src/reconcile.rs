//! Publishing documentation to a deployed REST API.
//!
//! Documentation is uploaded as API Gateway documentation parts and frozen as
//! a documentation version of the deployed stage. A version that already
//! exists is left alone.

use serde_json::{json, Map as JsonMap, Value as JsonValue};
use sha2::{Digest, Sha256};

use crate::config::DocumentationConfig;
use crate::documentation::{DocumentationRecord, ParameterDoc};
use crate::gateway::{DocumentationPart, GatewayClient, PartLocation};
use crate::models::ModelCollection;
use crate::naming::ResourceNaming;
use crate::service::ServiceDefinition;
use crate::spec;
use crate::template::API_ID_OUTPUT;
use crate::{Error, Result};

/// Keys copied from documentation objects into part properties
const PART_PROPERTIES: [&str; 5] = ["description", "summary", "tags", "example", "externalDocs"];

const VERSION_HASH_LEN: usize = 16;

/// What a reconciliation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The service carries no documentation block
    Skipped,
    /// The version was published before; nothing was uploaded
    AlreadyExists { version: String },
    Published { version: String },
}

/// Read the documented REST API id from the outputs of the deployed stack
pub async fn deployed_rest_api_id<G: GatewayClient>(
    client: &G,
    stack_name: &str,
) -> Result<String> {
    let outputs = client.describe_stack(stack_name).await?;
    match outputs.get(API_ID_OUTPUT) {
        Some(JsonValue::String(id)) => Ok(id.clone()),
        _ => Err(Error::gateway(
            404,
            format!("Stack {stack_name} has no {API_ID_OUTPUT} output"),
        )),
    }
}

/// Upload the documentation of `service` for `stage`.
///
/// `service` is expected to carry its records on the HTTP events already;
/// `models` is the collection of the same normalization pass.
pub async fn reconcile<G, N>(
    client: &G,
    naming: &N,
    service: &ServiceDefinition,
    models: &ModelCollection,
    stage: &str,
) -> Result<ReconcileOutcome>
where
    G: GatewayClient,
    N: ResourceNaming,
{
    let Some(documentation) = service.documentation() else {
        log::debug!("[gatedoc] no documentation block, nothing to publish");
        return Ok(ReconcileOutcome::Skipped);
    };

    let rest_api_id = deployed_rest_api_id(client, &naming.stack_name(stage)).await?;
    let parts = documentation_parts(documentation, service, models);
    let version = documentation
        .version
        .clone()
        .unwrap_or_else(|| content_version(&parts, models));

    if client
        .get_documentation_version(&rest_api_id, &version)
        .await?
        .is_some()
    {
        log::info!("[gatedoc] documentation version already exists, skipping upload");
        return Ok(ReconcileOutcome::AlreadyExists { version });
    }

    let stored = client.get_documentation_parts(&rest_api_id).await?;
    log::debug!("[gatedoc] deleting {} stored documentation parts", stored.len());
    for part in &stored {
        client
            .delete_documentation_part(&rest_api_id, &part.id)
            .await?;
    }

    log::info!("[gatedoc] uploading {} documentation parts", parts.len());
    for part in &parts {
        client.create_documentation_part(&rest_api_id, part).await?;
    }
    client
        .create_documentation_version(&rest_api_id, &version, stage)
        .await?;

    log::info!("[gatedoc] published documentation version {}", version);
    Ok(ReconcileOutcome::Published { version })
}

/// Every documentation part of a service, global parts first.
///
/// Parts whose properties come out empty are left out.
pub fn documentation_parts(
    documentation: &DocumentationConfig,
    service: &ServiceDefinition,
    models: &ModelCollection,
) -> Vec<DocumentationPart> {
    let mut parts = PartList::default();

    if let Some(api) = &documentation.api {
        let info = if documentation.openapi {
            api.get("info").unwrap_or(&JsonValue::Null)
        } else {
            api
        };
        parts.push(part_location("API"), properties_of(info));
    }

    for resource in &documentation.resources {
        if let Some(path) = resource.get("path").and_then(JsonValue::as_str) {
            let location = PartLocation {
                path: Some(spec::path_key(path)),
                ..part_location("RESOURCE")
            };
            parts.push(location, properties_of(resource));
        }
    }

    for authorizer in &documentation.authorizers {
        if let Some(name) = authorizer.get("name").and_then(JsonValue::as_str) {
            let location = PartLocation {
                name: Some(name.to_string()),
                ..part_location("AUTHORIZER")
            };
            parts.push(location, properties_of(authorizer));
        }
    }

    for model in models {
        let location = PartLocation {
            name: Some(model.name.clone()),
            ..part_location("MODEL")
        };
        let mut properties = JsonMap::new();
        if let Some(description) = &model.description {
            properties.insert("description".into(), json!(description));
        }
        parts.push(location, properties);
    }

    for definition in service.functions.values() {
        for (_, http) in definition.http_events() {
            if let Some(record) = &http.documentation {
                method_parts(&mut parts, &spec::path_key(&http.path), &http.method, record);
            }
        }
    }

    parts.0
}

fn method_parts(parts: &mut PartList, path: &str, method: &str, record: &DocumentationRecord) {
    let method = method.to_ascii_uppercase();
    let at = |kind: &str| PartLocation {
        path: Some(path.to_string()),
        method: Some(method.clone()),
        ..part_location(kind)
    };

    let mut method_properties = JsonMap::new();
    if let Some(description) = &record.description {
        method_properties.insert("description".into(), json!(description));
    }
    if let Some(summary) = &record.summary {
        method_properties.insert("summary".into(), json!(summary));
    }
    for key in PART_PROPERTIES {
        if let Some(value) = record.extra.get(key) {
            method_properties.insert(key.into(), value.clone());
        }
    }
    parts.push(at("METHOD"), method_properties);

    for (kind, params) in [
        ("REQUEST_HEADER", &record.request_headers),
        ("QUERY_PARAMETER", &record.query_params),
        ("PATH_PARAMETER", &record.path_params),
    ] {
        for param in params {
            let location = PartLocation {
                name: Some(param.name.clone()),
                ..at(kind)
            };
            parts.push(location, parameter_properties(param));
        }
    }

    if let Some(body) = record.extra.get("requestBody") {
        parts.push(at("REQUEST_BODY"), properties_of(body));
    }

    for response in record.method_responses.iter().flatten() {
        let location = PartLocation {
            status_code: Some(response.status_code.clone()),
            ..at("RESPONSE")
        };
        let mut properties = JsonMap::new();
        if let Some(description) = &response.description {
            properties.insert("description".into(), json!(description));
        }
        parts.push(location, properties);
    }
}

#[derive(Default)]
struct PartList(Vec<DocumentationPart>);

impl PartList {
    fn push(&mut self, location: PartLocation, properties: JsonMap<String, JsonValue>) {
        if !properties.is_empty() {
            self.0.push(DocumentationPart {
                location,
                properties,
            });
        }
    }
}

fn part_location(kind: &str) -> PartLocation {
    PartLocation {
        kind: kind.to_string(),
        ..Default::default()
    }
}

/// Documentation properties of an object; every key of an API `info` block
fn properties_of(value: &JsonValue) -> JsonMap<String, JsonValue> {
    let Some(map) = value.as_object() else {
        return JsonMap::new();
    };
    if map.contains_key("title") || map.contains_key("version") {
        return map.clone();
    }
    PART_PROPERTIES
        .iter()
        .filter_map(|key| map.get(*key).map(|v| (key.to_string(), v.clone())))
        .collect()
}

fn parameter_properties(param: &ParameterDoc) -> JsonMap<String, JsonValue> {
    let mut properties = JsonMap::new();
    if let Some(description) = &param.description {
        properties.insert("description".into(), json!(description));
    }
    properties
}

/// Content hash of the parts and models, stable across runs
pub fn content_version(parts: &[DocumentationPart], models: &ModelCollection) -> String {
    let models: Vec<_> = models.iter().collect();
    let canonical = json!({"parts": parts, "models": models}).to_string();
    let digest = Sha256::digest(canonical.as_bytes());
    format!("{digest:x}")[..VERSION_HASH_LEN].to_string()
}
