//! Dialect normalization: from a description document and a deployment unit
//! to models and per-endpoint documentation records.
//!
//! The walk is the same for both dialects and strictly sequential, so records
//! come out in function and event declaration order. Nothing owned by the
//! caller is mutated; records are grafted by
//! [`ServiceDefinition::attach_documentation`].

use std::fmt;

use indexmap::IndexMap;
use serde_json::Value as JsonValue;

use crate::config::DialectKind;
use crate::dialect::{ComponentDialect, LegacyDialect, SpecDialect};
use crate::documentation::{DocumentationRecord, MethodResponseDoc, ParameterLocation};
use crate::models::{self, CollisionPolicy, Extracted, ModelCollection, ModelDefinition, JSON_CONTENT_TYPE};
use crate::service::ServiceDefinition;
use crate::spec::{self, PathLookup};
use crate::validate;
use crate::{Error, Result};

/// Documentation produced for one HTTP event.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointDocumentation {
    /// Declaring function
    pub function: String,
    /// Index of the event in the function's `events`
    pub event_index: usize,
    pub path: String,
    pub method: String,
    pub record: DocumentationRecord,
}

/// Non-fatal findings of a normalization pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// The path is documented but the event's method is not
    MissingMethod {
        function: String,
        path: String,
        method: String,
    },
    /// A payload points at something that cannot become a model
    UnsupportedReference { function: String, pointer: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingMethod {
                function, method, ..
            } => write!(
                f,
                "Documentation for function {function} not found for event with {method}"
            ),
            Self::UnsupportedReference { function, pointer } => write!(
                f,
                "Reference {pointer} used by function {function} is not a model and was skipped"
            ),
        }
    }
}

/// Everything a normalization pass produces.
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    /// The document with internal schema pointers replaced by placeholders
    pub spec: Option<JsonValue>,
    pub models: ModelCollection,
    /// Records in declaration order
    pub records: Vec<EndpointDocumentation>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Normalize the documentation of a service, selecting the dialect from its
/// documentation block.
///
/// Returns `Ok(None)` when the service has no documentation block. The
/// component dialect awaits structural validation first; a failure is
/// returned as [`Error::Validation`] before any model or record exists.
pub async fn normalize_service(service: &ServiceDefinition) -> Result<Option<Normalized>> {
    let Some(documentation) = service.documentation() else {
        return Ok(None);
    };
    let policy = documentation.model_collisions;

    let normalized = match documentation.dialect() {
        DialectKind::Component => {
            let api = documentation.api.as_ref().ok_or_else(|| {
                Error::config("`openapi: true` requires an `api` document or `apiFile`")
            })?;
            let validated = validate::validate(api).await?;
            normalize(&ComponentDialect::new(api, validated), service, policy)?
        }
        DialectKind::Legacy => normalize(&LegacyDialect::new(documentation), service, policy)?,
        DialectKind::Declared => Normalized {
            spec: None,
            models: ModelCollection::from_models(documentation.models.clone(), policy)?,
            records: Vec::new(),
            diagnostics: Vec::new(),
        },
    };
    Ok(Some(normalized))
}

/// Walk every HTTP event of `service` against `dialect`.
pub fn normalize<D: SpecDialect>(
    dialect: &D,
    service: &ServiceDefinition,
    policy: CollisionPolicy,
) -> Result<Normalized> {
    let mut models = ModelCollection::new(policy);
    for (name, schema) in dialect.schema_root().into_iter().flatten() {
        models.insert(ModelDefinition::from_declared(name, schema))?;
    }

    let mut walk = Walk {
        dialect,
        models,
        diagnostics: Vec::new(),
    };
    let mut records = Vec::new();

    let Some(paths) = dialect.paths() else {
        log::debug!("[gatedoc] no paths documented");
        return Ok(walk.finish(records));
    };

    for (function, definition) in &service.functions {
        for (event_index, http) in definition.http_events() {
            let op = match spec::lookup(paths, &http.path, &http.method) {
                PathLookup::MissingPath => continue,
                PathLookup::MissingMethod => {
                    walk.report(Diagnostic::MissingMethod {
                        function: function.clone(),
                        path: http.path.clone(),
                        method: http.method.clone(),
                    });
                    continue;
                }
                PathLookup::Found(op) => op,
            };

            let record = walk.record(function, &http.path, &http.method, op)?;
            records.push(EndpointDocumentation {
                function: function.clone(),
                event_index,
                path: http.path.clone(),
                method: http.method.clone(),
                record,
            });
        }
    }

    Ok(walk.finish(records))
}

struct Walk<'d, D> {
    dialect: &'d D,
    models: ModelCollection,
    diagnostics: Vec<Diagnostic>,
}

impl<D: SpecDialect> Walk<'_, D> {
    fn report(&mut self, diagnostic: Diagnostic) {
        log::warn!("[gatedoc] {}", diagnostic);
        self.diagnostics.push(diagnostic);
    }

    fn record(
        &mut self,
        function: &str,
        path: &str,
        method: &str,
        op: &JsonValue,
    ) -> Result<DocumentationRecord> {
        let dialect = self.dialect;
        let mut record = DocumentationRecord::for_method(op);
        let request_name = format!("{function}Request");

        for param in dialect.parameters(path, &method.to_ascii_lowercase(), op) {
            let Some(location) = param
                .get("in")
                .and_then(JsonValue::as_str)
                .and_then(ParameterLocation::parse)
            else {
                continue;
            };
            if location == ParameterLocation::Body {
                if let Some(model) = self.model_for(function, param, &request_name)? {
                    record
                        .request_models
                        .insert(JSON_CONTENT_TYPE.to_string(), model);
                }
            } else {
                record.push_parameter(location, param);
            }
        }

        if let Some(body) = dialect.request_body(op) {
            if let Some(model) = self.model_for(function, body, &request_name)? {
                record
                    .request_models
                    .insert(JSON_CONTENT_TYPE.to_string(), model);
            }
        }

        if let Some(responses) = op.get("responses").and_then(JsonValue::as_object) {
            let response_name = format!("{function}Response");
            let mut method_responses = Vec::with_capacity(responses.len());
            for (status_code, response) in responses {
                let mut doc = MethodResponseDoc::new(status_code.as_str());
                if let Some(body) = dialect.response_body(response) {
                    if let Some(model) = self.model_for(function, body, &response_name)? {
                        doc.response_models =
                            Some(IndexMap::from([(JSON_CONTENT_TYPE.to_string(), model)]));
                    }
                }
                method_responses.push(doc);
            }
            record.method_responses = Some(method_responses);
        }

        Ok(record)
    }

    fn model_for(
        &mut self,
        function: &str,
        holder: &JsonValue,
        candidate: &str,
    ) -> Result<Option<String>> {
        let extracted = models::extract(holder, candidate, self.dialect.pattern(), &mut self.models)
            .map_err(|err| match err {
                Error::ModelCollision { name, .. } => Error::ModelCollision {
                    name,
                    function: Some(function.to_string()),
                },
                other => other,
            })?;
        match extracted {
            Extracted::Referenced(name) | Extracted::Minted(name) => Ok(Some(name)),
            Extracted::Unsupported(pointer) => {
                self.report(Diagnostic::UnsupportedReference {
                    function: function.to_string(),
                    pointer,
                });
                Ok(None)
            }
        }
    }

    fn finish(self, records: Vec<EndpointDocumentation>) -> Normalized {
        Normalized {
            spec: Some(self.dialect.normalized_spec()),
            models: self.models,
            records,
            diagnostics: self.diagnostics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn service(yaml: &str) -> ServiceDefinition {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn with_api(mut service: ServiceDefinition, api: JsonValue) -> ServiceDefinition {
        let documentation = serde_json::from_value(json!({"openapi": true, "api": api})).unwrap();
        service.custom.documentation = Some(documentation);
        service
    }

    fn widget_api() -> JsonValue {
        json!({
            "openapi": "3.0.0",
            "info": {"title": "Widgets", "version": "1.0.0"},
            "paths": {
                "/widgets": {
                    "get": {
                        "summary": "List widgets",
                        "responses": {
                            "200": {
                                "description": "ok",
                                "content": {
                                    "application/json": {"schema": {"$ref": "#/components/schemas/Widget"}}
                                }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Widget": {
                        "type": "object",
                        "properties": {"id": {"type": "string"}, "name": {"type": "string"}}
                    }
                }
            }
        })
    }

    #[tokio::test]
    async fn test_component_dialect_referenced_response() -> crate::Result<()> {
        let svc = with_api(
            service("service: s\nfunctions:\n  listWidgets:\n    events:\n      - http:\n          path: widgets\n          method: get\n"),
            widget_api(),
        );

        let normalized = normalize_service(&svc).await?.unwrap();
        let names: Vec<_> = normalized.models.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Widget"]);
        assert_eq!(normalized.records.len(), 1);

        let record = serde_json::to_value(&normalized.records[0].record)?;
        assert_eq!(record["summary"], json!("List widgets"));
        assert_eq!(
            record["methodResponses"],
            json!([{"statusCode": "200", "responseModels": {"application/json": "Widget"}}])
        );
        assert!(normalized.diagnostics.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_component_dialect_inline_request_body() -> crate::Result<()> {
        let api = json!({
            "openapi": "3.0.0",
            "info": {"title": "Widgets", "version": "1.0.0"},
            "paths": {
                "/widgets": {
                    "post": {
                        "parameters": [{"name": "X-Trace", "in": "header", "required": true, "schema": {"type": "string"}}],
                        "requestBody": {
                            "content": {
                                "application/json": {
                                    "schema": {"type": "object", "properties": {"name": {"type": "string"}}}
                                }
                            }
                        },
                        "responses": {"204": {"description": "created"}}
                    }
                }
            }
        });
        let svc = with_api(
            service("service: s\nfunctions:\n  createWidget:\n    events:\n      - http: POST widgets\n"),
            api,
        );

        let normalized = normalize_service(&svc).await?.unwrap();
        assert_eq!(normalized.models.len(), 1);
        assert!(normalized.models.contains("createWidgetRequest"));

        let record = &normalized.records[0].record;
        assert_eq!(
            record.request_models.get("application/json").map(String::as_str),
            Some("createWidgetRequest")
        );
        assert_eq!(record.request_headers[0].name, "X-Trace");
        assert_eq!(record.request_headers[0].required, Some(true));
        let responses = record.method_responses.as_ref().unwrap();
        assert_eq!(responses[0], MethodResponseDoc::new("204"));
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_path_and_missing_method() -> crate::Result<()> {
        let svc = with_api(
            service(
                "service: s\nfunctions:\n  deleteWidget:\n    events:\n      - http: DELETE widgets\n  health:\n    events:\n      - http: GET health\n",
            ),
            widget_api(),
        );

        let normalized = normalize_service(&svc).await?.unwrap();
        assert!(normalized.records.is_empty());
        assert_eq!(
            normalized.diagnostics,
            vec![Diagnostic::MissingMethod {
                function: "deleteWidget".into(),
                path: "widgets".into(),
                method: "delete".into(),
            }]
        );
        let message = normalized.diagnostics[0].to_string();
        assert!(message.contains("deleteWidget") && message.contains("delete"));
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_document_produces_nothing() {
        let mut api = widget_api();
        api["paths"]["/widgets"]["get"]["responses"]["200"]["content"]["application/json"]["schema"]
            ["$ref"] = json!("#/components/schemas/Gadget");
        let svc = with_api(
            service("service: s\nfunctions:\n  listWidgets:\n    events:\n      - http: GET widgets\n"),
            api,
        );

        let err = normalize_service(&svc).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_legacy_dialect_walk() -> crate::Result<()> {
        let svc = service(
            r##"
service: pets
custom:
  documentation:
    swagger: true
    definitions:
      Pet:
        description: A pet
        type: object
        properties:
          owner:
            $ref: "#/definitions/Owner"
      Owner:
        type: object
    paths:
      /pets/{id}:
        put:
          description: Replace a pet
          parameters:
            - name: id
              in: path
              required: true
            - name: dryRun
              in: query
            - name: body
              in: body
              schema:
                $ref: "#/definitions/Pet"
          responses:
            "200":
              description: updated
              schema:
                type: object
                properties:
                  pet:
                    $ref: "#/definitions/Pet"
            "404":
              description: not found
functions:
  updatePet:
    events:
      - http:
          path: pets/{id}
          method: put
"##,
        );

        let documentation = svc.documentation().unwrap();
        let normalized = normalize(
            &LegacyDialect::new(documentation),
            &svc,
            CollisionPolicy::Reject,
        )?;

        let names: Vec<_> = normalized.models.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Pet", "Owner", "updatePetResponse"]);
        let pet = normalized.models.get("Pet").unwrap();
        assert_eq!(pet.description.as_deref(), Some("A pet"));
        assert_eq!(
            pet.schema.as_ref().unwrap()["properties"]["owner"]["$ref"],
            json!("{{model: Owner}}")
        );
        let response_model = normalized.models.get("updatePetResponse").unwrap();
        assert_eq!(response_model.description.as_deref(), Some("updated"));

        let record = &normalized.records[0].record;
        assert_eq!(record.description.as_deref(), Some("Replace a pet"));
        assert_eq!(record.path_params[0].name, "id");
        assert_eq!(record.query_params[0].name, "dryRun");
        assert_eq!(
            record.request_models.get("application/json").map(String::as_str),
            Some("Pet")
        );
        let responses = record.method_responses.as_ref().unwrap();
        let codes: Vec<_> = responses.iter().map(|r| r.status_code.as_str()).collect();
        assert_eq!(codes, vec!["200", "404"]);
        assert!(responses[1].response_models.is_none());
        Ok(())
    }

    #[test]
    fn test_colliding_inline_responses_are_rejected() {
        let svc = service(
            r##"
service: s
custom:
  documentation:
    swagger: true
    paths:
      /things:
        get:
          responses:
            "200":
              schema: {type: array}
            "500":
              schema: {type: object}
functions:
  listThings:
    events:
      - http: GET things
"##,
        );
        let dialect = LegacyDialect::new(svc.documentation().unwrap());

        let err = normalize(&dialect, &svc, CollisionPolicy::Reject).unwrap_err();
        assert!(matches!(
            err,
            Error::ModelCollision { ref name, function: Some(ref function) }
                if name == "listThingsResponse" && function == "listThings"
        ));
        assert!(err.to_string().contains("modelCollisions: overwrite"));

        let normalized = normalize(&dialect, &svc, CollisionPolicy::Overwrite).unwrap();
        assert_eq!(normalized.models.len(), 1);
        assert_eq!(
            normalized.models.get("listThingsResponse").unwrap().schema,
            Some(json!({"type": "object"}))
        );
    }

    #[tokio::test]
    async fn test_declared_mode_keeps_hand_written_models() -> crate::Result<()> {
        let svc = service(
            "service: s\ncustom:\n  documentation:\n    models:\n      - name: Error\n        contentType: application/json\n        schema: {type: object}\n",
        );
        let normalized = normalize_service(&svc).await?.unwrap();
        assert!(normalized.spec.is_none());
        assert!(normalized.models.contains("Error"));
        assert!(normalized.records.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_no_documentation_block() -> crate::Result<()> {
        assert!(normalize_service(&service("service: s")).await?.is_none());
        Ok(())
    }
}
