//! Capability sets of the two supported description dialects.
//!
//! The normalizer walks deployment events once; everything that differs
//! between the legacy and the component format is answered by a
//! [`SpecDialect`] implementation.

use serde_json::{json, Map as JsonMap, Value as JsonValue};

use crate::config::DocumentationConfig;
use crate::models::JSON_CONTENT_TYPE;
use crate::resolver::{self, PointerPattern};
use crate::validate::{self, ValidatedSpec};

/// Where a dialect keeps schemas, parameters and payloads.
pub trait SpecDialect {
    /// Shape of internal schema pointers
    fn pattern(&self) -> PointerPattern;

    /// Declared schemas, already resolved, seeding the model collection
    fn schema_root(&self) -> Option<&JsonMap<String, JsonValue>>;

    /// The `paths` object deployment events are matched against
    fn paths(&self) -> Option<&JsonMap<String, JsonValue>>;

    /// Parameters of a matched method
    fn parameters<'a>(&'a self, path: &str, method: &str, op: &'a JsonValue) -> Vec<&'a JsonValue>;

    /// Object carrying the request body `schema`, beside `in: body` parameters
    fn request_body<'a>(&'a self, op: &'a JsonValue) -> Option<&'a JsonValue>;

    /// Object carrying a response's payload `schema`, if it declares one
    fn response_body<'a>(&'a self, response: &'a JsonValue) -> Option<&'a JsonValue>;

    /// The normalized document handed back to the caller
    fn normalized_spec(&self) -> JsonValue;
}

fn resolved_copy(schemas: &JsonMap<String, JsonValue>, pattern: PointerPattern) -> JsonMap<String, JsonValue> {
    let mut root = JsonValue::Object(schemas.clone());
    resolver::resolve(&mut root, pattern);
    match root {
        JsonValue::Object(map) => map,
        _ => JsonMap::new(),
    }
}

fn has_schema(holder: &JsonValue) -> bool {
    holder.get("schema").is_some_and(|schema| !schema.is_null())
}

/// Swagger 2 style: `definitions`, `in: body` parameters and `response.schema`.
#[derive(Debug, Clone)]
pub struct LegacyDialect {
    definitions: Option<JsonMap<String, JsonValue>>,
    paths: Option<JsonMap<String, JsonValue>>,
}

impl LegacyDialect {
    pub fn new(config: &DocumentationConfig) -> Self {
        Self {
            definitions: config
                .definitions
                .as_ref()
                .map(|defs| resolved_copy(defs, PointerPattern::Definitions)),
            paths: config.paths.clone(),
        }
    }
}

impl SpecDialect for LegacyDialect {
    fn pattern(&self) -> PointerPattern {
        PointerPattern::Definitions
    }

    fn schema_root(&self) -> Option<&JsonMap<String, JsonValue>> {
        self.definitions.as_ref()
    }

    fn paths(&self) -> Option<&JsonMap<String, JsonValue>> {
        self.paths.as_ref()
    }

    fn parameters<'a>(&'a self, _path: &str, _method: &str, op: &'a JsonValue) -> Vec<&'a JsonValue> {
        op.get("parameters")
            .and_then(JsonValue::as_array)
            .map(|params| params.iter().collect())
            .unwrap_or_default()
    }

    fn request_body<'a>(&'a self, _op: &'a JsonValue) -> Option<&'a JsonValue> {
        None
    }

    fn response_body<'a>(&'a self, response: &'a JsonValue) -> Option<&'a JsonValue> {
        has_schema(response).then_some(response)
    }

    fn normalized_spec(&self) -> JsonValue {
        json!({
            "definitions": self.definitions.clone().unwrap_or_default(),
            "paths": self.paths.clone().unwrap_or_default(),
        })
    }
}

/// OpenAPI 3: `components.schemas`, `requestBody` and `content` maps.
#[derive(Debug, Clone)]
pub struct ComponentDialect {
    spec: JsonValue,
    validated: ValidatedSpec,
}

impl ComponentDialect {
    /// Pair the raw document with its validated copy.
    ///
    /// `components.schemas` of an owned copy of `raw` is resolved; paths and
    /// payloads are read from that copy, parameters from `validated`.
    pub fn new(raw: &JsonValue, validated: ValidatedSpec) -> Self {
        let mut spec = raw.clone();
        if let Some(schemas) = spec.pointer_mut("/components/schemas") {
            resolver::resolve(schemas, PointerPattern::ComponentSchemas);
        }
        Self { spec, validated }
    }

    /// Follow a `$ref` to `components.requestBodies` / `components.responses`
    fn concrete<'a>(&'a self, value: &'a JsonValue) -> Option<&'a JsonValue> {
        validate::deref(&self.spec, value)
    }

    fn json_media<'a>(&'a self, holder: &'a JsonValue) -> Option<&'a JsonValue> {
        self.concrete(holder)?
            .get("content")?
            .get(JSON_CONTENT_TYPE)
            .filter(|media| has_schema(media))
    }
}

impl SpecDialect for ComponentDialect {
    fn pattern(&self) -> PointerPattern {
        PointerPattern::ComponentSchemas
    }

    fn schema_root(&self) -> Option<&JsonMap<String, JsonValue>> {
        self.spec
            .pointer("/components/schemas")
            .and_then(JsonValue::as_object)
    }

    fn paths(&self) -> Option<&JsonMap<String, JsonValue>> {
        self.spec.get("paths").and_then(JsonValue::as_object)
    }

    fn parameters<'a>(&'a self, path: &str, method: &str, _op: &'a JsonValue) -> Vec<&'a JsonValue> {
        self.validated.parameters(path, method)
    }

    fn request_body<'a>(&'a self, op: &'a JsonValue) -> Option<&'a JsonValue> {
        self.json_media(op.get("requestBody")?)
    }

    fn response_body<'a>(&'a self, response: &'a JsonValue) -> Option<&'a JsonValue> {
        self.json_media(response)
    }

    fn normalized_spec(&self) -> JsonValue {
        self.spec.clone()
    }
}
