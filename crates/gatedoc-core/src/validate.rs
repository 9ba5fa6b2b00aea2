//! Structural validation of component-dialect (OpenAPI 3) documents.
//!
//! Validation runs on a copy of the document on a blocking worker and collects
//! every issue it finds. A successful run yields a [`ValidatedSpec`] whose
//! operations carry their effective parameter lists: path-level parameters
//! merged in and parameter `$ref`s dereferenced.

use std::collections::HashSet;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::resolver::REF_KEY;
use crate::spec::ApiSpec;
use crate::{Error, Result};

/// HTTP methods an OpenAPI path item may declare
pub const HTTP_METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

const MAX_REF_HOPS: usize = 32;

static PATH_TEMPLATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([^}/]+)\}").expect("valid path template pattern"));

/// One structural problem, located by JSON pointer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ValidationIssue {
    pub location: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.location.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.location, self.message)
        }
    }
}

/// A document that passed validation.
#[derive(Debug, Clone)]
pub struct ValidatedSpec {
    pub spec: ApiSpec,
}

impl ValidatedSpec {
    /// Effective parameters of an operation (path-level merged, refs dereferenced)
    pub fn parameters(&self, path: &str, method: &str) -> Vec<&JsonValue> {
        self.spec
            .operation(path, method)
            .and_then(|op| op.get("parameters"))
            .and_then(JsonValue::as_array)
            .map(|params| params.iter().collect())
            .unwrap_or_default()
    }
}

/// Validate a copy of `spec`.
///
/// The caller's tree is never touched, whatever the outcome.
pub async fn validate(spec: &JsonValue) -> Result<ValidatedSpec> {
    let copy = spec.clone();
    tokio::task::spawn_blocking(move || validate_owned(copy))
        .await
        .map_err(|e| Error::openapi(format!("validation task failed: {e}")))?
}

/// Synchronous validation of an owned document
pub fn validate_owned(mut json: JsonValue) -> Result<ValidatedSpec> {
    let mut issues = Vec::new();

    match json.get("openapi").and_then(JsonValue::as_str) {
        Some(version) if version.starts_with("3.") => {}
        Some(version) => issues.push(ValidationIssue::new(
            "/openapi",
            format!("unsupported OpenAPI version '{version}'"),
        )),
        None => issues.push(ValidationIssue::new("/openapi", "missing OpenAPI version")),
    }

    if let Err(e) = serde_json::from_value::<openapiv3::OpenAPI>(json.clone()) {
        issues.push(ValidationIssue::new("", format!("invalid document: {e}")));
    }

    collect_unresolved_refs(&json, &json, &mut String::new(), &mut issues);
    check_operations(&json, &mut issues);

    if !issues.is_empty() {
        issues.sort();
        issues.dedup();
        return Err(Error::Validation(issues));
    }

    let effective = effective_parameters(&json);
    apply_parameters(&mut json, effective);
    Ok(ValidatedSpec {
        spec: ApiSpec::new(json),
    })
}

fn escape_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

fn collect_unresolved_refs(
    root: &JsonValue,
    node: &JsonValue,
    location: &mut String,
    issues: &mut Vec<ValidationIssue>,
) {
    match node {
        JsonValue::Object(map) => {
            for (key, value) in map {
                let len = location.len();
                location.push('/');
                location.push_str(&escape_segment(key));
                match (key.as_str(), value) {
                    (REF_KEY, JsonValue::String(pointer)) => {
                        if let Some(fragment) = pointer.strip_prefix('#') {
                            if root.pointer(fragment).is_none() {
                                issues.push(ValidationIssue::new(
                                    location.clone(),
                                    format!("unresolved reference '{pointer}'"),
                                ));
                            }
                        }
                    }
                    _ => collect_unresolved_refs(root, value, location, issues),
                }
                location.truncate(len);
            }
        }
        JsonValue::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                let len = location.len();
                location.push('/');
                location.push_str(&index.to_string());
                collect_unresolved_refs(root, item, location, issues);
                location.truncate(len);
            }
        }
        _ => {}
    }
}

/// Follow `$ref` chains until a concrete object is reached
pub(crate) fn deref<'a>(root: &'a JsonValue, mut value: &'a JsonValue) -> Option<&'a JsonValue> {
    for _ in 0..MAX_REF_HOPS {
        match value.get(REF_KEY).and_then(JsonValue::as_str) {
            Some(pointer) => value = root.pointer(pointer.strip_prefix('#')?)?,
            None => return Some(value),
        }
    }
    None
}

fn parameter_key(param: &JsonValue) -> Option<(String, String)> {
    let name = param.get("name")?.as_str()?;
    let location = param.get("in")?.as_str()?;
    Some((name.to_string(), location.to_string()))
}

fn parameter_list<'a>(root: &'a JsonValue, owner: &'a JsonValue) -> Vec<&'a JsonValue> {
    owner
        .get("parameters")
        .and_then(JsonValue::as_array)
        .map(|params| params.iter().filter_map(|p| deref(root, p)).collect())
        .unwrap_or_default()
}

fn operations(item: &JsonMap<String, JsonValue>) -> impl Iterator<Item = (&'static str, &JsonValue)> {
    HTTP_METHODS
        .iter()
        .filter_map(move |method| item.get(*method).map(|op| (*method, op)))
}

fn check_operations(root: &JsonValue, issues: &mut Vec<ValidationIssue>) {
    let Some(paths) = root.get("paths").and_then(JsonValue::as_object) else {
        return;
    };
    for (path, item) in paths {
        let Some(item_map) = item.as_object() else {
            continue;
        };
        let path_level = parameter_list(root, item);
        let templated: Vec<&str> = PATH_TEMPLATE_RE
            .captures_iter(path)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
            .collect();

        for (method, op) in operations(item_map) {
            let location = format!("/paths/{}/{}", escape_segment(path), method);
            let op_level = parameter_list(root, op);

            let mut seen = HashSet::new();
            for key in op_level.iter().filter_map(|p| parameter_key(p)) {
                if !seen.insert(key.clone()) {
                    issues.push(ValidationIssue::new(
                        location.clone(),
                        format!("duplicate parameter '{}' in {}", key.0, key.1),
                    ));
                }
            }

            let declared: HashSet<&str> = path_level
                .iter()
                .chain(op_level.iter())
                .filter(|p| p.get("in").and_then(JsonValue::as_str) == Some("path"))
                .filter_map(|p| p.get("name").and_then(JsonValue::as_str))
                .collect();
            let missing: Vec<String> = templated
                .iter()
                .filter(|name| !declared.contains(*name))
                .map(|name| format!("{{{name}}}"))
                .collect();
            if !missing.is_empty() {
                issues.push(ValidationIssue::new(
                    location,
                    format!("missing path parameter(s) for {}", missing.join(", ")),
                ));
            }
        }
    }
}

type EffectiveParameters = Vec<(String, &'static str, Vec<JsonValue>)>;

/// Operation parameters override path-level ones with the same name and location
fn effective_parameters(root: &JsonValue) -> EffectiveParameters {
    let mut effective = Vec::new();
    let Some(paths) = root.get("paths").and_then(JsonValue::as_object) else {
        return effective;
    };
    for (path, item) in paths {
        let Some(item_map) = item.as_object() else {
            continue;
        };
        let path_level = parameter_list(root, item);
        for (method, op) in operations(item_map) {
            let op_level = parameter_list(root, op);
            let overridden: HashSet<_> = op_level.iter().filter_map(|p| parameter_key(p)).collect();
            let params: Vec<JsonValue> = path_level
                .iter()
                .filter(|p| parameter_key(p).map_or(true, |key| !overridden.contains(&key)))
                .chain(op_level.iter())
                .map(|p| (*p).clone())
                .collect();
            if !params.is_empty() {
                effective.push((path.clone(), method, params));
            }
        }
    }
    effective
}

fn apply_parameters(root: &mut JsonValue, effective: EffectiveParameters) {
    for (path, method, params) in effective {
        if let Some(op) = root
            .get_mut("paths")
            .and_then(|paths| paths.get_mut(&path))
            .and_then(|item| item.get_mut(method))
            .and_then(JsonValue::as_object_mut)
        {
            op.insert("parameters".to_string(), JsonValue::Array(params));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(paths: JsonValue, components: JsonValue) -> JsonValue {
        json!({
            "openapi": "3.0.0",
            "info": {"title": "Widgets", "version": "1.0.0"},
            "paths": paths,
            "components": components
        })
    }

    #[tokio::test]
    async fn test_valid_document_dereferences_parameters() -> crate::Result<()> {
        let doc = document(
            json!({
                "/widgets/{id}": {
                    "parameters": [{"name": "id", "in": "path", "required": true, "schema": {"type": "string"}}],
                    "get": {
                        "parameters": [{"$ref": "#/components/parameters/Limit"}],
                        "responses": {"200": {"description": "ok"}}
                    }
                }
            }),
            json!({
                "parameters": {
                    "Limit": {"name": "limit", "in": "query", "schema": {"type": "integer"}}
                }
            }),
        );

        let validated = validate(&doc).await?;
        let names: Vec<_> = validated
            .parameters("widgets/{id}", "get")
            .into_iter()
            .filter_map(|p| p.get("name").and_then(JsonValue::as_str))
            .collect();
        assert_eq!(names, vec!["id", "limit"]);
        // the input keeps its reference
        assert_eq!(
            doc.pointer("/paths/~1widgets~1{id}/get/parameters/0/$ref"),
            Some(&json!("#/components/parameters/Limit"))
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_unresolved_reference_is_reported() {
        let doc = document(
            json!({
                "/widgets": {
                    "get": {
                        "responses": {
                            "200": {
                                "description": "ok",
                                "content": {"application/json": {"schema": {"$ref": "#/components/schemas/Missing"}}}
                            }
                        }
                    }
                }
            }),
            json!({"schemas": {}}),
        );

        let err = validate(&doc).await.unwrap_err();
        let Error::Validation(issues) = err else {
            panic!("expected a validation error");
        };
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("#/components/schemas/Missing"));
        assert!(issues[0].location.starts_with("/paths/~1widgets/get/responses/200"));
    }

    #[test]
    fn test_missing_path_parameter_and_duplicates() {
        let doc = document(
            json!({
                "/widgets/{id}": {
                    "delete": {
                        "parameters": [
                            {"name": "force", "in": "query", "schema": {"type": "boolean"}},
                            {"name": "force", "in": "query", "schema": {"type": "boolean"}}
                        ],
                        "responses": {"204": {"description": "gone"}}
                    }
                }
            }),
            json!({}),
        );

        let Err(Error::Validation(issues)) = validate_owned(doc) else {
            panic!("expected a validation error");
        };
        let messages: Vec<_> = issues.iter().map(|i| i.message.as_str()).collect();
        assert!(messages.contains(&"duplicate parameter 'force' in query"));
        assert!(messages.contains(&"missing path parameter(s) for {id}"));
    }

    #[test]
    fn test_swagger_document_is_rejected() {
        let doc = json!({"swagger": "2.0", "info": {"title": "x", "version": "1"}, "paths": {}});
        let Err(Error::Validation(issues)) = validate_owned(doc) else {
            panic!("expected a validation error");
        };
        assert!(issues
            .iter()
            .any(|i| i.location == "/openapi" && i.message == "missing OpenAPI version"));
    }
}
