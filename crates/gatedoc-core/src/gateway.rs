//! The deployed-state boundary: stack outputs and API Gateway documentation
//! calls.
//!
//! [`GatewayClient`] is the seam the reconciler and the download operation are
//! written against. [`HttpGatewayClient`] talks to the REST endpoints of API
//! Gateway and CloudFormation over `reqwest`. Request signing is not done
//! here; point the client at a signing proxy or a local emulator.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map as JsonMap, Value as JsonValue};
use url::Url;

use crate::{Error, Result};

/// Where a documentation part applies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartLocation {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A documentation part to upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentationPart {
    pub location: PartLocation,
    pub properties: JsonMap<String, JsonValue>,
}

/// A documentation part already stored for a REST API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoredPart {
    pub id: String,
}

/// Capabilities of the deployed environment.
#[allow(async_fn_in_trait)]
pub trait GatewayClient {
    /// Outputs of a deployed stack, keyed by output name
    async fn describe_stack(&self, stack_name: &str) -> Result<IndexMap<String, JsonValue>>;

    /// `Ok(None)` when the version does not exist
    async fn get_documentation_version(
        &self,
        rest_api_id: &str,
        version: &str,
    ) -> Result<Option<JsonValue>>;

    async fn get_documentation_parts(&self, rest_api_id: &str) -> Result<Vec<StoredPart>>;

    async fn delete_documentation_part(&self, rest_api_id: &str, part_id: &str) -> Result<()>;

    async fn create_documentation_part(
        &self,
        rest_api_id: &str,
        part: &DocumentationPart,
    ) -> Result<()>;

    async fn create_documentation_version(
        &self,
        rest_api_id: &str,
        version: &str,
        stage: &str,
    ) -> Result<()>;

    /// Export a deployed stage, returning the raw body
    async fn get_export(&self, rest_api_id: &str, export: &ExportRequest) -> Result<Vec<u8>>;
}

/// Parameters of a stage export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    pub stage: String,
    /// Export type, `swagger` or `oas30`
    pub export_type: String,
    /// Comma separated extensions
    pub extensions: String,
    /// Accepted media type
    pub accepts: String,
}

/// Service endpoints used by [`HttpGatewayClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayEndpoints {
    pub api_gateway: Url,
    pub cloudformation: Url,
}

impl GatewayEndpoints {
    /// Public AWS endpoints of a region
    pub fn for_region(region: &str) -> Result<Self> {
        Ok(Self {
            api_gateway: parse_url(&format!("https://apigateway.{region}.amazonaws.com"))?,
            cloudformation: parse_url(&format!("https://cloudformation.{region}.amazonaws.com"))?,
        })
    }

    /// One endpoint serving both APIs, as local emulators do
    pub fn single(endpoint: &str) -> Result<Self> {
        let url = parse_url(endpoint)?;
        Ok(Self {
            api_gateway: url.clone(),
            cloudformation: url,
        })
    }
}

fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| Error::config(format!("Invalid endpoint '{raw}': {e}")))
}

/// [`GatewayClient`] over HTTP
#[derive(Debug, Clone)]
pub struct HttpGatewayClient {
    http: reqwest::Client,
    endpoints: GatewayEndpoints,
}

impl HttpGatewayClient {
    pub fn new(endpoints: GatewayEndpoints) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoints,
        }
    }

    /// API Gateway URL below `/restapis/{id}`
    fn rest_api_url(&self, rest_api_id: &str, segments: &[&str]) -> Result<Url> {
        let mut url = self.endpoints.api_gateway.clone();
        url.path_segments_mut()
            .map_err(|_| Error::config("API Gateway endpoint cannot be a base URL"))?
            .pop_if_empty()
            .push("restapis")
            .push(rest_api_id)
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(Error::gateway(status.as_u16(), error_message(&body)))
    }
}

impl GatewayClient for HttpGatewayClient {
    async fn describe_stack(&self, stack_name: &str) -> Result<IndexMap<String, JsonValue>> {
        let request = self
            .http
            .post(self.endpoints.cloudformation.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[
                ("Action", "DescribeStacks"),
                ("Version", "2010-05-15"),
                ("StackName", stack_name),
            ]);
        let body: JsonValue = self.send(request).await?.json().await?;
        stack_outputs(&body)
            .ok_or_else(|| Error::gateway(404, format!("Stack {stack_name} not found")))
    }

    async fn get_documentation_version(
        &self,
        rest_api_id: &str,
        version: &str,
    ) -> Result<Option<JsonValue>> {
        let url = self.rest_api_url(rest_api_id, &["documentation", "versions", version])?;
        match self.send(self.http.get(url)).await {
            Ok(response) => Ok(Some(response.json().await?)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn get_documentation_parts(&self, rest_api_id: &str) -> Result<Vec<StoredPart>> {
        let mut url = self.rest_api_url(rest_api_id, &["documentation", "parts"])?;
        url.query_pairs_mut().append_pair("limit", "9999");
        let body: JsonValue = self.send(self.http.get(url)).await?.json().await?;
        Ok(stored_parts(&body))
    }

    async fn delete_documentation_part(&self, rest_api_id: &str, part_id: &str) -> Result<()> {
        let url = self.rest_api_url(rest_api_id, &["documentation", "parts", part_id])?;
        self.send(self.http.delete(url)).await?;
        Ok(())
    }

    async fn create_documentation_part(
        &self,
        rest_api_id: &str,
        part: &DocumentationPart,
    ) -> Result<()> {
        let url = self.rest_api_url(rest_api_id, &["documentation", "parts"])?;
        // properties travel as a JSON encoded string
        let body = json!({
            "location": part.location,
            "properties": serde_json::to_string(&part.properties)?,
        });
        self.send(self.http.post(url).json(&body)).await?;
        Ok(())
    }

    async fn create_documentation_version(
        &self,
        rest_api_id: &str,
        version: &str,
        stage: &str,
    ) -> Result<()> {
        let url = self.rest_api_url(rest_api_id, &["documentation", "versions"])?;
        let body = json!({"documentationVersion": version, "stageName": stage});
        self.send(self.http.post(url).json(&body)).await?;
        Ok(())
    }

    async fn get_export(&self, rest_api_id: &str, export: &ExportRequest) -> Result<Vec<u8>> {
        let mut url = self.rest_api_url(
            rest_api_id,
            &["stages", export.stage.as_str(), "exports", export.export_type.as_str()],
        )?;
        url.query_pairs_mut()
            .append_pair("extensions", &export.extensions);
        let request = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, export.accepts.as_str());
        let bytes = self.send(request).await?.bytes().await?;
        Ok(bytes.to_vec())
    }
}

/// Outputs of the first stack of a `DescribeStacks` JSON response
fn stack_outputs(body: &JsonValue) -> Option<IndexMap<String, JsonValue>> {
    let stack = body
        .pointer("/DescribeStacksResponse/DescribeStacksResult/Stacks")
        .or_else(|| body.get("Stacks"))?
        .as_array()?
        .first()?;
    let outputs = stack
        .get("Outputs")
        .and_then(JsonValue::as_array)
        .map(|outputs| {
            outputs
                .iter()
                .filter_map(|output| {
                    let key = output.get("OutputKey")?.as_str()?;
                    let value = output.get("OutputValue")?.clone();
                    Some((key.to_string(), value))
                })
                .collect()
        })
        .unwrap_or_default();
    Some(outputs)
}

/// Parts listed in a `GetDocumentationParts` response, plain or HAL encoded
fn stored_parts(body: &JsonValue) -> Vec<StoredPart> {
    let items = body
        .get("item")
        .or_else(|| body.pointer("/_embedded/item"))
        .or_else(|| body.get("items"));
    match items {
        Some(JsonValue::Array(items)) => items
            .iter()
            .filter_map(|item| serde_json::from_value(item.clone()).ok())
            .collect(),
        // a single embedded item is not wrapped in a list
        Some(item @ JsonValue::Object(_)) => serde_json::from_value(item.clone())
            .map(|part| vec![part])
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<JsonValue>(body)
        .ok()
        .and_then(|json| {
            json.get("message")
                .or_else(|| json.get("Message"))
                .or_else(|| json.pointer("/Error/Message"))
                .and_then(JsonValue::as_str)
                .map(String::from)
        })
        .unwrap_or_else(|| body.trim().to_string())
}
