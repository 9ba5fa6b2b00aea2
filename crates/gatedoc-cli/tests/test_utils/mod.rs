//! Test utilities for gatedoc integration tests

// Internal imports (std, crate)
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

// External imports (alphabetized)
use anyhow::Context;
use tempfile::TempDir;

/// Creates a temporary directory for test fixtures and outputs
pub fn create_temp_dir() -> anyhow::Result<(TempDir, PathBuf)> {
    let temp_dir = tempfile::tempdir()?;
    let temp_path = temp_dir.path().to_path_buf();
    Ok((temp_dir, temp_path))
}

/// Writes a service definition documented with an OpenAPI 3 file next to it
pub fn create_component_service(dir: &Path, widget_ref: &str) -> anyhow::Result<PathBuf> {
    let api_content = format!(
        r#"
openapi: 3.0.0
info:
  title: Widgets
  version: 1.0.0
paths:
  /widgets:
    get:
      summary: List widgets
      parameters:
        - name: limit
          in: query
          schema:
            type: integer
      responses:
        '200':
          description: A list of widgets
          content:
            application/json:
              schema:
                $ref: '{widget_ref}'
    post:
      summary: Create a widget
      requestBody:
        content:
          application/json:
            schema:
              type: object
              properties:
                name:
                  type: string
      responses:
        '201':
          description: Created
components:
  schemas:
    Widget:
      type: object
      properties:
        id:
          type: string
"#
    );
    fs::write(dir.join("openapi.yaml"), api_content)?;

    let service_path = dir.join("serverless.yml");
    let service_content = r#"
service: widgets
provider:
  name: aws
  runtime: nodejs18.x
custom:
  documentation:
    openapi: true
    apiFile: openapi.yaml
functions:
  listWidgets:
    handler: handler.list
    events:
      - http:
          path: widgets
          method: get
  createWidget:
    handler: handler.create
    events:
      - http: POST widgets
  deleteWidget:
    handler: handler.delete
    events:
      - http: DELETE widgets
"#;
    fs::write(&service_path, service_content)?;
    Ok(service_path)
}

/// Writes the template a deployment framework would have generated
pub fn create_generated_template(dir: &Path) -> anyhow::Result<PathBuf> {
    let template_path = dir.join("cloudformation-template-update-stack.json");
    let template_content = r#"{
  "AWSTemplateFormatVersion": "2010-09-09",
  "Resources": {
    "ApiGatewayRestApi": {"Type": "AWS::ApiGateway::RestApi"},
    "ApiGatewayMethodWidgetsGet": {
      "Type": "AWS::ApiGateway::Method",
      "Properties": {"HttpMethod": "GET"}
    },
    "ApiGatewayMethodWidgetsPost": {
      "Type": "AWS::ApiGateway::Method",
      "Properties": {"HttpMethod": "POST"}
    }
  },
  "Outputs": {}
}"#;
    fs::write(&template_path, template_content)?;
    Ok(template_path)
}

/// Runs the built gatedoc binary
pub fn run_gatedoc(args: &[&str]) -> anyhow::Result<Output> {
    Command::new(env!("CARGO_BIN_EXE_gatedoc"))
        .args(args)
        .output()
        .context("Failed to run gatedoc")
}

/// Reads a JSON file
pub fn read_json<P: AsRef<Path>>(path: P) -> anyhow::Result<serde_json::Value> {
    let path = path.as_ref();
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}
