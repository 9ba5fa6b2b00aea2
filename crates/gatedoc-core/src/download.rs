//! Downloading the deployed documentation as a Swagger export.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::gateway::{ExportRequest, GatewayClient};
use crate::naming::ResourceNaming;
use crate::reconcile::deployed_rest_api_id;
use crate::{Error, Result};

/// Export extensions API Gateway understands
pub const EXTENSIONS: [&str; 4] = ["integrations", "apigateway", "authorizers", "postman"];

const DEFAULT_EXTENSION: &str = "integrations";
const EXPORT_TYPE: &str = "swagger";

/// A manual download of the deployed documentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub output_file_name: PathBuf,
    pub extensions: Vec<String>,
}

impl DownloadRequest {
    pub fn new(output_file_name: impl Into<PathBuf>) -> Self {
        Self {
            output_file_name: output_file_name.into(),
            extensions: Vec::new(),
        }
    }

    /// Parse a comma separated extension list
    pub fn with_extensions(mut self, extensions: &str) -> Result<Self> {
        let mut parsed = Vec::new();
        for extension in extensions.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            if !EXTENSIONS.contains(&extension) {
                return Err(Error::config(format!(
                    "Unknown extension '{extension}', expected one of {}",
                    EXTENSIONS.join(", ")
                )));
            }
            parsed.push(extension.to_string());
        }
        self.extensions = parsed;
        Ok(self)
    }

    /// Media type matching the output file extension
    pub fn accepts(&self) -> &'static str {
        match self
            .output_file_name
            .extension()
            .and_then(|ext| ext.to_str())
        {
            Some("yml") | Some("yaml") => "application/yaml",
            _ => "application/json",
        }
    }

    /// The stage export this request asks for
    pub fn export(&self, stage: &str) -> ExportRequest {
        let extensions = if self.extensions.is_empty() {
            DEFAULT_EXTENSION.to_string()
        } else {
            self.extensions.join(",")
        };
        ExportRequest {
            stage: stage.to_string(),
            export_type: EXPORT_TYPE.to_string(),
            extensions,
            accepts: self.accepts().to_string(),
        }
    }
}

/// Export the deployed stage and write it to the requested file
pub async fn download_documentation<G, N>(
    client: &G,
    naming: &N,
    stage: &str,
    request: &DownloadRequest,
) -> Result<PathBuf>
where
    G: GatewayClient,
    N: ResourceNaming,
{
    let rest_api_id = deployed_rest_api_id(client, &naming.stack_name(stage)).await?;
    let body = client
        .get_export(&rest_api_id, &request.export(stage))
        .await?;
    write_output(&request.output_file_name, &body).await?;
    log::info!(
        "[gatedoc] documentation written to {}",
        request.output_file_name.display()
    );
    Ok(request.output_file_name.clone())
}

async fn write_output(path: &Path, body: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, body).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{DocumentationPart, StoredPart};
    use crate::naming::ServerlessNaming;
    use crate::template::API_ID_OUTPUT;
    use indexmap::IndexMap;
    use serde_json::{json, Value as JsonValue};
    use std::sync::Mutex;
    use tempfile::tempdir;

    struct ExportingGateway {
        seen: Mutex<Option<(String, ExportRequest)>>,
    }

    impl GatewayClient for ExportingGateway {
        async fn describe_stack(&self, _stack_name: &str) -> Result<IndexMap<String, JsonValue>> {
            Ok(IndexMap::from([(API_ID_OUTPUT.to_string(), json!("abc123"))]))
        }

        async fn get_documentation_version(&self, _: &str, _: &str) -> Result<Option<JsonValue>> {
            Ok(None)
        }

        async fn get_documentation_parts(&self, _: &str) -> Result<Vec<StoredPart>> {
            Ok(Vec::new())
        }

        async fn delete_documentation_part(&self, _: &str, _: &str) -> Result<()> {
            Ok(())
        }

        async fn create_documentation_part(&self, _: &str, _: &DocumentationPart) -> Result<()> {
            Ok(())
        }

        async fn create_documentation_version(&self, _: &str, _: &str, _: &str) -> Result<()> {
            Ok(())
        }

        async fn get_export(&self, rest_api_id: &str, export: &ExportRequest) -> Result<Vec<u8>> {
            *self.seen.lock().unwrap() = Some((rest_api_id.to_string(), export.clone()));
            Ok(b"swagger: '2.0'\n".to_vec())
        }
    }

    #[test]
    fn test_accept_type_follows_file_name() {
        assert_eq!(DownloadRequest::new("docs.yml").accepts(), "application/yaml");
        assert_eq!(DownloadRequest::new("docs.YAML").accepts(), "application/json");
        assert_eq!(DownloadRequest::new("docs.json").accepts(), "application/json");
        assert_eq!(DownloadRequest::new("docs").accepts(), "application/json");
    }

    #[test]
    fn test_extensions() {
        let request = DownloadRequest::new("docs.json");
        assert_eq!(request.export("dev").extensions, "integrations");

        let request = request.with_extensions("apigateway, postman").unwrap();
        assert_eq!(request.export("dev").extensions, "apigateway,postman");

        let err = DownloadRequest::new("docs.json")
            .with_extensions("integrations,swagger")
            .unwrap_err();
        assert!(err.to_string().contains("swagger"));
    }

    #[tokio::test]
    async fn test_download_writes_export() -> crate::Result<()> {
        let dir = tempdir()?;
        let gateway = ExportingGateway {
            seen: Mutex::new(None),
        };
        let request = DownloadRequest::new(dir.path().join("out/api.yaml"));

        let written =
            download_documentation(&gateway, &ServerlessNaming::new("widgets"), "prod", &request)
                .await?;

        assert_eq!(tokio::fs::read_to_string(&written).await?, "swagger: '2.0'\n");
        let (api_id, export) = gateway.seen.lock().unwrap().clone().unwrap();
        assert_eq!(api_id, "abc123");
        assert_eq!(export.stage, "prod");
        assert_eq!(export.export_type, "swagger");
        assert_eq!(export.accepts, "application/yaml");
        Ok(())
    }
}
