//! The host-facing hooks.
//!
//! A [`DocumentationPlugin`] owns the service definition for one run. The
//! host calls [`before_package`](DocumentationPlugin::before_package) with the
//! generated template, [`after_deploy`](DocumentationPlugin::after_deploy)
//! once the stack is up, and [`download`](DocumentationPlugin::download) on
//! demand.

use std::path::PathBuf;

use crate::config::PluginOptions;
use crate::download::{download_documentation, DownloadRequest};
use crate::gateway::GatewayClient;
use crate::models::ModelCollection;
use crate::naming::{ResourceNaming, ServerlessNaming};
use crate::normalize::{normalize_service, Diagnostic};
use crate::reconcile::{reconcile, ReconcileOutcome};
use crate::service::ServiceDefinition;
use crate::template::{CloudFormationTemplate, TemplateSynthesizer};
use crate::Result;

/// Summary of a packaging run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackageReport {
    pub models: usize,
    pub documented_endpoints: usize,
    pub diagnostics: Vec<Diagnostic>,
}

struct Prepared {
    service: ServiceDefinition,
    models: ModelCollection,
    documented_endpoints: usize,
    diagnostics: Vec<Diagnostic>,
}

pub struct DocumentationPlugin<N: ResourceNaming = ServerlessNaming> {
    service: ServiceDefinition,
    options: PluginOptions,
    naming: N,
    models: Option<ModelCollection>,
}

impl DocumentationPlugin<ServerlessNaming> {
    pub fn new(service: ServiceDefinition, options: PluginOptions) -> Self {
        let naming = ServerlessNaming::new(service.service.clone());
        Self::with_naming(service, options, naming)
    }
}

impl<N: ResourceNaming> DocumentationPlugin<N> {
    pub fn with_naming(service: ServiceDefinition, options: PluginOptions, naming: N) -> Self {
        Self {
            service,
            options,
            naming,
            models: None,
        }
    }

    /// The service definition, with documentation grafted once prepared
    pub fn service(&self) -> &ServiceDefinition {
        &self.service
    }

    /// Normalize the documentation block and graft the records onto a copy
    /// of the service.
    ///
    /// Returns `None` when the service is not documented. The plugin itself
    /// is only updated by [`commit`](Self::commit).
    async fn prepare(&self) -> Result<Option<Prepared>> {
        let Some(normalized) = normalize_service(&self.service).await? else {
            return Ok(None);
        };

        let mut service = self.service.clone();
        service.attach_documentation(&normalized.records);
        if let Some(documentation) = service.custom.documentation.as_mut() {
            documentation.models = normalized.models.iter().cloned().collect();
        }
        let documented_endpoints = service
            .functions
            .values()
            .flat_map(|f| f.http_events())
            .filter(|(_, http)| http.documentation.is_some())
            .count();
        Ok(Some(Prepared {
            service,
            models: normalized.models,
            documented_endpoints,
            diagnostics: normalized.diagnostics,
        }))
    }

    fn commit(&mut self, prepared: Prepared) -> PackageReport {
        log::info!(
            "[gatedoc] {} models, {} documented endpoints",
            prepared.models.len(),
            prepared.documented_endpoints
        );
        let report = PackageReport {
            models: prepared.models.len(),
            documented_endpoints: prepared.documented_endpoints,
            diagnostics: prepared.diagnostics,
        };
        self.service = prepared.service;
        self.models = Some(prepared.models);
        report
    }

    /// Pre-packaging hook: documentation into the service, models and method
    /// documentation into `template`.
    ///
    /// Neither the service nor `template` is changed when any step fails.
    pub async fn before_package(
        &mut self,
        template: &mut CloudFormationTemplate,
    ) -> Result<PackageReport> {
        let Some(prepared) = self.prepare().await? else {
            log::debug!("[gatedoc] no documentation block, template left unchanged");
            return Ok(PackageReport::default());
        };

        let mut updated = template.clone();
        TemplateSynthesizer::new(&self.naming, prepared.service.rest_api_id())
            .with_safe_mode(self.options.safe_mode)
            .synthesize(&mut updated, &prepared.models, &prepared.service)?;
        *template = updated;

        Ok(self.commit(prepared))
    }

    /// Post-deployment hook: publish the documentation of the deployed stage
    pub async fn after_deploy<G: GatewayClient>(&mut self, client: &G) -> Result<ReconcileOutcome> {
        if self.models.is_none() {
            let Some(prepared) = self.prepare().await? else {
                return Ok(ReconcileOutcome::Skipped);
            };
            self.commit(prepared);
        }
        let models = self.models.clone().unwrap_or_default();
        reconcile(
            client,
            &self.naming,
            &self.service,
            &models,
            &self.options.stage,
        )
        .await
    }

    /// Manual hook: export the deployed documentation to a file
    pub async fn download<G: GatewayClient>(
        &self,
        client: &G,
        request: &DownloadRequest,
    ) -> Result<PathBuf> {
        download_documentation(client, &self.naming, &self.options.stage, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use serde_json::json;

    const SERVICE_YAML: &str = r##"
service: widgets
provider:
  name: aws
custom:
  documentation:
    openapi: true
    api:
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
                required: true
                schema:
                  type: integer
            responses:
              "200":
                description: ok
                content:
                  application/json:
                    schema:
                      type: array
                      items:
                        $ref: "#/components/schemas/Widget"
      components:
        schemas:
          Widget:
            type: object
functions:
  listWidgets:
    events:
      - http: GET widgets
"##;

    fn template() -> CloudFormationTemplate {
        serde_json::from_value(json!({
            "Resources": {
                "ApiGatewayRestApi": {"Type": "AWS::ApiGateway::RestApi"},
                "ApiGatewayMethodWidgetsGet": {
                    "Type": "AWS::ApiGateway::Method",
                    "Properties": {"HttpMethod": "GET"}
                }
            }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_before_package_updates_service_and_template() -> crate::Result<()> {
        let service: ServiceDefinition = serde_yaml::from_str(SERVICE_YAML)?;
        let mut plugin = DocumentationPlugin::new(service, PluginOptions::default());
        let mut cf = template();

        let report = plugin.before_package(&mut cf).await?;
        assert_eq!(report.models, 2);
        assert_eq!(report.documented_endpoints, 1);
        assert!(report.diagnostics.is_empty());

        let http = plugin.service().functions["listWidgets"].events[0]
            .http
            .as_ref()
            .unwrap();
        let record = http.documentation.as_ref().unwrap();
        assert_eq!(record.summary.as_deref(), Some("List widgets"));

        let method = &cf.resources["ApiGatewayMethodWidgetsGet"];
        assert_eq!(
            method["Properties"]["RequestParameters"],
            json!({"method.request.querystring.limit": true})
        );
        assert_eq!(method["DependsOn"], json!(["listWidgetsResponseModel"]));

        let response_model = &cf.resources["listWidgetsResponseModel"];
        assert_eq!(response_model["DependsOn"], json!(["WidgetModel"]));
        assert!(cf.resources.contains_key("WidgetModel"));
        assert_eq!(
            cf.outputs["AwsDocApiId"]["Value"],
            json!({"Ref": "ApiGatewayRestApi"})
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_validation_failure_leaves_everything_untouched() {
        let yaml = SERVICE_YAML.replace("#/components/schemas/Widget", "#/components/schemas/Gadget");
        let service: ServiceDefinition = serde_yaml::from_str(&yaml).unwrap();
        let mut plugin = DocumentationPlugin::new(service, PluginOptions::default());
        let mut cf = template();
        let before = serde_json::to_value(&cf).unwrap();

        let err = plugin.before_package(&mut cf).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(serde_json::to_value(&cf).unwrap(), before);
        assert!(plugin.service().functions["listWidgets"].events[0]
            .http
            .as_ref()
            .unwrap()
            .documentation
            .is_none());
    }

    #[tokio::test]
    async fn test_synthesis_failure_leaves_service_untouched() {
        let service: ServiceDefinition = serde_yaml::from_str(SERVICE_YAML).unwrap();
        let mut plugin = DocumentationPlugin::new(service, PluginOptions::default());
        let mut cf: CloudFormationTemplate = serde_json::from_value(json!({
            "Resources": {"ApiGatewayRestApi": {"Type": "AWS::ApiGateway::RestApi"}}
        }))
        .unwrap();
        let before = serde_json::to_value(&cf).unwrap();

        let err = plugin.before_package(&mut cf).await.unwrap_err();
        assert!(matches!(err, Error::Template(_)));
        assert_eq!(serde_json::to_value(&cf).unwrap(), before);

        let documentation = plugin.service().documentation().unwrap();
        assert!(documentation.models.is_empty());
        assert!(plugin.service().functions["listWidgets"].events[0]
            .http
            .as_ref()
            .unwrap()
            .documentation
            .is_none());
    }

    #[tokio::test]
    async fn test_undocumented_service_is_a_noop() -> crate::Result<()> {
        let service: ServiceDefinition = serde_yaml::from_str("service: widgets")?;
        let mut plugin = DocumentationPlugin::new(service, PluginOptions::default());
        let mut cf = template();

        let report = plugin.before_package(&mut cf).await?;
        assert_eq!(report, PackageReport::default());
        assert!(cf.outputs.is_empty());
        Ok(())
    }
}
