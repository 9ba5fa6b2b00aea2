//! gatedoc CLI entrypoint
//! Parses command-line arguments and drives the documentation plugin hooks.

// Internal imports (std, crate)
use std::path::PathBuf;

// External imports (alphabetized)
use anyhow::Context;
use clap::{Args, Parser};
use gatedoc_core::{
    CloudFormationTemplate, DocumentationPlugin, DownloadRequest, GatewayEndpoints,
    HttpGatewayClient, PluginOptions, ReconcileOutcome, ServiceDefinition,
};
use tracing_subscriber::EnvFilter;

const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_STAGE: &str = "dev";

#[derive(Parser)]
#[command(name = "gatedoc")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Attach documentation and models to a generated CloudFormation template
    Package {
        #[command(flatten)]
        service: ServiceArgs,
        /// Generated template to update
        #[arg(long, default_value = ".serverless/cloudformation-template-update-stack.json")]
        template: PathBuf,
        /// Where to write the updated template (defaults to overwriting --template)
        #[arg(long)]
        output_template: Option<PathBuf>,
        /// Also write the service definition with documentation attached to events
        #[arg(long)]
        output_service: Option<PathBuf>,
        /// Do not touch RequestParameters of method resources
        #[arg(long)]
        doc_safe_mode: bool,
    },
    /// Publish documentation parts and a documentation version to the deployed stage
    ///
    /// Requests are sent unsigned. Point --endpoint at a SigV4 signing proxy
    /// or a local emulator; direct AWS endpoints reject them.
    Deploy {
        #[command(flatten)]
        service: ServiceArgs,
        #[command(flatten)]
        remote: RemoteArgs,
    },
    /// Download the deployed documentation as a Swagger export
    ///
    /// Requests are sent unsigned. Point --endpoint at a SigV4 signing proxy
    /// or a local emulator; direct AWS endpoints reject them.
    Download {
        #[command(flatten)]
        service: ServiceArgs,
        #[command(flatten)]
        remote: RemoteArgs,
        /// Output file; `.yml`/`.yaml` requests YAML, anything else JSON
        #[arg(long)]
        output_file_name: PathBuf,
        /// Comma separated export extensions (integrations, apigateway, authorizers, postman)
        #[arg(long, default_value = "integrations")]
        extensions: String,
    },
}

#[derive(Args, Debug)]
pub struct ServiceArgs {
    /// Service definition (YAML or JSON)
    #[arg(long, default_value = "serverless.yml")]
    service_file: PathBuf,
    /// Deployment stage (defaults to provider.stage, then "dev")
    #[arg(long)]
    stage: Option<String>,
}

#[derive(Args, Debug)]
pub struct RemoteArgs {
    /// Deployment region (defaults to provider.region, then us-east-1)
    #[arg(long)]
    region: Option<String>,
    /// Endpoint serving both API Gateway and CloudFormation, e.g. a signing proxy
    /// or a local emulator (requests are unsigned)
    #[arg(long)]
    endpoint: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Package {
            service,
            template,
            output_template,
            output_service,
            doc_safe_mode,
        } => {
            let (definition, mut options) = load_service(&service).await?;
            options.safe_mode = doc_safe_mode;

            let mut cf = CloudFormationTemplate::from_file(&template)
                .await
                .with_context(|| format!("Failed to load template {}", template.display()))?;

            let mut plugin = DocumentationPlugin::new(definition, options);
            let report = plugin
                .before_package(&mut cf)
                .await
                .context("Failed to document the service")?;

            let output_template = output_template.unwrap_or(template);
            cf.save(&output_template)
                .await
                .with_context(|| format!("Failed to write {}", output_template.display()))?;
            if let Some(path) = output_service {
                plugin
                    .service()
                    .save(&path)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?;
            }

            println!(
                "Documented {} endpoint(s) with {} model(s) into {}",
                report.documented_endpoints,
                report.models,
                output_template.display()
            );
            for diagnostic in &report.diagnostics {
                println!("warning: {diagnostic}");
            }
        }
        Commands::Deploy { service, remote } => {
            let (definition, options) = load_service(&service).await?;
            let client = gateway_client(&remote, &definition)?;

            let mut plugin = DocumentationPlugin::new(definition, options);
            let outcome = plugin
                .after_deploy(&client)
                .await
                .context("Failed to publish documentation")?;
            match outcome {
                ReconcileOutcome::Skipped => println!("No documentation configured, nothing to do"),
                ReconcileOutcome::AlreadyExists { version } => println!(
                    "Documentation version {version} already exists, skipping upload"
                ),
                ReconcileOutcome::Published { version } => {
                    println!("Published documentation version {version}")
                }
            }
        }
        Commands::Download {
            service,
            remote,
            output_file_name,
            extensions,
        } => {
            let (definition, options) = load_service(&service).await?;
            let client = gateway_client(&remote, &definition)?;
            let request = DownloadRequest::new(output_file_name).with_extensions(&extensions)?;

            let plugin = DocumentationPlugin::new(definition, options);
            let written = plugin
                .download(&client, &request)
                .await
                .context("Failed to download documentation")?;
            println!("Documentation written to {}", written.display());
        }
    }
    Ok(())
}

async fn load_service(args: &ServiceArgs) -> anyhow::Result<(ServiceDefinition, PluginOptions)> {
    let definition = ServiceDefinition::from_file(&args.service_file)
        .await
        .with_context(|| {
            format!(
                "Failed to load service definition {}",
                args.service_file.display()
            )
        })?;
    let options = plugin_options(args, &definition);
    tracing::debug!(stage = %options.stage, service = %definition.service, "service loaded");
    Ok((definition, options))
}

fn plugin_options(args: &ServiceArgs, definition: &ServiceDefinition) -> PluginOptions {
    PluginOptions {
        stage: args
            .stage
            .clone()
            .or_else(|| definition.provider.stage.clone())
            .unwrap_or_else(|| DEFAULT_STAGE.to_string()),
        safe_mode: false,
    }
}

fn gateway_client(
    remote: &RemoteArgs,
    definition: &ServiceDefinition,
) -> anyhow::Result<HttpGatewayClient> {
    let endpoints = match &remote.endpoint {
        Some(endpoint) => GatewayEndpoints::single(endpoint)?,
        None => {
            let region = remote
                .region
                .as_deref()
                .or(definition.provider.region.as_deref())
                .unwrap_or(DEFAULT_REGION);
            GatewayEndpoints::for_region(region)?
        }
    };
    Ok(HttpGatewayClient::new(endpoints))
}
