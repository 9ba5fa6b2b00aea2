//! Gatedoc Core Library
//!
//! This library turns an OpenAPI 3 or Swagger-style API description into API
//! Gateway documentation: per-endpoint documentation records, named model
//! resources merged into a CloudFormation template, and documentation parts
//! published to the deployed REST API.

pub mod config;
pub mod dialect;
pub mod documentation;
pub mod download;
pub mod error;
pub mod gateway;
pub mod models;
pub mod naming;
pub mod normalize;
pub mod plugin;
pub mod reconcile;
pub mod resolver;
pub mod service;
pub mod spec;
pub mod template;
pub mod validate;

pub use crate::{
    config::{DocumentationConfig, PluginOptions},
    download::DownloadRequest,
    error::{Error, Result},
    gateway::{GatewayClient, GatewayEndpoints, HttpGatewayClient},
    models::{CollisionPolicy, ModelCollection, ModelDefinition},
    normalize::{normalize_service, Diagnostic, Normalized},
    plugin::{DocumentationPlugin, PackageReport},
    reconcile::ReconcileOutcome,
    service::ServiceDefinition,
    template::CloudFormationTemplate,
};
