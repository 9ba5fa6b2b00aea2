//! Logical resource naming of the generated deployment template.

use once_cell::sync::Lazy;
use regex::Regex;

static PATH_VARIABLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(.*)\}").expect("valid path variable pattern"));
static NON_ALPHANUMERIC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^0-9A-Za-z]").expect("valid alphanumeric pattern"));

/// Naming functions of the host that generated the template.
pub trait ResourceNaming {
    /// Resource name fragment for an HTTP event path
    fn normalize_path(&self, path: &str) -> String;

    /// Logical id of the `AWS::ApiGateway::Method` resource
    fn method_logical_id(&self, resource_name: &str, method: &str) -> String;

    /// Name of the deployed stack
    fn stack_name(&self, stage: &str) -> String;
}

/// The Serverless Framework conventions.
#[derive(Debug, Clone)]
pub struct ServerlessNaming {
    service: String,
}

impl ServerlessNaming {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// `my-long-items` -> `MyDashlongDashitems`, `{id}` -> `IdVar`
    fn normalize_path_part(part: &str) -> String {
        let dashed = part.replace('-', "Dash");
        let variable = PATH_VARIABLE_RE.replace(&dashed, "${1}Var");
        upper_first(&NON_ALPHANUMERIC_RE.replace_all(&variable, ""))
    }
}

impl ResourceNaming for ServerlessNaming {
    fn normalize_path(&self, path: &str) -> String {
        path.split('/')
            .filter(|part| !part.is_empty())
            .map(Self::normalize_path_part)
            .collect()
    }

    fn method_logical_id(&self, resource_name: &str, method: &str) -> String {
        format!(
            "ApiGatewayMethod{}{}",
            resource_name,
            upper_first(&method.to_ascii_lowercase())
        )
    }

    fn stack_name(&self, stage: &str) -> String {
        format!("{}-{}", self.service, stage)
    }
}

fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
