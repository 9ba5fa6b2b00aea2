//! Error handling for the gatedoc documentation pipeline.
//!
//! This module defines the main error type `Error` used throughout the library,
//! along with a convenient `Result` type alias. It uses `thiserror` for easy
//! error handling and implements conversions from common error types.
//!
//! # Examples
//!
//! ```
//! use gatedoc_core::error::{Error, Result};
//!
//! fn might_fail() -> Result<()> {
//!     Err(Error::config("documentation block is missing"))
//! }
//!
//! assert!(might_fail().is_err());
//! ```

use thiserror::Error;

use crate::validate::ValidationIssue;

/// Result type for gatedoc operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for gatedoc operations
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// OpenAPI document could not be loaded
    #[error("OpenAPI error: {0}")]
    OpenApi(String),

    /// The component-dialect document failed structural validation
    #[error("{}", format_issues(.0))]
    Validation(Vec<ValidationIssue>),

    /// Two different models were registered under the same name
    #[error("{}", collision_message(.name, .function.as_deref()))]
    ModelCollision {
        name: String,
        /// Function whose documentation produced the second definition
        function: Option<String>,
    },

    /// CloudFormation template error
    #[error("Template error: {0}")]
    Template(String),

    /// Remote API Gateway / CloudFormation call failed
    #[error("Gateway error ({status}): {message}")]
    Gateway { status: u16, message: String },

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new OpenAPI error
    pub fn openapi<S: Into<String>>(msg: S) -> Self {
        Self::OpenApi(msg.into())
    }

    /// Create a new template error
    pub fn template<S: Into<String>>(msg: S) -> Self {
        Self::Template(msg.into())
    }

    /// Create a new gateway error
    pub fn gateway<S: Into<String>>(status: u16, msg: S) -> Self {
        Self::Gateway {
            status,
            message: msg.into(),
        }
    }

    /// Whether this is a gateway "not found" response
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Gateway { status: 404, .. })
    }
}

fn collision_message(name: &str, function: Option<&str>) -> String {
    let origin = function
        .map(|f| format!(" (function '{f}')"))
        .unwrap_or_default();
    format!(
        "model '{name}' is defined more than once with different schemas{origin}; \
         point the payloads at named schemas with `$ref` or set `modelCollisions: overwrite`"
    )
}

fn format_issues(issues: &[ValidationIssue]) -> String {
    let details = issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    format!("OpenAPI validation failed: {details}")
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Self::Config(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Self::Config(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_lists_every_issue() {
        let err = Error::Validation(vec![
            ValidationIssue::new("/paths/~1a", "first"),
            ValidationIssue::new("/paths/~1b", "second"),
        ]);
        assert_eq!(
            err.to_string(),
            "OpenAPI validation failed: /paths/~1a: first; /paths/~1b: second"
        );
    }

    #[test]
    fn test_collision_message_names_function_and_remedy() {
        let err = Error::ModelCollision {
            name: "thingsResponse".to_string(),
            function: Some("things".to_string()),
        };
        let message = err.to_string();
        assert!(message.starts_with("model 'thingsResponse' is defined more than once"));
        assert!(message.contains("(function 'things')"));
        assert!(message.contains("modelCollisions: overwrite"));
        assert!(message.contains("$ref"));
    }

    #[test]
    fn test_not_found_detection() {
        assert!(Error::gateway(404, "missing").is_not_found());
        assert!(!Error::gateway(500, "boom").is_not_found());
        assert!(!Error::config("x").is_not_found());
    }
}
