//! Error taxonomy for the session and request layer
//!
//! Callers (the schema layer) match on these variants to turn API failures
//! into Terraform diagnostics, so status codes and decoded error details are
//! preserved rather than flattened into strings.

use serde::Deserialize;
use thiserror::Error;

use super::models::ServiceKind;

/// Structured error body returned by both Veeam REST services
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub errors: Option<serde_json::Value>,
    #[serde(rename = "traceId", default)]
    pub trace_id: Option<String>,
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
}

impl ApiErrorBody {
    /// True when the body carries a usable title or detail
    pub fn is_structured(&self) -> bool {
        self.title.is_some() || self.detail.is_some()
    }

    /// Human-readable `title: detail` summary
    pub fn summary(&self) -> String {
        match (&self.title, &self.detail) {
            (Some(title), Some(detail)) => format!("{}: {}", title, detail),
            (Some(title), None) => title.clone(),
            (None, Some(detail)) => detail.clone(),
            (None, None) => String::new(),
        }
    }
}

/// Errors produced by session management, request execution, and routing
#[derive(Debug, Error)]
pub enum ApiError {
    /// Password or Refresh grant rejected by the token endpoint
    #[error("authentication with the {service} service failed: {message}")]
    AuthenticationFailed {
        service: ServiceKind,
        message: String,
    },

    /// Refresh was requested without a stored refresh token
    #[error("no refresh token available")]
    NoRefreshToken,

    /// Transport-level failure (connect, TLS, timeout)
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-2xx API response; `detail` is present when the body was the
    /// services' structured error shape
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        status: u16,
        body: String,
        detail: Option<ApiErrorBody>,
    },

    /// Resource type routed to a service whose provider block is missing
    #[error(
        "resource type \"{resource}\" is served by the {service} service, \
         but the \"{block}\" provider block is not configured"
    )]
    UnconfiguredService {
        resource: String,
        service: ServiceKind,
        block: &'static str,
    },

    /// Resource type name does not contain any known service name
    #[error("resource type \"{0}\" does not belong to any known Veeam service")]
    UnknownResourceType(String),

    /// Malformed provider configuration
    #[error("invalid provider configuration: {0}")]
    InvalidConfig(String),
}

impl ApiError {
    /// HTTP status of the failed call, when the error carries one
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for 404 responses; the schema layer maps these to
    /// resource-removed-outside-Terraform
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_summary_combines_title_and_detail() {
        let body: ApiErrorBody =
            serde_json::from_str(r#"{"title":"invalid_grant","detail":"bad password"}"#).unwrap();
        assert!(body.is_structured());
        assert_eq!(body.summary(), "invalid_grant: bad password");
    }

    #[test]
    fn error_body_tolerates_unknown_shape() {
        let body: ApiErrorBody = serde_json::from_str(r#"{"message":"nope"}"#).unwrap();
        assert!(!body.is_structured());
        assert_eq!(body.summary(), "");
    }

    #[test]
    fn status_is_exposed_for_http_errors() {
        let err = ApiError::HttpStatus {
            status: 404,
            body: "not here".to_string(),
            detail: None,
        };
        assert_eq!(err.status(), Some(404));
        assert!(err.is_not_found());
        assert!(ApiError::NoRefreshToken.status().is_none());
    }
}
