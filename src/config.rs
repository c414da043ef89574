//! Provider configuration surface
//!
//! Mirrors the provider block structure of the Terraform configuration: one
//! optional block per backend service. In production the schema layer
//! deserializes the blocks and hands over a [`ProviderConfig`];
//! [`ProviderConfig::from_env`] covers the development and acceptance-test
//! path.

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

use crate::api::models::{ServiceCredentials, ServiceKind};

/// Top-level provider configuration; a service is reachable iff its block
/// is present
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub azure: Option<ServiceConfig>,
    #[serde(default)]
    pub vbr: Option<ServiceConfig>,
}

/// One service's connection block
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    #[serde(default)]
    pub port: Option<u16>,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default)]
    pub skip_tls_verify: bool,
}

impl ProviderConfig {
    /// Read configuration from `VEEAM_AZURE_*` and `VEEAM_VBR_*` environment
    /// variables (a `.env` file is honored). A service block exists iff its
    /// `*_HOSTNAME` variable is set.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            azure: ServiceConfig::from_env("VEEAM_AZURE")?,
            vbr: ServiceConfig::from_env("VEEAM_VBR")?,
        })
    }
}

impl ServiceConfig {
    fn from_env(prefix: &str) -> Result<Option<Self>> {
        let Ok(hostname) = std::env::var(format!("{prefix}_HOSTNAME")) else {
            return Ok(None);
        };

        let username = std::env::var(format!("{prefix}_USERNAME"))
            .map_err(|_| anyhow!("{prefix}_USERNAME must be set when {prefix}_HOSTNAME is"))?;
        let password = std::env::var(format!("{prefix}_PASSWORD"))
            .map_err(|_| anyhow!("{prefix}_PASSWORD must be set when {prefix}_HOSTNAME is"))?;
        let port = std::env::var(format!("{prefix}_PORT"))
            .ok()
            .map(|raw| raw.parse::<u16>())
            .transpose()
            .with_context(|| format!("{prefix}_PORT must be a port number"))?;
        let api_version = std::env::var(format!("{prefix}_API_VERSION")).ok();
        let skip_tls_verify = std::env::var(format!("{prefix}_SKIP_TLS_VERIFY"))
            .map(|raw| matches!(raw.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Some(Self {
            hostname,
            port,
            username,
            password,
            api_version,
            skip_tls_verify,
        }))
    }

    /// Fill service defaults (port, API version) and freeze the block into
    /// the credentials owned by a session manager
    pub(crate) fn into_credentials(self, kind: ServiceKind) -> ServiceCredentials {
        ServiceCredentials {
            hostname: self.hostname,
            port: self.port.or_else(|| kind.default_port()),
            username: self.username,
            password: self.password,
            api_version: self
                .api_version
                .unwrap_or_else(|| kind.default_api_version().to_string()),
            skip_tls_verify: self.skip_tls_verify,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(hostname: &str) -> ServiceConfig {
        ServiceConfig {
            hostname: hostname.to_string(),
            port: None,
            username: "admin".to_string(),
            password: "secret".to_string(),
            api_version: None,
            skip_tls_verify: false,
        }
    }

    #[test]
    fn vbr_defaults_fill_port_and_version() {
        let credentials = block("vbr.example.com").into_credentials(ServiceKind::Vbr);
        assert_eq!(credentials.port, Some(9419));
        assert_eq!(credentials.api_version, "1.1-rev2");
    }

    #[test]
    fn azure_defaults_leave_port_implicit() {
        let credentials = block("backup.example.com").into_credentials(ServiceKind::Azure);
        assert_eq!(credentials.port, None);
        assert_eq!(credentials.api_version, "v8");
    }

    #[test]
    fn explicit_values_win_over_defaults() {
        let mut config = block("vbr.example.com");
        config.port = Some(9999);
        config.api_version = Some("1.2-rev0".to_string());
        let credentials = config.into_credentials(ServiceKind::Vbr);
        assert_eq!(credentials.port, Some(9999));
        assert_eq!(credentials.api_version, "1.2-rev0");
    }

    #[test]
    fn deserializes_partial_provider_config() {
        let config: ProviderConfig = serde_json::from_str(
            r#"{"vbr":{"hostname":"vbr.example.com","username":"admin","password":"secret"}}"#,
        )
        .unwrap();
        assert!(config.azure.is_none());
        let vbr = config.vbr.unwrap();
        assert_eq!(vbr.hostname, "vbr.example.com");
        assert!(!vbr.skip_tls_verify);
    }
}
