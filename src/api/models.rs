use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use super::constants;

/// Backend service a client talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    /// Veeam Backup for Microsoft Azure
    Azure,
    /// Veeam Backup & Replication
    Vbr,
}

impl ServiceKind {
    /// Service name as it appears inside resource and data-source type names
    pub fn name(&self) -> &'static str {
        match self {
            ServiceKind::Azure => "azure",
            ServiceKind::Vbr => "vbr",
        }
    }

    /// Name of the provider configuration block that supplies this
    /// service's credentials
    pub fn config_block(&self) -> &'static str {
        self.name()
    }

    /// API version used when the configuration does not pin one
    pub fn default_api_version(&self) -> &'static str {
        match self {
            ServiceKind::Azure => constants::AZURE_API_VERSION,
            ServiceKind::Vbr => constants::VBR_API_VERSION,
        }
    }

    /// Non-standard default port, if the service has one.
    /// Azure Backup serves plain HTTPS, so no explicit port is needed.
    pub fn default_port(&self) -> Option<u16> {
        match self {
            ServiceKind::Azure => None,
            ServiceKind::Vbr => Some(constants::VBR_DEFAULT_PORT),
        }
    }

    /// Every service this provider knows about
    pub fn all() -> [ServiceKind; 2] {
        [ServiceKind::Azure, ServiceKind::Vbr]
    }
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Connection settings for one backend service.
/// Built once at provider startup and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct ServiceCredentials {
    pub hostname: String,
    pub port: Option<u16>,
    pub username: String,
    pub password: String,
    pub api_version: String,
    pub skip_tls_verify: bool,
}

impl ServiceCredentials {
    /// Base URL of the service. Hostnames default to HTTPS; an explicit
    /// `http://` prefix is honored so local test servers can be targeted.
    pub fn base_url(&self) -> String {
        let authority = match self.port {
            Some(port) => format!("{}:{}", self.hostname, port),
            None => self.hostname.clone(),
        };
        if authority.starts_with("http://") || authority.starts_with("https://") {
            authority
        } else {
            format!("https://{}", authority)
        }
    }
}

/// Cached token state for one authenticated session.
/// Replaced wholesale on every successful authenticate or refresh call.
#[derive(Debug, Clone)]
pub struct TokenState {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl TokenState {
    /// True while the token stays valid for at least `margin` more time
    pub fn valid_for(&self, margin: Duration) -> bool {
        Utc::now() + margin < self.expires_at
    }
}

/// Wire shape of a successful token endpoint response
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Absolute expiry instant, RFC 2822 or RFC 3339 formatted
    #[serde(rename = ".expires", default)]
    pub expires: Option<String>,
    /// Lifetime in seconds, sent by some service builds instead of `.expires`
    #[serde(default)]
    pub expires_in: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_defaults_to_https() {
        let credentials = ServiceCredentials {
            hostname: "backup.example.com".to_string(),
            port: None,
            username: "admin".to_string(),
            password: "secret".to_string(),
            api_version: "v8".to_string(),
            skip_tls_verify: false,
        };
        assert_eq!(credentials.base_url(), "https://backup.example.com");
    }

    #[test]
    fn base_url_appends_port() {
        let credentials = ServiceCredentials {
            hostname: "vbr.example.com".to_string(),
            port: Some(9419),
            username: "admin".to_string(),
            password: "secret".to_string(),
            api_version: "1.1-rev2".to_string(),
            skip_tls_verify: false,
        };
        assert_eq!(credentials.base_url(), "https://vbr.example.com:9419");
    }

    #[test]
    fn base_url_honors_explicit_scheme() {
        let credentials = ServiceCredentials {
            hostname: "http://127.0.0.1".to_string(),
            port: Some(5000),
            username: "admin".to_string(),
            password: "secret".to_string(),
            api_version: "v8".to_string(),
            skip_tls_verify: false,
        };
        assert_eq!(credentials.base_url(), "http://127.0.0.1:5000");
    }

    #[test]
    fn token_validity_respects_margin() {
        let token = TokenState {
            access_token: "abc".to_string(),
            refresh_token: None,
            expires_at: Utc::now() + Duration::minutes(10),
        };
        assert!(token.valid_for(Duration::minutes(5)));
        assert!(!token.valid_for(Duration::minutes(15)));
    }
}
