//! API constants for the Veeam backup REST services

/// Default API version for Veeam Backup for Microsoft Azure
pub const AZURE_API_VERSION: &str = "v8";

/// Default API version for Veeam Backup & Replication
pub const VBR_API_VERSION: &str = "1.1-rev2";

/// OAuth2 token endpoint path, shared by both services
pub const TOKEN_ENDPOINT: &str = "/api/oauth2/token";

/// Port the VBR REST API listens on by default
pub const VBR_DEFAULT_PORT: u16 = 9419;

/// Overall timeout applied to every HTTP call
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Seconds of remaining token lifetime below which a renewal is forced,
/// so a request issued right before expiry cannot race the server clock
pub const TOKEN_EXPIRY_MARGIN_SECS: i64 = 300;

/// Token lifetime assumed when the token endpoint omits expiry information
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Standard headers for Veeam REST requests
pub mod headers {
    /// Content type for JSON requests
    pub const CONTENT_TYPE_JSON: &str = "application/json";

    /// Version header sent on Azure Backup data calls
    pub const AZURE_API_VERSION: &str = "X-API-Version";

    /// Version header sent on all VBR calls, token endpoint included
    pub const VBR_API_VERSION: &str = "x-api-version";
}

/// OAuth2 grant type values the token endpoint accepts
pub mod grants {
    pub const PASSWORD: &str = "Password";
    pub const REFRESH_TOKEN: &str = "Refresh_token";
}

/// Build the token endpoint URL for a service base URL
pub fn token_endpoint(base_url: &str) -> String {
    format!("{}{}", base_url, TOKEN_ENDPOINT)
}
