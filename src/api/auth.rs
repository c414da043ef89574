//! OAuth2 session management for the Veeam REST services
//!
//! Each configured backend service gets one [`SessionManager`] owning its
//! credentials and cached token state. The manager performs the Password
//! grant, renews sessions with the Refresh grant, and falls back to full
//! re-authentication when a stored refresh token has gone stale, so callers
//! only ever ask for "a currently valid access token".

use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use reqwest::Client;
use std::time::Duration as StdDuration;
use tokio::sync::{Mutex, RwLock};

use super::constants::{self, grants, headers};
use super::error::{ApiError, ApiErrorBody};
use super::models::{ServiceCredentials, ServiceKind, TokenResponse, TokenState};

/// Owns the token lifecycle for one backend service.
///
/// Safe to share across concurrent resource operations: the valid-token fast
/// path takes only a read lock, while authenticate/refresh calls are
/// serialized through an internal mutex so parallel callers cannot clobber
/// each other's token rotation.
#[derive(Debug)]
pub struct SessionManager {
    service: ServiceKind,
    credentials: ServiceCredentials,
    http_client: Client,
    token: RwLock<Option<TokenState>>,
    // serializes the check-then-renew slow path of get_valid_token
    auth_guard: Mutex<()>,
}

impl SessionManager {
    pub fn new(service: ServiceKind, credentials: ServiceCredentials) -> Result<Self, ApiError> {
        let http_client = Client::builder()
            .timeout(StdDuration::from_secs(constants::REQUEST_TIMEOUT_SECS))
            .connect_timeout(StdDuration::from_secs(constants::REQUEST_TIMEOUT_SECS))
            .danger_accept_invalid_certs(credentials.skip_tls_verify)
            .build()?;

        Ok(Self {
            service,
            credentials,
            http_client,
            token: RwLock::new(None),
            auth_guard: Mutex::new(()),
        })
    }

    pub fn service(&self) -> ServiceKind {
        self.service
    }

    /// Base URL of the service this manager authenticates against
    pub fn base_url(&self) -> String {
        self.credentials.base_url()
    }

    pub(crate) fn http_client(&self) -> &Client {
        &self.http_client
    }

    pub(crate) fn api_version(&self) -> &str {
        &self.credentials.api_version
    }

    /// Exchange username/password for a fresh session (Password grant).
    /// Replaces the cached token state wholesale on success.
    pub async fn authenticate(&self) -> Result<(), ApiError> {
        let _guard = self.auth_guard.lock().await;
        self.authenticate_locked().await?;
        Ok(())
    }

    /// Renew the session with the stored refresh token (Refresh grant).
    /// Fails with [`ApiError::NoRefreshToken`] when none is cached.
    pub async fn refresh(&self) -> Result<(), ApiError> {
        let _guard = self.auth_guard.lock().await;
        self.refresh_locked().await?;
        Ok(())
    }

    /// Return an access token that is guaranteed to outlive in-flight
    /// requests, renewing the session when the cached token is inside the
    /// expiry safety margin.
    ///
    /// The renewal is bounded: at most one Refresh attempt, then at most one
    /// Authenticate fallback. A stale or revoked refresh token therefore
    /// never blocks obtaining a new session.
    pub async fn get_valid_token(&self) -> Result<String, ApiError> {
        let margin = Duration::seconds(constants::TOKEN_EXPIRY_MARGIN_SECS);

        // fast path, read lock only
        if let Some(token) = self.token.read().await.as_ref() {
            if token.valid_for(margin) {
                return Ok(token.access_token.clone());
            }
        }

        let _guard = self.auth_guard.lock().await;

        // another caller may have renewed the session while we waited
        if let Some(token) = self.token.read().await.as_ref() {
            if token.valid_for(margin) {
                return Ok(token.access_token.clone());
            }
        }

        match self.refresh_locked().await {
            Ok(access_token) => Ok(access_token),
            Err(ApiError::NoRefreshToken) => {
                debug!("no refresh token cached for {}, authenticating", self.service);
                self.authenticate_locked().await
            }
            Err(err) => {
                warn!(
                    "token refresh against {} failed ({}), falling back to re-authentication",
                    self.service, err
                );
                self.authenticate_locked().await
            }
        }
    }

    /// Pure query: does the cached token exist and lie before its expiry?
    /// Never mutates token state and never touches the network.
    pub async fn is_authenticated(&self) -> bool {
        self.token
            .read()
            .await
            .as_ref()
            .is_some_and(|token| token.expires_at > Utc::now())
    }

    /// Best-effort server-side logout. The cached token state is cleared
    /// regardless of the outcome; failures are logged, never propagated.
    pub async fn logout(&self) {
        let Some(token) = self.token.write().await.take() else {
            return;
        };

        let url = constants::token_endpoint(&self.base_url());
        let mut request = self
            .http_client
            .delete(&url)
            .bearer_auth(&token.access_token);
        if self.service == ServiceKind::Vbr {
            request = request.header(headers::VBR_API_VERSION, self.api_version());
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                debug!("logged out of {}", self.service);
            }
            Ok(response) => {
                warn!(
                    "logout against {} returned HTTP {}",
                    self.service,
                    response.status()
                );
            }
            Err(err) => {
                warn!("logout against {} failed: {}", self.service, err);
            }
        }
    }

    async fn authenticate_locked(&self) -> Result<String, ApiError> {
        debug!(
            "requesting Password grant from {} token endpoint",
            self.service
        );
        let params = [
            ("grant_type", grants::PASSWORD),
            ("username", self.credentials.username.as_str()),
            ("password", self.credentials.password.as_str()),
        ];
        let state = self.token_request(&params).await?;
        info!(
            "authenticated with {} as {}",
            self.service, self.credentials.username
        );

        let access_token = state.access_token.clone();
        *self.token.write().await = Some(state);
        Ok(access_token)
    }

    async fn refresh_locked(&self) -> Result<String, ApiError> {
        let refresh_token = self
            .token
            .read()
            .await
            .as_ref()
            .and_then(|token| token.refresh_token.clone())
            .ok_or(ApiError::NoRefreshToken)?;

        debug!("requesting Refresh grant from {} token endpoint", self.service);
        let params = [
            ("grant_type", grants::REFRESH_TOKEN),
            ("refresh_token", refresh_token.as_str()),
        ];
        let state = self.token_request(&params).await?;
        debug!("refreshed {} session", self.service);

        let access_token = state.access_token.clone();
        *self.token.write().await = Some(state);
        Ok(access_token)
    }

    /// POST a grant request to the token endpoint and parse the new token
    /// state. VBR expects its version header on the token call as well;
    /// Azure Backup does not.
    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenState, ApiError> {
        let url = constants::token_endpoint(&self.base_url());
        let mut request = self
            .http_client
            .post(&url)
            .header("Accept", headers::CONTENT_TYPE_JSON)
            .form(form);
        if self.service == ServiceKind::Vbr {
            request = request.header(headers::VBR_API_VERSION, self.api_version());
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::AuthenticationFailed {
                service: self.service,
                message: auth_failure_message(status.as_u16(), &body),
            });
        }

        let parsed: TokenResponse =
            serde_json::from_str(&body).map_err(|err| ApiError::AuthenticationFailed {
                service: self.service,
                message: format!("unexpected token response: {}", err),
            })?;

        Ok(TokenState {
            access_token: parsed.access_token,
            refresh_token: parsed.refresh_token.filter(|t| !t.is_empty()),
            expires_at: parse_expiry(parsed.expires.as_deref(), parsed.expires_in),
        })
    }
}

/// Summarize a token endpoint failure: decoded title/detail when the body is
/// the services' structured error shape, raw status and body text otherwise.
fn auth_failure_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(decoded) if decoded.is_structured() => decoded.summary(),
        _ => format!("HTTP {}: {}", status, body),
    }
}

/// Resolve the absolute expiry instant of a token response. `.expires`
/// carries an absolute timestamp (RFC 2822 on current service builds, RFC
/// 3339 on older ones); `expires_in` seconds are the fallback when absent.
fn parse_expiry(expires: Option<&str>, expires_in: Option<i64>) -> DateTime<Utc> {
    if let Some(raw) = expires {
        if let Ok(instant) = DateTime::parse_from_rfc2822(raw) {
            return instant.with_timezone(&Utc);
        }
        if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
            return instant.with_timezone(&Utc);
        }
        warn!("unparseable .expires value {:?}, falling back to expires_in", raw);
    }
    Utc::now() + Duration::seconds(expires_in.unwrap_or(constants::DEFAULT_TOKEN_LIFETIME_SECS))
}
