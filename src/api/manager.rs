//! Multi-service client registry and routing
//!
//! [`ProviderClient`] is the only surface the schema layer sees: it owns one
//! [`ServiceClient`] per configured backend service and resolves which one
//! handles a given resource or data-source type name. It is an explicitly
//! constructed instance handed around by reference, not a process-wide
//! singleton.

use log::{debug, info};
use std::collections::HashMap;
use std::sync::Arc;

use super::auth::SessionManager;
use super::client::ServiceClient;
use super::constants;
use super::error::ApiError;
use super::models::ServiceKind;
use super::resilience::RetryConfig;
use crate::config::{ProviderConfig, ServiceConfig};

/// Owns the per-service clients built from the provider configuration
#[derive(Debug)]
pub struct ProviderClient {
    clients: HashMap<ServiceKind, ServiceClient>,
}

impl ProviderClient {
    /// Build a client per configured service block and authenticate each one
    /// immediately, so bad credentials fail provider initialization instead
    /// of the first resource operation.
    pub async fn connect(config: ProviderConfig) -> Result<Self, ApiError> {
        let mut clients = HashMap::new();

        if let Some(service_config) = config.azure {
            let client = Self::build_service(ServiceKind::Azure, service_config).await?;
            clients.insert(ServiceKind::Azure, client);
        }
        if let Some(service_config) = config.vbr {
            let client = Self::build_service(ServiceKind::Vbr, service_config).await?;
            clients.insert(ServiceKind::Vbr, client);
        }

        if clients.is_empty() {
            return Err(ApiError::InvalidConfig(
                "at least one of the \"azure\" or \"vbr\" blocks must be configured".to_string(),
            ));
        }

        Ok(Self { clients })
    }

    async fn build_service(
        kind: ServiceKind,
        config: ServiceConfig,
    ) -> Result<ServiceClient, ApiError> {
        let credentials = config.into_credentials(kind);
        info!("connecting to {} at {}", kind, credentials.base_url());

        let session = Arc::new(SessionManager::new(kind, credentials)?);
        session.authenticate().await?;

        Ok(ServiceClient::new(session, RetryConfig::default()))
    }

    /// Resolve the client responsible for a resource or data-source type
    /// name. Type names carry their owning service's name as a substring
    /// (e.g. `veeam_azure_repository`, `veeam_vbr_job`).
    pub fn client_for(&self, resource_type: &str) -> Result<&ServiceClient, ApiError> {
        let service = route(resource_type)
            .ok_or_else(|| ApiError::UnknownResourceType(resource_type.to_string()))?;

        debug!("resource type {} routed to {}", resource_type, service);
        self.clients
            .get(&service)
            .ok_or_else(|| ApiError::UnconfiguredService {
                resource: resource_type.to_string(),
                service,
                block: service.config_block(),
            })
    }

    /// Client for a specific service, if that service was configured
    pub fn client(&self, kind: ServiceKind) -> Option<&ServiceClient> {
        self.clients.get(&kind)
    }

    pub fn is_configured(&self, kind: ServiceKind) -> bool {
        self.clients.contains_key(&kind)
    }

    pub fn configured_services(&self) -> Vec<ServiceKind> {
        self.clients.keys().copied().collect()
    }

    /// Best-effort logout of every session, used at provider shutdown
    pub async fn logout_all(&self) {
        for client in self.clients.values() {
            client.logout().await;
        }
    }
}

/// Resolve the owning service by substring match on the type name. Matching
/// is case-sensitive; should service names ever overlap, the longest match
/// wins so the more specific name cannot be shadowed by a shorter one.
fn route(resource_type: &str) -> Option<ServiceKind> {
    ServiceKind::all()
        .into_iter()
        .filter(|kind| resource_type.contains(kind.name()))
        .max_by_key(|kind| kind.name().len())
}

/// Best-effort guess of which service a port belongs to, for diagnostics and
/// configuration hints only: 9419 is the VBR REST default, plain HTTPS ports
/// point at the Azure-hosted service, anything else is unknown.
pub fn guess_service(port: Option<u16>) -> Option<ServiceKind> {
    match port {
        Some(constants::VBR_DEFAULT_PORT) => Some(ServiceKind::Vbr),
        None | Some(80) | Some(443) => Some(ServiceKind::Azure),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_by_service_name_substring() {
        assert_eq!(route("veeam_azure_repository"), Some(ServiceKind::Azure));
        assert_eq!(route("veeam_vbr_credentials"), Some(ServiceKind::Vbr));
        assert_eq!(route("veeam_tape_library"), None);
    }

    #[test]
    fn routing_is_case_sensitive() {
        assert_eq!(route("veeam_AZURE_policy"), None);
    }

    #[test]
    fn port_heuristic() {
        assert_eq!(guess_service(Some(9419)), Some(ServiceKind::Vbr));
        assert_eq!(guess_service(None), Some(ServiceKind::Azure));
        assert_eq!(guess_service(Some(443)), Some(ServiceKind::Azure));
        assert_eq!(guess_service(Some(80)), Some(ServiceKind::Azure));
        assert_eq!(guess_service(Some(8080)), None);
    }
}
