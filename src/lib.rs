//! Session and request core for the Veeam Terraform provider
//!
//! Talks to two independently versioned Veeam REST services (Veeam Backup
//! for Microsoft Azure, and Veeam Backup & Replication/VBR) through one
//! uniform contract: build a [`ProviderClient`] from the provider
//! configuration, ask it for the client owning a resource type, and perform
//! authenticated requests. Token acquisition, caching, refresh, and the
//! refresh-to-reauthenticate fallback happen behind that surface.
//!
//! ```no_run
//! use terraform_provider_veeam::{ProviderClient, ProviderConfig};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ProviderConfig::from_env()?;
//! let provider = ProviderClient::connect(config).await?;
//!
//! let client = provider.client_for("veeam_vbr_job")?;
//! let jobs = client.get("/api/v1/jobs").await?;
//! println!("{}", String::from_utf8_lossy(&jobs.body));
//!
//! provider.logout_all().await;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;

pub use api::{
    ApiError, ApiErrorBody, ApiResponse, ProviderClient, ServiceClient, ServiceKind,
    SessionManager, TokenState,
};
pub use config::{ProviderConfig, ServiceConfig};
