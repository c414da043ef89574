//! Veeam backup REST API core
//!
//! Session management, authenticated request execution, and service routing
//! for the Veeam Backup for Microsoft Azure and Veeam Backup & Replication
//! REST APIs. The schema layer consumes this module exclusively through
//! [`ProviderClient`].

pub mod auth;
pub mod client;
pub mod constants;
pub mod error;
pub mod manager;
pub mod models;
pub mod resilience;

pub use auth::SessionManager;
pub use client::{ApiResponse, ServiceClient};
pub use error::{ApiError, ApiErrorBody};
pub use manager::{ProviderClient, guess_service};
pub use models::{ServiceCredentials, ServiceKind, TokenState};
pub use resilience::{RetryConfig, RetryPolicy, RetryableError};
