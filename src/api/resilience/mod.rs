//! Resilience features for API calls
//!
//! Retry policies with exponential backoff for transient transport failures
//! on data calls. Token endpoint calls are never retried here; their
//! recovery path is the refresh-then-reauthenticate fallback in the session
//! layer.

pub mod retry;

pub use retry::{RetryConfig, RetryPolicy, RetryableError};
