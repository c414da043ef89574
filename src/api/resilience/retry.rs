//! Retry policy with exponential backoff and jitter

use log::{debug, warn};
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Single attempt, no retries. Used by tests that assert exact call
    /// counts against a mock server.
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            jitter: false,
        }
    }
}

/// Classification of request outcomes into retry behavior
#[derive(Debug, Clone, PartialEq)]
pub enum RetryableError {
    /// Connection-level failures (refused, DNS, TLS)
    Network,
    /// Request or response timed out
    Timeout,
    /// HTTP 429 Too Many Requests
    RateLimited,
    /// HTTP 5xx
    ServerError(u16),
    /// HTTP 4xx other than 408/429; retrying cannot help
    ClientError(u16),
    /// Anything else, treated as non-retryable
    Unknown,
}

impl RetryableError {
    pub fn should_retry(&self) -> bool {
        match self {
            RetryableError::Network => true,
            RetryableError::Timeout => true,
            RetryableError::RateLimited => true,
            RetryableError::ServerError(_) => true,
            RetryableError::ClientError(_) => false,
            RetryableError::Unknown => false,
        }
    }

    pub fn from_status_code(status: u16) -> Self {
        match status {
            408 => RetryableError::Timeout,
            429 => RetryableError::RateLimited,
            400..=499 => RetryableError::ClientError(status),
            500..=599 => RetryableError::ServerError(status),
            _ => RetryableError::Unknown,
        }
    }

    pub fn from_reqwest_error(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            RetryableError::Timeout
        } else if error.is_connect() || error.is_request() {
            RetryableError::Network
        } else if let Some(status) = error.status() {
            Self::from_status_code(status.as_u16())
        } else {
            RetryableError::Unknown
        }
    }
}

/// Re-issues a request on transient failures, backing off exponentially
/// between attempts
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Run `operation` until it yields a non-retryable outcome or attempts
    /// run out. A response with a retryable status (5xx, 429, 408) counts as
    /// a failed attempt, but once attempts are exhausted the response is
    /// returned as-is so the caller keeps its uniform status handling.
    pub async fn execute<F, Fut>(&self, operation: F) -> Result<reqwest::Response, reqwest::Error>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<reqwest::Response, reqwest::Error>>,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    let retryable = RetryableError::from_status_code(status).should_retry();
                    if !retryable || attempt >= self.config.max_attempts {
                        return Ok(response);
                    }
                    warn!(
                        "attempt {}/{} returned HTTP {}, retrying",
                        attempt, self.config.max_attempts, status
                    );
                }
                Err(error) => {
                    let retryable = RetryableError::from_reqwest_error(&error).should_retry();
                    if !retryable || attempt >= self.config.max_attempts {
                        return Err(error);
                    }
                    warn!(
                        "attempt {}/{} failed ({}), retrying",
                        attempt, self.config.max_attempts, error
                    );
                }
            }

            let delay = self.calculate_delay(attempt);
            debug!("waiting {:?} before retry", delay);
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// Exponential backoff delay for the given attempt, capped at
    /// `max_delay`, with optional jitter against thundering herds
    fn calculate_delay(&self, attempt: u32) -> Duration {
        let delay_ms = (self.config.base_delay.as_millis() as f64)
            * self.config.backoff_multiplier.powi(attempt as i32 - 1);

        let mut delay = Duration::from_millis(delay_ms as u64);
        if delay > self.config.max_delay {
            delay = self.config.max_delay;
        }

        if self.config.jitter {
            let jitter_factor = rand::rng().random_range(0.5..=1.5);
            delay = Duration::from_millis((delay.as_millis() as f64 * jitter_factor) as u64);
        }

        delay
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_classification() {
        assert!(RetryableError::Network.should_retry());
        assert!(RetryableError::Timeout.should_retry());
        assert!(RetryableError::RateLimited.should_retry());
        assert!(RetryableError::ServerError(503).should_retry());

        assert!(!RetryableError::ClientError(400).should_retry());
        assert!(!RetryableError::Unknown.should_retry());
    }

    #[test]
    fn status_code_classification() {
        assert_eq!(RetryableError::from_status_code(408), RetryableError::Timeout);
        assert_eq!(RetryableError::from_status_code(429), RetryableError::RateLimited);
        assert_eq!(
            RetryableError::from_status_code(404),
            RetryableError::ClientError(404)
        );
        assert_eq!(
            RetryableError::from_status_code(500),
            RetryableError::ServerError(500)
        );
        assert_eq!(RetryableError::from_status_code(200), RetryableError::Unknown);
    }

    #[test]
    fn delay_grows_exponentially() {
        let policy = RetryPolicy::new(RetryConfig {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter: false,
        });

        assert_eq!(policy.calculate_delay(1), Duration::from_millis(100));
        assert_eq!(policy.calculate_delay(2), Duration::from_millis(200));
        assert_eq!(policy.calculate_delay(3), Duration::from_millis(400));
    }

    #[test]
    fn delay_is_capped() {
        let policy = RetryPolicy::new(RetryConfig {
            max_attempts: 10,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            jitter: false,
        });

        assert_eq!(policy.calculate_delay(6), Duration::from_secs(5));
        assert_eq!(policy.calculate_delay(9), Duration::from_secs(5));
    }
}
