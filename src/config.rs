//! Serializable client configuration.

use crate::log::LogLevel;
use crate::request::Options;
use crate::retry::{Backoff, ExceptionPropagationPolicy};
use serde::Deserialize;
use std::time::Duration;

/// The plain-data subset of a client's configuration, as loaded from a file
/// or the environment. Missing fields take their defaults.
///
/// # Examples
///
/// ```
/// use courier::{ClientConfig, LogLevel};
///
/// let config: ClientConfig = serde_json::from_str(
///     r#"{ "read_timeout_ms": 5000, "log_level": "headers", "decode_404": true }"#,
/// )
/// .unwrap();
///
/// assert_eq!(config.options().read_timeout().as_secs(), 5);
/// assert_eq!(config.log_level, LogLevel::Headers);
/// assert_eq!(config.retry_max_attempts, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
    pub follow_redirects: bool,
    /// Initial backoff interval.
    pub retry_period_ms: u64,
    /// Cap on any single backoff interval.
    pub retry_max_period_ms: u64,
    /// Total attempts per call, the first one included.
    pub retry_max_attempts: u32,
    pub retry_jitter: bool,
    pub log_level: LogLevel,
    /// Hand 404 responses to the decoder instead of the error decoder.
    pub decode_404: bool,
    /// Buffer small raw responses so their connection is released.
    pub close_after_decode: bool,
    pub propagation_policy: ExceptionPropagationPolicy,
}

impl ClientConfig {
    pub fn options(&self) -> Options {
        Options::new(
            Duration::from_millis(self.connect_timeout_ms),
            Duration::from_millis(self.read_timeout_ms),
            self.follow_redirects,
        )
    }

    pub fn retryer(&self) -> Backoff {
        Backoff::new(
            Duration::from_millis(self.retry_period_ms),
            Duration::from_millis(self.retry_max_period_ms),
            self.retry_max_attempts,
        )
        .with_jitter(self.retry_jitter)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 10_000,
            read_timeout_ms: 60_000,
            follow_redirects: true,
            retry_period_ms: 100,
            retry_max_period_ms: 1_000,
            retry_max_attempts: 5,
            retry_jitter: false,
            log_level: LogLevel::None,
            decode_404: false,
            close_after_decode: true,
            propagation_policy: ExceptionPropagationPolicy::None,
        }
    }
}
