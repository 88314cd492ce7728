//! Configuration schema definitions.
//!
//! This module defines the configuration structure for breakers.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration file.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Settings {
    /// Breaker thresholds and dispatch options.
    pub breaker: BreakerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Mutual exclusion applied around a wrapped call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LockingMode {
    /// No lock; calls may run concurrently.
    #[default]
    None,
    /// Wait for the lock indefinitely.
    Blocking,
    /// Skip the call (drop handler) when the lock is held.
    Try,
}

/// Breaker thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Failures within the window before Closed → Open.
    pub fail_limit: u32,

    /// Window in which `fail_limit` applies, in milliseconds.
    pub fail_window_ms: u64,

    /// Consecutive half-open successes before Half-Open → Closed.
    pub success_limit: u32,

    /// Quiescence before Open → Half-Open, in milliseconds.
    pub open_timeout_ms: u64,

    /// Optional pause after every successful call, in milliseconds.
    pub post_success_delay_ms: Option<u64>,

    /// Lock applied around dispatch (call wrappers only).
    pub locking: LockingMode,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            fail_limit: 5,
            fail_window_ms: 60_000,
            success_limit: 2,
            open_timeout_ms: 30_000,
            post_success_delay_ms: None,
            locking: LockingMode::None,
        }
    }
}

/// Whole milliseconds, rounded up so a non-zero duration never becomes shorter
/// (or zero). Saturates at `u64::MAX`.
fn ceil_millis(duration: Duration) -> u64 {
    let partial = u128::from(duration.subsec_nanos() % 1_000_000 != 0);
    u64::try_from(duration.as_millis() + partial).unwrap_or(u64::MAX)
}

/// Durations are stored in milliseconds; the `with_*` setters round
/// sub-millisecond parts up.
impl BreakerConfig {
    pub fn fail_window(&self) -> Duration {
        Duration::from_millis(self.fail_window_ms)
    }

    pub fn open_timeout(&self) -> Duration {
        Duration::from_millis(self.open_timeout_ms)
    }

    pub fn post_success_delay(&self) -> Option<Duration> {
        self.post_success_delay_ms.map(Duration::from_millis)
    }

    /// Set the failure limit.
    pub fn with_fail_limit(mut self, limit: u32) -> Self {
        self.fail_limit = limit;
        self
    }

    /// Set the failure window.
    pub fn with_fail_window(mut self, window: Duration) -> Self {
        self.fail_window_ms = ceil_millis(window);
        self
    }

    /// Set the success limit for recovery.
    pub fn with_success_limit(mut self, limit: u32) -> Self {
        self.success_limit = limit;
        self
    }

    /// Set the open timeout.
    pub fn with_open_timeout(mut self, timeout: Duration) -> Self {
        self.open_timeout_ms = ceil_millis(timeout);
        self
    }

    /// Set a fixed pause after successful calls.
    pub fn with_post_success_delay(mut self, delay: Duration) -> Self {
        self.post_success_delay_ms = Some(ceil_millis(delay));
        self
    }

    /// Set the locking mode.
    pub fn with_locking(mut self, mode: LockingMode) -> Self {
        self.locking = mode;
        self
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit breaker counters through the metrics facade.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BreakerConfig::default();
        assert_eq!(config.fail_limit, 5);
        assert_eq!(config.open_timeout(), Duration::from_secs(30));
        assert_eq!(config.locking, LockingMode::None);
        assert!(config.post_success_delay().is_none());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [breaker]
            fail_limit = 1
            locking = "try"
            "#,
        )
        .unwrap();
        assert_eq!(settings.breaker.fail_limit, 1);
        assert_eq!(settings.breaker.success_limit, 2);
        assert_eq!(settings.breaker.locking, LockingMode::Try);
        assert_eq!(settings.observability.log_level, "info");
    }

    #[test]
    fn test_builder_setters() {
        let config = BreakerConfig::default()
            .with_fail_window(Duration::from_millis(50))
            .with_post_success_delay(Duration::from_millis(5))
            .with_locking(LockingMode::Blocking);
        assert_eq!(config.fail_window_ms, 50);
        assert_eq!(config.post_success_delay(), Some(Duration::from_millis(5)));
        assert_eq!(config.locking, LockingMode::Blocking);
    }

    #[test]
    fn test_sub_millisecond_durations_round_up() {
        let config = BreakerConfig::default()
            .with_open_timeout(Duration::from_micros(1500))
            .with_fail_window(Duration::from_nanos(1))
            .with_post_success_delay(Duration::from_millis(3));
        assert_eq!(config.open_timeout_ms, 2);
        assert_eq!(config.fail_window_ms, 1);
        assert_eq!(config.post_success_delay_ms, Some(3));

        let huge = BreakerConfig::default().with_open_timeout(Duration::MAX);
        assert_eq!(huge.open_timeout_ms, u64::MAX);
    }
}
