//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits > 0, durations > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BreakerConfig → Result<(), Vec<ValidationError>>
//! - Runs before any breaker is constructed

use thiserror::Error;
use crate::config::schema::BreakerConfig;

/// Longest accepted post-success pause.
pub const MAX_POST_SUCCESS_DELAY_MS: u64 = 60 * 60 * 1000;

/// A single semantic problem in a breaker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("fail_limit must be at least 1")]
    ZeroFailLimit,

    #[error("success_limit must be at least 1")]
    ZeroSuccessLimit,

    #[error("fail_window_ms must be greater than 0")]
    ZeroFailWindow,

    #[error("open_timeout_ms must be greater than 0")]
    ZeroOpenTimeout,

    #[error("post_success_delay_ms {0} exceeds one hour")]
    PostSuccessDelayTooLong(u64),
}

/// Check a breaker configuration.
pub fn validate_config(config: &BreakerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.fail_limit == 0 {
        errors.push(ValidationError::ZeroFailLimit);
    }
    if config.success_limit == 0 {
        errors.push(ValidationError::ZeroSuccessLimit);
    }
    if config.fail_window_ms == 0 {
        errors.push(ValidationError::ZeroFailWindow);
    }
    if config.open_timeout_ms == 0 {
        errors.push(ValidationError::ZeroOpenTimeout);
    }
    if let Some(delay) = config.post_success_delay_ms {
        if delay > MAX_POST_SUCCESS_DELAY_MS {
            errors.push(ValidationError::PostSuccessDelayTooLong(delay));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(validate_config(&BreakerConfig::default()).is_ok());
    }

    #[test]
    fn test_reports_every_error() {
        let config = BreakerConfig {
            fail_limit: 0,
            success_limit: 0,
            fail_window_ms: 0,
            open_timeout_ms: 0,
            post_success_delay_ms: Some(MAX_POST_SUCCESS_DELAY_MS + 1),
            ..Default::default()
        };
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors.contains(&ValidationError::ZeroOpenTimeout));
    }

    #[test]
    fn test_zero_post_success_delay_allowed() {
        let config = BreakerConfig {
            post_success_delay_ms: Some(0),
            ..Default::default()
        };
        assert!(validate_config(&config).is_ok());
    }
}
