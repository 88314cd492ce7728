//! Breaker metrics.
//!
//! # Metrics
//! - `breaker_transitions_total` (counter): phase changes by breaker, from, to
//! - `breaker_failures_total` (counter): observed failures by breaker
//! - `breaker_successes_total` (counter): half-open probe successes by breaker
//! - `breaker_drops_total` (counter): calls rejected while open by breaker
//! - `breaker_open` (gauge): 1=open, 0=otherwise
//!
//! # Design Decisions
//! - Emits through the `metrics` facade; installing a recorder is the host's job
//! - A global switch lets hosts silence emission without a recorder swap

use std::sync::atomic::{AtomicBool, Ordering};
use crate::resilience::state::Phase;

static ENABLED: AtomicBool = AtomicBool::new(true);

/// Turn metric emission on or off process-wide.
pub fn set_enabled(enabled: bool) {
    ENABLED.store(enabled, Ordering::Relaxed);
}

pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

/// Record a phase change.
pub fn record_transition(breaker: &str, from: Phase, to: Phase) {
    if !is_enabled() {
        return;
    }
    metrics::counter!(
        "breaker_transitions_total",
        "breaker" => breaker.to_string(),
        "from" => from.to_string(),
        "to" => to.to_string()
    )
    .increment(1);
    let open = if to == Phase::Open { 1.0 } else { 0.0 };
    metrics::gauge!("breaker_open", "breaker" => breaker.to_string()).set(open);
}

/// Record an observed failure.
pub fn record_failure(breaker: &str) {
    if is_enabled() {
        metrics::counter!("breaker_failures_total", "breaker" => breaker.to_string()).increment(1);
    }
}

/// Record a successful half-open probe.
pub fn record_success(breaker: &str) {
    if is_enabled() {
        metrics::counter!("breaker_successes_total", "breaker" => breaker.to_string()).increment(1);
    }
}

/// Record a call routed to the drop handler.
pub fn record_drop(breaker: &str) {
    if is_enabled() {
        metrics::counter!("breaker_drops_total", "breaker" => breaker.to_string()).increment(1);
    }
}
