//! Transition engine.
//!
//! # State Transitions
//! ```text
//! Closed → Open:      fail_count >= fail_limit, and the previous failure is
//!                     within fail_window (or there was none this cycle)
//! Open → Half-Open:   recovery timer fires after open_timeout
//! Half-Open → Closed: success_count >= success_limit
//! Half-Open → Open:   probe failure (window gate cleared first)
//! ```
//!
//! # Design Decisions
//! - Every observation is one compare-and-swap on the state cell
//! - Only the swap that moved the phase into Open arms the recovery timer
//! - The timer carries the trip generation; a stale timer changes nothing

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::BreakerConfig;
use crate::observability::metrics;
use crate::resilience::state::{CircuitState, Phase, StateCell, StateHandle};
use crate::resilience::timer::RecoveryTimer;

/// Limits an engine applies, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub fail_limit: u32,
    pub fail_window: Duration,
    pub success_limit: u32,
    pub open_timeout: Duration,
}

impl From<&BreakerConfig> for Thresholds {
    fn from(config: &BreakerConfig) -> Self {
        Self {
            fail_limit: config.fail_limit.max(1),
            fail_window: config.fail_window(),
            success_limit: config.success_limit.max(1),
            open_timeout: config.open_timeout(),
        }
    }
}

/// An observed failure, handed to the failure observer.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure<E> {
    /// The error returned by the protected call.
    pub error: E,
    /// When the failure was observed.
    pub timestamp: Instant,
    /// Failure count right after this failure was recorded.
    pub fail_count: u32,
}

/// Owns one breaker's state and applies observations to it.
#[derive(Debug)]
pub struct TransitionEngine {
    name: Arc<str>,
    thresholds: Thresholds,
    cell: Arc<StateCell>,
    timer: RecoveryTimer,
}

impl TransitionEngine {
    pub fn new(name: impl Into<String>, thresholds: Thresholds) -> Self {
        let name: Arc<str> = Arc::from(name.into());
        tracing::debug!(
            breaker = %name,
            fail_limit = thresholds.fail_limit,
            fail_window = ?thresholds.fail_window,
            success_limit = thresholds.success_limit,
            open_timeout = ?thresholds.open_timeout,
            "Circuit breaker initialized"
        );
        Self {
            timer: RecoveryTimer::new(&name),
            name,
            thresholds,
            cell: Arc::new(StateCell::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read-only handle on this engine's state.
    pub fn state(&self) -> StateHandle {
        StateHandle::new(self.cell.clone())
    }

    /// Phase as of now.
    pub fn phase(&self) -> Phase {
        self.cell.load().phase
    }

    /// Record a failure, tripping the breaker when the limits are met.
    pub fn observe_failure<E>(&self, error: E) -> Failure<E> {
        let now = Instant::now();
        let limits = self.thresholds;

        let (prev, next) = self.cell.update(|s| {
            let fail_count = s.fail_count.saturating_add(1);
            let within_window = match s.last_failure {
                None => true,
                Some(last) => now.saturating_duration_since(last) <= limits.fail_window,
            };
            let mut next = CircuitState {
                fail_count,
                last_failure: Some(now),
                ..s.clone()
            };
            if s.phase != Phase::Open && fail_count >= limits.fail_limit && within_window {
                next.phase = Phase::Open;
                next.success_count = 0;
                next.trips = s.trips + 1;
                next.opened_at = Some(now);
            }
            Some(next)
        });

        metrics::record_failure(&self.name);
        tracing::debug!(breaker = %self.name, fail_count = next.fail_count, phase = %next.phase, "Failure observed");

        if prev.phase != Phase::Open && next.phase == Phase::Open {
            tracing::warn!(
                breaker = %self.name,
                fail_count = next.fail_count,
                from = %prev.phase,
                open_timeout = ?limits.open_timeout,
                "Circuit opened"
            );
            metrics::record_transition(&self.name, prev.phase, Phase::Open);
            self.arm_recovery(next.trips);
        }

        Failure {
            error,
            timestamp: now,
            fail_count: next.fail_count,
        }
    }

    /// Record a successful probe. Has no effect unless half-open.
    pub fn observe_success(&self) {
        let limit = self.thresholds.success_limit;
        let (prev, next) = self.cell.update(|s| {
            if s.phase != Phase::HalfOpen {
                return None;
            }
            let success_count = s.success_count.saturating_add(1);
            if success_count >= limit {
                Some(CircuitState {
                    phase: Phase::Closed,
                    success_count,
                    fail_count: 0,
                    last_failure: None,
                    ..s.clone()
                })
            } else {
                Some(CircuitState {
                    success_count,
                    ..s.clone()
                })
            }
        });

        if prev.phase != Phase::HalfOpen {
            return;
        }
        metrics::record_success(&self.name);
        if next.phase == Phase::Closed {
            tracing::info!(breaker = %self.name, successes = next.success_count, "Circuit closed");
            metrics::record_transition(&self.name, Phase::HalfOpen, Phase::Closed);
        } else {
            tracing::debug!(breaker = %self.name, successes = next.success_count, "Probe succeeded");
        }
    }

    /// Forget the last failure time so the next failure skips the window check.
    ///
    /// `fail_count` is left as is.
    pub fn clear_failure_window(&self) {
        self.cell.update(|s| {
            s.last_failure?;
            Some(CircuitState {
                last_failure: None,
                ..s.clone()
            })
        });
    }

    /// Stop the pending recovery timer. The breaker stays in its current phase.
    pub fn shutdown(&self) {
        self.timer.cancel();
    }

    fn arm_recovery(&self, generation: u64) {
        let cell = self.cell.clone();
        let name = self.name.clone();
        self.timer.arm(self.thresholds.open_timeout, move || {
            enter_half_open(&cell, &name, generation);
        });
    }
}

impl Drop for TransitionEngine {
    fn drop(&mut self) {
        self.timer.cancel();
    }
}

/// Move Open → Half-Open if the breaker is still in trip `generation`.
fn enter_half_open(cell: &StateCell, name: &str, generation: u64) {
    let (prev, next) = cell.update(|s| {
        if s.phase != Phase::Open || s.trips != generation {
            return None;
        }
        Some(CircuitState {
            phase: Phase::HalfOpen,
            success_count: 0,
            ..s.clone()
        })
    });
    if prev.phase == Phase::Open && next.phase == Phase::HalfOpen {
        tracing::info!(breaker = %name, trips = generation, "Circuit half-open");
        metrics::record_transition(name, Phase::Open, Phase::HalfOpen);
    }
}
