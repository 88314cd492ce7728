//! Circuit state value and its shared cell.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: tripped, calls go to the drop handler
//! - Half-Open: probing, calls pass through and decide recovery
//!
//! # Design Decisions
//! - `CircuitState` is an immutable value; every mutation replaces the whole value
//! - The cell is an `ArcSwap`, updated with a compare-and-swap loop
//! - `update` hands back both the replaced and the installed value, so callers
//!   decide from the outcome of the swap, never from an earlier read

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::Instant;

/// Breaker phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Closed => write!(f, "closed"),
            Phase::Open => write!(f, "open"),
            Phase::HalfOpen => write!(f, "half_open"),
        }
    }
}

/// One consistent view of a breaker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitState {
    /// Current phase.
    pub phase: Phase,
    /// Consecutive successes observed while half-open.
    pub success_count: u32,
    /// Failures observed since the last close.
    pub fail_count: u32,
    /// Most recent failure of this cycle; `None` is the "never" sentinel.
    pub last_failure: Option<Instant>,
    /// Number of transitions into `Open` so far. Doubles as the recovery
    /// timer generation.
    pub trips: u64,
    /// When the current (or last) open period started.
    pub opened_at: Option<Instant>,
}

impl Default for CircuitState {
    fn default() -> Self {
        Self {
            phase: Phase::Closed,
            success_count: 0,
            fail_count: 0,
            last_failure: None,
            trips: 0,
            opened_at: None,
        }
    }
}

impl CircuitState {
    /// Build a serializable diagnostic view relative to `now`.
    pub fn snapshot_at(&self, now: Instant) -> StateSnapshot {
        StateSnapshot {
            phase: self.phase,
            success_count: self.success_count,
            fail_count: self.fail_count,
            trips: self.trips,
            ms_since_last_failure: self
                .last_failure
                .map(|t| now.saturating_duration_since(t).as_millis() as u64),
            ms_since_opened: self
                .opened_at
                .map(|t| now.saturating_duration_since(t).as_millis() as u64),
        }
    }
}

/// Serializable copy of a [`CircuitState`] for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub phase: Phase,
    pub success_count: u32,
    pub fail_count: u32,
    pub trips: u64,
    pub ms_since_last_failure: Option<u64>,
    pub ms_since_opened: Option<u64>,
}

/// Atomically replaceable holder of the circuit state.
#[derive(Debug)]
pub struct StateCell {
    inner: ArcSwap<CircuitState>,
}

impl StateCell {
    pub fn new() -> Self {
        Self {
            inner: ArcSwap::from_pointee(CircuitState::default()),
        }
    }

    /// Current value.
    pub fn load(&self) -> Arc<CircuitState> {
        self.inner.load_full()
    }

    /// Replace the state with `f(current)` as one linearizable step.
    ///
    /// `f` may run several times under contention and must be pure.
    /// Returns `(previous, installed)`. When `f` returns `None` nothing is
    /// written and both halves are the value that was observed.
    pub fn update<F>(&self, mut f: F) -> (Arc<CircuitState>, Arc<CircuitState>)
    where
        F: FnMut(&CircuitState) -> Option<CircuitState>,
    {
        let mut current = self.inner.load_full();
        loop {
            let next = match f(&current) {
                Some(next) => Arc::new(next),
                None => return (current.clone(), current),
            };
            let prev = self.inner.compare_and_swap(&current, next.clone());
            if Arc::ptr_eq(&*prev, &current) {
                return (current, next);
            }
            current = arc_swap::Guard::into_inner(prev);
        }
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view of a breaker's state.
///
/// Cloning is cheap; every clone observes the same cell.
#[derive(Debug, Clone)]
pub struct StateHandle {
    cell: Arc<StateCell>,
}

impl StateHandle {
    pub(crate) fn new(cell: Arc<StateCell>) -> Self {
        Self { cell }
    }

    pub fn load(&self) -> Arc<CircuitState> {
        self.cell.load()
    }

    pub fn phase(&self) -> Phase {
        self.cell.load().phase
    }

    pub fn snapshot(&self) -> StateSnapshot {
        self.cell.load().snapshot_at(Instant::now())
    }
}
