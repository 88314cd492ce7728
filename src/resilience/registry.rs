//! Named breaker registry for diagnostics.
//!
//! # Responsibilities
//! - Map breaker names to their read-only state handles
//! - Produce a consistent listing for status output
//!
//! # Design Decisions
//! - Holds `StateHandle`s only; the registry can never change a breaker
//! - Concurrent map so breakers can register from any thread

use std::sync::Arc;
use dashmap::DashMap;
use crate::resilience::state::{StateHandle, StateSnapshot};

/// A thread-safe name → state handle map.
#[derive(Debug, Clone, Default)]
pub struct BreakerRegistry {
    inner: Arc<DashMap<String, StateHandle>>,
}

impl BreakerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a breaker, replacing any previous one with the same name.
    pub fn register(&self, name: impl Into<String>, handle: StateHandle) -> Option<StateHandle> {
        let name = name.into();
        tracing::debug!(breaker = %name, "Breaker registered");
        self.inner.insert(name, handle)
    }

    pub fn get(&self, name: &str) -> Option<StateHandle> {
        self.inner.get(name).map(|r| r.value().clone())
    }

    pub fn remove(&self, name: &str) -> Option<StateHandle> {
        self.inner.remove(name).map(|(_, handle)| handle)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Snapshot every breaker, sorted by name.
    pub fn snapshot_all(&self) -> Vec<(String, StateSnapshot)> {
        let mut all: Vec<_> = self
            .inner
            .iter()
            .map(|r| (r.key().clone(), r.value().snapshot()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }
}
