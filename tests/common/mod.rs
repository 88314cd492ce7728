//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tripwire::{BreakerConfig, Failure, Handlers};

/// What a wrapped call handed back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Value(u32),
    Dropped(u32),
    Failed { error: String, fail_count: u32 },
}

/// A unit of work that fails while its switch is on, counting invocations.
#[derive(Debug, Clone, Default)]
pub struct FlakyService {
    failing: Arc<AtomicBool>,
    calls: Arc<AtomicU32>,
}

impl FlakyService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn handle(&self, n: &u32) -> Result<Reply, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            Err(format!("service down on {n}"))
        } else {
            Ok(Reply::Value(*n))
        }
    }
}

/// Echo-style handlers: drops return the arguments, failures return the record.
pub fn echo_handlers() -> Handlers<u32, Reply, String> {
    Handlers::new(
        |n: &u32| Reply::Dropped(*n),
        |failure: Failure<String>| Reply::Failed {
            error: failure.error,
            fail_count: failure.fail_count,
        },
    )
}

pub fn config(fail_limit: u32, fail_window_ms: u64, success_limit: u32, open_timeout_ms: u64) -> BreakerConfig {
    BreakerConfig::default()
        .with_fail_limit(fail_limit)
        .with_fail_window(Duration::from_millis(fail_window_ms))
        .with_success_limit(success_limit)
        .with_open_timeout(Duration::from_millis(open_timeout_ms))
}
