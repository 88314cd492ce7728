//! Optional mutual exclusion around a wrapped call.
//!
//! # Design Decisions
//! - RAII permits: the lock is released on every exit path
//! - Poisoned locks are recovered; the lock guards no data
//! - Try mode never blocks; a contended call is treated as dropped

use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};
use crate::config::LockingMode;

/// Outcome of trying to enter a guarded call.
#[derive(Debug)]
pub enum Permit<G> {
    /// No lock configured.
    Free,
    /// Lock held until the permit is dropped.
    Held(G),
    /// Try mode and the lock was busy.
    Contended,
}

impl<G> Permit<G> {
    pub fn is_contended(&self) -> bool {
        matches!(self, Permit::Contended)
    }
}

/// Lock for synchronous wrappers.
#[derive(Debug)]
pub struct CallGuard {
    mode: LockingMode,
    lock: Mutex<()>,
}

impl CallGuard {
    pub fn new(mode: LockingMode) -> Self {
        Self {
            mode,
            lock: Mutex::new(()),
        }
    }

    pub fn acquire(&self) -> Permit<MutexGuard<'_, ()>> {
        match self.mode {
            LockingMode::None => Permit::Free,
            LockingMode::Blocking => {
                Permit::Held(self.lock.lock().unwrap_or_else(PoisonError::into_inner))
            }
            LockingMode::Try => match self.lock.try_lock() {
                Ok(guard) => Permit::Held(guard),
                Err(TryLockError::Poisoned(poisoned)) => Permit::Held(poisoned.into_inner()),
                Err(TryLockError::WouldBlock) => Permit::Contended,
            },
        }
    }
}

/// Lock for async wrappers.
#[derive(Debug)]
pub struct AsyncCallGuard {
    mode: LockingMode,
    lock: tokio::sync::Mutex<()>,
}

impl AsyncCallGuard {
    pub fn new(mode: LockingMode) -> Self {
        Self {
            mode,
            lock: tokio::sync::Mutex::new(()),
        }
    }

    pub async fn acquire(&self) -> Permit<tokio::sync::MutexGuard<'_, ()>> {
        match self.mode {
            LockingMode::None => Permit::Free,
            LockingMode::Blocking => Permit::Held(self.lock.lock().await),
            LockingMode::Try => match self.lock.try_lock() {
                Ok(guard) => Permit::Held(guard),
                Err(_) => Permit::Contended,
            },
        }
    }
}
