//! Fire-once recovery timer.
//!
//! # Responsibilities
//! - Run a task once after a delay, off the caller's thread
//! - Allow the pending task to be replaced or cancelled
//!
//! # Design Decisions
//! - Each timer owns one worker thread, started on first arm, so a task
//!   fires even when the arming runtime is gone or its thread is blocked
//! - The worker waits on a condvar, so arming or cancelling wakes it early
//! - Arming swaps the pending task under the slot lock; the last arm wins
//! - Deadlines use the wall clock, never a paused test clock

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

type Task = Box<dyn FnOnce() + Send>;

struct Pending {
    deadline: Instant,
    task: Task,
}

#[derive(Default)]
struct Slot {
    pending: Option<Pending>,
    started: bool,
    closed: bool,
}

#[derive(Default)]
struct Shared {
    slot: Mutex<Slot>,
    wake: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Holder for at most one pending delayed task.
pub struct RecoveryTimer {
    name: String,
    shared: Arc<Shared>,
}

impl std::fmt::Debug for RecoveryTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slot = self.shared.lock();
        f.debug_struct("RecoveryTimer")
            .field("name", &self.name)
            .field("pending", &slot.pending.as_ref().map(|p| p.deadline))
            .finish()
    }
}

impl RecoveryTimer {
    /// `name` labels the worker thread.
    pub fn new(name: &str) -> Self {
        Self {
            name: format!("tripwire-recovery-{name}"),
            shared: Arc::new(Shared::default()),
        }
    }

    /// Schedule `task` to run once after `delay`, replacing any pending task.
    pub fn arm<F>(&self, delay: Duration, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut slot = self.shared.lock();
        slot.pending = Some(Pending {
            deadline: Instant::now() + delay,
            task: Box::new(task),
        });

        if !slot.started {
            let shared = self.shared.clone();
            match thread::Builder::new()
                .name(self.name.clone())
                .spawn(move || run(&shared))
            {
                Ok(_) => slot.started = true,
                Err(e) => {
                    slot.pending = None;
                    tracing::error!(timer = %self.name, error = %e, "Failed to spawn recovery timer thread");
                    return;
                }
            }
        }
        drop(slot);
        self.shared.wake.notify_one();
    }

    /// Cancel the pending task, if any. A task that already ran is unaffected.
    pub fn cancel(&self) {
        let cancelled = self.shared.lock().pending.take();
        if cancelled.is_some() {
            self.shared.wake.notify_one();
        }
    }

    #[cfg(test)]
    fn is_armed(&self) -> bool {
        self.shared.lock().pending.is_some()
    }
}

impl Drop for RecoveryTimer {
    fn drop(&mut self) {
        let mut slot = self.shared.lock();
        slot.pending = None;
        slot.closed = true;
        drop(slot);
        self.shared.wake.notify_one();
    }
}

/// Worker loop: sleep until the pending deadline, then run the task outside the lock.
fn run(shared: &Shared) {
    let mut slot = shared.lock();
    loop {
        if slot.closed {
            return;
        }
        let Some(deadline) = slot.pending.as_ref().map(|p| p.deadline) else {
            slot = shared.wake.wait(slot).unwrap_or_else(PoisonError::into_inner);
            continue;
        };

        let now = Instant::now();
        if now < deadline {
            slot = match shared.wake.wait_timeout(slot, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
            continue;
        }

        if let Some(pending) = slot.pending.take() {
            drop(slot);
            (pending.task)();
            slot = shared.lock();
        }
    }
}
