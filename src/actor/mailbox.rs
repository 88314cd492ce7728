//! Sequential actor: one cell of state, one action at a time.
//!
//! # Responsibilities
//! - Queue actions and apply them in submission order
//! - Publish each new state to readers
//! - Hand failed actions' errors to the installed error handler
//!
//! # Design Decisions
//! - Unbounded Tokio channel drained by a dedicated OS thread, so actions
//!   may block (post-success pacing sleeps there) and no runtime is needed
//! - Readers see snapshots through a `watch` channel
//! - A failing action leaves the state unchanged
//! - Panics in actions or in the error handler are logged, never fatal to the loop

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use tokio::sync::{mpsc, oneshot, watch};

/// A state transition submitted to an actor.
pub type Action<S, E> = Box<dyn FnOnce(&S) -> Result<S, E> + Send>;

/// Callback for actions that returned `Err`.
pub type ErrorHandler<E> = Arc<dyn Fn(E) + Send + Sync>;

enum Envelope<S, E> {
    Apply(Action<S, E>),
    Flush(oneshot::Sender<()>),
}

/// Handle to a running actor. Cloning shares the same mailbox.
pub struct Actor<S, E> {
    name: Arc<str>,
    tx: mpsc::UnboundedSender<Envelope<S, E>>,
    state: watch::Receiver<S>,
    errors: Arc<AtomicU64>,
}

impl<S, E> Clone for Actor<S, E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            tx: self.tx.clone(),
            state: self.state.clone(),
            errors: self.errors.clone(),
        }
    }
}

impl<S, E> Actor<S, E>
where
    S: Clone + Send + Sync + 'static,
    E: Send + 'static,
{
    /// Start the processing loop with `initial` state.
    pub fn spawn(
        name: impl Into<String>,
        initial: S,
        on_error: impl Fn(E) + Send + Sync + 'static,
    ) -> io::Result<Self> {
        let name: Arc<str> = Arc::from(name.into());
        let (tx, rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(initial.clone());
        let errors = Arc::new(AtomicU64::new(0));

        let mailbox = Mailbox {
            name: name.clone(),
            current: initial,
            state: state_tx,
            errors: errors.clone(),
            on_error: Arc::new(on_error),
        };
        thread::Builder::new()
            .name(format!("tripwire-actor-{name}"))
            .spawn(move || mailbox.run(rx))?;

        tracing::debug!(actor = %name, "Actor started");
        Ok(Self {
            name,
            tx,
            state: state_rx,
            errors,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queue an action. Returns false if the mailbox has stopped.
    pub fn send(&self, action: Action<S, E>) -> bool {
        self.tx.send(Envelope::Apply(action)).is_ok()
    }

    /// Latest published state.
    pub fn state(&self) -> S {
        self.state.borrow().clone()
    }

    /// Watch state changes.
    pub fn subscribe(&self) -> watch::Receiver<S> {
        self.state.clone()
    }

    /// Number of actions that returned `Err` so far.
    pub fn error_count(&self) -> u64 {
        self.errors.load(Ordering::SeqCst)
    }

    /// Wait until every action sent before this call has been applied.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Envelope::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }

    /// Blocking form of [`Actor::flush`]. Must not be called from async code.
    pub fn flush_blocking(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Envelope::Flush(done_tx)).is_ok() {
            let _ = done_rx.blocking_recv();
        }
    }
}

/// Processing side, owned by the actor thread.
struct Mailbox<S, E> {
    name: Arc<str>,
    current: S,
    state: watch::Sender<S>,
    errors: Arc<AtomicU64>,
    on_error: ErrorHandler<E>,
}

impl<S: Clone, E> Mailbox<S, E> {
    fn run(mut self, mut rx: mpsc::UnboundedReceiver<Envelope<S, E>>) {
        while let Some(envelope) = rx.blocking_recv() {
            match envelope {
                Envelope::Apply(action) => self.apply(action),
                Envelope::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }
        tracing::debug!(actor = %self.name, "Actor mailbox closed");
    }

    fn apply(&mut self, action: Action<S, E>) {
        let current = &self.current;
        match panic::catch_unwind(AssertUnwindSafe(|| action(current))) {
            Ok(Ok(next)) => {
                self.current = next;
                self.state.send_replace(self.current.clone());
            }
            Ok(Err(error)) => {
                self.errors.fetch_add(1, Ordering::SeqCst);
                let on_error = &self.on_error;
                if panic::catch_unwind(AssertUnwindSafe(|| on_error(error))).is_err() {
                    tracing::error!(actor = %self.name, "Actor error handler panicked");
                }
            }
            Err(_) => {
                tracing::error!(actor = %self.name, "Actor action panicked, state unchanged");
            }
        }
    }
}
