//! Caller-supplied behaviour for wrapped calls.

use std::sync::Arc;
use std::time::Duration;
use crate::resilience::engine::Failure;

/// Produces the result of a call rejected while open.
pub type DropHandler<A, R> = Arc<dyn Fn(&A) -> R + Send + Sync>;

/// Produces the result of a call whose protected work failed.
pub type FailureObserver<E, R> = Arc<dyn Fn(Failure<E>) -> R + Send + Sync>;

/// Pacing applied after every successful call.
pub enum PostSuccess<A> {
    /// Pause for a fixed duration.
    Sleep(Duration),
    /// Run a function of the call's arguments.
    Hook(Arc<dyn Fn(&A) + Send + Sync>),
}

impl<A> PostSuccess<A> {
    pub fn hook(f: impl Fn(&A) + Send + Sync + 'static) -> Self {
        PostSuccess::Hook(Arc::new(f))
    }

    /// Apply on a thread that may block.
    pub(crate) fn run_blocking(&self, args: &A) {
        match self {
            PostSuccess::Sleep(delay) => std::thread::sleep(*delay),
            PostSuccess::Hook(f) => f(args),
        }
    }

    /// Apply inside an async context.
    pub(crate) async fn run_async(&self, args: &A) {
        match self {
            PostSuccess::Sleep(delay) => tokio::time::sleep(*delay).await,
            PostSuccess::Hook(f) => f(args),
        }
    }

    /// The caller's choice, else the configured fixed delay.
    pub(crate) fn resolve(explicit: Option<Self>, configured: Option<Duration>) -> Option<Self> {
        explicit.or_else(|| configured.map(PostSuccess::Sleep))
    }
}

impl<A> Clone for PostSuccess<A> {
    fn clone(&self) -> Self {
        match self {
            PostSuccess::Sleep(delay) => PostSuccess::Sleep(*delay),
            PostSuccess::Hook(f) => PostSuccess::Hook(f.clone()),
        }
    }
}

impl<A> std::fmt::Debug for PostSuccess<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PostSuccess::Sleep(delay) => f.debug_tuple("Sleep").field(delay).finish(),
            PostSuccess::Hook(_) => f.write_str("Hook(..)"),
        }
    }
}

/// Drop handler, failure observer and optional pacing for a call wrapper.
pub struct Handlers<A, R, E> {
    pub drop_handler: DropHandler<A, R>,
    pub failure_observer: FailureObserver<E, R>,
    pub post_success: Option<PostSuccess<A>>,
}

impl<A, R, E> Handlers<A, R, E> {
    pub fn new(
        drop_handler: impl Fn(&A) -> R + Send + Sync + 'static,
        failure_observer: impl Fn(Failure<E>) -> R + Send + Sync + 'static,
    ) -> Self {
        Self {
            drop_handler: Arc::new(drop_handler),
            failure_observer: Arc::new(failure_observer),
            post_success: None,
        }
    }

    /// Pace successful calls. Overrides `post_success_delay_ms` from the config.
    pub fn with_post_success(mut self, post_success: PostSuccess<A>) -> Self {
        self.post_success = Some(post_success);
        self
    }
}

impl<A, R, E> Clone for Handlers<A, R, E> {
    fn clone(&self) -> Self {
        Self {
            drop_handler: self.drop_handler.clone(),
            failure_observer: self.failure_observer.clone(),
            post_success: self.post_success.clone(),
        }
    }
}
