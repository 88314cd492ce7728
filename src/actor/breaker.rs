//! Circuit breaker for actor actions.
//!
//! # Data Flow
//! ```text
//! caller action
//!     → ActionTransform::wrap (dispatch by phase at execution time)
//!     → mailbox applies it
//!     → Err: mailbox error handler → observe_failure → failure observer
//! ```
//!
//! # Design Decisions
//! - An action cannot be skipped, so the open path returns a state
//!   (the drop handler's, by default the unchanged current state)
//! - Failures are observed by the mailbox's error handler, not by the
//!   wrapped action, so raw actions that fail are still counted
//! - No locking: the mailbox already serializes actions

use std::sync::Arc;

use crate::actor::mailbox::{Action, Actor};
use crate::actor::ActorError;
use crate::config::BreakerConfig;
use crate::observability::metrics;
use crate::resilience::engine::{Failure, TransitionEngine};
use crate::resilience::handlers::PostSuccess;
use crate::resilience::state::{Phase, StateHandle};
use crate::resilience::wrapper::build_engine;

/// Caller-supplied behaviour for an actor breaker.
pub struct ActorHandlers<S, E> {
    pub drop_handler: Arc<dyn Fn(&S) -> S + Send + Sync>,
    pub failure_observer: Arc<dyn Fn(Failure<E>) + Send + Sync>,
    pub post_success: Option<PostSuccess<S>>,
}

impl<S: Clone, E> ActorHandlers<S, E> {
    /// Keep the current state while open and ignore failures.
    pub fn new() -> Self {
        Self {
            drop_handler: Arc::new(|state: &S| state.clone()),
            failure_observer: Arc::new(|_: Failure<E>| {}),
            post_success: None,
        }
    }
}

impl<S: Clone, E> Default for ActorHandlers<S, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, E> ActorHandlers<S, E> {
    /// Next state for actions rejected while open.
    pub fn on_drop(mut self, f: impl Fn(&S) -> S + Send + Sync + 'static) -> Self {
        self.drop_handler = Arc::new(f);
        self
    }

    /// Called for every failed action after it has been counted.
    pub fn on_failure(mut self, f: impl Fn(Failure<E>) + Send + Sync + 'static) -> Self {
        self.failure_observer = Arc::new(f);
        self
    }

    pub fn with_post_success(mut self, post_success: PostSuccess<S>) -> Self {
        self.post_success = Some(post_success);
        self
    }
}

/// Turns raw actions into breaker-aware actions.
pub struct ActionTransform<S, E> {
    engine: Arc<TransitionEngine>,
    drop_handler: Arc<dyn Fn(&S) -> S + Send + Sync>,
    post_success: Option<PostSuccess<S>>,
    _error: std::marker::PhantomData<fn() -> E>,
}

impl<S, E> Clone for ActionTransform<S, E> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            drop_handler: self.drop_handler.clone(),
            post_success: self.post_success.clone(),
            _error: std::marker::PhantomData,
        }
    }
}

impl<S, E> ActionTransform<S, E>
where
    S: Send + Sync + 'static,
    E: Send + 'static,
{
    /// Wrap `action` so it runs under the breaker's dispatch rules.
    pub fn wrap<F>(&self, action: F) -> Action<S, E>
    where
        F: FnOnce(&S) -> Result<S, E> + Send + 'static,
    {
        let this = self.clone();
        Box::new(move |state: &S| this.dispatch(state, action))
    }

    fn dispatch<F>(&self, state: &S, action: F) -> Result<S, E>
    where
        F: FnOnce(&S) -> Result<S, E>,
    {
        match self.engine.phase() {
            Phase::Closed => {
                let next = action(state)?;
                self.after_success(state);
                Ok(next)
            }
            Phase::Open => {
                metrics::record_drop(self.engine.name());
                Ok((self.drop_handler)(state))
            }
            Phase::HalfOpen => match action(state) {
                Ok(next) => {
                    self.engine.observe_success();
                    self.after_success(state);
                    Ok(next)
                }
                Err(error) => {
                    self.engine.clear_failure_window();
                    Err(error)
                }
            },
        }
    }

    fn after_success(&self, state: &S) {
        if let Some(post_success) = &self.post_success {
            post_success.run_blocking(state);
        }
    }

    pub fn state(&self) -> StateHandle {
        self.engine.state()
    }
}

/// Start an actor whose failures drive a circuit breaker.
///
/// Returns the actor, the transform every action must go through, and a
/// read-only view of the breaker state.
#[allow(clippy::type_complexity)]
pub fn wrap_actor<S, E>(
    name: impl Into<String>,
    initial: S,
    config: &BreakerConfig,
    handlers: ActorHandlers<S, E>,
) -> Result<(Actor<S, E>, ActionTransform<S, E>, StateHandle), ActorError>
where
    S: Clone + Send + Sync + 'static,
    E: Send + 'static,
{
    let name = name.into();
    let engine = build_engine(name.clone(), config)?;

    let observer_engine = engine.clone();
    let observer = handlers.failure_observer;
    let actor = Actor::spawn(name, initial, move |error: E| {
        let failure = observer_engine.observe_failure(error);
        observer(failure);
    })?;

    let transform = ActionTransform {
        engine: engine.clone(),
        drop_handler: handlers.drop_handler,
        post_success: PostSuccess::resolve(handlers.post_success, config.post_success_delay()),
        _error: std::marker::PhantomData,
    };
    Ok((actor, transform, engine.state()))
}
