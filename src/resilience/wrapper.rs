//! Call wrappers.
//!
//! # Responsibilities
//! - Dispatch each call by the phase read at call time
//! - Close the loop back into the transition engine
//! - Turn failures into values via the failure observer
//!
//! # Dispatch
//! ```text
//! Closed:    run work → post-success → value
//! Open:      drop handler(args) → value (work not run)
//! Half-Open: run work → success: observe_success → post-success → value
//!                     → failure: clear window gate → failure path
//! Failure path: observe_failure → failure observer(failure) → value
//! ```

use std::future::Future;
use std::sync::Arc;

use crate::config::{validate_config, BreakerConfig, ConfigError};
use crate::observability::metrics;
use crate::resilience::engine::{Thresholds, TransitionEngine};
use crate::resilience::guard::{AsyncCallGuard, CallGuard};
use crate::resilience::handlers::{DropHandler, FailureObserver, Handlers, PostSuccess};
use crate::resilience::state::{Phase, StateHandle};

/// Validate `config` and build an engine for it.
pub(crate) fn build_engine(
    name: impl Into<String>,
    config: &BreakerConfig,
) -> Result<Arc<TransitionEngine>, ConfigError> {
    validate_config(config).map_err(ConfigError::Validation)?;
    Ok(Arc::new(TransitionEngine::new(name, Thresholds::from(config))))
}

/// Wrap a synchronous unit of work.
///
/// The returned wrapper never surfaces `E` directly: a failed call returns
/// whatever the failure observer makes of it.
pub fn wrap<F, A, R, E>(
    name: impl Into<String>,
    callable: F,
    config: &BreakerConfig,
    handlers: Handlers<A, R, E>,
) -> Result<CallWrapper<F, A, R, E>, ConfigError>
where
    F: Fn(&A) -> Result<R, E>,
{
    let engine = build_engine(name, config)?;
    Ok(CallWrapper {
        inner: callable,
        engine,
        drop_handler: handlers.drop_handler,
        failure_observer: handlers.failure_observer,
        post_success: PostSuccess::resolve(handlers.post_success, config.post_success_delay()),
        guard: CallGuard::new(config.locking),
    })
}

/// Wrap an async unit of work.
pub fn wrap_async<F, Fut, A, R, E>(
    name: impl Into<String>,
    callable: F,
    config: &BreakerConfig,
    handlers: Handlers<A, R, E>,
) -> Result<AsyncCallWrapper<F, A, R, E>, ConfigError>
where
    F: Fn(A) -> Fut,
    Fut: Future<Output = Result<R, E>>,
    A: Clone,
{
    let engine = build_engine(name, config)?;
    Ok(AsyncCallWrapper {
        inner: callable,
        engine,
        drop_handler: handlers.drop_handler,
        failure_observer: handlers.failure_observer,
        post_success: PostSuccess::resolve(handlers.post_success, config.post_success_delay()),
        guard: AsyncCallGuard::new(config.locking),
    })
}

/// A synchronous callable guarded by a circuit breaker.
pub struct CallWrapper<F, A, R, E> {
    inner: F,
    engine: Arc<TransitionEngine>,
    drop_handler: DropHandler<A, R>,
    failure_observer: FailureObserver<E, R>,
    post_success: Option<PostSuccess<A>>,
    guard: CallGuard,
}

impl<F, A, R, E> CallWrapper<F, A, R, E>
where
    F: Fn(&A) -> Result<R, E>,
{
    /// Invoke through the breaker.
    pub fn call(&self, args: A) -> R {
        let permit = self.guard.acquire();
        if permit.is_contended() {
            tracing::trace!(breaker = %self.engine.name(), "Call skipped, lock contended");
            metrics::record_drop(self.engine.name());
            return (self.drop_handler)(&args);
        }

        match self.dispatch(&args) {
            Ok(value) => value,
            Err(error) => {
                let failure = self.engine.observe_failure(error);
                (self.failure_observer)(failure)
            }
        }
    }

    fn dispatch(&self, args: &A) -> Result<R, E> {
        match self.engine.phase() {
            Phase::Closed => {
                let value = (self.inner)(args)?;
                self.after_success(args);
                Ok(value)
            }
            Phase::Open => {
                metrics::record_drop(self.engine.name());
                Ok((self.drop_handler)(args))
            }
            Phase::HalfOpen => match (self.inner)(args) {
                Ok(value) => {
                    self.engine.observe_success();
                    self.after_success(args);
                    Ok(value)
                }
                Err(error) => {
                    self.engine.clear_failure_window();
                    Err(error)
                }
            },
        }
    }

    fn after_success(&self, args: &A) {
        if let Some(post_success) = &self.post_success {
            post_success.run_blocking(args);
        }
    }

    /// Read-only state handle.
    pub fn state(&self) -> StateHandle {
        self.engine.state()
    }

    /// Cancel a pending recovery. An open breaker stays open.
    pub fn shutdown(&self) {
        self.engine.shutdown();
    }

    /// Turn the wrapper into a plain closure with the same argument shape.
    pub fn into_fn(self) -> impl Fn(A) -> R {
        move |args| self.call(args)
    }
}

/// An async callable guarded by a circuit breaker.
pub struct AsyncCallWrapper<F, A, R, E> {
    inner: F,
    engine: Arc<TransitionEngine>,
    drop_handler: DropHandler<A, R>,
    failure_observer: FailureObserver<E, R>,
    post_success: Option<PostSuccess<A>>,
    guard: AsyncCallGuard,
}

impl<F, Fut, A, R, E> AsyncCallWrapper<F, A, R, E>
where
    F: Fn(A) -> Fut,
    Fut: Future<Output = Result<R, E>>,
    A: Clone,
{
    /// Invoke through the breaker.
    pub async fn call(&self, args: A) -> R {
        let permit = self.guard.acquire().await;
        if permit.is_contended() {
            tracing::trace!(breaker = %self.engine.name(), "Call skipped, lock contended");
            metrics::record_drop(self.engine.name());
            return (self.drop_handler)(&args);
        }

        match self.dispatch(args).await {
            Ok(value) => value,
            Err(error) => {
                let failure = self.engine.observe_failure(error);
                (self.failure_observer)(failure)
            }
        }
    }

    async fn dispatch(&self, args: A) -> Result<R, E> {
        match self.engine.phase() {
            Phase::Closed => {
                let value = (self.inner)(args.clone()).await?;
                self.after_success(&args).await;
                Ok(value)
            }
            Phase::Open => {
                metrics::record_drop(self.engine.name());
                Ok((self.drop_handler)(&args))
            }
            Phase::HalfOpen => match (self.inner)(args.clone()).await {
                Ok(value) => {
                    self.engine.observe_success();
                    self.after_success(&args).await;
                    Ok(value)
                }
                Err(error) => {
                    self.engine.clear_failure_window();
                    Err(error)
                }
            },
        }
    }

    async fn after_success(&self, args: &A) {
        if let Some(post_success) = &self.post_success {
            post_success.run_async(args).await;
        }
    }

    /// Read-only state handle.
    pub fn state(&self) -> StateHandle {
        self.engine.state()
    }

    /// Cancel a pending recovery. An open breaker stays open.
    pub fn shutdown(&self) {
        self.engine.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LockingMode;
    use crate::resilience::engine::Failure;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn echo_handlers() -> Handlers<i32, String, String> {
        Handlers::new(
            |n: &i32| format!("dropped {n}"),
            |failure: Failure<String>| format!("failed {} ({})", failure.error, failure.fail_count),
        )
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = BreakerConfig::default().with_fail_limit(0);
        let result = wrap("bad", |n: &i32| Ok::<_, String>(n.to_string()), &config, echo_handlers());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_closed_passes_through() {
        let config = BreakerConfig::default();
        let breaker = wrap("ok", |n: &i32| Ok::<_, String>(format!("v{n}")), &config, echo_handlers()).unwrap();
        assert_eq!(breaker.call(4), "v4");
        assert_eq!(breaker.state().phase(), Phase::Closed);
    }

    #[test]
    fn test_failure_goes_to_observer() {
        let config = BreakerConfig::default();
        let breaker = wrap("err", |_: &i32| Err::<String, _>("boom".to_string()), &config, echo_handlers()).unwrap();
        assert_eq!(breaker.call(1), "failed boom (1)");
        assert_eq!(breaker.call(1), "failed boom (2)");
    }

    #[test]
    fn test_open_uses_drop_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let config = BreakerConfig::default()
            .with_fail_limit(1)
            .with_open_timeout(Duration::from_secs(60));
        let breaker = wrap(
            "drop",
            move |_: &i32| {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<String, _>("down".to_string())
            },
            &config,
            echo_handlers(),
        )
        .unwrap();

        assert_eq!(breaker.call(1), "failed down (1)");
        assert_eq!(breaker.state().phase(), Phase::Open);
        assert_eq!(breaker.call(2), "dropped 2");
        assert_eq!(breaker.call(3), "dropped 3");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(breaker.state().load().fail_count, 1);
    }

    #[test]
    fn test_post_success_skipped_on_failure() {
        let hooks = Arc::new(AtomicUsize::new(0));
        let h = hooks.clone();
        let config = BreakerConfig::default();
        let handlers = echo_handlers().with_post_success(PostSuccess::hook(move |_: &i32| {
            h.fetch_add(1, Ordering::SeqCst);
        }));
        let breaker = wrap(
            "hook",
            |n: &i32| if *n > 0 { Ok(n.to_string()) } else { Err("neg".to_string()) },
            &config,
            handlers,
        )
        .unwrap();

        breaker.call(1);
        breaker.call(-1);
        breaker.call(2);
        assert_eq!(hooks.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_try_lock_drops_reentrant_call() {
        let config = BreakerConfig::default().with_locking(LockingMode::Try);
        let breaker = Arc::new(
            wrap(
                "locked",
                |n: &i32| Ok::<_, String>(format!("v{n}")),
                &config,
                echo_handlers(),
            )
            .unwrap(),
        );

        let held = breaker.guard.acquire();
        assert_eq!(breaker.call(5), "dropped 5");
        drop(held);
        assert_eq!(breaker.call(5), "v5");
    }

    #[test]
    fn test_into_fn_keeps_shape() {
        let config = BreakerConfig::default();
        let f = wrap("fn", |n: &i32| Ok::<_, String>((n * 2).to_string()), &config, echo_handlers())
            .unwrap()
            .into_fn();
        assert_eq!(f(21), "42");
    }

    #[tokio::test]
    async fn test_async_dispatch() {
        let config = BreakerConfig::default()
            .with_fail_limit(1)
            .with_open_timeout(Duration::from_secs(60));
        let breaker = wrap_async(
            "async",
            |n: i32| async move {
                if n >= 0 {
                    Ok(format!("v{n}"))
                } else {
                    Err("neg".to_string())
                }
            },
            &config,
            echo_handlers(),
        )
        .unwrap();

        assert_eq!(breaker.call(3).await, "v3");
        assert_eq!(breaker.call(-1).await, "failed neg (1)");
        assert_eq!(breaker.state().phase(), Phase::Open);
        assert_eq!(breaker.call(3).await, "dropped 3");
    }
}
