//! Tripwire: circuit breakers for callables and sequential actors.

pub mod actor;
pub mod config;
pub mod observability;
pub mod resilience;

pub use actor::{wrap_actor, ActionTransform, Actor, ActorError, ActorHandlers};
pub use config::{BreakerConfig, ConfigError, LockingMode};
pub use resilience::{
    wrap, wrap_async, AsyncCallWrapper, BreakerRegistry, CallWrapper, Failure, Handlers, Phase,
    PostSuccess, StateHandle,
};
