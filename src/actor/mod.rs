//! Actor subsystem.
//!
//! # Data Flow
//! ```text
//! caller
//!     → breaker.rs ActionTransform::wrap(action)
//!     → mailbox.rs queue (FIFO)
//!     → processing thread applies one action at a time
//!     → Ok: publish new state
//!     → Err: error handler → transition engine
//! ```
//!
//! # Design Decisions
//! - One processing thread per actor; actions never run concurrently
//! - The breaker relies only on FIFO order and the error handler hook

pub mod breaker;
pub mod mailbox;

use thiserror::Error;
use crate::config::ConfigError;

pub use breaker::{wrap_actor, ActionTransform, ActorHandlers};
pub use mailbox::{Action, Actor};

/// Errors from starting an actor breaker.
#[derive(Debug, Error)]
pub enum ActorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to start actor thread: {0}")]
    Spawn(#[from] std::io::Error),
}
