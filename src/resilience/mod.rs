//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Caller:
//!     → wrapper.rs (dispatch by phase; optional guard.rs lock)
//!     → protected work
//!     → On failure: engine.rs observe_failure (CAS on state.rs cell)
//!     → On trip: timer.rs arms Open → Half-Open
//!     → handlers.rs failure observer decides the returned value
//! ```
//!
//! # Design Decisions
//! - Per-wrapper state (never global)
//! - Fail fast in Open state via the drop handler
//! - Every call in Half-Open is a probe
//! - Failures are values: the breaker owns how they are presented

pub mod engine;
pub mod guard;
pub mod handlers;
pub mod registry;
pub mod state;
pub mod timer;
pub mod wrapper;

pub use engine::{Failure, Thresholds, TransitionEngine};
pub use handlers::{Handlers, PostSuccess};
pub use registry::BreakerRegistry;
pub use state::{CircuitState, Phase, StateHandle, StateSnapshot};
pub use wrapper::{wrap, wrap_async, AsyncCallWrapper, CallWrapper};
