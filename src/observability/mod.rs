//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Transition engine and wrappers produce:
//!     → tracing events (trips, recoveries, closes)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → Host's tracing subscriber (logging.rs installs one for binaries)
//!     → Host's metrics recorder
//! ```
//!
//! # Design Decisions
//! - The library never installs a recorder or subscriber on its own
//! - Metrics are cheap (facade calls, no-ops without a recorder)

pub mod logging;
pub mod metrics;
