//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Outbound call (gateway→resolver, location lookup, weather lookup):
//!     → timeouts.rs (one attempt, fixed deadline)
//!     → success, or a single error that fails the enclosing request
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - No retries at any layer: one attempt per call, fail fast

pub mod timeouts;

pub use timeouts::{is_deadline, outbound_client, upstream_deadline};
