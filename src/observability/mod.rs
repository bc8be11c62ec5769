//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Both hops produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!     → telemetry.rs (spans, W3C context extract/inject)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape, optional)
//!     → Trace collector (OTLP, batched)
//! ```
//!
//! # Design Decisions
//! - One `Telemetry` per process, passed into handler state
//! - Span guards close on drop, so no exit path leaves a span open
//! - Exporter `none` keeps the same code path with nothing exported

pub mod logging;
pub mod metrics;
pub mod propagation;
pub mod span;
pub mod telemetry;

pub use propagation::{HeaderExtractor, HeaderInjector, TRACEPARENT_HEADER};
pub use span::HopSpan;
pub use telemetry::{Telemetry, TelemetryError};
