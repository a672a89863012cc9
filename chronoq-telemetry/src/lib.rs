//! # Chronoq Telemetry
//!
//! Logging setup and prometheus metrics for the scheduler.

pub mod logging;
pub mod metrics;

pub use logging::SchedulerLogger;
pub use metrics::SchedulerMetrics;
