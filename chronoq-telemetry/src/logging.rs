//! ## chronoq-telemetry::logging
//! **Structured logging with `tracing`**
//!
//! The subscriber filter comes from `RUST_LOG` when set, otherwise from the
//! configured `telemetry.log_level`.

use chronoq_config::TelemetryConfig;
use tracing::info_span;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Clone)]
pub struct SchedulerLogger;

impl SchedulerLogger {
    /// Installs the global fmt subscriber.
    ///
    /// # Panics
    /// If a global subscriber is already installed.
    pub fn init(config: &TelemetryConfig) {
        Self::builder(config).init()
    }

    /// Installs the global fmt subscriber unless one already exists.
    /// Returns `false` when another subscriber won.
    pub fn try_init(config: &TelemetryConfig) -> bool {
        Self::builder(config).try_init().is_ok()
    }

    fn builder(
        config: &TelemetryConfig,
    ) -> fmt::SubscriberBuilder<fmt::format::DefaultFields, fmt::format::Format, EnvFilter> {
        fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str())),
            )
            .with_span_events(FmtSpan::CLOSE)
    }

    /// Emits one summary line for a completed drain.
    #[inline]
    pub fn log_drain(policy: &str, fired: u64, pending: usize, now_ns: u64) {
        let span = info_span!("drain", policy = policy);
        let _enter = span.enter();
        tracing::debug!(fired, pending, now_ns, "Drain completed");
    }
}
