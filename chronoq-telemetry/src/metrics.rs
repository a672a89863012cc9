//! ## chronoq-telemetry::metrics
//! **Prometheus counters for scheduler activity**

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry};

#[derive(Debug, Clone)]
pub struct SchedulerMetrics {
    pub registry: Registry,
    pub scheduled: IntCounter,
    pub fired: IntCounter,
    pub canceled: IntCounter,
    pub queue_depth: IntGauge,
    /// Distance between registration time and due time, in virtual nanoseconds.
    pub lead_time: Histogram,
}

impl SchedulerMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let scheduled = IntCounter::new("chronoq_events_scheduled_total", "Registered events")?;
        let fired = IntCounter::new("chronoq_events_fired_total", "Events whose body ran")?;
        let canceled = IntCounter::new("chronoq_events_canceled_total", "Events canceled")?;
        let queue_depth = IntGauge::new("chronoq_queue_depth", "Pending events")?;
        let lead_time = Histogram::with_opts(
            HistogramOpts::new(
                "chronoq_lead_time_ns",
                "Virtual time between registration and due time",
            )
            .buckets(vec![0.0, 1_000.0, 1_000_000.0, 1_000_000_000.0, 60_000_000_000.0]),
        )?;

        registry.register(Box::new(scheduled.clone()))?;
        registry.register(Box::new(fired.clone()))?;
        registry.register(Box::new(canceled.clone()))?;
        registry.register(Box::new(queue_depth.clone()))?;
        registry.register(Box::new(lead_time.clone()))?;

        Ok(Self {
            registry,
            scheduled,
            fired,
            canceled,
            queue_depth,
            lead_time,
        })
    }

    pub fn record_scheduled(&self, lead_ns: u64, depth: usize) {
        self.scheduled.inc();
        self.lead_time.observe(lead_ns as f64);
        self.queue_depth.set(depth as i64);
    }

    pub fn record_fired(&self, depth: usize) {
        self.fired.inc();
        self.queue_depth.set(depth as i64);
    }

    pub fn record_canceled(&self, depth: usize) {
        self.canceled.inc();
        self.queue_depth.set(depth as i64);
    }

    /// Renders the registry in the prometheus text format.
    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
