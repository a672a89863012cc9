use chronoq_config::ConfigError;
use thiserror::Error;

use crate::alloc::pool::SlotKey;
use crate::time::VirtualTime;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Event {0} is not queued (already fired or canceled)")]
    NotFound(SlotKey),

    #[error("Event {0} is firing and cannot be canceled")]
    Firing(SlotKey),

    #[error("Event pool exhausted (capacity {capacity})")]
    PoolExhausted { capacity: usize },

    #[error("Virtual clock cannot move backwards from {now} to {requested}")]
    ClockRegression {
        now: VirtualTime,
        requested: VirtualTime,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}
