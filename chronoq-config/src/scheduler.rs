//! Scheduler configuration.
//!
//! Controls the starting instant of the virtual clock and the sizing of the
//! slot pool that stores queued event records.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use crate::validation;

/// Scheduler parameters.
#[derive(Default, Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// Virtual clock value at construction, in nanoseconds.
    #[serde(default)]
    pub epoch_ns: u64,

    /// Event record pool configuration.
    #[serde(default)]
    #[validate(nested)]
    pub pool: PoolConfig,
}

/// Slot pool configuration.
#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
#[validate(schema(function = validation::validate_pool))]
pub struct PoolConfig {
    /// Slots added each time the pool grows (must be a power of two).
    #[serde(default = "default_chunk_size")]
    #[validate(range(min = 16, max = 65536))]
    pub chunk_size: usize,

    /// Hard limit on live records. `None` means unbounded.
    #[serde(default)]
    #[validate(range(min = 1))]
    pub capacity: Option<usize>,
}

fn default_chunk_size() -> usize {
    256
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            capacity: None,
        }
    }
}
