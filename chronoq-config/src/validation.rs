//! Custom validation functions for configuration.

use validator::ValidationError;

use crate::scheduler::PoolConfig;

/// Validate that the pool grows in power-of-two chunks.
pub fn validate_pool(pool: &PoolConfig) -> Result<(), ValidationError> {
    if pool.chunk_size.is_power_of_two() {
        Ok(())
    } else {
        Err(ValidationError::new("chunk_size_must_be_power_of_two"))
    }
}

/// Validate a `tracing` level name.
pub fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid = ["trace", "debug", "info", "warn", "error"]
        .contains(&level.to_lowercase().as_str());
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_log_level"))
    }
}
