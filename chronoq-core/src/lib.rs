//! # chronoq-core
//!
//! Deterministic virtual-time event scheduler.
//!
//! Callbacks are registered to run at (or after) a simulated instant and are
//! executed in time order as the caller drives a manual clock forward. The
//! same registrations and stepping calls always produce the same execution
//! order and the same final clock value.
//!
//! ### Key Submodules:
//! - `time`: `VirtualTime` instants and the shared `VirtualClock`
//! - `alloc`: generational slot pool holding queued records, with shared statistics
//! - `events`: event records, the time-ordered queue and cancel handles
//! - `scheduler`: registration and the stepping API

pub mod alloc;
pub mod error;
pub mod events;
pub mod scheduler;
pub mod time;

pub mod prelude {
    pub use crate::alloc::pool::{MemoryPool, SlotKey};
    pub use crate::alloc::stats::MemoryStats;
    pub use crate::error::*;
    pub use crate::events::{CancelHandle, EventBody, EventQueue, EventRecord};
    pub use crate::scheduler::{Scheduler, SchedulerStats};
    pub use crate::time::{VirtualClock, VirtualTime};
}

pub use error::SchedulerError;
pub use scheduler::Scheduler;
