//! ## chronoq-core::alloc
//! **Slot pools for queued records**
//!
//! ### Key Submodules:
//! - `pool/`: chunked slot table addressed by generational keys
//! - `stats/`: allocation counters, shareable across pools
pub mod pool;
pub mod stats;
