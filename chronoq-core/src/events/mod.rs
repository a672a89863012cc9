//! ## chronoq-core::events
//! **Scheduled records, their time-ordered queue and cancel handles**

mod handle;
mod queue;
mod record;

pub use handle::CancelHandle;
pub use queue::EventQueue;
pub use record::{EventBody, EventRecord};
