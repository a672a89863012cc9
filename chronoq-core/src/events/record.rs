//! Event records and the type-erased callback they carry.

use std::fmt;

use crate::scheduler::Scheduler;
use crate::time::VirtualTime;

/// Work to run when a record becomes due.
///
/// Implemented for every `FnOnce(&mut Scheduler) + 'static`, so closures are
/// registered directly. The scheduler is handed to the body so it can
/// register or cancel further events while it runs.
pub trait EventBody {
    fn fire(self: Box<Self>, scheduler: &mut Scheduler);
}

impl<F> EventBody for F
where
    F: FnOnce(&mut Scheduler) + 'static,
{
    #[inline]
    fn fire(self: Box<Self>, scheduler: &mut Scheduler) {
        (*self)(scheduler)
    }
}

/// One scheduled callback, owned by the queue until it fires or is canceled.
pub struct EventRecord {
    due: VirtualTime,
    seq: u64,
    body: Option<Box<dyn EventBody>>,
}

impl EventRecord {
    pub(crate) fn new(due: VirtualTime, seq: u64, body: Box<dyn EventBody>) -> Self {
        Self {
            due,
            seq,
            body: Some(body),
        }
    }

    #[inline]
    pub fn due(&self) -> VirtualTime {
        self.due
    }

    /// Registration order within the owning queue.
    #[inline]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// True between the moment the body is taken and the record's removal.
    #[inline]
    pub fn is_firing(&self) -> bool {
        self.body.is_none()
    }

    pub(crate) fn take_body(&mut self) -> Option<Box<dyn EventBody>> {
        self.body.take()
    }
}

impl fmt::Debug for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRecord")
            .field("due", &self.due)
            .field("seq", &self.seq)
            .field("firing", &self.is_firing())
            .finish()
    }
}
