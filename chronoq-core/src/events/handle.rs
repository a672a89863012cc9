use crate::alloc::pool::SlotKey;

/// Identifies one queued record for cancellation.
///
/// Copies refer to the same record. A handle never owns its record: once the
/// record fires or is canceled the handle goes stale and every lookup through
/// it reports the record as gone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CancelHandle {
    key: SlotKey,
}

impl CancelHandle {
    pub(crate) fn new(key: SlotKey) -> Self {
        Self { key }
    }

    #[inline]
    pub fn key(&self) -> SlotKey {
        self.key
    }
}
