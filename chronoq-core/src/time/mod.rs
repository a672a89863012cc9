//! ## chronoq-core::time
//! **Virtual instants and the manual clock**
//!
//! Time is counted in nanoseconds from an arbitrary epoch and only moves when
//! the scheduler (or a caller holding the clock) moves it.

use std::fmt;
use std::ops::Add;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::SchedulerError;

/// An instant on the virtual timeline, in nanoseconds since the epoch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VirtualTime(u64);

impl VirtualTime {
    pub const ZERO: VirtualTime = VirtualTime(0);
    pub const MAX: VirtualTime = VirtualTime(u64::MAX);

    #[inline]
    pub const fn from_nanos(ns: u64) -> Self {
        VirtualTime(ns)
    }

    #[inline]
    pub const fn from_millis(ms: u64) -> Self {
        VirtualTime(ms.saturating_mul(1_000_000))
    }

    #[inline]
    pub const fn from_secs(secs: u64) -> Self {
        VirtualTime(secs.saturating_mul(1_000_000_000))
    }

    #[inline]
    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    /// Returns `None` when the sum does not fit in the timeline.
    pub fn checked_add(self, delay: Duration) -> Option<VirtualTime> {
        let delay = u64::try_from(delay.as_nanos()).ok()?;
        self.0.checked_add(delay).map(VirtualTime)
    }

    /// Time elapsed from `earlier` to `self`, zero if `earlier` is later.
    pub fn duration_since(self, earlier: VirtualTime) -> Duration {
        Duration::from_nanos(self.0.saturating_sub(earlier.0))
    }
}

/// Saturates at [`VirtualTime::MAX`].
impl Add<Duration> for VirtualTime {
    type Output = VirtualTime;

    fn add(self, delay: Duration) -> VirtualTime {
        self.checked_add(delay).unwrap_or(VirtualTime::MAX)
    }
}

impl fmt::Display for VirtualTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ns", self.0)
    }
}

/// A manually driven clock. Clones share the same counter, so collaborators
/// can hold a clone and read the current instant.
#[derive(Clone, Debug)]
pub struct VirtualClock {
    offset: Arc<AtomicU64>,
}

impl VirtualClock {
    /// Creates a clock reading `epoch`.
    pub fn new(epoch: VirtualTime) -> Self {
        Self {
            offset: Arc::new(AtomicU64::new(epoch.as_nanos())),
        }
    }

    #[inline]
    pub fn now(&self) -> VirtualTime {
        VirtualTime(self.offset.load(Ordering::Acquire))
    }

    /// Forces the clock to `t`. Moving backwards is rejected.
    pub fn set(&self, t: VirtualTime) -> Result<(), SchedulerError> {
        self.offset
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (t.0 >= current).then_some(t.0)
            })
            .map(|_| ())
            .map_err(|current| SchedulerError::ClockRegression {
                now: VirtualTime(current),
                requested: t,
            })
    }

    /// Moves the clock to `t` if that is later than now. Returns the new reading.
    #[inline]
    pub fn advance_to(&self, t: VirtualTime) -> VirtualTime {
        let previous = self.offset.fetch_max(t.0, Ordering::AcqRel);
        VirtualTime(previous.max(t.0))
    }

    /// Advances the clock by `delay`, saturating at the end of the timeline.
    #[inline]
    pub fn advance(&self, delay: Duration) -> VirtualTime {
        self.advance_to(self.now() + delay)
    }
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new(VirtualTime::ZERO)
    }
}
