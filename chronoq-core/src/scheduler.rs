//! ## chronoq-core::scheduler
//! **Registration and stepping**
//!
//! The scheduler owns the clock and the event queue. Callers register bodies
//! with [`Scheduler::at`] / [`Scheduler::after`] and then drive virtual time
//! with one of the stepping methods, each of which repeatedly fires the
//! earliest ready record:
//!
//! 1. the clock moves to the record's due time (never backwards),
//! 2. the body runs while the record is still queued and reported by
//!    [`Scheduler::current`],
//! 3. the record is erased, even if the body panicked.
//!
//! Records with equal due times fire in registration order.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chronoq_config::{ChronoqConfig, SchedulerConfig};
use chronoq_telemetry::{SchedulerLogger, SchedulerMetrics};
use tracing::{debug, instrument, trace, warn};

use crate::alloc::pool::{MemoryPool, SlotKey};
use crate::alloc::stats::MemoryStats;
use crate::error::SchedulerError;
use crate::events::{CancelHandle, EventQueue, EventRecord};
use crate::time::{VirtualClock, VirtualTime};

/// Running totals since construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub scheduled: u64,
    pub fired: u64,
    pub canceled: u64,
}

pub struct Scheduler {
    clock: VirtualClock,
    queue: EventQueue,
    firing: Option<SlotKey>,
    stats: SchedulerStats,
    metrics: Option<SchedulerMetrics>,
}

impl Scheduler {
    /// Clock at [`VirtualTime::ZERO`], unbounded record pool.
    pub fn new() -> Self {
        Self::from_config(&SchedulerConfig::default())
    }

    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self::with_pool(
            VirtualTime::from_nanos(config.epoch_ns),
            MemoryPool::from_config(&config.pool),
        )
    }

    /// Builds the scheduler and, when enabled, its metrics recorder.
    pub fn from_chronoq_config(config: &ChronoqConfig) -> Result<Self, SchedulerError> {
        let scheduler = Self::from_config(&config.scheduler);
        if config.telemetry.metrics_enabled {
            Ok(scheduler.with_metrics(SchedulerMetrics::new()?))
        } else {
            Ok(scheduler)
        }
    }

    /// Uses a caller-built pool, e.g. one sharing [`MemoryStats`] with other pools.
    pub fn with_pool(epoch: VirtualTime, pool: MemoryPool<EventRecord>) -> Self {
        Self {
            clock: VirtualClock::new(epoch),
            queue: EventQueue::new(pool),
            firing: None,
            stats: SchedulerStats::default(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: SchedulerMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// The pool storing queued records.
    pub fn alloc(&self) -> &MemoryPool<EventRecord> {
        self.queue.pool()
    }

    /// Allocation ledger of the record pool, for pools that want to share it.
    pub fn memory_stats(&self) -> Arc<MemoryStats> {
        Arc::clone(self.queue.pool().stats())
    }

    pub fn clock(&self) -> &VirtualClock {
        &self.clock
    }

    #[inline]
    pub fn now(&self) -> VirtualTime {
        self.clock.now()
    }

    pub fn metrics(&self) -> Option<&SchedulerMetrics> {
        self.metrics.as_ref()
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    /// Queued records, including any that are currently firing.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Due time of the next record a step would fire.
    pub fn next_due(&self) -> Option<VirtualTime> {
        self.queue.next_ready().map(|(_, due)| due)
    }

    /// The record whose body is running right now, if any.
    pub fn current(&self) -> Option<CancelHandle> {
        self.firing.map(CancelHandle::new)
    }

    /// Read access to the queue in firing order.
    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    /// True while the record is queued and has not started firing.
    pub fn is_pending(&self, handle: CancelHandle) -> bool {
        self.queue
            .get(handle.key())
            .is_some_and(|record| !record.is_firing())
    }

    /// Due time of a queued (or firing) record.
    pub fn due(&self, handle: CancelHandle) -> Option<VirtualTime> {
        self.queue.due_of(handle.key())
    }

    /// Registers `f` to fire at `when`. A `when` in the past fires on the
    /// next step without moving the clock backwards.
    ///
    /// # Panics
    /// If the record pool is exhausted. Use [`Scheduler::try_at`] to handle
    /// that case.
    pub fn at<F>(&mut self, when: VirtualTime, f: F) -> CancelHandle
    where
        F: FnOnce(&mut Scheduler) + 'static,
    {
        match self.try_at(when, f) {
            Ok(handle) => handle,
            Err(err) => panic!("cannot schedule event at {}: {}", when, err),
        }
    }

    /// Registers `f` to fire `delay` after now.
    ///
    /// # Panics
    /// If the record pool is exhausted.
    #[doc(alias = "in")]
    pub fn after<F>(&mut self, delay: Duration, f: F) -> CancelHandle
    where
        F: FnOnce(&mut Scheduler) + 'static,
    {
        let when = self.now() + delay;
        self.at(when, f)
    }

    pub fn try_at<F>(&mut self, when: VirtualTime, f: F) -> Result<CancelHandle, SchedulerError>
    where
        F: FnOnce(&mut Scheduler) + 'static,
    {
        let key = self.queue.insert(when, Box::new(f))?;
        self.stats.scheduled += 1;
        trace!(due_ns = when.as_nanos(), key = %key, "Scheduled event");
        if let Some(metrics) = &self.metrics {
            let lead = when.duration_since(self.clock.now());
            metrics.record_scheduled(lead.as_nanos() as u64, self.queue.len());
        }
        Ok(CancelHandle::new(key))
    }

    pub fn try_after<F>(&mut self, delay: Duration, f: F) -> Result<CancelHandle, SchedulerError>
    where
        F: FnOnce(&mut Scheduler) + 'static,
    {
        let when = self.now() + delay;
        self.try_at(when, f)
    }

    /// Removes a record before it fires. Its body is dropped, never run.
    pub fn cancel(&mut self, handle: CancelHandle) -> Result<(), SchedulerError> {
        let key = handle.key();
        match self.queue.get(key) {
            None => Err(SchedulerError::NotFound(key)),
            Some(record) if record.is_firing() => Err(SchedulerError::Firing(key)),
            Some(_) => {
                self.queue.erase(key)?;
                self.stats.canceled += 1;
                debug!(key = %key, "Canceled event");
                if let Some(metrics) = &self.metrics {
                    metrics.record_canceled(self.queue.len());
                }
                Ok(())
            }
        }
    }

    /// Drops every pending record without running it. Returns how many.
    pub fn clear(&mut self) -> usize {
        let dropped = self.queue.clear();
        self.stats.canceled += dropped as u64;
        if let Some(metrics) = &self.metrics {
            for _ in 0..dropped {
                metrics.record_canceled(self.queue.len());
            }
        }
        dropped
    }

    /// Fires the earliest ready record. Returns `false` if there was none.
    pub fn step_one(&mut self) -> bool {
        let Some((key, due)) = self.queue.next_ready() else {
            return false;
        };
        let Some(body) = self.queue.take_body(key) else {
            return false;
        };

        let now = self.clock.advance_to(due);
        trace!(due_ns = due.as_nanos(), now_ns = now.as_nanos(), key = %key, "Firing event");

        let previous = self.firing.replace(key);
        let guard = Firing {
            scheduler: self,
            key,
            previous,
        };
        body.fire(&mut *guard.scheduler);
        true
    }

    /// Fires records until none remain, including ones registered along
    /// the way. Returns `false` if nothing was ready on entry.
    pub fn step(&mut self) -> bool {
        let fired_before = self.stats.fired;
        if !self.step_one() {
            return false;
        }
        while self.step_one() {}
        self.log_drain("step", fired_before);
        true
    }

    /// Fires records while `pred` holds and records remain. `pred` is checked
    /// before every step. Returns `true` if anything fired.
    pub fn step_while<P>(&mut self, mut pred: P) -> bool
    where
        P: FnMut(&Scheduler) -> bool,
    {
        let fired_before = self.stats.fired;
        let mut ran = false;
        while pred(&*self) && self.step_one() {
            ran = true;
        }
        if ran {
            self.log_drain("step_while", fired_before);
        }
        ran
    }

    /// Fires every record due at or before `limit`, then leaves the clock at
    /// `limit`. Returns `true` if records remain queued.
    ///
    /// A `limit` earlier than now is rejected before anything fires.
    #[instrument(level = "debug", skip(self), fields(now_ns = self.now().as_nanos()))]
    pub fn step_until(&mut self, limit: VirtualTime) -> Result<bool, SchedulerError> {
        let now = self.now();
        if limit < now {
            warn!(now_ns = now.as_nanos(), limit_ns = limit.as_nanos(), "Refusing to step backwards");
            return Err(SchedulerError::ClockRegression {
                now,
                requested: limit,
            });
        }

        let fired_before = self.stats.fired;
        while self.next_due().is_some_and(|due| due <= limit) {
            self.step_one();
        }
        self.clock.advance_to(limit);
        self.log_drain("step_until", fired_before);
        Ok(self.next_due().is_some())
    }

    /// `step_until(now + amount)`.
    pub fn step_for(&mut self, amount: Duration) -> Result<bool, SchedulerError> {
        let limit = self.now() + amount;
        self.step_until(limit)
    }

    fn log_drain(&self, policy: &str, fired_before: u64) {
        SchedulerLogger::log_drain(
            policy,
            self.stats.fired - fired_before,
            self.queue.len(),
            self.now().as_nanos(),
        );
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("now", &self.now())
            .field("pending", &self.queue.len())
            .field("firing", &self.firing)
            .field("stats", &self.stats)
            .finish()
    }
}

/// Erases the firing record once its body returns or unwinds.
struct Firing<'a> {
    scheduler: &'a mut Scheduler,
    key: SlotKey,
    previous: Option<SlotKey>,
}

impl Drop for Firing<'_> {
    fn drop(&mut self) {
        let scheduler = &mut *self.scheduler;
        // Firing records are immune to cancel and clear, so this cannot miss.
        let erased = scheduler.queue.erase(self.key);
        debug_assert!(erased.is_ok(), "firing record left the queue early");
        scheduler.firing = self.previous;
        scheduler.stats.fired += 1;
        if let Some(metrics) = &scheduler.metrics {
            metrics.record_fired(scheduler.queue.len());
        }
    }
}
