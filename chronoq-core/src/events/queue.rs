//! Time-ordered multiset of event records.
//!
//! Records are stored by value in a [`MemoryPool`] and indexed by
//! `(due, seq)` in a `BTreeMap`, where `seq` is the registration counter.
//! Records with equal due times therefore come out in registration order.
//! Insertion, erase and minimum lookup are O(log n).

use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Unbounded};

use tracing::debug;

use super::record::{EventBody, EventRecord};
use crate::alloc::pool::{MemoryPool, SlotKey};
use crate::error::SchedulerError;
use crate::time::VirtualTime;

pub struct EventQueue {
    pool: MemoryPool<EventRecord>,
    by_when: BTreeMap<(VirtualTime, u64), SlotKey>,
    next_seq: u64,
}

impl EventQueue {
    pub fn new(pool: MemoryPool<EventRecord>) -> Self {
        Self {
            pool,
            by_when: BTreeMap::new(),
            next_seq: 0,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.by_when.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.by_when.len()
    }

    /// Earliest record, firing or not.
    pub fn peek_min(&self) -> Option<(SlotKey, VirtualTime)> {
        self.by_when.iter().next().map(|(&(due, _), &key)| (key, due))
    }

    /// Earliest record whose body has not been taken yet.
    pub fn next_ready(&self) -> Option<(SlotKey, VirtualTime)> {
        self.iter()
            .find(|&(key, _)| self.pool.get(key).is_some_and(|r| !r.is_firing()))
    }

    /// Stores a new record and returns its key.
    pub fn insert(
        &mut self,
        due: VirtualTime,
        body: Box<dyn EventBody>,
    ) -> Result<SlotKey, SchedulerError> {
        let seq = self.next_seq;
        let key = self.pool.insert(EventRecord::new(due, seq, body))?;
        self.next_seq += 1;
        self.by_when.insert((due, seq), key);
        Ok(key)
    }

    /// Removes and drops the record, returning the key of the record that
    /// followed it in time order.
    pub fn erase(&mut self, key: SlotKey) -> Result<Option<SlotKey>, SchedulerError> {
        let record = self.pool.remove(key).ok_or(SchedulerError::NotFound(key))?;
        let position = (record.due(), record.seq());
        self.by_when.remove(&position);
        drop(record);

        Ok(self
            .by_when
            .range((Excluded(position), Unbounded))
            .next()
            .map(|(_, &next)| next))
    }

    /// Forward traversal in `(due, registration)` order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotKey, VirtualTime)> + '_ {
        self.by_when.iter().map(|(&(due, _), &key)| (key, due))
    }

    /// Records due at or before `limit`, in firing order.
    pub fn range_until(
        &self,
        limit: VirtualTime,
    ) -> impl Iterator<Item = (SlotKey, VirtualTime)> + '_ {
        self.by_when
            .range(..=(limit, u64::MAX))
            .map(|(&(due, _), &key)| (key, due))
    }

    pub fn get(&self, key: SlotKey) -> Option<&EventRecord> {
        self.pool.get(key)
    }

    pub fn contains(&self, key: SlotKey) -> bool {
        self.pool.contains(key)
    }

    pub fn due_of(&self, key: SlotKey) -> Option<VirtualTime> {
        self.pool.get(key).map(EventRecord::due)
    }

    /// Takes the body out of a record, marking it as firing. The record
    /// stays queued until erased.
    pub(crate) fn take_body(&mut self, key: SlotKey) -> Option<Box<dyn EventBody>> {
        self.pool.get_mut(key)?.take_body()
    }

    /// Drops every record that is not firing. Returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let pool = &mut self.pool;
        let before = self.by_when.len();
        self.by_when.retain(|_, key| match pool.get(*key) {
            Some(record) if record.is_firing() => true,
            _ => {
                pool.remove(*key);
                false
            }
        });
        before - self.by_when.len()
    }

    /// The pool that stores this queue's records.
    pub fn pool(&self) -> &MemoryPool<EventRecord> {
        &self.pool
    }
}

impl Drop for EventQueue {
    fn drop(&mut self) {
        if !self.by_when.is_empty() {
            debug!(
                pending = self.by_when.len(),
                "Dropping event queue with pending records"
            );
        }
    }
}
