//! ## chronoq-core::alloc::pool
//! **Chunked slot pool with generational keys**
//!
//! Values live in fixed-size chunks that are added as the pool grows and are
//! never moved or returned to the system allocator until the pool is dropped.
//! Freed slots are reused LIFO. Every slot carries a generation that is bumped
//! on removal, so a key that outlives its value never resolves to the slot's
//! next occupant.

use std::fmt;
use std::sync::Arc;

use chronoq_config::PoolConfig;
use tracing::warn;

use super::stats::MemoryStats;
use crate::error::SchedulerError;

/// Stable address of one value in a [`MemoryPool`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotKey {
    index: u32,
    generation: u32,
}

impl SlotKey {
    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }

    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

pub struct MemoryPool<T> {
    chunk_size: usize,
    chunks: Vec<Box<[Slot<T>]>>,
    free_indices: Vec<u32>,
    allocated_count: usize,
    capacity: Option<usize>,
    stats: Arc<MemoryStats>,
}

impl<T> MemoryPool<T> {
    /// Creates an empty pool. No slots are reserved until the first insert.
    ///
    /// # Panics
    /// If `chunk_size` is zero or `capacity` is `Some(0)`.
    pub fn new(chunk_size: usize, capacity: Option<usize>) -> Self {
        Self::with_stats(chunk_size, capacity, Arc::new(MemoryStats::new()))
    }

    /// Creates a pool reporting into an existing statistics ledger.
    pub fn with_stats(chunk_size: usize, capacity: Option<usize>, stats: Arc<MemoryStats>) -> Self {
        assert!(chunk_size > 0, "Chunk size must be greater than zero");
        assert!(capacity != Some(0), "Capacity must be greater than zero");

        Self {
            chunk_size,
            chunks: Vec::new(),
            free_indices: Vec::new(),
            allocated_count: 0,
            capacity,
            stats,
        }
    }

    pub fn from_config(config: &PoolConfig) -> Self {
        Self::new(config.chunk_size, config.capacity)
    }

    /// Moves `value` into a free slot.
    pub fn insert(&mut self, value: T) -> Result<SlotKey, SchedulerError> {
        if let Some(capacity) = self.capacity {
            if self.allocated_count >= capacity {
                return Err(self.exhausted(capacity));
            }
        }

        if self.free_indices.is_empty() && !self.grow() {
            return Err(self.exhausted(self.slots()));
        }
        let Some(index) = self.free_indices.pop() else {
            return Err(self.exhausted(self.slots()));
        };

        let slot = self.slot_mut(index);
        debug_assert!(slot.value.is_none());
        slot.value = Some(value);
        let generation = slot.generation;

        self.allocated_count += 1;
        self.stats.increment_allocations();
        Ok(SlotKey { index, generation })
    }

    /// Takes the value out of its slot. Stale keys return `None`.
    pub fn remove(&mut self, key: SlotKey) -> Option<T> {
        let slot = self.live_slot_mut(key)?;
        let value = slot.value.take();
        slot.generation = slot.generation.wrapping_add(1);

        self.free_indices.push(key.index);
        self.allocated_count -= 1;
        self.stats.increment_deallocations();
        value
    }

    pub fn get(&self, key: SlotKey) -> Option<&T> {
        let (chunk, offset) = self.locate(key.index)?;
        let slot = &self.chunks[chunk][offset];
        if slot.generation == key.generation {
            slot.value.as_ref()
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, key: SlotKey) -> Option<&mut T> {
        self.live_slot_mut(key)?.value.as_mut()
    }

    pub fn contains(&self, key: SlotKey) -> bool {
        self.get(key).is_some()
    }

    /// Drops every live value. Returns how many were dropped.
    pub fn drain(&mut self) -> usize {
        let mut dropped = 0;
        for (chunk_index, chunk) in self.chunks.iter_mut().enumerate() {
            for (offset, slot) in chunk.iter_mut().enumerate() {
                if slot.value.take().is_some() {
                    slot.generation = slot.generation.wrapping_add(1);
                    self.free_indices
                        .push((chunk_index * self.chunk_size + offset) as u32);
                    self.stats.increment_deallocations();
                    dropped += 1;
                }
            }
        }
        self.allocated_count = 0;
        dropped
    }

    /// Number of live values.
    pub fn len(&self) -> usize {
        self.allocated_count
    }

    pub fn is_empty(&self) -> bool {
        self.allocated_count == 0
    }

    /// Hard limit on live values, if any.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Slots reserved so far, live or free.
    pub fn slots(&self) -> usize {
        self.chunks.len() * self.chunk_size
    }

    pub fn stats(&self) -> &Arc<MemoryStats> {
        &self.stats
    }

    fn exhausted(&self, capacity: usize) -> SchedulerError {
        self.stats.increment_exhausted();
        warn!(capacity, "Memory pool exhausted");
        SchedulerError::PoolExhausted { capacity }
    }

    /// Appends one chunk. Fails once slot indices would overflow `u32`.
    fn grow(&mut self) -> bool {
        let start = self.slots();
        let end = start + self.chunk_size;
        if end > u32::MAX as usize {
            return false;
        }

        let chunk: Box<[Slot<T>]> = (0..self.chunk_size)
            .map(|_| Slot {
                generation: 0,
                value: None,
            })
            .collect();
        self.chunks.push(chunk);
        // Reversed so the lowest index is handed out first.
        self.free_indices.extend((start as u32..end as u32).rev());
        true
    }

    #[inline]
    fn locate(&self, index: u32) -> Option<(usize, usize)> {
        let index = index as usize;
        let chunk = index / self.chunk_size;
        (chunk < self.chunks.len()).then_some((chunk, index % self.chunk_size))
    }

    #[inline]
    fn slot_mut(&mut self, index: u32) -> &mut Slot<T> {
        let index = index as usize;
        &mut self.chunks[index / self.chunk_size][index % self.chunk_size]
    }

    fn live_slot_mut(&mut self, key: SlotKey) -> Option<&mut Slot<T>> {
        let (chunk, offset) = self.locate(key.index)?;
        let slot = &mut self.chunks[chunk][offset];
        (slot.generation == key.generation && slot.value.is_some()).then_some(slot)
    }
}

impl<T> Drop for MemoryPool<T> {
    fn drop(&mut self) {
        for _ in 0..self.allocated_count {
            self.stats.increment_deallocations();
        }
    }
}

impl<T> fmt::Debug for MemoryPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryPool")
            .field("chunk_size", &self.chunk_size)
            .field("slots", &self.slots())
            .field("allocated_count", &self.allocated_count)
            .field("capacity", &self.capacity)
            .finish()
    }
}
