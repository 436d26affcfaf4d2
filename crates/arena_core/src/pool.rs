//! Fixed-capacity projectile pool.
//!
//! Slots are reused through generation-checked handles, so a stale handle
//! to a recycled projectile never aliases the projectile that took its
//! slot. Active handles are kept in acquisition order; that order is both
//! the deterministic update order and the eviction order under pressure.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Handle to a pooled item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PoolHandle {
    index: usize,
    generation: u32,
}

impl PoolHandle {
    /// Slot index of this handle.
    #[must_use]
    pub const fn index(self) -> usize {
        self.index
    }

    /// Generation of the slot when the handle was issued.
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Slot<T> {
    generation: u32,
    item: Option<T>,
}

/// Object pool with get-or-create and evict-oldest semantics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pool<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    active: VecDeque<PoolHandle>,
    capacity: usize,
}

impl<T> Pool<T> {
    /// Create a pool holding at most `capacity` live items.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            active: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Maximum number of live items.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of live items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Whether the pool has no live items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Store `item`, reusing a free slot or creating one.
    ///
    /// Returns the item back when the pool is at capacity.
    pub fn acquire(&mut self, item: T) -> std::result::Result<PoolHandle, T> {
        if self.active.len() >= self.capacity {
            return Err(item);
        }
        Ok(self.insert(item))
    }

    fn insert(&mut self, item: T) -> PoolHandle {
        let handle = if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.item = Some(item);
            PoolHandle {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len();
            self.slots.push(Slot {
                generation: 0,
                item: Some(item),
            });
            PoolHandle {
                index,
                generation: 0,
            }
        };

        self.active.push_back(handle);
        handle
    }

    /// Store `item`, evicting the oldest live item if the pool is full.
    ///
    /// Returns the new handle and the evicted item, if any.
    pub fn force_acquire(&mut self, item: T) -> (PoolHandle, Option<(PoolHandle, T)>) {
        let mut evicted = None;
        if self.active.len() >= self.capacity {
            if let Some(oldest) = self.active.front().copied() {
                evicted = self.recycle(oldest).map(|old| (oldest, old));
            }
        }

        let handle = self.insert(item);
        (handle, evicted)
    }

    /// Release a live item, returning it. Stale handles return `None`.
    pub fn recycle(&mut self, handle: PoolHandle) -> Option<T> {
        let slot = self.slots.get_mut(handle.index)?;
        if slot.generation != handle.generation {
            return None;
        }
        let item = slot.item.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.active.retain(|h| *h != handle);
        Some(item)
    }

    /// Borrow a live item.
    #[must_use]
    pub fn get(&self, handle: PoolHandle) -> Option<&T> {
        let slot = self.slots.get(handle.index)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.item.as_ref()
    }

    /// Mutably borrow a live item.
    pub fn get_mut(&mut self, handle: PoolHandle) -> Option<&mut T> {
        let slot = self.slots.get_mut(handle.index)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.item.as_mut()
    }

    /// Live handles, oldest first.
    #[must_use]
    pub fn handles(&self) -> Vec<PoolHandle> {
        self.active.iter().copied().collect()
    }

    /// Iterate over live items, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = (PoolHandle, &T)> {
        self.active
            .iter()
            .filter_map(move |handle| self.get(*handle).map(|item| (*handle, item)))
    }
}
