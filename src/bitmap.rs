//! Fixed-capacity, mutex-guarded first-fit allocators. One `Bitmap<N>`
//! backs the inode table, the data block store, and the open-file table,
//! matching the three independent `pthread_mutex_t`-guarded tables of
//! `original_source/tecnicofs-v2/fs/state.c` (`freeinode_ts`,
//! `free_blocks`, `free_open_file_entries`).
//!
//! Coarse locking is intentional here (spec.md §9): the scan-and-mark is
//! short, so we hold the single mutex for its whole duration rather than
//! trying to lock per-bit.

use std::sync::Mutex;

/// The block store's free-block allocator. `N` is the compile-time
/// ceiling (`DATA_BLOCKS`); the usable prefix is capped at construction
/// time to the runtime `FsConfig::data_blocks`, so the allocator never
/// hands out an index the (possibly smaller) `BlockStore` doesn't
/// contain.
pub type BlockBitmap = Bitmap<{ crate::config::DATA_BLOCKS }>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Free,
    Taken,
}

/// A first-fit allocator over up to `N` fixed slots, of which only the
/// first `limit` are ever handed out.
pub struct Bitmap<const N: usize> {
    limit: usize,
    slots: Mutex<[Slot; N]>,
}

impl<const N: usize> Bitmap<N> {
    /// Makes every one of the `N` compile-time slots usable.
    pub fn new() -> Self {
        Self::with_limit(N)
    }

    /// Restricts allocation to the first `limit` slots (clamped to `N`),
    /// leaving the rest permanently out of range. Used when a table's
    /// true capacity is a runtime value smaller than its compile-time
    /// ceiling (spec.md §9, Open Question: block bitmap vs. block store
    /// sizing).
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: limit.min(N),
            slots: Mutex::new([Slot::Free; N]),
        }
    }

    /// Scans for the lowest free slot within the usable range, marks it
    /// taken, and returns its index. Returns `None` when every slot in
    /// range is taken.
    pub fn alloc(&self) -> Option<usize> {
        let mut slots = self.slots.lock().expect("bitmap mutex poisoned");
        let index = slots[..self.limit].iter().position(|s| *s == Slot::Free)?;
        slots[index] = Slot::Taken;
        Some(index)
    }

    /// Marks `index` free. Freeing an already-free (or out-of-range) slot
    /// is a silent no-op, mirroring `data_block_free` in the original — a
    /// case worth flagging at call sites, not at this layer (spec.md §4.B).
    pub fn free(&self, index: usize) {
        let mut slots = self.slots.lock().expect("bitmap mutex poisoned");
        if index < self.limit {
            if let Some(slot) = slots.get_mut(index) {
                *slot = Slot::Free;
            }
        }
    }

    /// Like [`Bitmap::free`], but reports whether `index` was in range and
    /// previously taken. Used where the caller must distinguish "already
    /// free" from success (inode deletion, spec.md §4.C).
    pub fn free_checked(&self, index: usize) -> bool {
        if index >= self.limit {
            return false;
        }
        let mut slots = self.slots.lock().expect("bitmap mutex poisoned");
        match slots.get_mut(index) {
            Some(slot @ Slot::Taken) => {
                *slot = Slot::Free;
                true
            }
            _ => false,
        }
    }

    /// Whether `index` is currently taken. Out-of-range indices are never
    /// taken.
    pub fn is_taken(&self, index: usize) -> bool {
        if index >= self.limit {
            return false;
        }
        let slots = self.slots.lock().expect("bitmap mutex poisoned");
        slots.get(index).copied() == Some(Slot::Taken)
    }
}

impl<const N: usize> Default for Bitmap<N> {
    fn default() -> Self {
        Self::new()
    }
}
