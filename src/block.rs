//! The block store (spec.md §4.A): a contiguous byte arena addressed by
//! block index, with no locking or content semantics of its own —
//! `original_source/tecnicofs-v2/fs/state.c`'s `data_block_get` does
//! nothing but bounds-check and return a pointer, leaving synchronization
//! entirely to callers holding the owning inode's or bitmap's lock.
//!
//! Rust has no way to hand out a `&mut [u8; BLOCK_SIZE]` per block out of
//! one shared allocation without either per-block locks (which the
//! original doesn't have — locking lives one layer up, at the inode) or
//! `unsafe`. This follows the same precedent as `kernel-rs`'s `RcCell`
//! and `Buf::deref_inner_mut`: wrap the arena in `UnsafeCell`, pushing the
//! safety invariant up to callers.

use std::cell::UnsafeCell;

use crate::config::BLOCK_SIZE;
use crate::types::BlockIndex;

/// One fixed-size block of raw bytes.
pub type Block = [u8; BLOCK_SIZE];

/// A fixed-size-block byte arena, indexed by [`BlockIndex`].
pub struct BlockStore {
    blocks: Box<[UnsafeCell<Block>]>,
}

// SAFETY: `BlockStore` hands out block references only through `block`/
// `block_mut`, whose own safety contracts require the caller to already
// hold whatever lock (inode rwlock, or an allocator bitmap mutex during
// initialization) gives it exclusive or read-only access to that block
// index. No two `FileSystem` operations touch the same block index
// without agreeing through one of those locks first.
unsafe impl Sync for BlockStore {}

impl BlockStore {
    /// Creates a store of `block_count` zeroed blocks.
    pub fn new(block_count: usize) -> Self {
        let blocks = (0..block_count)
            .map(|_| UnsafeCell::new([0u8; BLOCK_SIZE]))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self { blocks }
    }

    /// Total number of blocks in the store.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Borrows block `index` for reading.
    ///
    /// # Safety
    ///
    /// The caller must hold a lock that prevents any concurrent mutable
    /// access to this block index for the lifetime of the returned
    /// reference (in practice: the owning inode's read or write lock, or
    /// an allocator bitmap mutex while initializing a freshly allocated
    /// block).
    pub unsafe fn block(&self, index: BlockIndex) -> Option<&Block> {
        self.blocks
            .get(index.as_usize())
            .map(|cell| unsafe { &*cell.get() })
    }

    /// Borrows block `index` for writing. Same safety contract as
    /// [`BlockStore::block`], but the caller must additionally hold
    /// exclusive access (no concurrent reader or writer of this index).
    ///
    /// # Safety
    ///
    /// See [`BlockStore::block`]; the caller's lock must be held
    /// exclusively (write mode), not shared.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn block_mut(&self, index: BlockIndex) -> Option<&mut Block> {
        self.blocks
            .get(index.as_usize())
            .map(|cell| unsafe { &mut *cell.get() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_index_yields_none() {
        let store = BlockStore::new(4);
        unsafe {
            assert!(store.block(BlockIndex::from_usize(4)).is_none());
            assert!(store.block_mut(BlockIndex::from_usize(100)).is_none());
        }
    }

    #[test]
    fn write_then_read_round_trips() {
        let store = BlockStore::new(2);
        unsafe {
            let b = store.block_mut(BlockIndex::from_usize(0)).unwrap();
            b[0] = 42;
            b[1] = 7;
        }
        unsafe {
            let b = store.block(BlockIndex::from_usize(0)).unwrap();
            assert_eq!(b[0], 42);
            assert_eq!(b[1], 7);
        }
    }
}
