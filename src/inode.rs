//! The inode table (spec.md §4.C): a fixed array of inodes, each guarded
//! by its own reader/writer lock, plus the inode-number allocator.
//!
//! Grounded on `original_source/tecnicofs-v2/fs/state.c`'s `inode_create`/
//! `inode_delete`/`inode_get`, and on the direct+indirect block layout of
//! `kernel-rs`'s `fs/ufs/inode.rs`
//! (`NDIRECT`/`NINDIRECT`/`addr_direct`/`addr_indirect`) — reshaped from
//! an on-disk `Dinode` to an in-memory `InodeData` guarded by
//! `std::sync::RwLock` rather than a sleep lock, since this crate runs on
//! hosted OS threads rather than bare metal (spec.md §9, "Per-inode
//! reader/writer lock").

use std::sync::RwLock;

use array_macro::array;
use log::{debug, trace};

use crate::bitmap::{Bitmap, BlockBitmap};
use crate::block::BlockStore;
use crate::config::{BLOCK_SIZE, DIRECT_BLOCKS, INDIRECT_BLOCKS, INODE_TABLE_SIZE};
use crate::dir;
use crate::error::FsError;
use crate::types::{BlockIndex, Inumber};

/// The kind of an inode. The store is flat, so `Directory` only ever
/// describes the root (spec.md §1: "Only one directory exists").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InodeKind {
    File,
    Directory,
}

/// The in-memory state of one inode slot, guarded by that slot's
/// `RwLock`. Invariant (spec.md §3): if `size == 0`, every direct entry
/// and the indirect pointer are `None`.
#[derive(Debug, Clone)]
pub struct InodeData {
    pub kind: InodeKind,
    pub size: usize,
    pub direct: [Option<BlockIndex>; DIRECT_BLOCKS],
    pub indirect: Option<BlockIndex>,
}

impl InodeData {
    fn empty_file() -> Self {
        Self {
            kind: InodeKind::File,
            size: 0,
            direct: [None; DIRECT_BLOCKS],
            indirect: None,
        }
    }

    /// Logical capacity of a file, in bytes: `DIRECT_BLOCKS * BLOCK_SIZE +
    /// INDIRECT_BLOCKS * BLOCK_SIZE` (spec.md §4.G, "Growth policy").
    pub fn capacity_bytes() -> usize {
        (DIRECT_BLOCKS + INDIRECT_BLOCKS) * BLOCK_SIZE
    }

    /// Frees every block this inode references (direct, indirect entries,
    /// and the indirect block itself) and resets all pointers to `None`
    /// and size to 0. Used by both truncation and deletion (spec.md §9,
    /// Open Question 3: truncation must free the whole indirect tree).
    pub fn free_all_blocks(&mut self, blocks: &BlockStore, block_bitmap: &BlockBitmap) {
        for slot in &mut self.direct {
            if let Some(b) = slot.take() {
                block_bitmap.free(b.as_usize());
            }
        }
        if let Some(indirect) = self.indirect.take() {
            // SAFETY: caller holds this inode's write lock, so no other
            // operation can be reading or writing through `indirect`.
            if let Some(block) = unsafe { blocks.block(indirect) } {
                for entry in indirect_entries(block) {
                    if let Some(b) = entry {
                        block_bitmap.free(b.as_usize());
                    }
                }
            }
            block_bitmap.free(indirect.as_usize());
        }
        self.size = 0;
    }
}

/// Reads an indirect block's `INDIRECT_BLOCKS` signed slots as an array of
/// `Option<BlockIndex>`, `-1` meaning unallocated (spec.md §4.A: "indirect
/// blocks are reinterpreted as arrays of signed indices").
pub fn indirect_entries(block: &crate::block::Block) -> [Option<BlockIndex>; INDIRECT_BLOCKS] {
    let mut out = [None; INDIRECT_BLOCKS];
    for (j, slot) in out.iter_mut().enumerate() {
        let raw = read_i32(block, j);
        *slot = (raw >= 0).then(|| BlockIndex(raw as u32));
    }
    out
}

/// Reads entry `j` of an indirect block.
pub fn indirect_entry(block: &crate::block::Block, j: usize) -> Option<BlockIndex> {
    let raw = read_i32(block, j);
    (raw >= 0).then(|| BlockIndex(raw as u32))
}

/// Writes entry `j` of an indirect block; `None` is stored as `-1`.
pub fn set_indirect_entry(block: &mut crate::block::Block, j: usize, value: Option<BlockIndex>) {
    let raw = value.map_or(-1, |b| b.0 as i32);
    write_i32(block, j, raw);
}

/// Fills every entry of a freshly allocated indirect block with `-1`.
pub fn init_indirect_block(block: &mut crate::block::Block) {
    for j in 0..INDIRECT_BLOCKS {
        set_indirect_entry(block, j, None);
    }
}

fn read_i32(block: &crate::block::Block, j: usize) -> i32 {
    let off = j * 4;
    i32::from_le_bytes(block[off..off + 4].try_into().unwrap())
}

fn write_i32(block: &mut crate::block::Block, j: usize, value: i32) {
    let off = j * 4;
    block[off..off + 4].copy_from_slice(&value.to_le_bytes());
}

/// The fixed array of inodes, one reader/writer lock per slot, plus the
/// allocation bitmap that tracks which slots are live.
pub struct InodeTable {
    bitmap: Bitmap<INODE_TABLE_SIZE>,
    slots: Box<[RwLock<InodeData>]>,
}

impl InodeTable {
    pub fn new() -> Self {
        let slots = array![RwLock::new(InodeData::empty_file()); INODE_TABLE_SIZE];
        Self {
            bitmap: Bitmap::new(),
            slots: Box::new(slots),
        }
    }

    /// Allocates a new inode slot and initializes it for `kind`. For a
    /// directory, also allocates and zeroes its single data block
    /// (spec.md §4.C).
    pub fn create(
        &self,
        kind: InodeKind,
        blocks: &BlockStore,
        block_bitmap: &BlockBitmap,
    ) -> Result<Inumber, FsError> {
        let idx = self
            .bitmap
            .alloc()
            .ok_or(FsError::Exhausted("inode table full"))?;
        let inumber = Inumber(idx as u32);
        let mut guard = self.slots[idx].write().expect("inode lock poisoned");

        match kind {
            InodeKind::File => {
                *guard = InodeData::empty_file();
            }
            InodeKind::Directory => {
                let Some(b) = block_bitmap.alloc() else {
                    drop(guard);
                    self.bitmap.free(idx);
                    return Err(FsError::Exhausted("block store full"));
                };
                let block_index = BlockIndex::from_usize(b);
                let mut data = InodeData::empty_file();
                data.kind = InodeKind::Directory;
                data.size = BLOCK_SIZE;
                data.direct[0] = Some(block_index);
                *guard = data;
                // SAFETY: this block was just allocated and is reachable
                // from no other inode yet; we hold the new inode's write
                // lock for the duration.
                let block = unsafe { blocks.block_mut(block_index) }
                    .expect("freshly allocated block index is in range");
                dir::init_empty_directory_block(block);
            }
        }

        trace!("inode_create: inumber={inumber} kind={kind:?}");
        Ok(inumber)
    }

    /// Frees inode `inumber`: marks it free in the bitmap first, then
    /// takes its write lock and releases every block it referenced.
    /// Two-phase by design (spec.md §5, §9): any thread already holding a
    /// reference to this inumber blocks on the write lock until teardown
    /// completes, rather than racing the bitmap.
    pub fn delete(
        &self,
        inumber: Inumber,
        blocks: &BlockStore,
        block_bitmap: &BlockBitmap,
    ) -> Result<(), FsError> {
        let idx = self.bounds_check(inumber)?;
        if !self.bitmap.free_checked(idx) {
            return Err(FsError::bad_inumber(inumber));
        }

        let mut guard = self.slots[idx].write().expect("inode lock poisoned");
        guard.free_all_blocks(blocks, block_bitmap);
        *guard = InodeData::empty_file();
        debug!("inode_delete: inumber={inumber}");
        Ok(())
    }

    /// Returns the slot for `inumber`, bounds-checked only — the caller
    /// is responsible for acquiring the appropriate lock mode before
    /// reading or mutating its fields (spec.md §4.C).
    pub fn get(&self, inumber: Inumber) -> Result<&RwLock<InodeData>, FsError> {
        let idx = self.bounds_check(inumber)?;
        Ok(&self.slots[idx])
    }

    fn bounds_check(&self, inumber: Inumber) -> Result<usize, FsError> {
        let idx = inumber.as_usize();
        if idx >= self.slots.len() {
            return Err(FsError::bad_inumber(inumber));
        }
        Ok(idx)
    }
}

impl Default for InodeTable {
    fn default() -> Self {
        Self::new()
    }
}
