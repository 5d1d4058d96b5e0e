//! The open-file table (spec.md §4.E): a fixed array of entries, each
//! mapping one live `FileHandle` to an inumber and a byte offset.
//!
//! Grounded on `original_source/tecnicofs-v2/fs/state.c`'s
//! `open_file_entry_t`, `add_to_open_file_table`, `remove_from_open_file_table`,
//! and `get_open_file_entry` — the original guards the whole table with
//! one mutex for allocation and a per-entry mutex for the offset; we keep
//! that split, using `Bitmap` for the former and `std::sync::Mutex` for
//! the latter.

use std::sync::Mutex;

use crate::bitmap::Bitmap;
use crate::config::MAX_OPEN_FILES;
use crate::error::FsError;
use crate::types::{FileHandle, Inumber};

/// The mutable state of one open file: which inode it refers to, and the
/// current read/write cursor (spec.md §4.E).
#[derive(Debug, Clone, Copy)]
pub struct OpenFileEntry {
    pub inumber: Inumber,
    pub offset: usize,
}

/// The fixed array of open-file entries, plus the handle allocator.
pub struct OpenFileTable {
    bitmap: Bitmap<MAX_OPEN_FILES>,
    entries: Box<[Mutex<OpenFileEntry>]>,
}

impl OpenFileTable {
    pub fn new() -> Self {
        let entries = (0..MAX_OPEN_FILES)
            .map(|_| {
                Mutex::new(OpenFileEntry {
                    inumber: Inumber(0),
                    offset: 0,
                })
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            bitmap: Bitmap::new(),
            entries,
        }
    }

    /// Allocates a handle for a freshly opened `inumber`, starting at
    /// `offset` (spec.md §4.G: 0 for a plain open, end-of-file for
    /// `O_APPEND`).
    pub fn add(&self, inumber: Inumber, offset: usize) -> Result<FileHandle, FsError> {
        let idx = self
            .bitmap
            .alloc()
            .ok_or(FsError::Exhausted("open file table full"))?;
        let mut guard = self.entries[idx].lock().expect("open-file mutex poisoned");
        *guard = OpenFileEntry { inumber, offset };
        Ok(FileHandle(idx as u32))
    }

    /// Closes `handle`, freeing its slot. Fails if the handle is already
    /// closed or out of range (spec.md §9, Open Question 5).
    pub fn remove(&self, handle: FileHandle) -> Result<(), FsError> {
        let idx = handle.as_usize();
        if idx >= self.entries.len() || !self.bitmap.free_checked(idx) {
            return Err(FsError::bad_handle(handle));
        }
        Ok(())
    }

    /// Returns the mutex-guarded entry for a live `handle`. Bounds- and
    /// liveness-checked; the caller still must hold the lock for the
    /// duration of any read/write against the entry's offset.
    pub fn get(&self, handle: FileHandle) -> Result<&Mutex<OpenFileEntry>, FsError> {
        let idx = handle.as_usize();
        if idx >= self.entries.len() || !self.bitmap.is_taken(idx) {
            return Err(FsError::bad_handle(handle));
        }
        Ok(&self.entries[idx])
    }
}

impl Default for OpenFileTable {
    fn default() -> Self {
        Self::new()
    }
}
