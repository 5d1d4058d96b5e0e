//! The root directory (spec.md §4.D): a flat table of name/inumber pairs
//! packed into the directory inode's single data block, one block,
//! `MAX_DIR_ENTRIES` slots, no subdirectories.
//!
//! Grounded on `original_source/tecnicofs-v2/fs/state.c`'s `dir_entry_t`,
//! `add_dir_entry`, and `find_in_dir`, which scan a fixed-size array of
//! `{ char d_name[MAX_FILE_NAME]; int d_inumber; }` for the first free
//! (`d_inumber == -1`) or matching slot. Reinterpreted here as manual
//! little-endian byte packing over the block's raw bytes rather than a
//! `#[repr(C)]` struct cast, for the same reason as the indirect-block
//! helpers in `inode.rs`: no compiler available to verify an unsafe
//! reinterpret-cast crate's API.

use crate::block::Block;
use crate::config::{MAX_DIR_ENTRIES, MAX_FILE_NAME};
use crate::error::FsError;
use crate::types::Inumber;

const ENTRY_SIZE: usize = MAX_FILE_NAME + 4;

/// One slot of the root directory: a name and the inumber it names, or
/// `None` if the slot is free.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub inumber: Inumber,
}

fn entry_offset(slot: usize) -> usize {
    slot * ENTRY_SIZE
}

fn read_slot(block: &Block, slot: usize) -> Option<DirEntry> {
    let off = entry_offset(slot);
    let raw_inumber = i32::from_le_bytes(block[off + MAX_FILE_NAME..off + ENTRY_SIZE].try_into().unwrap());
    if raw_inumber < 0 {
        return None;
    }
    let name_bytes = &block[off..off + MAX_FILE_NAME];
    let len = name_bytes.iter().position(|&b| b == 0).unwrap_or(MAX_FILE_NAME);
    let name = String::from_utf8_lossy(&name_bytes[..len]).into_owned();
    Some(DirEntry {
        name,
        inumber: Inumber(raw_inumber as u32),
    })
}

fn write_slot(block: &mut Block, slot: usize, entry: Option<&DirEntry>) {
    let off = entry_offset(slot);
    let name_field = &mut block[off..off + MAX_FILE_NAME];
    name_field.fill(0);
    let inumber_field_off = off + MAX_FILE_NAME;

    match entry {
        Some(e) => {
            let bytes = e.name.as_bytes();
            let len = bytes.len().min(MAX_FILE_NAME);
            block[off..off + len].copy_from_slice(&bytes[..len]);
            block[inumber_field_off..inumber_field_off + 4].copy_from_slice(&(e.inumber.0 as i32).to_le_bytes());
        }
        None => {
            block[inumber_field_off..inumber_field_off + 4].copy_from_slice(&(-1i32).to_le_bytes());
        }
    }
}

/// Marks every slot of a freshly allocated directory block free.
pub fn init_empty_directory_block(block: &mut Block) {
    for slot in 0..MAX_DIR_ENTRIES {
        write_slot(block, slot, None);
    }
}

/// Validates a directory entry name: non-empty and within
/// `MAX_FILE_NAME` bytes. A further `/` is accepted as an ordinary name
/// character, not a path separator — the store is flat, so
/// `lookup("/a/b")` treats `a/b` as one name (spec.md §4.F: "any further
/// `/` in the name is treated as part of the file name").
pub fn valid_entry_name(name: &str) -> bool {
    !name.is_empty() && name.len() <= MAX_FILE_NAME
}

/// Inserts `name -> inumber` into the first free slot. Fails if the name
/// is already taken or the directory block is full (spec.md §4.D).
pub fn add_dir_entry(block: &mut Block, name: &str, inumber: Inumber) -> Result<(), FsError> {
    if !valid_entry_name(name) {
        return Err(FsError::invalid_path(name));
    }
    let mut free_slot = None;
    for slot in 0..MAX_DIR_ENTRIES {
        match read_slot(block, slot) {
            Some(existing) if existing.name == name => {
                return Err(FsError::Conflict("name already exists in directory"));
            }
            Some(_) => {}
            None if free_slot.is_none() => free_slot = Some(slot),
            None => {}
        }
    }
    let slot = free_slot.ok_or(FsError::Exhausted("directory is full"))?;
    write_slot(
        block,
        slot,
        Some(&DirEntry {
            name: name.to_string(),
            inumber,
        }),
    );
    Ok(())
}

/// Removes the entry named `name`, if any. Returns whether it was present.
pub fn remove_dir_entry(block: &mut Block, name: &str) -> bool {
    for slot in 0..MAX_DIR_ENTRIES {
        if let Some(existing) = read_slot(block, slot) {
            if existing.name == name {
                write_slot(block, slot, None);
                return true;
            }
        }
    }
    false
}

/// Looks up `name`, returning its inumber if present (spec.md §4.D,
/// `find_in_dir`).
pub fn find_in_dir(block: &Block, name: &str) -> Option<Inumber> {
    (0..MAX_DIR_ENTRIES)
        .filter_map(|slot| read_slot(block, slot))
        .find(|e| e.name == name)
        .map(|e| e.inumber)
}
