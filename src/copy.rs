//! `copy_to_external` (spec.md §6): a thin collaborator that reads an
//! internal file in full and writes it to a host-OS path, grounded on
//! `original_source/tecnicofs-v2/fs/operations.c`'s
//! `tfs_copy_to_external_fs`. Does not lock the destination; concurrent
//! writers to the same host path exhibit host-filesystem behavior.

use std::io::Write;
use std::path::Path;

use crate::config::{BLOCK_SIZE, DATA_BLOCKS};
use crate::error::FsError;
use crate::fs::{FileSystem, OpenFlags};

/// Copies the contents of `source` (an internal path) to `dest` (a
/// host-filesystem path), reading at most `BLOCK_SIZE * DATA_BLOCKS`
/// bytes.
pub fn copy_to_external(fs: &FileSystem, source: &str, dest: &Path) -> Result<(), FsError> {
    let handle = fs.open(source, OpenFlags::empty())?;
    let result = read_all_and_write(fs, handle, dest);
    let _ = fs.close(handle);
    result
}

fn read_all_and_write(fs: &FileSystem, handle: crate::types::FileHandle, dest: &Path) -> Result<(), FsError> {
    let mut buf = vec![0u8; BLOCK_SIZE * DATA_BLOCKS];
    let mut total = 0usize;
    loop {
        let n = fs.read(handle, &mut buf[total..])?;
        if n == 0 {
            break;
        }
        total += n;
    }
    let mut out = std::fs::File::create(dest)
        .map_err(|e| FsError::InvalidArgument(format!("cannot open destination {dest:?}: {e}")))?;
    out.write_all(&buf[..total])
        .map_err(|e| FsError::InvalidArgument(format!("failed writing destination {dest:?}: {e}")))
}
