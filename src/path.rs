//! Path resolution (spec.md §4.F): the store is flat, so the only legal
//! paths are `/name`, where `name` may itself contain further `/`
//! characters — there are no nested directories to traverse, so any
//! later `/` is just part of the name. Grounded on
//! `original_source/tecnicofs-v2/fs/operations.c`'s `tfs_lookup`, which
//! strips the leading `/` and otherwise only checks length.

use crate::dir::valid_entry_name;
use crate::error::FsError;

/// Strips the leading `/` of an absolute path and validates the
/// remainder as an entry name. Rejects empty paths, paths without a
/// leading `/`, and paths too long to name a directory entry. A further
/// `/` in the remainder is accepted as part of the name (spec.md §4.F:
/// "any further `/` in the name is treated as part of the file name").
pub fn resolve_name(path: &str) -> Result<&str, FsError> {
    let name = path.strip_prefix('/').ok_or_else(|| FsError::invalid_path(path))?;
    if !valid_entry_name(name) {
        return Err(FsError::invalid_path(path));
    }
    Ok(name)
}
