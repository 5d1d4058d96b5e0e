//! The error taxonomy of the file system, as outcome categories rather
//! than raw status codes.

use thiserror::Error;

use crate::types::{FileHandle, Inumber};

/// Everything that can go wrong in a `tfs` operation.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum FsError {
    /// A bad path, empty name, or out-of-range handle/inumber.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// `lookup` found no entry, or `open` was called without `O_CREAT`.
    #[error("not found: {0}")]
    NotFound(String),

    /// The inode table, block bitmap, or open-file table is full.
    #[error("resource exhausted: {0}")]
    Exhausted(&'static str),

    /// The target directory is full, or isn't a directory.
    #[error("conflict: {0}")]
    Conflict(&'static str),

    /// A bitmap/lock invariant was violated; this should never happen in a
    /// correct caller, and indicates a bug in `tfs` itself.
    #[error("internal inconsistency: {0}")]
    Internal(&'static str),
}

impl FsError {
    pub(crate) fn invalid_path(path: &str) -> Self {
        Self::InvalidArgument(format!("invalid path: {path:?}"))
    }

    pub(crate) fn bad_handle(handle: FileHandle) -> Self {
        Self::InvalidArgument(format!("invalid handle: {handle:?}"))
    }

    pub(crate) fn bad_inumber(inumber: Inumber) -> Self {
        Self::InvalidArgument(format!("invalid inumber: {inumber:?}"))
    }
}
