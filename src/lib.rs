//! `tfs`: a small, in-memory, UNIX-style file system that serves
//! concurrent clients through a POSIX-like file-handle API.
//!
//! The store holds a single flat root directory of regular files; each
//! file is an inode with a fixed number of direct block references plus
//! one indirect index block. There is no persistence, no nested
//! directories, and no permissions model — see [`FileSystem`] for the
//! operations this crate actually implements.
//!
//! Grounded throughout on `kaist-cp-rv6`'s `kernel-rs` crate (lock
//! discipline, inode/block layout idioms) and on
//! `original_source/tecnicofs-v2` (the C implementation this design is
//! distilled from) for exact semantics where the two diverge. See
//! `DESIGN.md` at the repository root for the full grounding ledger.

mod bitmap;
mod block;
mod config;
mod copy;
mod dir;
mod error;
mod fs;
mod inode;
mod open_file;
mod path;
mod types;

pub use config::FsConfig;
pub use error::FsError;
pub use fs::{FileSystem, OpenFlags};
pub use types::{BlockIndex, FileHandle, Inumber};
