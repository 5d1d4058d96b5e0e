//! Compile-time constants and the runtime-overridable [`FsConfig`] that
//! mirrors them, so tests can exercise a tiny store without recompiling.

/// Bytes per data block.
pub const BLOCK_SIZE: usize = 1024;

/// Total number of data blocks in the store.
pub const DATA_BLOCKS: usize = 1024;

/// Maximum number of live inodes.
pub const INODE_TABLE_SIZE: usize = 64;

/// Maximum number of simultaneously open handles.
pub const MAX_OPEN_FILES: usize = 16;

/// Number of direct block references per inode.
pub const DIRECT_BLOCKS: usize = 10;

/// Number of block references held by one indirect block.
pub const INDIRECT_BLOCKS: usize = BLOCK_SIZE / core::mem::size_of::<i32>();

/// Maximum directory entry name length, including the terminator.
pub const MAX_FILE_NAME: usize = 40;

/// Number of directory entries that fit in one data block.
pub const MAX_DIR_ENTRIES: usize = BLOCK_SIZE / DirEntrySize::SIZE;

/// Inumber of the (only) root directory.
pub const ROOT_DIR_INUM: u32 = 0;

static_assertions::const_assert!(BLOCK_SIZE % core::mem::size_of::<i32>() == 0);
static_assertions::const_assert!(DIRECT_BLOCKS < INODE_TABLE_SIZE);
static_assertions::const_assert!(MAX_DIR_ENTRIES > 0);

/// Helper purely to name the on-disk size of a directory entry without
/// creating a circular module dependency on `dir::DirEntry`.
struct DirEntrySize;
impl DirEntrySize {
    const SIZE: usize = MAX_FILE_NAME + core::mem::size_of::<i32>();
}

/// Runtime knobs for a [`crate::FileSystem`], defaulting to the constants
/// above. Exists so tests can build a small store (e.g. to exercise
/// exhaustion paths) without touching the compile-time constants that size
/// the rest of the crate's fixed-capacity collections.
#[derive(Debug, Clone, Copy)]
pub struct FsConfig {
    /// Total number of data blocks backing the [`crate::block::BlockStore`].
    /// Must not exceed the compile-time ceiling `DATA_BLOCKS`;
    /// [`crate::FileSystem::new`] also sizes the block allocator to this
    /// value so the two always agree.
    pub data_blocks: usize,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            data_blocks: DATA_BLOCKS,
        }
    }
}
