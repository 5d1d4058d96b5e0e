//! Standalone invariant checks (spec.md §8) against a deliberately small
//! configuration, to exercise exhaustion paths without enormous loops.

use tfs::{FsConfig, FsError, FileSystem, OpenFlags};

fn tiny() -> FileSystem {
    FileSystem::new(FsConfig { data_blocks: 4 }).unwrap()
}

#[test]
fn root_inumber_is_stable_and_is_a_directory() {
    let fs = tiny();
    // The root directory itself isn't reachable through `lookup` (it has
    // no name), but any successful open/lookup round-trip confirms the
    // table didn't get corrupted at init.
    let h = fs.open("/x", OpenFlags::CREAT).unwrap();
    fs.close(h).unwrap();
    assert!(fs.lookup("/x").is_ok());
}

#[test]
fn exhausting_data_blocks_fails_write_cleanly() {
    let fs = tiny();
    // One block already went to the root directory; 3 remain.
    let h = fs.open("/big", OpenFlags::CREAT).unwrap();
    let payload = vec![1u8; 3 * 1024];
    assert_eq!(fs.write(h, &payload).unwrap(), payload.len());

    // A fourth block's worth of data has nowhere to go: the block
    // allocator is capped to this store's 4 blocks, so allocation fails
    // cleanly rather than handing out an index the store doesn't have.
    assert!(matches!(fs.write(h, &[1u8; 1024]), Err(FsError::Exhausted(_))));
    fs.close(h).unwrap();
}

#[test]
fn open_creat_twice_leaves_one_directory_entry() {
    let fs = tiny();
    let h1 = fs.open("/a", OpenFlags::CREAT).unwrap();
    fs.close(h1).unwrap();
    let h2 = fs.open("/a", OpenFlags::CREAT).unwrap();
    fs.close(h2).unwrap();

    // Re-creating must not have spawned a second inode under the same
    // name: writing through a fresh open should see the same file.
    let h3 = fs.open("/a", OpenFlags::APPEND).unwrap();
    assert_eq!(fs.write(h3, b"x").unwrap(), 1);
    fs.close(h3).unwrap();

    let h4 = fs.open("/a", OpenFlags::empty()).unwrap();
    let mut buf = [0u8; 1];
    assert_eq!(fs.read(h4, &mut buf).unwrap(), 1);
    fs.close(h4).unwrap();
}

#[test]
fn read_at_eof_returns_zero() {
    let fs = tiny();
    let h = fs.open("/a", OpenFlags::CREAT).unwrap();
    fs.write(h, b"abc").unwrap();
    let mut buf = [0u8; 10];
    assert_eq!(fs.read(h, &mut buf).unwrap(), 3);
    assert_eq!(fs.read(h, &mut buf).unwrap(), 0);
    fs.close(h).unwrap();
}

#[test]
fn write_crossing_block_boundary_splits_correctly() {
    let fs = tiny();
    let h = fs.open("/a", OpenFlags::CREAT).unwrap();
    let first = vec![b'a'; 1024];
    fs.write(h, &first).unwrap();
    fs.close(h).unwrap();

    let h2 = fs.open("/a", OpenFlags::empty()).unwrap();
    // Reopen at offset 1023 is not directly expressible without seek, so
    // instead verify the boundary byte landed in the first block and the
    // next write (via append) lands in the second.
    let mut buf = vec![0u8; 1024];
    assert_eq!(fs.read(h2, &mut buf).unwrap(), 1024);
    assert!(buf.iter().all(|&b| b == b'a'));
    fs.close(h2).unwrap();

    let h3 = fs.open("/a", OpenFlags::APPEND).unwrap();
    fs.write(h3, b"bb").unwrap();
    fs.close(h3).unwrap();

    let h4 = fs.open("/a", OpenFlags::empty()).unwrap();
    let mut whole = vec![0u8; 1026];
    assert_eq!(fs.read(h4, &mut whole).unwrap(), 1026);
    assert_eq!(&whole[1024..], b"bb");
    fs.close(h4).unwrap();
}

#[test]
fn inode_table_exhaustion_fails_open_creat() {
    // Only a handful of inodes: the root took one; fill the remainder.
    // Handles are closed immediately — this test fills the inode table,
    // not the (much smaller) open-file table.
    let fs = FileSystem::new(FsConfig { data_blocks: 256 }).unwrap();
    // INODE_TABLE_SIZE is 64 by default; root used one slot already.
    for i in 0..63 {
        let path = format!("/f{i}");
        let h = fs.open(&path, OpenFlags::CREAT).unwrap();
        fs.close(h).unwrap();
    }
    assert!(matches!(
        fs.open("/overflow", OpenFlags::CREAT),
        Err(FsError::Exhausted(_))
    ));
}
