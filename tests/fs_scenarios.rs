//! End-to-end scenarios from spec.md §8, each against a fresh `FileSystem`.

use std::sync::{Arc, Barrier};
use std::thread;

use tfs::{FileSystem, FsConfig, OpenFlags};

fn fresh() -> FileSystem {
    FileSystem::new(FsConfig::default()).unwrap()
}

#[test]
fn scenario_1_create_write_read() {
    let fs = fresh();
    let h1 = fs.open("/a", OpenFlags::CREAT).unwrap();
    assert_eq!(fs.write(h1, b"hello").unwrap(), 5);
    fs.close(h1).unwrap();

    let h2 = fs.open("/a", OpenFlags::empty()).unwrap();
    let mut buf = [0u8; 5];
    assert_eq!(fs.read(h2, &mut buf).unwrap(), 5);
    assert_eq!(&buf, b"hello");
    fs.close(h2).unwrap();
}

#[test]
fn scenario_2_truncate() {
    let fs = fresh();
    let h1 = fs.open("/a", OpenFlags::CREAT).unwrap();
    fs.write(h1, b"hello").unwrap();
    fs.close(h1).unwrap();

    let h3 = fs.open("/a", OpenFlags::TRUNC).unwrap();
    let mut buf = [0u8; 5];
    assert_eq!(fs.read(h3, &mut buf).unwrap(), 0);
    fs.close(h3).unwrap();
}

#[test]
fn scenario_3_append() {
    let fs = fresh();
    let h1 = fs.open("/b", OpenFlags::CREAT).unwrap();
    fs.write(h1, &[b'X'; 100]).unwrap();
    fs.close(h1).unwrap();

    let h2 = fs.open("/b", OpenFlags::APPEND).unwrap();
    fs.write(h2, &[b'Y'; 50]).unwrap();
    fs.close(h2).unwrap();

    let h3 = fs.open("/b", OpenFlags::empty()).unwrap();
    let mut buf = [0u8; 150];
    assert_eq!(fs.read(h3, &mut buf).unwrap(), 150);
    assert!(buf[..100].iter().all(|&b| b == b'X'));
    assert!(buf[100..].iter().all(|&b| b == b'Y'));
    fs.close(h3).unwrap();
}

#[test]
fn scenario_4_indirect_spill() {
    const BLOCK_SIZE: usize = 1024;
    const DIRECT_BLOCKS: usize = 10;

    let fs = fresh();
    let h = fs.open("/c", OpenFlags::CREAT).unwrap();
    let payload = vec![0xABu8; (DIRECT_BLOCKS + 1) * BLOCK_SIZE];
    assert_eq!(fs.write(h, &payload).unwrap(), payload.len());
    fs.close(h).unwrap();

    let h2 = fs.open("/c", OpenFlags::empty()).unwrap();
    let mut buf = vec![0u8; payload.len()];
    assert_eq!(fs.read(h2, &mut buf).unwrap(), payload.len());
    assert_eq!(buf, payload);
    fs.close(h2).unwrap();
}

#[test]
fn scenario_5_concurrent_writers_different_files() {
    let fs = Arc::new(fresh());
    let barrier = Arc::new(Barrier::new(2));

    let run = |fs: Arc<FileSystem>, barrier: Arc<Barrier>, path: &'static str, byte: u8| {
        thread::spawn(move || {
            barrier.wait();
            let h = fs.open(path, OpenFlags::CREAT).unwrap();
            for _ in 0..40 {
                assert_eq!(fs.write(h, &[byte; 256]).unwrap(), 256);
            }
            fs.close(h).unwrap();
        })
    };

    let t1 = run(Arc::clone(&fs), Arc::clone(&barrier), "/f1", b'1');
    let t2 = run(Arc::clone(&fs), Arc::clone(&barrier), "/f2", b'2');
    t1.join().unwrap();
    t2.join().unwrap();

    for (path, byte) in [("/f1", b'1'), ("/f2", b'2')] {
        let h = fs.open(path, OpenFlags::empty()).unwrap();
        let mut buf = vec![0u8; 40 * 256];
        assert_eq!(fs.read(h, &mut buf).unwrap(), 40 * 256);
        assert!(buf.iter().all(|&b| b == byte));
        fs.close(h).unwrap();
    }
}

#[test]
fn scenario_6_concurrent_writers_same_file_then_concurrent_readers() {
    let fs = Arc::new(fresh());

    let h1 = fs.open("/shared", OpenFlags::CREAT).unwrap();
    for _ in 0..40 {
        fs.write(h1, &[b'A'; 256]).unwrap();
    }
    fs.close(h1).unwrap();

    let h2 = fs.open("/shared", OpenFlags::APPEND).unwrap();
    for _ in 0..40 {
        fs.write(h2, &[b'A'; 256]).unwrap();
    }
    fs.close(h2).unwrap();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let fs = Arc::clone(&fs);
            thread::spawn(move || {
                let h = fs.open("/shared", OpenFlags::empty()).unwrap();
                let mut buf = vec![0u8; 80 * 256];
                let mut total = 0usize;
                loop {
                    let n = fs.read(h, &mut buf[total..]).unwrap();
                    if n == 0 {
                        break;
                    }
                    total += n;
                }
                assert_eq!(total, 80 * 256);
                assert!(buf.iter().all(|&b| b == b'A'));
                fs.close(h).unwrap();
            })
        })
        .collect();
    for r in readers {
        r.join().unwrap();
    }
}
