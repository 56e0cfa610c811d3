mod common;

use std::sync::Arc;

use block_dev::{BlockDevice, MemDisk};
use common::{disk, format_volume, pattern};
use sfs::{
    BLOCK_SIZE, DEFAULT_TOTAL_BLOCKS, DIRECT_COUNT, Error, INODE_SIZE, MAX_FILES, SimpleFileSystem,
};

#[test]
fn create_is_persisted_at_once() {
    let (dev, mut fs) = format_volume(DEFAULT_TOTAL_BLOCKS);
    fs.open("empty").unwrap();

    let mut fs = SimpleFileSystem::mount(dev).unwrap();
    assert_eq!(Ok(0), fs.file_size("empty"));
    assert_eq!(Some("empty".into()), fs.next_directory_name());
    assert_eq!(None, fs.next_directory_name());
}

#[test]
fn content_survives_remount() {
    let (dev, mut fs) = format_volume(DEFAULT_TOTAL_BLOCKS);
    let small = pattern(2500);
    let big = pattern(DIRECT_COUNT * BLOCK_SIZE + 3000);

    let fd = fs.open("small").unwrap();
    fs.write(fd, &small).unwrap();
    let fd = fs.open("big").unwrap();
    fs.write(fd, &big).unwrap();
    let free_blocks = fs.free_blocks();
    drop(fs);

    let mut fs = SimpleFileSystem::mount(dev).unwrap();
    assert_eq!(free_blocks, fs.free_blocks());
    assert_eq!(vec!["small", "big"], fs.names().collect::<Vec<_>>());

    // 会话不会跨越挂载，文件从末尾重新打开
    let fd = fs.open("big").unwrap();
    assert!(fs.read_to_vec(fd, 10).unwrap().is_empty());
    fs.seek(fd, 0).unwrap();
    assert_eq!(big, fs.read_to_vec(fd, big.len()).unwrap());

    let fd = fs.open("small").unwrap();
    fs.seek(fd, 0).unwrap();
    assert_eq!(small, fs.read_to_vec(fd, 4096).unwrap());
}

#[test]
fn remove_survives_remount() {
    let (dev, mut fs) = format_volume(DEFAULT_TOTAL_BLOCKS);
    let fresh = fs.free_blocks();
    let fd = fs.open("gone").unwrap();
    fs.write(fd, &pattern(3 * BLOCK_SIZE)).unwrap();
    fs.open("kept").unwrap();
    fs.remove("gone").unwrap();

    let fs = SimpleFileSystem::mount(dev).unwrap();
    assert_eq!(Err(Error::NotFound), fs.file_size("gone"));
    assert_eq!(vec!["kept"], fs.names().collect::<Vec<_>>());
    // 只有 "kept" 的首个块在用
    assert_eq!(fresh - 1, fs.free_blocks());
}

#[test]
fn blank_device() {
    assert_eq!(
        Some(Error::InvalidVolume),
        SimpleFileSystem::mount(disk(DEFAULT_TOTAL_BLOCKS)).err()
    );
}

#[test]
fn geometry_mismatch() {
    let dev: Arc<dyn BlockDevice> = Arc::new(MemDisk::new(512, DEFAULT_TOTAL_BLOCKS));
    assert_eq!(
        Some(Error::InvalidVolume),
        SimpleFileSystem::format(dev).err()
    );

    // 卷镜像被拷到更大的设备上
    let (dev, _) = format_volume(64);
    let larger = disk(128);
    larger.write_blocks(0, 64, &dev.read_blocks(0, 64).unwrap()).unwrap();
    assert_eq!(Some(Error::InvalidVolume), SimpleFileSystem::mount(larger).err());

    assert_eq!(Some(Error::InvalidVolume), SimpleFileSystem::format(disk(10)).err());
}

/// 改写卷上 `block_id` 号块中 `offset` 处的一个 i32
fn patch_i32(dev: &Arc<dyn BlockDevice>, block_id: usize, offset: usize, value: i32) {
    let mut block = dev.read_blocks(block_id, 1).unwrap();
    block[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    dev.write_blocks(block_id, 1, &block).unwrap();
}

#[test]
fn stray_pointer() {
    let (dev, mut fs) = format_volume(64);
    let fd = fs.open("f").unwrap();
    fs.write(fd, b"data").unwrap();
    drop(fs);

    // 1 号 inode 的 direct[0] 位于 inode 表第一块的 56 + 4 字节处
    patch_i32(&dev, 1, INODE_SIZE + 4, 9999);
    assert_eq!(
        Some(Error::InvalidVolume),
        SimpleFileSystem::mount(dev).err()
    );
}

#[test]
fn stale_directory_entry() {
    let (dev, mut fs) = format_volume(64);
    fs.open("f").unwrap();
    drop(fs);

    // 目录项指向空闲的 inode
    patch_i32(&dev, 7, 20, 50);
    assert_eq!(
        Some(Error::InvalidVolume),
        SimpleFileSystem::mount(dev.clone()).err()
    );

    // 以及卷外的 inode
    patch_i32(&dev, 7, 20, MAX_FILES as i32);
    assert_eq!(
        Some(Error::InvalidVolume),
        SimpleFileSystem::mount(dev).err()
    );
}
