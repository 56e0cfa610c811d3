//! 测试公用工具

#![allow(dead_code)]

use std::sync::Arc;

use block_dev::{BlockDevice, MemDisk};
use sfs::{BLOCK_SIZE, SimpleFileSystem};

pub fn disk(total_blocks: usize) -> Arc<dyn BlockDevice> {
    Arc::new(MemDisk::new(BLOCK_SIZE, total_blocks))
}

pub fn format_volume(total_blocks: usize) -> (Arc<dyn BlockDevice>, SimpleFileSystem) {
    let dev = disk(total_blocks);
    let fs = SimpleFileSystem::format(dev.clone()).unwrap();
    (dev, fs)
}

/// `len` 个字节，块与块之间、块内各处都不相同
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
