//! # 块设备接口层
//!
//! 块设备是以**块**为单位存储数据的设备，例如磁盘镜像、一段内存等；
//! [`BlockDevice`] 就是对读写整块的抽象，
//! 实现了此特质的类型称为**块设备驱动**。
//!
//! 驱动不做缓存，也不处理不足一块的数据：每次传输都是整数个块。

#![cfg_attr(not(test), no_std)]

extern crate alloc;

mod mem_disk;

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

pub use self::mem_disk::MemDisk;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceError {
    /// 块号超出设备末尾
    OutOfRange { block_id: usize, num_blocks: usize },
    /// 缓冲区长度与传输大小不符
    BadLength { expected: usize, found: usize },
    /// 后备存储出错
    Io,
}

/// 块设备驱动特质
pub trait BlockDevice: Send + Sync {
    /// 每块字节数
    fn block_size(&self) -> usize;

    /// 设备上的块数
    fn num_blocks(&self) -> usize;

    /// `buf.len()` 须等于 [`BlockDevice::block_size`]
    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<(), DeviceError>;

    /// `buf.len()` 须等于 [`BlockDevice::block_size`]
    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<(), DeviceError>;

    /// 从 `start` 起读取连续 `count` 块
    fn read_blocks(&self, start: usize, count: usize) -> Result<Vec<u8>, DeviceError> {
        let block_size = self.block_size();
        let mut buf = vec![0; count * block_size];
        for (i, block) in buf.chunks_exact_mut(block_size).enumerate() {
            self.read_block(start + i, block)?;
        }

        Ok(buf)
    }

    /// 从 `start` 起写入连续 `count` 块
    fn write_blocks(&self, start: usize, count: usize, buf: &[u8]) -> Result<(), DeviceError> {
        let block_size = self.block_size();
        if buf.len() != count * block_size {
            return Err(DeviceError::BadLength {
                expected: count * block_size,
                found: buf.len(),
            });
        }

        for (i, block) in buf.chunks_exact(block_size).enumerate() {
            self.write_block(start + i, block)?;
        }

        Ok(())
    }
}

/// 按设备的块数与块大小检查单块传输
pub fn check_access(
    dev: &dyn BlockDevice,
    block_id: usize,
    buf_len: usize,
) -> Result<(), DeviceError> {
    if block_id >= dev.num_blocks() {
        return Err(DeviceError::OutOfRange {
            block_id,
            num_blocks: dev.num_blocks(),
        });
    }

    if buf_len != dev.block_size() {
        return Err(DeviceError::BadLength {
            expected: dev.block_size(),
            found: buf_len,
        });
    }

    Ok(())
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange {
                block_id,
                num_blocks,
            } => write!(f, "block {block_id} out of range ({num_blocks} blocks)"),
            Self::BadLength { expected, found } => {
                write!(f, "expected a {expected}-byte buffer, found {found} bytes")
            }
            Self::Io => f.write_str("backing store I/O failure"),
        }
    }
}

impl core::error::Error for DeviceError {}
