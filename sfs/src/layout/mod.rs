//! # 磁盘数据结构层
//!
//! 卷的布局：
//! 超级块 | inode 表 | 数据块 | 空闲块表
//!
//! 所有整数都以 4 字节小端序存放。`-1` 在 `size` 中表示空闲的 inode 槽位，
//! 在块指针中表示未分配。

mod super_block;
pub use super_block::{Geometry, SuperBlock};

mod free_map;
pub use free_map::FreeMap;

mod inode;
pub use inode::{DiskInode, INDIRECT_COUNT, INODE_SIZE, InodeSlot, MAX_FILE_SIZE};

/// 根目录的目录项，同样是磁盘数据
mod dir_entry;
pub use dir_entry::{DIR_ENTRY_SIZE, DirEntry, Directory, NAME_MAX_LEN};

use crate::BlockId;

/// 未分配指针和空闲 inode 的 `size` 在磁盘上的值
const NIL: i32 = -1;

#[inline]
fn read_i32(buf: &[u8], offset: usize) -> i32 {
    let mut bytes = [0; 4];
    bytes.copy_from_slice(&buf[offset..offset + 4]);
    i32::from_le_bytes(bytes)
}

#[inline]
fn write_i32(buf: &mut [u8], offset: usize, value: i32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

#[inline]
fn read_ptr(buf: &[u8], offset: usize) -> Option<BlockId> {
    match read_i32(buf, offset) {
        ptr if ptr < 0 => None,
        ptr => Some(ptr as BlockId),
    }
}

#[inline]
fn write_ptr(buf: &mut [u8], offset: usize, ptr: Option<BlockId>) {
    write_i32(buf, offset, ptr.map_or(NIL, |id| id as i32));
}
