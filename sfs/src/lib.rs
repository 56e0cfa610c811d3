#![cfg_attr(not(test), no_std)]

extern crate alloc;

/* sfs 的整体架构，自上而下 */

// 文件操作层：打开、关闭、读写、定位、删除、遍历
mod vfs;

// 卷管理层：格式化、挂载、元数据写回
mod sfs;

// 打开文件会话
mod session;

// 磁盘数据结构层
mod layout;

mod error;

pub use self::{
    error::{Error, Result},
    layout::{DIR_ENTRY_SIZE, Geometry, INDIRECT_COUNT, INODE_SIZE, MAX_FILE_SIZE, NAME_MAX_LEN},
    session::Fd,
    sfs::{Dirty, SimpleFileSystem},
};
pub use block_dev::{BlockDevice, DeviceError};

pub const MAGIC: u32 = 0xACBD_0005;
pub const BLOCK_SIZE: usize = 1024;
/// 每个 inode 的直接指针数
pub const DIRECT_COUNT: usize = 12;
/// inode 表、目录表与会话表的容量
pub const MAX_FILES: usize = 100;
pub const INODE_TABLE_BLOCKS: usize = 6;
pub const DEFAULT_TOTAL_BLOCKS: usize = 4096;
/// 根目录位于 0 号 inode
pub const ROOT_INODE: u32 = 0;

/// 物理块号
pub type BlockId = u32;

type DataBlock = [u8; BLOCK_SIZE];
