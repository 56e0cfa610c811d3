use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use super::{read_i32, write_i32};
use crate::{Error, Result};

/// 文件名的最大字节数，另留一字节给结尾的 NUL
pub const NAME_MAX_LEN: usize = 15;
/// `used`、文件名、三个填充字节、inode 编号
pub const DIR_ENTRY_SIZE: usize = 24;

const NAME_OFFSET: usize = 1;
const INODE_OFFSET: usize = 20;

/// 单个文件名到 inode 的映射
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    name: String,
    inode_id: u32,
}

impl DirEntry {
    pub fn new(name: &str, inode_id: u32) -> Result<Self> {
        Self::check_name(name)?;
        Ok(Self {
            name: name.into(),
            inode_id,
        })
    }

    pub fn check_name(name: &str) -> Result<()> {
        if name.is_empty() || name.contains('\0') {
            return Err(Error::InvalidName);
        }
        if name.len() > NAME_MAX_LEN {
            return Err(Error::NameTooLong);
        }

        Ok(())
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn inode_id(&self) -> u32 {
        self.inode_id
    }
}

/// 扁平的根目录：槽位数固定，`None` 为墓碑，之后的创建可复用。
/// 槽位从不压缩。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    entries: Vec<Option<DirEntry>>,
    /// 共享的遍历游标，见 [`Directory::next_name`]
    cursor: usize,
}

impl Directory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: vec![None; capacity],
            cursor: 0,
        }
    }

    /// 名为 `name` 的已用目录项的 inode
    pub fn lookup(&self, name: &str) -> Option<u32> {
        self.iter()
            .find(|entry| entry.name() == name)
            .map(DirEntry::inode_id)
    }

    /// 第一个空闲槽位
    #[inline]
    pub fn free_slot(&self) -> Option<usize> {
        self.entries.iter().position(Option::is_none)
    }

    /// 把目录项放进第一个空闲槽位，返回该槽位。
    pub fn insert(&mut self, entry: DirEntry) -> Result<usize> {
        let slot = self.free_slot().ok_or(Error::DirectoryFull)?;
        self.entries[slot] = Some(entry);
        Ok(slot)
    }

    /// 把名为 `name` 的目录项置为墓碑，返回其 inode。
    pub fn remove(&mut self, name: &str) -> Option<u32> {
        let slot = self
            .entries
            .iter_mut()
            .find(|slot| matches!(slot, Some(entry) if entry.name() == name))?;

        slot.take().map(|entry| entry.inode_id())
    }

    /// 按表中顺序的已用目录项
    pub fn iter(&self) -> impl Iterator<Item = &DirEntry> {
        self.entries.iter().flatten()
    }

    /// 游标之后的下一个已用文件名。
    ///
    /// 游标越过表尾时返回 `None` 并回到表头，下一次调用开始新的一轮。
    /// 游标是共享的：两个调用者同时遍历会看到彼此的进度。
    pub fn next_name(&mut self) -> Option<String> {
        while self.cursor < self.entries.len() {
            let slot = self.cursor;
            self.cursor += 1;
            if let Some(entry) = &self.entries[slot] {
                return Some(entry.name.clone());
            }
        }

        self.cursor = 0;
        None
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = vec![0; self.entries.len() * DIR_ENTRY_SIZE];
        for (entry, buf) in self
            .entries
            .iter()
            .zip(bytes.chunks_exact_mut(DIR_ENTRY_SIZE))
        {
            let Some(entry) = entry else {
                continue;
            };
            buf[0] = 1;
            buf[NAME_OFFSET..NAME_OFFSET + entry.name.len()].copy_from_slice(entry.name.as_bytes());
            write_i32(buf, INODE_OFFSET, entry.inode_id as i32);
        }

        bytes
    }

    /// 重建 `capacity` 个槽位的目录表，`bytes` 中缺失的槽位视为空闲。
    pub fn decode(bytes: &[u8], capacity: usize) -> Result<Self> {
        let mut directory = Self::new(capacity);
        for (slot, buf) in directory
            .entries
            .iter_mut()
            .zip(bytes.chunks_exact(DIR_ENTRY_SIZE))
        {
            if buf[0] == 0 {
                continue;
            }

            let name = &buf[NAME_OFFSET..NAME_OFFSET + NAME_MAX_LEN + 1];
            let len = name.iter().position(|&c| c == 0).unwrap_or(name.len());
            let name = core::str::from_utf8(&name[..len]).map_err(|_| Error::InvalidVolume)?;
            let inode_id = read_i32(buf, INODE_OFFSET);
            if inode_id < 0 {
                return Err(Error::InvalidVolume);
            }

            *slot = Some(DirEntry::new(name, inode_id as u32).map_err(|_| Error::InvalidVolume)?);
        }

        Ok(directory)
    }
}
