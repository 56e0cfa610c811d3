//! # 文件操作层
//!
//! 调用者对已挂载卷所做的一切：打开（不存在则创建）、关闭、
//! 带偏移的顺序读写、删除，以及扁平根目录的遍历。

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use enumflags2::BitFlags;

use crate::layout::{DirEntry, DiskInode, InodeSlot};
use crate::{Dirty, Error, Fd, Result, SimpleFileSystem};

impl SimpleFileSystem {
    /// 打开文件 `name`，不存在时创建一个空文件。
    ///
    /// 已有文件从末尾打开；文件上已有会话时返回该会话的句柄。
    pub fn open(&mut self, name: &str) -> Result<Fd> {
        let Some(inode_id) = self.directory.lookup(name) else {
            return self.create(name);
        };

        if let Some(fd) = self.sessions.find(inode_id) {
            return Ok(fd);
        }
        let size = self.inode(inode_id)?.size as usize;
        self.sessions.open(inode_id, size)
    }

    /// 结束会话，文件本身不受影响。
    pub fn close(&mut self, fd: Fd) -> Result<()> {
        let session = self.sessions.close(fd)?;
        log::debug!("closed {fd:?} on inode {}", session.inode_id);
        Ok(())
    }

    /// 从会话偏移处写入 `buf` 并推进偏移。
    ///
    /// 卷中途写满时返回不足 `buf.len()` 的字节数；
    /// 一个字节都没写成时才返回 [`Error::OutOfSpace`]。
    pub fn write(&mut self, fd: Fd, buf: &[u8]) -> Result<usize> {
        let session = *self.sessions.get(fd)?;
        let inode = self
            .inodes
            .get_mut(session.inode_id as usize)
            .and_then(InodeSlot::as_used_mut)
            .ok_or(Error::NotFound)?;

        let result = inode.write_at(session.offset, buf, &mut self.free_map, &self.block_device);
        if let Err(Error::FileTooLarge) = result {
            // 尚未改动任何东西
            return result;
        }

        // 即使一个字节都没写，也可能已经分配了块
        self.flush(Dirty::InodeTable | Dirty::FreeMap)?;
        let written_size = result?;
        self.sessions.get_mut(fd)?.offset += written_size;

        Ok(written_size)
    }

    /// 从会话偏移处读入 `buf` 并推进偏移，读到的字节数不足即到达文件末尾。
    pub fn read(&mut self, fd: Fd, buf: &mut [u8]) -> Result<usize> {
        let session = *self.sessions.get(fd)?;
        let inode = self.inode(session.inode_id)?;
        let read_size = inode.read_at(session.offset, buf, &self.block_device)?;
        self.sessions.get_mut(fd)?.offset += read_size;

        Ok(read_size)
    }

    /// 至多读取 `max_len` 字节，`usize::MAX` 即读到文件末尾。
    pub fn read_to_vec(&mut self, fd: Fd, max_len: usize) -> Result<Vec<u8>> {
        let session = *self.sessions.get(fd)?;
        let size = self.inode(session.inode_id)?.size as usize;

        let mut buf = vec![0; max_len.min(size.saturating_sub(session.offset))];
        let read_size = self.read(fd, &mut buf)?;
        buf.truncate(read_size);
        Ok(buf)
    }

    /// 移动会话偏移，`offset` 须位于 `[0, size]` 之内。
    pub fn seek(&mut self, fd: Fd, offset: i64) -> Result<()> {
        let inode_id = self.sessions.get(fd)?.inode_id;
        let size = self.inode(inode_id)?.size as i64;
        if !(0..=size).contains(&offset) {
            return Err(Error::InvalidSeek);
        }

        self.sessions.get_mut(fd)?.offset = offset as usize;
        Ok(())
    }

    /// 删除 `name`，把它的块还给空闲块表；
    /// 文件上仍打开的会话一并结束。
    pub fn remove(&mut self, name: &str) -> Result<()> {
        let inode_id = self.directory.remove(name).ok_or(Error::NotFound)?;
        if let Some(fd) = self.sessions.find(inode_id) {
            self.sessions.close(fd)?;
        }

        let slot = self
            .inodes
            .get_mut(inode_id as usize)
            .ok_or(Error::InvalidVolume)?;
        if let InodeSlot::Used(inode) = slot {
            for block_id in inode.clear(&self.block_device)? {
                self.free_map.dealloc(block_id);
            }
        }
        *slot = InodeSlot::Free;

        log::debug!("removed {name:?}, inode {inode_id}");
        self.flush(BitFlags::all())
    }

    /// 目录遍历的下一个文件名，一轮结束时返回 `None`。
    ///
    /// 游标整个卷只有一个，并非每个调用者一个。
    #[inline]
    pub fn next_directory_name(&mut self) -> Option<String> {
        self.directory.next_name()
    }

    /// 按目录顺序列出所有文件名，不动遍历游标。
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.directory.iter().map(DirEntry::name)
    }

    pub fn file_size(&self, name: &str) -> Result<usize> {
        let inode_id = self.directory.lookup(name).ok_or(Error::NotFound)?;
        Ok(self.inode(inode_id)?.size as usize)
    }
}

impl SimpleFileSystem {
    /// 创建带首个数据块的空文件并打开它。
    /// 所有检查都在改动之前完成。
    fn create(&mut self, name: &str) -> Result<Fd> {
        DirEntry::check_name(name)?;
        if !self.sessions.has_free_slot() {
            return Err(Error::TooManyOpenFiles);
        }
        if self.directory.free_slot().is_none() {
            return Err(Error::DirectoryFull);
        }
        let inode_id = self
            .inodes
            .iter()
            .position(InodeSlot::is_free)
            .ok_or(Error::NoFreeInode)? as u32;
        let block_id = self.free_map.alloc().ok_or(Error::OutOfSpace)?;

        self.inodes[inode_id as usize] = InodeSlot::Used(DiskInode::with_first_block(block_id));
        self.directory.insert(DirEntry::new(name, inode_id)?)?;
        let fd = self.sessions.open(inode_id, 0)?;

        log::debug!("created {name:?}, inode {inode_id}, first block {block_id}");
        self.flush(BitFlags::all())?;
        Ok(fd)
    }
}
