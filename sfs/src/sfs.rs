//! # 卷管理层
//!
//! 构建卷的布局（格式化）或载入已有的卷（挂载），
//! 并持有内存中的全部元数据：空闲块表、inode 表、目录和会话。
//! 改动过的元数据以整个结构为单位写回。

use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use block_dev::BlockDevice;
use enumflags2::{BitFlags, bitflags};

use crate::layout::*;
use crate::session::SessionTable;
use crate::{BLOCK_SIZE, BlockId, Error, INODE_TABLE_BLOCKS, MAX_FILES, ROOT_INODE, Result};

const _: () = assert!(MAX_FILES * INODE_SIZE <= INODE_TABLE_BLOCKS * BLOCK_SIZE);

/// 操作改动过、需要写回的元数据结构
#[bitflags]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dirty {
    FreeMap = 0b001,
    InodeTable = 0b010,
    Directory = 0b100,
}

/// 已挂载的卷。
///
/// 所有状态都在这里，每个操作都可变借用它，调用天然串行，没有任何加锁共享。
pub struct SimpleFileSystem {
    pub(crate) block_device: Arc<dyn BlockDevice>,
    geometry: Geometry,
    pub(crate) free_map: FreeMap,
    pub(crate) inodes: Vec<InodeSlot>,
    pub(crate) directory: Directory,
    pub(crate) sessions: SessionTable,
}

impl SimpleFileSystem {
    /// 在整个设备上构建空卷。
    pub fn format(block_device: Arc<dyn BlockDevice>) -> Result<Self> {
        check_block_size(&block_device)?;
        let geometry = Geometry::new(block_device.num_blocks())?;

        let mut free_map = FreeMap::new(geometry.total_blocks());
        for block_id in geometry.reserved() {
            free_map.mark_used(block_id);
        }
        // 根目录从第一个数据块开始
        let root_block = geometry.data_start();
        free_map.mark_used(root_block);

        let mut inodes = vec![InodeSlot::Free; MAX_FILES];
        inodes[ROOT_INODE as usize] = InodeSlot::Used(DiskInode::with_first_block(root_block));

        let super_block = SuperBlock::new(geometry.total_blocks() as u32);
        block_device.write_block(0, &super_block.encode())?;

        let mut fs = Self {
            block_device,
            geometry,
            free_map,
            inodes,
            directory: Directory::new(MAX_FILES),
            sessions: SessionTable::new(MAX_FILES),
        };
        fs.flush(BitFlags::all())?;

        log::info!(
            "formatted {} blocks, {} free",
            geometry.total_blocks(),
            fs.free_blocks()
        );
        Ok(fs)
    }

    /// 载入已有卷的元数据，指针越界或目录项失效的卷会被拒绝。
    pub fn mount(block_device: Arc<dyn BlockDevice>) -> Result<Self> {
        check_block_size(&block_device)?;

        let super_block = SuperBlock::decode(&block_device.read_blocks(0, 1)?);
        if !super_block.is_valid() || super_block.total_blocks as usize != block_device.num_blocks()
        {
            log::error!("bad superblock: {super_block:?}");
            return Err(Error::InvalidVolume);
        }
        let geometry = Geometry::new(super_block.total_blocks as usize)?;

        let free_map = geometry.free_map();
        let free_map = FreeMap::decode(
            &block_device.read_blocks(free_map.start, free_map.len())?,
            geometry.total_blocks(),
        );

        let inode_table = geometry.inode_table();
        let inodes: Vec<InodeSlot> = block_device
            .read_blocks(inode_table.start, inode_table.len())?
            .chunks_exact(INODE_SIZE)
            .take(MAX_FILES)
            .map(InodeSlot::decode)
            .collect();

        for (inode_id, inode) in inodes.iter().enumerate() {
            if let Some(inode) = inode.as_used() {
                inode
                    .validate(geometry.total_blocks(), &block_device)
                    .inspect_err(|_| log::error!("inode {inode_id} is corrupted: {inode:?}"))?;
            }
        }

        let root = inodes[ROOT_INODE as usize]
            .as_used()
            .ok_or(Error::InvalidVolume)?;
        // 目录表之后的内容不会被解码
        let blocks = DiskInode::count_data_block(root.size).min(Geometry::ROOT_DIR_BLOCKS);
        let mut bytes = vec![0; blocks * BLOCK_SIZE];
        let read_size = root.read_at(0, &mut bytes, &block_device)?;
        let directory = Directory::decode(&bytes[..read_size], MAX_FILES)?;

        for entry in directory.iter() {
            let inode_id = entry.inode_id();
            let points_to_file = inode_id != ROOT_INODE
                && inodes
                    .get(inode_id as usize)
                    .is_some_and(|slot| !slot.is_free());
            if !points_to_file {
                log::error!("{:?} points to inode {inode_id}", entry.name());
                return Err(Error::InvalidVolume);
            }
        }

        log::info!(
            "mounted {} blocks, {} files",
            geometry.total_blocks(),
            directory.iter().count()
        );
        Ok(Self {
            block_device,
            geometry,
            free_map,
            inodes,
            directory,
            sessions: SessionTable::new(MAX_FILES),
        })
    }

    #[inline]
    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    #[inline]
    pub fn free_blocks(&self) -> usize {
        self.free_map.free_blocks()
    }

    #[inline]
    pub fn is_block_free(&self, block_id: BlockId) -> bool {
        self.free_map.is_free(block_id)
    }

    /// 把给定的结构写回设备。
    ///
    /// 目录最先写：它是根 inode 的内容，可能为此分配块。
    pub fn flush(&mut self, mut dirty: BitFlags<Dirty>) -> Result<()> {
        if dirty.contains(Dirty::Directory) {
            self.store_directory()?;
            dirty |= Dirty::InodeTable | Dirty::FreeMap;
        }

        if dirty.contains(Dirty::InodeTable) {
            let mut bytes = vec![0; INODE_TABLE_BLOCKS * BLOCK_SIZE];
            for (slot, buf) in self.inodes.iter().zip(bytes.chunks_exact_mut(INODE_SIZE)) {
                slot.encode_into(buf);
            }
            let inode_table = self.geometry.inode_table();
            self.block_device
                .write_blocks(inode_table.start, inode_table.len(), &bytes)?;
        }

        if dirty.contains(Dirty::FreeMap) {
            let free_map = self.geometry.free_map();
            self.block_device.write_blocks(
                free_map.start,
                free_map.len(),
                &self.free_map.encode(free_map.len()),
            )?;
        }

        Ok(())
    }

    /// 按编号取已用 inode
    pub(crate) fn inode(&self, inode_id: u32) -> Result<&DiskInode> {
        self.inodes
            .get(inode_id as usize)
            .and_then(InodeSlot::as_used)
            .ok_or(Error::NotFound)
    }

    fn store_directory(&mut self) -> Result<()> {
        let bytes = self.directory.encode();
        let root = self.inodes[ROOT_INODE as usize]
            .as_used_mut()
            .ok_or(Error::InvalidVolume)?;

        let written = root.write_at(0, &bytes, &mut self.free_map, &self.block_device)?;
        if written < bytes.len() {
            return Err(Error::OutOfSpace);
        }

        Ok(())
    }
}

fn check_block_size(block_device: &Arc<dyn BlockDevice>) -> Result<()> {
    if block_device.block_size() != BLOCK_SIZE {
        log::error!(
            "device blocks are {} bytes, expected {BLOCK_SIZE}",
            block_device.block_size()
        );
        return Err(Error::InvalidVolume);
    }

    Ok(())
}
