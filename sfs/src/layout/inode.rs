//! 文件的块索引
//!
//! - 直接索引：`DIRECT_COUNT` 个指针，各指向一个数据块
//! - 间接索引：一个指针，指向存放 `INDIRECT_COUNT` 个数据块指针的块
//!
//! 逻辑块 `i` 存放文件字节 `[i * BLOCK_SIZE, (i + 1) * BLOCK_SIZE)`。

use alloc::sync::Arc;
use alloc::vec::Vec;

use block_dev::BlockDevice;

use super::{FreeMap, NIL, read_i32, read_ptr, write_i32, write_ptr};
use crate::{BLOCK_SIZE, BlockId, DIRECT_COUNT, DataBlock, Error, Result};

/// 间接块所含指针数
pub const INDIRECT_COUNT: usize = BLOCK_SIZE / 4;
/// `size`、直接指针、间接指针
pub const INODE_SIZE: usize = 4 + DIRECT_COUNT * 4 + 4;
/// 文件可寻址的逻辑块数
const MAX_FILE_BLOCKS: usize = DIRECT_COUNT + INDIRECT_COUNT;
pub const MAX_FILE_SIZE: usize = MAX_FILE_BLOCKS * BLOCK_SIZE;

type IndirectBlock = [Option<BlockId>; INDIRECT_COUNT];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiskInode {
    /// 文件的确切字节数
    pub size: u32,
    direct: [Option<BlockId>; DIRECT_COUNT],
    indirect: Option<BlockId>,
}

/// inode 表的一个槽位
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum InodeSlot {
    #[default]
    Free,
    Used(DiskInode),
}

impl DiskInode {
    /// 已分配首个数据块的空文件
    pub fn with_first_block(block_id: BlockId) -> Self {
        let mut inode = Self::default();
        inode.direct[0] = Some(block_id);
        inode
    }

    /// 把逻辑块号映射为物理块号，未分配时为 `None`。
    pub fn block_id(
        &self,
        block_index: usize,
        block_device: &Arc<dyn BlockDevice>,
    ) -> Result<Option<BlockId>> {
        if block_index < DIRECT_COUNT {
            return Ok(self.direct[block_index]);
        }
        if block_index >= MAX_FILE_BLOCKS {
            return Ok(None);
        }

        match self.indirect {
            // 没有间接块时，直接索引之外的块都不存在
            None => Ok(None),
            Some(indirect) => {
                Ok(load_indirect(indirect, block_device)?[block_index - DIRECT_COUNT])
            }
        }
    }

    /// 同 [`DiskInode::block_id`]，但块缺失时会分配它（必要时先分配间接块）。
    /// 返回的标志表示数据块是否新分配。
    pub fn ensure_block(
        &mut self,
        block_index: usize,
        free_map: &mut FreeMap,
        block_device: &Arc<dyn BlockDevice>,
    ) -> Result<(BlockId, bool)> {
        if block_index >= MAX_FILE_BLOCKS {
            return Err(Error::FileTooLarge);
        }

        if block_index < DIRECT_COUNT {
            if let Some(block_id) = self.direct[block_index] {
                return Ok((block_id, false));
            }
            let block_id = free_map.alloc().ok_or(Error::OutOfSpace)?;
            self.direct[block_index] = Some(block_id);
            return Ok((block_id, true));
        }

        let indirect = match self.indirect {
            Some(indirect) => indirect,
            None => {
                let indirect = free_map.alloc().ok_or(Error::OutOfSpace)?;
                store_indirect(indirect, &[None; INDIRECT_COUNT], block_device)?;
                self.indirect = Some(indirect);
                indirect
            }
        };

        let mut pointers = load_indirect(indirect, block_device)?;
        let slot = &mut pointers[block_index - DIRECT_COUNT];
        if let Some(block_id) = *slot {
            return Ok((block_id, false));
        }

        let block_id = free_map.alloc().ok_or(Error::OutOfSpace)?;
        *slot = Some(block_id);
        store_indirect(indirect, &pointers, block_device)?;

        Ok((block_id, true))
    }

    /// 从字节 `offset` 处读入 `buf`，遇到文件末尾或第一个未分配块即停止。
    pub fn read_at(
        &self,
        offset: usize,
        buf: &mut [u8],
        block_device: &Arc<dyn BlockDevice>,
    ) -> Result<usize> {
        let mut start = offset;
        let end = (offset + buf.len()).min(self.size as usize);

        let mut read_size = 0;
        let mut data_block: DataBlock = [0; BLOCK_SIZE];
        while start < end {
            // 当前块的逻辑块号
            let block_index = start / BLOCK_SIZE;
            // 当前块在文件中的结束位置
            let current_block_end = ((block_index + 1) * BLOCK_SIZE).min(end);
            let block_read_size = current_block_end - start;

            let Some(block_id) = self.block_id(block_index, block_device)? else {
                break;
            };
            block_device.read_block(block_id as usize, &mut data_block)?;

            let src = &data_block[start % BLOCK_SIZE..start % BLOCK_SIZE + block_read_size];
            buf[read_size..read_size + block_read_size].copy_from_slice(src);

            read_size += block_read_size;
            start = current_block_end;
        }

        Ok(read_size)
    }

    /// 在字节 `offset` 处写入 `buf`，按需扩展块索引。
    ///
    /// 只被部分覆盖的块会先读出再合并，写入范围两侧的字节得以保留。
    /// 卷写满时停在最后提交的块上并返回不足的字节数，`size` 恰好覆盖已提交的字节。
    pub fn write_at(
        &mut self,
        offset: usize,
        buf: &[u8],
        free_map: &mut FreeMap,
        block_device: &Arc<dyn BlockDevice>,
    ) -> Result<usize> {
        let end = offset + buf.len();
        if end > MAX_FILE_SIZE {
            return Err(Error::FileTooLarge);
        }

        let mut start = offset;
        let mut written_size = 0;
        let mut data_block: DataBlock = [0; BLOCK_SIZE];
        while start < end {
            let block_index = start / BLOCK_SIZE;
            let current_block_end = ((block_index + 1) * BLOCK_SIZE).min(end);
            let block_write_size = current_block_end - start;

            let (block_id, fresh) = match self.ensure_block(block_index, free_map, block_device) {
                Ok(block) => block,
                Err(Error::OutOfSpace) if written_size > 0 => {
                    log::warn!(
                        "volume full, wrote {written_size} of {} bytes",
                        buf.len()
                    );
                    break;
                }
                Err(err) => return Err(err),
            };

            if fresh {
                data_block.fill(0);
            } else if block_write_size < BLOCK_SIZE {
                block_device.read_block(block_id as usize, &mut data_block)?;
            }

            let dest = &mut data_block[start % BLOCK_SIZE..start % BLOCK_SIZE + block_write_size];
            dest.copy_from_slice(&buf[written_size..written_size + block_write_size]);
            block_device.write_block(block_id as usize, &data_block)?;

            written_size += block_write_size;
            start = current_block_end;
        }

        self.size = self.size.max((offset + written_size) as u32);
        Ok(written_size)
    }

    /// 检查 inode 是否可信：指针都在卷内，`size` 不超过可寻址范围。
    pub fn validate(
        &self,
        total_blocks: usize,
        block_device: &Arc<dyn BlockDevice>,
    ) -> Result<()> {
        let in_volume = |block_id: &BlockId| (*block_id as usize) < total_blocks;

        let pointers_ok = self
            .direct
            .iter()
            .flatten()
            .chain(&self.indirect)
            .all(in_volume);
        if self.size as usize > MAX_FILE_SIZE || !pointers_ok {
            return Err(Error::InvalidVolume);
        }

        if let Some(indirect) = self.indirect {
            if !load_indirect(indirect, block_device)?.iter().flatten().all(in_volume) {
                return Err(Error::InvalidVolume);
            }
        }

        Ok(())
    }

    /// 清空索引，返回其持有的全部块，包括间接块。
    pub fn clear(&mut self, block_device: &Arc<dyn BlockDevice>) -> Result<Vec<BlockId>> {
        let mut blocks: Vec<BlockId> = self.direct.iter().flatten().copied().collect();

        if let Some(indirect) = self.indirect {
            blocks.extend(load_indirect(indirect, block_device)?.iter().flatten());
            blocks.push(indirect);
        }

        *self = Self::default();
        Ok(blocks)
    }

    /// 容纳 `size` 字节所需的数据块数
    #[inline]
    pub fn count_data_block(size: u32) -> usize {
        (size as usize).div_ceil(BLOCK_SIZE)
    }
}

impl InodeSlot {
    #[inline]
    pub fn as_used(&self) -> Option<&DiskInode> {
        match self {
            Self::Used(inode) => Some(inode),
            Self::Free => None,
        }
    }

    #[inline]
    pub fn as_used_mut(&mut self) -> Option<&mut DiskInode> {
        match self {
            Self::Used(inode) => Some(inode),
            Self::Free => None,
        }
    }

    #[inline]
    pub fn is_free(&self) -> bool {
        matches!(self, Self::Free)
    }

    /// 把该槽位的 `INODE_SIZE` 字节写入 `buf`。
    pub fn encode_into(&self, buf: &mut [u8]) {
        let default = DiskInode::default();
        let (size, inode) = match self {
            Self::Free => (NIL, &default),
            Self::Used(inode) => (inode.size as i32, inode),
        };

        write_i32(buf, 0, size);
        for (i, &ptr) in inode.direct.iter().enumerate() {
            write_ptr(buf, 4 + i * 4, ptr);
        }
        write_ptr(buf, 4 + DIRECT_COUNT * 4, inode.indirect);
    }

    pub fn decode(buf: &[u8]) -> Self {
        let size = read_i32(buf, 0);
        if size < 0 {
            return Self::Free;
        }

        let mut inode = DiskInode {
            size: size as u32,
            ..Default::default()
        };
        for (i, ptr) in inode.direct.iter_mut().enumerate() {
            *ptr = read_ptr(buf, 4 + i * 4);
        }
        inode.indirect = read_ptr(buf, 4 + DIRECT_COUNT * 4);

        Self::Used(inode)
    }
}

fn load_indirect(block_id: BlockId, block_device: &Arc<dyn BlockDevice>) -> Result<IndirectBlock> {
    let mut data_block: DataBlock = [0; BLOCK_SIZE];
    block_device.read_block(block_id as usize, &mut data_block)?;

    let mut pointers = [None; INDIRECT_COUNT];
    for (i, ptr) in pointers.iter_mut().enumerate() {
        *ptr = read_ptr(&data_block, i * 4);
    }

    Ok(pointers)
}

fn store_indirect(
    block_id: BlockId,
    pointers: &IndirectBlock,
    block_device: &Arc<dyn BlockDevice>,
) -> Result<()> {
    let mut data_block: DataBlock = [0; BLOCK_SIZE];
    for (i, &ptr) in pointers.iter().enumerate() {
        write_ptr(&mut data_block, i * 4, ptr);
    }

    block_device.write_block(block_id as usize, &data_block)?;
    Ok(())
}
