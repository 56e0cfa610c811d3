use core::ops::Range;

use super::{DIR_ENTRY_SIZE, read_i32, write_i32};
use crate::{BLOCK_SIZE, BlockId, DataBlock, Error, INODE_TABLE_BLOCKS, MAGIC, MAX_FILES, ROOT_INODE, Result};

/// 超级块：
/// - 标识合法的卷；
/// - 记录推导其他区域所需的几何参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuperBlock {
    /// 魔数：标识 sfs 卷
    magic: u32,
    pub block_size: u32,
    /// 整个卷的块数
    pub total_blocks: u32,
    pub inode_table_blocks: u32,
    pub root_inode: u32,
}

impl SuperBlock {
    #[inline]
    pub fn new(total_blocks: u32) -> Self {
        Self {
            magic: MAGIC,
            block_size: BLOCK_SIZE as u32,
            total_blocks,
            inode_table_blocks: INODE_TABLE_BLOCKS as u32,
            root_inode: ROOT_INODE,
        }
    }

    /// 检查本实现离不开的字段。
    pub fn is_valid(&self) -> bool {
        self.magic == MAGIC
            && self.block_size == BLOCK_SIZE as u32
            && self.inode_table_blocks == INODE_TABLE_BLOCKS as u32
            && self.root_inode == ROOT_INODE
    }

    pub fn encode(&self) -> DataBlock {
        let mut block = [0; BLOCK_SIZE];
        let fields = [
            self.magic,
            self.block_size,
            self.total_blocks,
            self.inode_table_blocks,
            self.root_inode,
        ];
        for (i, field) in fields.into_iter().enumerate() {
            write_i32(&mut block, i * 4, field as i32);
        }

        block
    }

    pub fn decode(block: &[u8]) -> Self {
        let field = |i: usize| read_i32(block, i * 4) as u32;
        Self {
            magic: field(0),
            block_size: field(1),
            total_blocks: field(2),
            inode_table_blocks: field(3),
            root_inode: field(4),
        }
    }
}

/// 卷中各区域的位置。
///
/// 0 号块是超级块，其后是 inode 表，空闲块表占最后几块，中间都是数据。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    total_blocks: u32,
    free_map_blocks: u32,
}

impl Geometry {
    /// 空的根目录表所占块数
    pub const ROOT_DIR_BLOCKS: usize = (MAX_FILES * DIR_ENTRY_SIZE).div_ceil(BLOCK_SIZE);

    pub fn new(total_blocks: usize) -> Result<Self> {
        // 空闲块表每块占一字节
        let free_map_blocks = total_blocks.div_ceil(BLOCK_SIZE);
        let minimum = 1 + INODE_TABLE_BLOCKS + Self::ROOT_DIR_BLOCKS + free_map_blocks;

        if total_blocks < minimum || total_blocks > i32::MAX as usize {
            log::error!("cannot lay out a volume of {total_blocks} blocks");
            return Err(Error::InvalidVolume);
        }

        Ok(Self {
            total_blocks: total_blocks as u32,
            free_map_blocks: free_map_blocks as u32,
        })
    }

    #[inline]
    pub fn total_blocks(&self) -> usize {
        self.total_blocks as usize
    }

    #[inline]
    pub fn inode_table(&self) -> Range<usize> {
        1..1 + INODE_TABLE_BLOCKS
    }

    /// 第一个数据块，格式化时交给根目录
    #[inline]
    pub fn data_start(&self) -> BlockId {
        (1 + INODE_TABLE_BLOCKS) as BlockId
    }

    #[inline]
    pub fn free_map(&self) -> Range<usize> {
        let start = (self.total_blocks - self.free_map_blocks) as usize;
        start..self.total_blocks as usize
    }

    /// 从不存放文件数据的块：超级块、inode 表、空闲块表
    pub fn reserved(&self) -> impl Iterator<Item = BlockId> {
        (0..1)
            .chain(self.inode_table())
            .chain(self.free_map())
            .map(|id| id as BlockId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_geometry() {
        let geometry = Geometry::new(crate::DEFAULT_TOTAL_BLOCKS).unwrap();

        assert_eq!(1..7, geometry.inode_table());
        assert_eq!(7, geometry.data_start());
        assert_eq!(4092..4096, geometry.free_map());
        assert_eq!(3, Geometry::ROOT_DIR_BLOCKS);
        assert_eq!(11, geometry.reserved().count());
    }

    #[test]
    fn too_small() {
        assert_eq!(Err(Error::InvalidVolume), Geometry::new(10));
        assert!(Geometry::new(11).is_ok());
    }

    #[test]
    fn super_block_codec() {
        let super_block = SuperBlock::new(4096);
        let block = super_block.encode();

        assert_eq!(&0xACBD_0005u32.to_le_bytes(), &block[..4]);
        assert_eq!(super_block, SuperBlock::decode(&block));
        assert!(!SuperBlock::decode(&[0; BLOCK_SIZE]).is_valid());
    }
}
