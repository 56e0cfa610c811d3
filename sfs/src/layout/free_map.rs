use alloc::vec;
use alloc::vec::Vec;

use crate::{BLOCK_SIZE, BlockId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum BlockState {
    #[default]
    Free = 0,
    Used = 1,
}

/// 空闲块表：整个卷每块一个状态，元数据区也包括在内。
///
/// 从 0 号块起首次适配分配。没有引用计数，释放仍被引用的块是调用者的错误。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeMap {
    states: Vec<BlockState>,
}

impl FreeMap {
    #[inline]
    pub fn new(total_blocks: usize) -> Self {
        Self {
            states: vec![BlockState::Free; total_blocks],
        }
    }

    /// 把第一个空闲块标为已用并返回；卷满时返回 `None`。
    pub fn alloc(&mut self) -> Option<BlockId> {
        let index = self
            .states
            .iter()
            .position(|&state| state == BlockState::Free)?;
        self.states[index] = BlockState::Used;
        log::trace!("allocated block {index}");

        Some(index as BlockId)
    }

    #[inline]
    pub fn mark_used(&mut self, block_id: BlockId) {
        self.states[block_id as usize] = BlockState::Used;
    }

    #[inline]
    pub fn dealloc(&mut self, block_id: BlockId) {
        self.states[block_id as usize] = BlockState::Free;
    }

    #[inline]
    pub fn is_free(&self, block_id: BlockId) -> bool {
        self.states
            .get(block_id as usize)
            .is_some_and(|&state| state == BlockState::Free)
    }

    pub fn free_blocks(&self) -> usize {
        self.states
            .iter()
            .filter(|&&state| state == BlockState::Free)
            .count()
    }

    /// 序列化为 `blocks` 个整块，每个状态一字节。
    pub fn encode(&self, blocks: usize) -> Vec<u8> {
        let mut bytes: Vec<u8> = self.states.iter().map(|&state| state as u8).collect();
        bytes.resize(blocks * BLOCK_SIZE, 0);
        bytes
    }

    /// 非零字节即已用块。
    pub fn decode(bytes: &[u8], total_blocks: usize) -> Self {
        let states = bytes
            .iter()
            .take(total_blocks)
            .map(|&byte| match byte {
                0 => BlockState::Free,
                _ => BlockState::Used,
            })
            .collect();

        Self { states }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_fit() {
        let mut map = FreeMap::new(4);
        map.mark_used(0);

        assert_eq!(Some(1), map.alloc());
        assert_eq!(Some(2), map.alloc());
        map.dealloc(1);
        assert_eq!(Some(1), map.alloc());
        assert_eq!(Some(3), map.alloc());
        assert_eq!(None, map.alloc());
        assert_eq!(0, map.free_blocks());
    }

    #[test]
    fn codec() {
        let mut map = FreeMap::new(3);
        map.mark_used(2);
        let bytes = map.encode(1);

        assert_eq!(BLOCK_SIZE, bytes.len());
        assert_eq!([0, 0, 1], bytes[..3]);
        assert_eq!(map, FreeMap::decode(&bytes, 3));
    }
}
