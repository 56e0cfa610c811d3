use alloc::vec;
use alloc::vec::Vec;

use spin::Mutex;

use crate::{BlockDevice, DeviceError, check_access};

/// 以内存为后备的块设备
#[derive(Debug)]
pub struct MemDisk {
    data: Mutex<Vec<u8>>,
    block_size: usize,
    num_blocks: usize,
}

impl MemDisk {
    pub fn new(block_size: usize, num_blocks: usize) -> Self {
        Self {
            data: Mutex::new(vec![0; block_size * num_blocks]),
            block_size,
            num_blocks,
        }
    }
}

impl BlockDevice for MemDisk {
    #[inline]
    fn block_size(&self) -> usize {
        self.block_size
    }

    #[inline]
    fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<(), DeviceError> {
        check_access(self, block_id, buf.len())?;
        let start = block_id * self.block_size;
        buf.copy_from_slice(&self.data.lock()[start..start + self.block_size]);
        Ok(())
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<(), DeviceError> {
        check_access(self, block_id, buf.len())?;
        let start = block_id * self.block_size;
        self.data.lock()[start..start + self.block_size].copy_from_slice(buf);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_round_trip() {
        let disk = MemDisk::new(16, 4);
        let data: Vec<u8> = (0..32).collect();
        disk.write_blocks(1, 2, &data).unwrap();

        assert_eq!(data, disk.read_blocks(1, 2).unwrap());
        assert_eq!(vec![0; 16], disk.read_blocks(0, 1).unwrap());
    }

    #[test]
    fn rejects_bad_access() {
        let disk = MemDisk::new(16, 4);

        assert_eq!(
            Err(DeviceError::OutOfRange {
                block_id: 4,
                num_blocks: 4
            }),
            disk.write_block(4, &[0; 16])
        );
        assert_eq!(
            Err(DeviceError::BadLength {
                expected: 32,
                found: 16
            }),
            disk.write_blocks(0, 2, &[0; 16])
        );
    }
}
