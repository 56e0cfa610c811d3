#[cfg(test)]
mod tests;

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use block_dev::{BlockDevice, DeviceError, check_access};
use sfs::{BLOCK_SIZE, SimpleFileSystem};

/// 宿主机文件中的卷镜像
#[derive(Debug)]
pub struct BlockFile {
    file: Mutex<File>,
    block_size: usize,
    num_blocks: usize,
}

impl BlockFile {
    /// 创建（或截断）镜像，并把它的长度设为 `num_blocks` 块。
    pub fn create(path: impl AsRef<Path>, block_size: usize, num_blocks: usize) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len((block_size * num_blocks) as u64)?;

        Ok(Self {
            file: Mutex::new(file),
            block_size,
            num_blocks,
        })
    }

    /// 打开已有镜像，其长度须恰好为 `num_blocks` 块。
    pub fn open(path: impl AsRef<Path>, block_size: usize, num_blocks: usize) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let len = file.metadata()?.len();
        if len != (block_size * num_blocks) as u64 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("image is {len} bytes, expected {num_blocks} blocks of {block_size}"),
            ));
        }

        Ok(Self {
            file: Mutex::new(file),
            block_size,
            num_blocks,
        })
    }

    fn seek_to(&self, file: &mut File, block_id: usize) -> io::Result<()> {
        file.seek(SeekFrom::Start((block_id * self.block_size) as u64))?;
        Ok(())
    }
}

impl BlockDevice for BlockFile {
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
        let mut file = self.file.lock().map_err(|_| DeviceError::Io)?;
        self.seek_to(&mut file, block_id)
            .and_then(|()| file.read_exact(buf))
            .map_err(|err| {
                log::error!("reading block {block_id}: {err}");
                DeviceError::Io
            })
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<(), DeviceError> {
        check_access(self, block_id, buf.len())?;
        let mut file = self.file.lock().map_err(|_| DeviceError::Io)?;
        self.seek_to(&mut file, block_id)
            .and_then(|()| file.write_all(buf))
            .map_err(|err| {
                log::error!("writing block {block_id}: {err}");
                DeviceError::Io
            })
    }
}

/// 在 `path` 处格式化一个 `num_blocks` 块的新镜像
pub fn format(path: impl AsRef<Path>, num_blocks: usize) -> sfs::Result<SimpleFileSystem> {
    let block_file = BlockFile::create(path, BLOCK_SIZE, num_blocks).map_err(|err| {
        log::error!("creating image: {err}");
        DeviceError::Io
    })?;
    SimpleFileSystem::format(Arc::new(block_file))
}

/// 挂载 `path` 处的镜像，块数由文件长度决定
pub fn mount(path: impl AsRef<Path>) -> sfs::Result<SimpleFileSystem> {
    let path = path.as_ref();
    let block_file = path
        .metadata()
        .and_then(|meta| BlockFile::open(path, BLOCK_SIZE, meta.len() as usize / BLOCK_SIZE))
        .map_err(|err| {
            log::error!("opening image {}: {err}", path.display());
            DeviceError::Io
        })?;
    SimpleFileSystem::mount(Arc::new(block_file))
}
