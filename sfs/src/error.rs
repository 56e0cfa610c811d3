use core::fmt;

use block_dev::DeviceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// 文件名或句柄无法解析
    NotFound,
    /// 会话槽位已全部占用
    TooManyOpenFiles,
    DirectoryFull,
    NoFreeInode,
    OutOfSpace,
    /// 偏移超出直接与间接指针可寻址的范围
    FileTooLarge,
    /// 偏移不在 `[0, size]` 之内
    InvalidSeek,
    NameTooLong,
    /// 空文件名，或含有 NUL 的文件名
    InvalidName,
    /// 超级块、几何参数或元数据损坏
    InvalidVolume,
    Device(DeviceError),
}

pub type Result<T> = core::result::Result<T, Error>;

impl From<DeviceError> for Error {
    #[inline]
    fn from(err: DeviceError) -> Self {
        Self::Device(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => f.write_str("no such file or handle"),
            Self::TooManyOpenFiles => f.write_str("too many open files"),
            Self::DirectoryFull => f.write_str("directory is full"),
            Self::NoFreeInode => f.write_str("no free inode"),
            Self::OutOfSpace => f.write_str("no space left on volume"),
            Self::FileTooLarge => f.write_str("file too large"),
            Self::InvalidSeek => f.write_str("seek outside of file"),
            Self::NameTooLong => f.write_str("file name too long"),
            Self::InvalidName => f.write_str("invalid file name"),
            Self::InvalidVolume => f.write_str("not a valid sfs volume"),
            Self::Device(err) => write!(f, "device error: {err}"),
        }
    }
}

impl core::error::Error for Error {}
