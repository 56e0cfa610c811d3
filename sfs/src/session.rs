//! 打开文件会话：句柄指向哪个 inode，读写位置在哪里。

use alloc::vec;
use alloc::vec::Vec;

use derive_more::{From, Into};

use crate::{Error, Result};

/// 打开文件的句柄，即会话表中的下标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, From, Into)]
pub struct Fd(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub inode_id: u32,
    /// 字节偏移，操作之间始终满足 `0 <= offset <= size`
    pub offset: usize,
}

#[derive(Debug)]
pub struct SessionTable {
    slots: Vec<Option<Session>>,
}

impl SessionTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
        }
    }

    /// `inode_id` 上已打开会话的句柄
    pub fn find(&self, inode_id: u32) -> Option<Fd> {
        self.slots
            .iter()
            .position(|slot| slot.is_some_and(|session| session.inode_id == inode_id))
            .map(Fd::from)
    }

    #[inline]
    pub fn has_free_slot(&self) -> bool {
        self.slots.iter().any(Option::is_none)
    }

    /// 在第一个空闲槽位上打开会话。
    pub fn open(&mut self, inode_id: u32, offset: usize) -> Result<Fd> {
        let index = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(Error::TooManyOpenFiles)?;
        self.slots[index] = Some(Session { inode_id, offset });

        Ok(Fd::from(index))
    }

    pub fn close(&mut self, fd: Fd) -> Result<Session> {
        self.slots
            .get_mut(usize::from(fd))
            .and_then(Option::take)
            .ok_or(Error::NotFound)
    }

    pub fn get(&self, fd: Fd) -> Result<&Session> {
        self.slots
            .get(usize::from(fd))
            .and_then(Option::as_ref)
            .ok_or(Error::NotFound)
    }

    pub fn get_mut(&mut self, fd: Fd) -> Result<&mut Session> {
        self.slots
            .get_mut(usize::from(fd))
            .and_then(Option::as_mut)
            .ok_or(Error::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots() {
        let mut table = SessionTable::new(2);

        assert_eq!(Ok(Fd::from(0)), table.open(5, 0));
        assert_eq!(Ok(Fd::from(1)), table.open(6, 10));
        assert_eq!(Err(Error::TooManyOpenFiles), table.open(7, 0));
        assert!(!table.has_free_slot());

        let fd = table.find(6).unwrap();
        assert_eq!(1, usize::from(fd));
        assert_eq!(10, table.get(fd).unwrap().offset);
        assert_eq!(5, table.close(Fd::from(0)).unwrap().inode_id);
        assert_eq!(Err(Error::NotFound), table.close(Fd::from(0)));
        assert_eq!(Err(Error::NotFound), table.get(Fd::from(9)).map(|_| ()));
        assert_eq!(Ok(Fd::from(0)), table.open(7, 0));
    }
}
