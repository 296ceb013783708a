use alloc::borrow::Cow;
use alloc::string::String;

use crate::codec::{dec16, enc16};
use crate::{BSIZE, DIRSIZ};

/// 目录项：inode 号加定长文件名。
/// 目录文件就是目录项的数组，空槽位全部字节为 0。
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub inum: u16,
    name: [u8; DIRSIZ],
}

const _: () = assert!(BSIZE % DirEntry::DISK_SIZE == 0);

impl DirEntry {
    /// 磁盘上占据的字节数
    pub const DISK_SIZE: usize = 16;

    /// 过长的名字截断到 `DIRSIZ` 字节以内；
    /// 截断点退到最近的字符边界，不在多字节字符中间落刀
    pub fn new(name: &str, inum: u16) -> Self {
        let mut len = name.len().min(DIRSIZ);
        while !name.is_char_boundary(len) {
            len -= 1;
        }

        let mut buf = [0; DIRSIZ];
        buf[..len].copy_from_slice(&name.as_bytes()[..len]);

        Self { inum, name: buf }
    }

    /// 磁盘上的字节可能不是合法 UTF-8，按有损方式解读
    pub fn name(&self) -> Cow<'_, str> {
        let len = self.name.iter().position(|&c| c == 0).unwrap_or(DIRSIZ);
        String::from_utf8_lossy(&self.name[..len])
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inum == 0 && self.name[0] == 0
    }

    pub fn encode(&self, buf: &mut [u8]) {
        enc16(&mut buf[0..], self.inum);
        buf[2..2 + DIRSIZ].copy_from_slice(&self.name);
    }

    pub fn decode(buf: &[u8]) -> Self {
        let mut name = [0; DIRSIZ];
        name.copy_from_slice(&buf[2..2 + DIRSIZ]);
        Self {
            inum: dec16(&buf[0..]),
            name,
        }
    }
}
