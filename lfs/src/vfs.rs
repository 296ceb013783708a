//! # 索引节点层
//!
//! 位于内存的只读文件视图：[`Inode`] 把磁盘 inode 的
//! 直接块与间接块遍历收拢成按字节偏移的读取，
//! 目录查找也建立在它之上。所有磁盘访问都经过块缓存。

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use crate::codec::dec32;
use crate::layout::{Dinode, DirEntry, InodeKind};
use crate::lfs::LogFileSystem;
use crate::{FsError, BSIZE, NDIRECT};

pub struct Inode {
    fs: Arc<LogFileSystem>,
    inum: u32,
}

impl Inode {
    #[inline]
    pub(crate) fn new(fs: Arc<LogFileSystem>, inum: u32) -> Self {
        Self { fs, inum }
    }

    #[inline]
    pub fn inum(&self) -> u32 {
        self.inum
    }

    pub fn size(&self) -> Result<u32, FsError> {
        Ok(self.dinode()?.size)
    }

    pub fn kind(&self) -> Result<InodeKind, FsError> {
        Ok(self.dinode()?.kind)
    }

    /// 从 `offset` 起读出至多 `buf.len()` 字节，返回实际读出的字节数
    pub fn read_at(&self, offset: usize, buf: &mut [u8]) -> Result<usize, FsError> {
        let dinode = self.dinode()?;
        let size = dinode.size as usize;
        if offset >= size {
            return Ok(0);
        }
        let end = size.min(offset + buf.len());

        let mut read = 0;
        let mut off = offset;
        while off < end {
            let blockno = self.block_for(&dinode, off / BSIZE)?;
            let block = self.fs.bread(blockno).ok_or(FsError::Io)?;

            let begin = off % BSIZE;
            let len = (BSIZE - begin).min(end - off);
            buf[read..read + len].copy_from_slice(&block[begin..begin + len]);
            read += len;
            off += len;
        }

        Ok(read)
    }

    /// 在当前目录下按名字查找
    pub fn find(&self, name: &str) -> Result<Option<Inode>, FsError> {
        for entry in self.entries()? {
            if entry.name() == name {
                return Ok(self.fs.inode(entry.inum as u32));
            }
        }
        Ok(None)
    }

    /// 列出当前目录下的所有名字
    pub fn ls(&self) -> Result<Vec<String>, FsError> {
        Ok(self
            .entries()?
            .iter()
            .map(|entry| String::from(entry.name()))
            .collect())
    }
}

impl Inode {
    /// 读出磁盘 inode；inode 独占一个块，位于偏移 0 处
    fn dinode(&self) -> Result<Dinode, FsError> {
        let blockno = self.fs.inode_block_for(self.inum).ok_or(FsError::Corrupt)?;
        let buf = self.fs.bread(blockno).ok_or(FsError::Io)?;
        Ok(Dinode::decode(&buf[..]))
    }

    /// 文件内第 `fbn` 块对应的磁盘块号
    fn block_for(&self, dinode: &Dinode, fbn: usize) -> Result<u32, FsError> {
        if fbn < NDIRECT {
            return Ok(dinode.addrs[fbn]);
        }

        let indirect = dinode.addrs[NDIRECT];
        if indirect == 0 {
            return Err(FsError::Corrupt);
        }
        let buf = self.fs.bread(indirect).ok_or(FsError::Io)?;
        Ok(dec32(&buf[(fbn - NDIRECT) * 4..]))
    }

    /// 读出目录的全部有效目录项
    fn entries(&self) -> Result<Vec<DirEntry>, FsError> {
        let dinode = self.dinode()?;
        if !dinode.is_dir() {
            return Err(FsError::Corrupt);
        }

        let mut content = vec![0; dinode.size as usize];
        self.read_at(0, &mut content)?;

        Ok(content
            .chunks_exact(DirEntry::DISK_SIZE)
            .map(DirEntry::decode)
            .filter(|entry| !entry.is_empty())
            .collect())
    }
}
