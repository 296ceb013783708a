//! # 磁盘块管理器层
//!
//! 挂载镜像：校验超级块，在两份检查点中选取时间戳较新者，
//! 再顺着它记录的 imap 块地址重建完整的 inode 映射表。
//! 此后任一 inode 所在的块号都经由 [`LogFileSystem::inode_block_for`]
//! 这一个入口换算，与构建镜像时的内存 imap 相对应。

use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::block_cache::{Buf, BufCache};
use crate::layout::{Checkpoint, ImapBlock, SuperBlock};
use crate::vfs::Inode;
use crate::{FsError, CHECKPOINT1, CHECKPOINT2, NINODES, ROOTINO};

pub struct LogFileSystem {
    cache: Arc<BufCache>,
    dev: u32,
    superblock: SuperBlock,
    /// inode 号到 inode 所在块号的映射，挂载时重建
    imap: Vec<u32>,
}

impl LogFileSystem {
    /// 挂载设备 `dev` 上的文件系统
    pub fn open(cache: Arc<BufCache>, dev: u32) -> Result<Arc<Self>, FsError> {
        let superblock = {
            let buf = cache.bread(dev, 1).ok_or(FsError::Io)?;
            SuperBlock::decode(&buf[..])
        };
        if !superblock.is_valid() {
            return Err(FsError::Corrupt);
        }

        let cp1 = Self::read_checkpoint(&cache, dev, CHECKPOINT1 as u32)?;
        let cp2 = Self::read_checkpoint(&cache, dev, CHECKPOINT2 as u32)?;
        let checkpoint = Checkpoint::newer(&cp1, &cp2);

        let mut imap = Vec::with_capacity(NINODES);
        for &addr in checkpoint.imap.iter() {
            let buf = cache.bread(dev, addr).ok_or(FsError::Io)?;
            let block = ImapBlock::decode(&buf[..]);
            for &entry in block.entries.iter() {
                if imap.len() < NINODES {
                    imap.push(entry);
                }
            }
        }

        Ok(Arc::new(Self {
            cache,
            dev,
            superblock,
            imap,
        }))
    }

    fn read_checkpoint(
        cache: &Arc<BufCache>,
        dev: u32,
        blockno: u32,
    ) -> Result<Checkpoint, FsError> {
        let buf = cache.bread(dev, blockno).ok_or(FsError::Io)?;
        Ok(Checkpoint::decode(&buf[..]))
    }

    /// inode 所在的块号；未分配的 inode 返回 `None`
    pub fn inode_block_for(&self, inum: u32) -> Option<u32> {
        let blockno = *self.imap.get(inum as usize)?;
        (blockno != 0).then_some(blockno)
    }

    #[inline]
    pub fn superblock(&self) -> &SuperBlock {
        &self.superblock
    }

    #[inline]
    pub fn root_inode(self: &Arc<Self>) -> Inode {
        Inode::new(self.clone(), ROOTINO)
    }

    /// 凭借 inode 号获取 [`Inode`]
    pub fn inode(self: &Arc<Self>, inum: u32) -> Option<Inode> {
        self.inode_block_for(inum)?;
        Some(Inode::new(self.clone(), inum))
    }

    #[inline]
    pub(crate) fn bread(&self, blockno: u32) -> Option<Buf<'_>> {
        self.cache.bread(self.dev, blockno)
    }
}
