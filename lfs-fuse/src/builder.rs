use std::fs::OpenOptions;
use std::fs::File;
use std::io::Read;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use lfs::codec::{dec32, enc32};
use lfs::layout::{
    segment_of, summary_block, BlockKind, Checkpoint, Dinode, DirEntry, ImapBlock, InodeKind,
    SegmentSummary, SummaryEntry, SuperBlock,
};
use lfs::{
    DataBlock, BSIZE, FSSIZE, MAXFILE, NDIRECT, NENTRY, NINODEMAP, NINODES, NMETA, ROOTINO,
    SEGSIZE,
};

use crate::error::{BuildError, Result};

/// 从宿主机文件合成 lfs 镜像：块严格按递增顺序写进段区域。
/// 构建期间独占镜像文件与全部分配游标。
pub struct ImageBuilder {
    image: File,
    /// 下一个待分配的块号，段摘要块会被跳过
    freeblock: u32,
    /// 下一个 inode 号，0 号保留
    freeinode: u32,
    /// 内存中的 imap，构建收尾时由 `wimap` 落盘
    imp: [u32; NINODES],
    imap_blocks: [u32; NINODEMAP],
}

impl ImageBuilder {
    /// 打开并清零镜像，写入超级块，
    /// 分配根目录及其 `.`、`..` 两个目录项
    pub fn create(path: &Path) -> Result<Self> {
        let image = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| BuildError::io(path.display(), e))?;

        let mut builder = Self {
            image,
            freeblock: NMETA as u32,
            freeinode: 1,
            imp: [0; NINODES],
            imap_blocks: [0; NINODEMAP],
        };

        let zeroes = [0; BSIZE];
        for sec in 0..FSSIZE as u32 {
            builder.wsect(sec, &zeroes)?;
        }

        let mut buf = [0; BSIZE];
        SuperBlock::new().encode(&mut buf);
        builder.wsect(1, &buf)?;

        let rootino = builder.ialloc(InodeKind::Directory)?;
        assert_eq!(rootino, ROOTINO);
        builder.append_dirent(rootino, ".", rootino)?;
        builder.append_dirent(rootino, "..", rootino)?;

        Ok(builder)
    }

    /// 把一个宿主机文件以 `name` 为名装进根目录
    pub fn add_file(&mut self, name: &str, reader: &mut impl Read) -> Result<u32> {
        let inum = self.ialloc(InodeKind::File)?;
        self.append_dirent(ROOTINO, name, inum)?;

        let mut buf = [0; BSIZE];
        loop {
            let n = reader.read(&mut buf).map_err(|e| BuildError::io(name, e))?;
            if n == 0 {
                break;
            }
            self.iappend(inum, &buf[..n])?;
        }

        Ok(inum)
    }

    /// 把根目录大小向上取整到整块，落盘 imap 与两份检查点；
    /// 返回首个未分配的块号
    pub fn finish(mut self) -> Result<u32> {
        let mut root = self.rinode(ROOTINO)?;
        root.size = (root.size / BSIZE as u32 + 1) * BSIZE as u32;
        self.winode(ROOTINO, &root)?;

        self.wimap()?;
        self.wchkpt(1)?;
        self.wchkpt(2)?;

        Ok(self.freeblock)
    }
}

impl ImageBuilder {
    fn wsect(&mut self, sec: u32, buf: &DataBlock) -> Result<()> {
        self.image
            .seek(SeekFrom::Start(sec as u64 * BSIZE as u64))
            .and_then(|_| self.image.write_all(buf))
            .map_err(|e| BuildError::io(format_args!("sector {sec}"), e))
    }

    fn rsect(&mut self, sec: u32, buf: &mut DataBlock) -> Result<()> {
        self.image
            .seek(SeekFrom::Start(sec as u64 * BSIZE as u64))
            .and_then(|_| self.image.read_exact(buf))
            .map_err(|e| BuildError::io(format_args!("sector {sec}"), e))
    }

    /// 分配下一个块并登记它的段摘要条目；
    /// 条目先于块号的交出落盘
    fn balloc(&mut self, kind: BlockKind, inum: u32, block_no: u32) -> Result<u32> {
        // 跳过段摘要块
        if (self.freeblock - NMETA as u32) % SEGSIZE as u32 == 0 {
            self.freeblock += 1;
        }
        if self.freeblock as usize >= FSSIZE {
            return Err(BuildError::Exhausted("blocks"));
        }

        let summary_bn = summary_block(segment_of(self.freeblock as usize)) as u32;
        let entry = (self.freeblock - summary_bn - 1) as usize;

        let mut buf = [0; BSIZE];
        self.rsect(summary_bn, &mut buf)?;
        let mut summary = SegmentSummary::decode(&buf);
        summary.entries[entry] = SummaryEntry::new(kind, inum, block_no);
        summary.encode(&mut buf);
        self.wsect(summary_bn, &buf)?;

        let block = self.freeblock;
        self.freeblock += 1;
        Ok(block)
    }

    /// 占用下一个 inode 号，并把空白 dinode 写进新分配的独立块
    fn ialloc(&mut self, kind: InodeKind) -> Result<u32> {
        if self.freeinode as usize >= NINODES {
            return Err(BuildError::Exhausted("inodes"));
        }
        let inum = self.freeinode;
        self.freeinode += 1;

        self.imp[inum as usize] = self.balloc(BlockKind::Inode, inum, 0)?;
        self.winode(inum, &Dinode::new(kind))?;
        Ok(inum)
    }

    fn winode(&mut self, inum: u32, dinode: &Dinode) -> Result<()> {
        let bn = self.imp[inum as usize];
        let mut buf = [0; BSIZE];
        self.rsect(bn, &mut buf)?;
        dinode.encode(&mut buf);
        self.wsect(bn, &buf)
    }

    fn rinode(&mut self, inum: u32) -> Result<Dinode> {
        let bn = self.imp[inum as usize];
        let mut buf = [0; BSIZE];
        self.rsect(bn, &mut buf)?;
        Ok(Dinode::decode(&buf))
    }

    fn append_dirent(&mut self, dir: u32, name: &str, inum: u32) -> Result<()> {
        let mut buf = [0; DirEntry::DISK_SIZE];
        DirEntry::new(name, inum as u16).encode(&mut buf);
        self.iappend(dir, &buf)
    }

    /// 文件 `inum` 尾部追加 `data`；直接块用尽后转入间接块，
    /// 目标块都在首次触碰时分配
    fn iappend(&mut self, inum: u32, data: &[u8]) -> Result<()> {
        let mut dinode = self.rinode(inum)?;
        let mut off = dinode.size as usize;
        let mut remaining = data;

        while !remaining.is_empty() {
            let fbn = off / BSIZE;
            if fbn >= MAXFILE {
                return Err(BuildError::InvalidArgument(format!(
                    "inode {inum}: file too large"
                )));
            }

            let block = if fbn < NDIRECT {
                if dinode.addrs[fbn] == 0 {
                    dinode.addrs[fbn] = self.balloc(BlockKind::Data, inum, fbn as u32)?;
                }
                dinode.addrs[fbn]
            } else {
                if dinode.addrs[NDIRECT] == 0 {
                    dinode.addrs[NDIRECT] = self.balloc(BlockKind::Indirect, inum, 0)?;
                }
                let mut indirect = [0; BSIZE];
                self.rsect(dinode.addrs[NDIRECT], &mut indirect)?;

                let at = (fbn - NDIRECT) * 4;
                let mut block = dec32(&indirect[at..]);
                if block == 0 {
                    block = self.balloc(BlockKind::Data, inum, fbn as u32)?;
                    enc32(&mut indirect[at..], block);
                    self.wsect(dinode.addrs[NDIRECT], &indirect)?;
                }
                block
            };

            let begin = off % BSIZE;
            let len = remaining.len().min(BSIZE - begin);
            let mut buf = [0; BSIZE];
            self.rsect(block, &mut buf)?;
            buf[begin..begin + len].copy_from_slice(&remaining[..len]);
            self.wsect(block, &buf)?;

            off += len;
            remaining = &remaining[len..];
        }

        dinode.size = off as u32;
        self.winode(inum, &dinode)
    }

    /// 把内存 imap 按块切片，逐块经分配器落盘
    fn wimap(&mut self) -> Result<()> {
        for i in 0..NINODEMAP {
            let mut block = ImapBlock::new();
            for j in 0..NENTRY {
                let inum = i * NENTRY + j;
                if inum < NINODES {
                    block.entries[j] = self.imp[inum];
                }
            }

            self.imap_blocks[i] = self.balloc(BlockKind::Imap, 0, i as u32)?;
            let mut buf = [0; BSIZE];
            block.encode(&mut buf);
            self.wsect(self.imap_blocks[i], &buf)?;
        }
        Ok(())
    }

    /// 检查点 1 记录 imap 地址、段使用位图与时间戳 1；
    /// 检查点 2 保持全零，时间戳 0 使它在挂载时被视为较旧
    fn wchkpt(&mut self, chkpt_no: u32) -> Result<()> {
        let mut buf = [0; BSIZE];
        if chkpt_no == 1 {
            let mut checkpoint = Checkpoint::new();
            checkpoint.imap.copy_from_slice(&self.imap_blocks);
            let used = (self.freeblock as usize - NMETA).div_ceil(SEGSIZE);
            for segno in 0..used {
                checkpoint.mark_segment(segno);
            }
            checkpoint.timestamp = 1;
            checkpoint.encode(&mut buf);
        }
        self.wsect(1 + chkpt_no, &buf)
    }
}

/// 宿主机路径对应的盘上文件名：剥掉开头的 `user/` 与 `_`，
/// 剩余部分不得再含 `/`
pub fn target_name(path: &Path) -> Result<&str> {
    let path = path
        .to_str()
        .ok_or_else(|| BuildError::InvalidArgument(format!("{}: not utf-8", path.display())))?;

    let name = path.strip_prefix("user/").unwrap_or(path);
    let name = name.strip_prefix('_').unwrap_or(name);
    if name.contains('/') {
        return Err(BuildError::InvalidArgument(format!(
            "{name}: name must not contain '/'"
        )));
    }

    Ok(name)
}
