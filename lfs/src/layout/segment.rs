use crate::codec::{dec32, enc32};
use crate::{BSIZE, NMETA, SEGSIZE};

/// 段摘要条目记录的块类型，磁盘上为 32 位整数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum BlockKind {
    #[default]
    Empty = 0,
    Inode = 1,
    Data = 2,
    Indirect = 3,
    Imap = 4,
}

impl BlockKind {
    fn from_disk(v: u32) -> Self {
        match v {
            1 => Self::Inode,
            2 => Self::Data,
            3 => Self::Indirect,
            4 => Self::Imap,
            _ => Self::Empty,
        }
    }
}

/// 段摘要的单个条目。
/// `inum` 对 Empty 与 Imap 恒为 0；
/// `block_no` 对 Inode 与 Indirect 恒为 0，
/// 对 Data 是文件内块号，对 Imap 是 imap 分片序号。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SummaryEntry {
    pub kind: BlockKind,
    pub inum: u32,
    pub block_no: u32,
}

impl SummaryEntry {
    /// 磁盘上占据的字节数
    pub const DISK_SIZE: usize = 12;

    pub fn new(kind: BlockKind, inum: u32, block_no: u32) -> Self {
        Self {
            kind,
            inum,
            block_no,
        }
    }

    pub fn encode(&self, buf: &mut [u8]) {
        enc32(&mut buf[0..], self.kind as u32);
        enc32(&mut buf[4..], self.inum);
        enc32(&mut buf[8..], self.block_no);
    }

    pub fn decode(buf: &[u8]) -> Self {
        Self {
            kind: BlockKind::from_disk(dec32(&buf[0..])),
            inum: dec32(&buf[4..]),
            block_no: dec32(&buf[8..]),
        }
    }
}

/// 段摘要：每段的第一块，逐项描述其余 `SEGSIZE - 1` 块的归属
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SegmentSummary {
    pub entries: [SummaryEntry; SEGSIZE - 1],
}

const _: () = assert!(SegmentSummary::DISK_SIZE <= BSIZE);

impl SegmentSummary {
    /// 磁盘上占据的字节数
    pub const DISK_SIZE: usize = SummaryEntry::DISK_SIZE * (SEGSIZE - 1);

    pub fn encode(&self, buf: &mut [u8]) {
        for (i, entry) in self.entries.iter().enumerate() {
            entry.encode(&mut buf[i * SummaryEntry::DISK_SIZE..]);
        }
    }

    pub fn decode(buf: &[u8]) -> Self {
        let mut entries = [SummaryEntry::default(); SEGSIZE - 1];
        for (i, entry) in entries.iter_mut().enumerate() {
            *entry = SummaryEntry::decode(&buf[i * SummaryEntry::DISK_SIZE..]);
        }
        Self { entries }
    }
}

/// 块号所属的段号
#[inline]
pub fn segment_of(block: usize) -> usize {
    (block - NMETA) / SEGSIZE
}

/// 某段的段摘要所在块号
#[inline]
pub fn summary_block(segno: usize) -> usize {
    NMETA + segno * SEGSIZE
}
