//! # 磁盘数据结构层
//!
//! lfs 的磁盘布局：
//! 启动块 | 超级块 | 检查点1 | 检查点2 | 段区域
//!
//! 段区域由定长的段组成，每段的第一块是段摘要，
//! 描述其余块的归属；inode 块、数据块、间接块与
//! imap 块都顺序写入段中。

mod super_block;
pub use super_block::SuperBlock;

mod inode;
pub use inode::{Dinode, InodeKind};

/// 目录项，也属于磁盘文件系统数据结构
mod dir_entry;
pub use dir_entry::DirEntry;

mod segment;
pub use segment::{segment_of, summary_block, BlockKind, SegmentSummary, SummaryEntry};

mod imap;
pub use imap::ImapBlock;

mod checkpoint;
pub use checkpoint::Checkpoint;
