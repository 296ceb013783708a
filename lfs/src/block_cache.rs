//! # 块缓存层
//!
//! 块设备读写速度一般慢于内存读写速度，因此我们在内存中开辟
//! 定量的缓冲区，把即将操作的块复制到内存中；同一块的并发访问
//! 也经由缓冲区的独占锁串行化。
//!
//! 使用方式：
//! - 取某个块的缓冲区调用 [`BufCache::bread`]；
//! - 改完缓冲区内容后调用 [`Buf::bwrite`] 写穿到设备；
//! - 用完即释放（drop 即 brelse），不要长期持有。
//!
//! 锁的层级固定：先取缓存全局锁，释放后才阻塞等待缓冲区锁；
//! 全局锁只保护元数据与链表，绝不跨越设备读写持有。
//! `refcnt`、`dev`、`blockno`、`valid` 只在持有全局锁时改动。

use alloc::sync::Arc;
use core::array;
use core::ops::{Deref, DerefMut};

use spin::{Mutex, MutexGuard};

use crate::BlockDevice;
use crate::DataBlock;
use crate::{BSIZE, NBUF};

/// LRU 链表哨兵的下标
const HEAD: usize = NBUF;

/// 单个缓冲区的元数据，全部由缓存全局锁保护
#[derive(Clone, Copy, PartialEq, Eq)]
struct BufMeta {
    dev: u32,
    blockno: u32,
    /// 未决的持有者数量；归零后缓冲区才可被回收
    refcnt: u32,
    /// 缓冲区内容是否已从设备读入
    valid: bool,
}

impl BufMeta {
    const fn empty() -> Self {
        Self {
            dev: 0,
            blockno: 0,
            refcnt: 0,
            valid: false,
        }
    }
}

/// 缓存全局状态：各缓冲区元数据，以及带哨兵的 LRU 双向循环链表。
/// 链表用数组加下标实现，哨兵位于 `HEAD`；
/// `next[HEAD]` 是最近释放端，`prev[HEAD]` 是最久未用端。
struct CacheCtrl {
    meta: [BufMeta; NBUF],
    prev: [usize; NBUF + 1],
    next: [usize; NBUF + 1],
}

impl CacheCtrl {
    fn unlink(&mut self, i: usize) {
        let (prev, next) = (self.prev[i], self.next[i]);
        self.next[prev] = next;
        self.prev[next] = prev;
    }

    /// 插到哨兵之后，即最近释放端
    fn push_front(&mut self, i: usize) {
        let first = self.next[HEAD];
        self.prev[i] = HEAD;
        self.next[i] = first;
        self.prev[first] = i;
        self.next[HEAD] = i;
    }
}

/// 块缓存：定量缓冲区加底层块设备。
/// 整个内核初始化一次，再由各线程共享引用。
pub struct BufCache {
    device: Arc<dyn BlockDevice>,
    ctrl: Mutex<CacheCtrl>,
    /// 各缓冲区的数据与独占锁；锁的持有即对 `data` 的独占
    data: [Mutex<DataBlock>; NBUF],
}

impl BufCache {
    pub fn new(device: Arc<dyn BlockDevice>) -> Self {
        let mut ctrl = CacheCtrl {
            meta: [BufMeta::empty(); NBUF],
            prev: [HEAD; NBUF + 1],
            next: [HEAD; NBUF + 1],
        };
        for i in 0..NBUF {
            ctrl.push_front(i);
        }

        Self {
            device,
            ctrl: Mutex::new(ctrl),
            data: array::from_fn(|_| Mutex::new([0; BSIZE])),
        }
    }

    /// 查找 `(dev, blockno)` 对应的缓冲区；未缓存则回收一个空闲缓冲区。
    /// 成功时返回已锁定的缓冲区；所有缓冲区都被占用时返回 `None`。
    fn bget(&self, dev: u32, blockno: u32) -> Option<Buf<'_>> {
        let mut ctrl = self.ctrl.lock();

        // 命中：从最近释放端向最久未用端扫描
        let mut i = ctrl.next[HEAD];
        while i != HEAD {
            if ctrl.meta[i].dev == dev && ctrl.meta[i].blockno == blockno {
                ctrl.meta[i].refcnt += 1;
                drop(ctrl);
                // 全局锁已释放，才阻塞等待缓冲区锁
                let guard = self.data[i].lock();
                return Some(Buf {
                    cache: self,
                    index: i,
                    dev,
                    blockno,
                    guard: Some(guard),
                });
            }
            i = ctrl.next[i];
        }

        // 未命中：从最久未用端回收 refcnt == 0 的缓冲区
        let mut i = ctrl.prev[HEAD];
        while i != HEAD {
            if ctrl.meta[i].refcnt == 0 {
                ctrl.meta[i] = BufMeta {
                    dev,
                    blockno,
                    refcnt: 1,
                    valid: false,
                };
                drop(ctrl);
                let guard = self.data[i].lock();
                return Some(Buf {
                    cache: self,
                    index: i,
                    dev,
                    blockno,
                    guard: Some(guard),
                });
            }
            i = ctrl.prev[i];
        }

        // 所有缓冲区都有持有者
        None
    }

    /// 返回锁定且内容有效的缓冲区。
    /// 缓冲区耗尽或设备读失败时返回 `None`；
    /// 读失败的缓冲区被完整释放，槽位可以再被回收。
    pub fn bread(&self, dev: u32, blockno: u32) -> Option<Buf<'_>> {
        let mut buf = self.bget(dev, blockno)?;
        if !buf.valid() {
            if !self.device.read_block(blockno as usize, buf.data_mut()) {
                return None;
            }
            self.ctrl.lock().meta[buf.index].valid = true;
        }
        Some(buf)
    }
}

/// 已锁定的缓冲区。持有期间独占块数据；
/// 析构即 brelse：先在全局锁下归还引用计数，
/// 归零则移到最近释放端，最后释放缓冲区锁。
pub struct Buf<'a> {
    cache: &'a BufCache,
    index: usize,
    dev: u32,
    blockno: u32,
    guard: Option<MutexGuard<'a, DataBlock>>,
}

impl Buf<'_> {
    /// 有效位以全局锁下的元数据为准
    fn valid(&self) -> bool {
        self.cache.ctrl.lock().meta[self.index].valid
    }

    #[inline]
    pub fn dev(&self) -> u32 {
        self.dev
    }

    #[inline]
    pub fn blockno(&self) -> u32 {
        self.blockno
    }

    #[inline]
    pub fn data(&self) -> &DataBlock {
        self.guard.as_ref().unwrap()
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut DataBlock {
        self.guard.as_mut().unwrap()
    }

    /// 把缓冲区内容写穿到块设备。
    /// 对缓冲区锁的持有由 `Buf` 本身保证，无需再作检查。
    pub fn bwrite(&mut self) -> bool {
        self.cache
            .device
            .write_block(self.blockno as usize, self.data())
    }

    /// 释放缓冲区，与内核接口同名；等价于直接 drop
    #[inline]
    pub fn brelse(self) {
        drop(self);
    }
}

impl Deref for Buf<'_> {
    type Target = DataBlock;

    #[inline]
    fn deref(&self) -> &DataBlock {
        self.data()
    }
}

impl DerefMut for Buf<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut DataBlock {
        self.data_mut()
    }
}

impl Drop for Buf<'_> {
    fn drop(&mut self) {
        let mut ctrl = self.cache.ctrl.lock();
        ctrl.meta[self.index].refcnt -= 1;
        if ctrl.meta[self.index].refcnt == 0 {
            // 最后一个持有者离开：移到最近释放端
            ctrl.unlink(self.index);
            ctrl.push_front(self.index);
        }
        drop(ctrl);
        // 全局状态更新完毕，再释放缓冲区锁
        self.guard.take();
    }
}
