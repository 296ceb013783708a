//! # 块设备接口层
//!
//! 块设备是以**块**为单位存储数据的设备；
//! [`BlockDevice`] 就是对读写块设备的抽象，
//! 实现了此特质的类型称为**块设备驱动**。
//!
//! 读写均为阻塞操作，以返回值表示成败：
//! 读失败时不得改动 `buf`，写不完整时不得报告成功。

use core::any::Any;

/// 块设备驱动特质
pub trait BlockDevice: Send + Sync + Any {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> bool;
    fn write_block(&self, block_id: usize, buf: &[u8]) -> bool;
}
