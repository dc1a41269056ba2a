//! 同步原语
//!
//! 向驱动框架的其它模块提供基本的锁原语，包括自旋锁和读写锁。
//!
//! 锁的外层接口由 [`lock_api`] 提供，本 crate 只实现底层的原子自旋逻辑：
//! - [`RawSpinLock`] 实现 [`lock_api::RawMutex`]
//! - [`RawSpinRwLock`] 实现 [`lock_api::RawRwLock`]
//!
//! 驱动宿主运行在普通进程中，不涉及中断屏蔽，因此这里的锁只负责互斥。

#![no_std]

mod raw_spin_lock;
mod rwlock;
mod spin_lock;

pub use raw_spin_lock::RawSpinLock;
pub use rwlock::{RawSpinRwLock, RwLock, RwLockReadGuard, RwLockWriteGuard};
pub use spin_lock::{SpinLock, SpinLockGuard};
