//! 设备宿主服务
//!
//! 此 crate 实现运行在设备宿主进程中的部分，包括：
//!
//! - [`DeviceHost`] - 宿主内设备集合，负责驱动实例的加载、卸载与电源状态下发
//! - [`Device`] / [`DeviceNode`] - 逻辑设备与其上加载的驱动实例
//! - [`DeviceObject`] - 驱动可见的设备对象
//! - [`ServiceObserver`] - 宿主内的服务名订阅表
//! - [`PowerStateToken`] / [`WakeLockRef`] - 唤醒锁引用计数与恢复/挂起回调
//!
//! # 外部协作者
//!
//! - [`DriverLoader`]: 把设备描述映射为驱动入口
//! - [`hdf::DevmgrService`]: 设备管理器（通常位于另一个进程）
//! - [`hdf::ServiceManager`]: 全局服务名注册表
//!
//! 它们通过 [`HostContext`] 在构造 [`DeviceHost`] 时注入。

#![no_std]

extern crate alloc;

pub mod device;
pub mod host;
pub mod loader;
pub mod node;
pub mod object;
pub mod observer;
pub mod power;
pub mod sref;

// Re-export host
pub use host::{DeviceHost, HostContext};

// Re-export device
pub use device::Device;

// Re-export node
pub use node::DeviceNode;

// Re-export object
pub use object::DeviceObject;

// Re-export loader
pub use loader::{DriverEntry, DriverLoader};

// Re-export observer
pub use observer::ServiceObserver;

// Re-export power
pub use power::{PowerEventListener, PowerStateToken};

// Re-export sref
pub use sref::{WakeLockRef, WakeRefListener};
