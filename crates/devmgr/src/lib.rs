//! 设备管理器
//!
//! 此 crate 实现驱动框架中协调全部设备宿主的部分，包括：
//!
//! - [`DeviceManager`] - 宿主启动、驱动安装、按服务名加载/卸载与电源状态下发
//! - [`HostClient`] / [`DeviceTokenClient`] - 管理器侧的宿主与设备记录
//! - [`ServiceRegistry`] - 全局服务名注册表
//! - [`StaticAttributeManager`] - 内存中的主机与设备配置
//!
//! # 外部协作者
//!
//! 通过 [`ManagerContext`] 在构造时注入：
//! - [`hdf::AttributeManager`]: 主机与设备配置表
//! - [`hdf::DriverInstaller`]: 启动宿主进程
//! - [`hdf::PowerStateManager`]: 全局唤醒锁管理

#![no_std]

extern crate alloc;

pub mod attribute;
pub mod host_client;
pub mod manager;
pub mod registry;
pub mod token_client;

// Re-export attribute
pub use attribute::{HostConfig, StaticAttributeManager};

// Re-export host_client
pub use host_client::HostClient;

// Re-export manager
pub use manager::{DeviceManager, ManagerContext};

// Re-export registry
pub use registry::ServiceRegistry;

// Re-export token_client
pub use token_client::DeviceTokenClient;
