//! 驱动框架公共定义
//!
//! 此 crate 提供设备管理器与设备宿主之间共享的类型和接口，包括：
//!
//! - [`DeviceInfo`] - 来自配置的设备描述
//! - [`HdfError`] - 框架错误码
//! - [`PowerState`] / [`PowerTokenState`] - 电源状态
//! - [`DevHostService`] / [`DevmgrService`] - 跨进程服务接口
//! - [`ServiceManager`] - 全局服务名注册表接口
//!
//! # 外部协作者
//!
//! 以下 trait 由框架之外的组件实现，在构造时注入：
//! - [`AttributeManager`]: 主机与设备配置表
//! - [`DriverInstaller`]: 启动设备宿主进程
//! - [`PowerStateManager`]: 全局唤醒锁管理

#![no_std]

extern crate alloc;

pub mod config;
pub mod device_info;
pub mod error;
pub mod ops;
pub mod power;
pub mod service;

// Re-export config
pub use config::{AttributeManager, DEVMGR_HOST_ID, HostInfo, INVALID_HOST_PID};

// Re-export device_info
pub use device_info::{DeviceInfo, PreloadMode, ServicePolicy, make_hardware_id};

// Re-export error
pub use error::{HdfError, HdfResult};

// Re-export ops
pub use ops::{DevHostService, DeviceToken, DevmgrService, DriverInstaller};

// Re-export power
pub use power::{PowerState, PowerStateManager, PowerStateTokenIf, PowerTokenState};

// Re-export service
pub use service::{DeviceClass, DeviceService, ServiceManager, ServiceSubscriber};
