//! 配置常量与配置源接口
//!
//! 主机表和设备表来自外部的属性管理器（静态配置），通过 [`AttributeManager`]
//! 注入到设备管理器中。

use alloc::{string::String, sync::Arc, vec::Vec};

use crate::device_info::DeviceInfo;

/// 硬件 ID 中主机 ID 所在的位移
pub const HOST_ID_SHIFT: u32 = 16;

/// 宿主进程尚未启动时的进程号
pub const INVALID_HOST_PID: i32 = -1;

/// 保留给设备管理器自身的主机 ID，配置中的主机不能使用
pub const DEVMGR_HOST_ID: u16 = 0;

/// 主机描述（来自配置）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    /// 主机 ID
    pub host_id: u16,
    /// 主机名
    pub host_name: String,
    /// 启动优先级，数值越小越先启动
    pub priority: u16,
}

impl HostInfo {
    /// 创建主机描述
    pub fn new(host_id: u16, host_name: &str, priority: u16) -> Self {
        Self {
            host_id,
            host_name: String::from(host_name),
            priority,
        }
    }
}

/// 属性管理器
///
/// 此 trait 抽象了静态配置的读取，设备管理器在构造时接收其实现。
pub trait AttributeManager: Send + Sync {
    /// 获取全部主机描述，按启动顺序排列
    fn host_list(&self) -> Vec<HostInfo>;

    /// 获取指定主机上配置的设备列表
    ///
    /// 返回 `None` 表示配置读取失败，空列表表示该主机没有设备。
    fn device_list(&self, host_id: u16, host_name: &str) -> Option<Vec<Arc<DeviceInfo>>>;
}
