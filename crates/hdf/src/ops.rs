//! 跨进程服务接口
//!
//! 设备管理器与设备宿主运行在不同进程中，双方只通过这里的 trait 交互。
//! 具体的传输方式（进程间调用、同进程直连）由实现这些 trait 的一方决定。

use alloc::sync::Arc;

use crate::device_info::DeviceInfo;
use crate::error::HdfResult;
use crate::power::{PowerState, PowerStateTokenIf};

/// 设备宿主服务
///
/// 设备管理器持有远端宿主的此接口，用于安装、卸载驱动和下发电源状态。
pub trait DevHostService: Send + Sync {
    /// 宿主的主机 ID
    fn host_id(&self) -> u16;

    /// 加载一个驱动实例
    fn add_device(&self, info: &Arc<DeviceInfo>) -> HdfResult;

    /// 卸载一个驱动实例，设备不存在时视为成功
    fn del_device(&self, info: &Arc<DeviceInfo>) -> HdfResult;

    /// 向设备管理器登记本宿主
    fn start_service(&self) -> HdfResult;

    /// 向宿主内所有驱动下发电源状态
    fn pm_notify(&self, state: PowerState) -> HdfResult;
}

/// 设备令牌
///
/// 代表宿主中一个已加载的驱动实例，设备管理器以此关联设备。
pub trait DeviceToken: Send + Sync {
    /// 驱动实例发布的服务名
    fn service_name(&self) -> &str;
}

/// 设备管理器服务
///
/// 宿主持有设备管理器的此接口。
pub trait DevmgrService: Send + Sync {
    /// 宿主进程启动后回调登记
    fn attach_device_host(&self, host_id: u16, host: Arc<dyn DevHostService>) -> HdfResult;

    /// 登记已加载的驱动实例
    fn attach_device(&self, info: &Arc<DeviceInfo>, token: Arc<dyn DeviceToken>) -> HdfResult;

    /// 注销驱动实例
    fn detach_device(&self, info: &DeviceInfo) -> HdfResult;

    /// 按服务名加载设备
    fn load_device(&self, svc_name: &str) -> HdfResult;

    /// 按服务名卸载设备
    fn unload_device(&self, svc_name: &str) -> HdfResult;

    /// 令牌开始持有唤醒锁
    fn acquire_wake_lock(&self, token: &dyn PowerStateTokenIf);

    /// 令牌释放唤醒锁
    fn release_wake_lock(&self, token: &dyn PowerStateTokenIf);
}

/// 驱动安装器
///
/// 由框架外部实现，负责拉起设备宿主进程。
pub trait DriverInstaller: Send + Sync {
    /// 启动宿主进程，返回进程号
    fn start_device_host(&self, host_id: u16, host_name: &str) -> HdfResult<i32>;
}
