//! 设备服务与服务注册表接口

use alloc::{string::String, sync::Arc, vec::Vec};
use core::any::Any;

use crate::error::HdfResult;

/// 设备类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceClass {
    /// 默认类别
    #[default]
    Default,
    /// 平台设备
    Plat,
    /// 传感器
    Sensor,
    /// 输入设备
    Input,
    /// 显示设备
    Display,
    /// 音频设备
    Audio,
    /// 摄像头
    Camera,
    /// USB 设备
    Usb,
}

impl DeviceClass {
    /// 从原始值转换，越界返回 `None`
    pub fn from_raw(raw: u32) -> Option<Self> {
        let class = match raw {
            0 => DeviceClass::Default,
            1 => DeviceClass::Plat,
            2 => DeviceClass::Sensor,
            3 => DeviceClass::Input,
            4 => DeviceClass::Display,
            5 => DeviceClass::Audio,
            6 => DeviceClass::Camera,
            7 => DeviceClass::Usb,
            _ => return None,
        };
        Some(class)
    }
}

/// 驱动对外发布的服务对象
pub trait DeviceService: Any + Send + Sync {
    /// 转换为 `Any` 以便使用者向下转型到具体服务类型
    fn as_any(&self) -> &dyn Any;
}

/// 服务订阅者
pub trait ServiceSubscriber: Send + Sync {
    /// 订阅的服务可用时回调
    fn on_service_connected(&self, service: &Arc<dyn DeviceService>) -> HdfResult;
}

/// 全局服务名注册表
///
/// 宿主在设备启动后将公开服务登记到这里，其它组件按服务名查找。
pub trait ServiceManager: Send + Sync {
    /// 登记服务
    fn add_service(
        &self,
        svc_name: &str,
        class: DeviceClass,
        service: Arc<dyn DeviceService>,
    ) -> HdfResult;

    /// 注销服务，不存在时忽略
    fn remove_service(&self, svc_name: &str);

    /// 按服务名查找
    fn get_service(&self, svc_name: &str) -> Option<Arc<dyn DeviceService>>;

    /// 订阅服务
    ///
    /// 服务已登记时立即回调；否则按服务名请求加载对应设备。
    fn subscribe_service(&self, svc_name: &str, subscriber: Arc<dyn ServiceSubscriber>)
    -> HdfResult;

    /// 列出指定类别的全部服务名
    fn list_service(&self, class: DeviceClass) -> Vec<String>;
}
