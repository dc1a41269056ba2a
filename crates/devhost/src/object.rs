//! 驱动可见的设备对象

use alloc::{string::String, sync::Arc, sync::Weak};

use hdf::{
    DeviceClass, DeviceInfo, DeviceService, HdfError, HdfResult, PowerStateTokenIf,
    ServiceSubscriber,
};
use sync::SpinLock;

use crate::node::DeviceNode;
use crate::power::PowerEventListener;

/// 设备对象
///
/// 驱动通过它发布服务、订阅其它服务以及管理唤醒锁。
/// 对象由所属的 [`DeviceNode`] 创建并持有，反向引用为弱引用。
pub struct DeviceObject {
    node: Weak<DeviceNode>,
    class: SpinLock<DeviceClass>,
    service: SpinLock<Option<Arc<dyn DeviceService>>>,
}

impl DeviceObject {
    pub(crate) fn new(node: Weak<DeviceNode>) -> Self {
        Self {
            node,
            class: SpinLock::new(DeviceClass::Default),
            service: SpinLock::new(None),
        }
    }

    /// 所属的驱动实例
    pub fn node(&self) -> Option<Arc<DeviceNode>> {
        self.node.upgrade()
    }

    /// 设备描述
    pub fn device_info(&self) -> Option<Arc<DeviceInfo>> {
        self.node().map(|n| Arc::clone(n.info()))
    }

    /// 发布的服务名
    pub fn service_name(&self) -> Option<String> {
        self.node().map(|n| n.info().svc_name.clone())
    }

    /// 设置设备类别
    pub fn set_device_class(&self, class: DeviceClass) {
        *self.class.lock() = class;
    }

    /// 设备类别
    pub fn device_class(&self) -> DeviceClass {
        *self.class.lock()
    }

    /// 设置要发布的服务对象
    pub fn set_service(&self, service: Arc<dyn DeviceService>) {
        *self.service.lock() = Some(service);
    }

    /// 已设置的服务对象
    pub fn service(&self) -> Option<Arc<dyn DeviceService>> {
        self.service.lock().clone()
    }

    /// 订阅同一宿主内的服务
    pub fn subscribe_service(
        &self,
        svc_name: &str,
        callback: Arc<dyn ServiceSubscriber>,
    ) -> HdfResult {
        let node = self.node().ok_or(HdfError::InvalidParameter)?;
        let host = node.host().ok_or_else(|| {
            log::error!("object: {} is not attached to a host", node.info().svc_name);
            HdfError::Failure
        })?;
        host.observer()
            .subscribe(svc_name, node.info().hardware_id(), callback)
    }

    /// 注册电源事件监听者
    ///
    /// 同时为驱动实例创建电源状态令牌，一个实例只能注册一次。
    pub fn register_power_listener(&self, listener: Arc<dyn PowerEventListener>) -> HdfResult {
        let node = self.node().ok_or(HdfError::InvalidParameter)?;
        node.add_power_state_listener(listener)
    }

    /// 增加唤醒锁引用，未注册电源监听者时什么也不做
    pub fn acquire_wake_lock(&self) {
        if let Some(token) = self.node().and_then(|n| n.power_token()) {
            token.acquire_wake_lock();
        }
    }

    /// 减少唤醒锁引用，未注册电源监听者时什么也不做
    pub fn release_wake_lock(&self) {
        if let Some(token) = self.node().and_then(|n| n.power_token()) {
            token.release_wake_lock();
        }
    }
}

impl core::fmt::Debug for DeviceObject {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DeviceObject")
            .field("service_name", &self.service_name())
            .field("class", &self.device_class())
            .finish()
    }
}
