//! 驱动入口与驱动加载器

use alloc::sync::Arc;

use hdf::{DeviceInfo, HdfError, HdfResult};

use crate::node::DeviceNode;
use crate::object::DeviceObject;

/// 驱动入口
///
/// 驱动的生命周期为 `bind` -> `init` -> `release`。
/// `bind` 只对需要对外发布服务的设备调用，驱动在其中通过
/// [`DeviceObject::set_service`] 提供服务对象。
pub trait DriverEntry: Send + Sync {
    /// 驱动模块名
    fn module_name(&self) -> &str;

    /// 绑定服务对象
    fn bind(&self, _object: &Arc<DeviceObject>) -> HdfResult {
        Ok(())
    }

    /// 初始化驱动
    fn init(&self, object: &Arc<DeviceObject>) -> HdfResult;

    /// 释放驱动资源
    fn release(&self, _object: &Arc<DeviceObject>) {}
}

/// 驱动加载器
///
/// 负责把设备描述映射为驱动入口。实现者只需提供 [`get_driver_entry`]，
/// 节点的构造与绑定由默认实现完成。
///
/// [`get_driver_entry`]: DriverLoader::get_driver_entry
pub trait DriverLoader: Send + Sync {
    /// 按模块名查找驱动入口
    fn get_driver_entry(&self, info: &DeviceInfo) -> Option<Arc<dyn DriverEntry>>;

    /// 为设备创建驱动实例
    ///
    /// 找不到驱动或绑定失败时返回 [`HdfError::NoDeviceService`]。
    fn load_node(&self, info: &Arc<DeviceInfo>) -> HdfResult<Arc<DeviceNode>> {
        let entry = self.get_driver_entry(info).ok_or_else(|| {
            log::error!("loader: no driver entry for module {}", info.module_name);
            HdfError::NoDeviceService
        })?;

        let node = DeviceNode::new(Arc::clone(info), entry);
        if info.policy.is_global() {
            if let Err(e) = node.driver().bind(node.object()) {
                log::error!("loader: bind {} failed: {:?}", info.module_name, e);
                return Err(HdfError::NoDeviceService);
            }
        }
        Ok(node)
    }

    /// 释放驱动实例
    ///
    /// `object` 为空表示实例从未成功创建，此时只做查找。
    fn unload_node(&self, info: &DeviceInfo, object: Option<&Arc<DeviceObject>>) {
        let Some(entry) = self.get_driver_entry(info) else {
            log::error!("loader: no driver entry for module {}", info.module_name);
            return;
        };
        if let Some(object) = object {
            entry.release(object);
        }
    }
}
