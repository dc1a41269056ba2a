//! 设备宿主
//!
//! [`DeviceHost`] 维护宿主内按加载顺序排列的设备列表，
//! 实现设备管理器调用的 [`DevHostService`] 接口。
//!
//! # 锁
//!
//! 设备列表的锁在 `add_device`/`del_device`/`pm_notify` 的整个过程中持有，
//! 以串行化这三类操作。驱动回调（`bind`/`init`/电源监听者）运行在这把锁内，
//! 因此驱动不能在回调中同步地对同一宿主再次加载或卸载设备。

use alloc::{
    string::String,
    sync::{Arc, Weak},
    vec::Vec,
};

use hdf::{
    DevHostService, DeviceInfo, DevmgrService, HdfError, HdfResult, PowerState, ServiceManager,
};
use sync::SpinLock;

use crate::device::Device;
use crate::loader::DriverLoader;
use crate::node::DeviceNode;
use crate::observer::ServiceObserver;

/// 宿主的外部协作者
#[derive(Clone)]
pub struct HostContext {
    /// 设备管理器
    pub devmgr: Arc<dyn DevmgrService>,
    /// 全局服务名注册表
    pub svcmgr: Arc<dyn ServiceManager>,
    /// 驱动加载器，缺失时无法加载或卸载设备
    pub loader: Option<Arc<dyn DriverLoader>>,
}

/// 设备宿主
pub struct DeviceHost {
    host_id: u16,
    host_name: String,
    devices: SpinLock<Vec<Device>>,
    observer: ServiceObserver,
    ctx: HostContext,
    this: Weak<DeviceHost>,
}

impl DeviceHost {
    /// 创建宿主
    pub fn new(host_id: u16, host_name: &str, ctx: HostContext) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            host_id,
            host_name: String::from(host_name),
            devices: SpinLock::new(Vec::new()),
            observer: ServiceObserver::new(),
            ctx,
            this: this.clone(),
        })
    }

    /// 宿主名
    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    /// 外部协作者
    pub fn context(&self) -> &HostContext {
        &self.ctx
    }

    /// 宿主内的服务观察表
    pub fn observer(&self) -> &ServiceObserver {
        &self.observer
    }

    /// 设备数量
    pub fn device_count(&self) -> usize {
        self.devices.lock().len()
    }

    /// 按加载顺序列出设备 ID
    pub fn device_ids(&self) -> Vec<u16> {
        self.devices.lock().iter().map(Device::device_id).collect()
    }

    /// 指定设备上的驱动实例数量
    pub fn node_count(&self, device_id: u16) -> usize {
        self.devices
            .lock()
            .iter()
            .find(|d| d.device_id() == device_id)
            .map_or(0, Device::len)
    }

    /// 按服务名查找驱动实例
    pub fn find_node(&self, svc_name: &str) -> Option<Arc<DeviceNode>> {
        self.devices
            .lock()
            .iter()
            .flat_map(|d| d.nodes().iter())
            .find(|n| n.info().svc_name == svc_name)
            .cloned()
    }

    /// 停止宿主，撤销全部驱动实例
    ///
    /// 驱动的 `release` 不会被调用，宿主进程即将退出。
    pub fn stop(&self) {
        let devices = core::mem::take(&mut *self.devices.lock());
        for mut device in devices {
            for node in device.take_nodes() {
                node.unlaunch(self);
            }
        }
        self.observer.clear();
        log::info!("host {}({}) stopped", self.host_name, self.host_id);
    }

    fn loader(&self) -> HdfResult<&Arc<dyn DriverLoader>> {
        self.ctx.loader.as_ref().ok_or_else(|| {
            log::error!("host {}: driver loader is missing", self.host_name);
            HdfError::InvalidParameter
        })
    }

    /// 移除空设备，同时删除该设备上的驱动留下的订阅
    fn drop_device(&self, devices: &mut Vec<Device>, idx: usize) {
        let device = devices.remove(idx);
        self.observer.unsubscribe_all(device.hardware_id());
    }

    fn load_into(&self, device: &mut Device, info: &Arc<DeviceInfo>) -> HdfResult {
        let node = self.loader()?.load_node(info)?;
        node.set_host(self.this.clone());
        device.attach(node, self)
    }
}

impl DevHostService for DeviceHost {
    fn host_id(&self) -> u16 {
        self.host_id
    }

    fn add_device(&self, info: &Arc<DeviceInfo>) -> HdfResult {
        self.loader()?;

        let mut devices = self.devices.lock();
        let (idx, created) = match devices
            .iter()
            .position(|d| d.device_id() == info.device_id)
        {
            Some(idx) => (idx, false),
            None => {
                devices.push(Device::new(self.host_id, info.device_id));
                (devices.len() - 1, true)
            }
        };

        let result = self.load_into(&mut devices[idx], info);
        if let Err(e) = result {
            log::error!(
                "host {}: add {} failed: {:?}",
                self.host_name,
                info.svc_name,
                e
            );
            if created && devices[idx].is_empty() {
                self.drop_device(&mut devices, idx);
            }
            return Err(e);
        }
        Ok(())
    }

    fn del_device(&self, info: &Arc<DeviceInfo>) -> HdfResult {
        let loader = self.loader()?;

        let mut devices = self.devices.lock();
        let Some(idx) = devices
            .iter()
            .position(|d| d.device_id() == info.device_id)
        else {
            log::warn!(
                "host {}: device {} not found, nothing to delete",
                self.host_name,
                info.device_id
            );
            return Ok(());
        };

        let object = devices[idx].find_node(info).map(|n| Arc::clone(n.object()));
        loader.unload_node(info, object.as_ref());

        match devices[idx].detach(info) {
            Some(node) => node.unlaunch(self),
            None => log::warn!(
                "host {}: no instance of {} on device {}",
                self.host_name,
                info.svc_name,
                info.device_id
            ),
        }
        self.ctx.svcmgr.remove_service(&info.svc_name);

        if devices[idx].is_empty() {
            self.drop_device(&mut devices, idx);
        }
        Ok(())
    }

    fn start_service(&self) -> HdfResult {
        let this = self.this.upgrade().ok_or(HdfError::Failure)?;
        self.ctx
            .devmgr
            .attach_device_host(self.host_id, this)
            .inspect_err(|e| {
                log::error!("host {}: attach to manager failed: {:?}", self.host_name, e);
            })
    }

    fn pm_notify(&self, state: PowerState) -> HdfResult {
        log::debug!("host {}: power state {:?}", self.host_name, state);
        let devices = self.devices.lock();
        if state.is_wake() {
            devices.iter().rev().for_each(|d| d.apply_power_state(state));
        } else {
            devices.iter().for_each(|d| d.apply_power_state(state));
        }
        Ok(())
    }
}
