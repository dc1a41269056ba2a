//! 驱动实例
//!
//! [`DeviceNode`] 是一个设备描述在宿主中的一次加载：它持有驱动入口、
//! 设备对象以及可选的电源状态令牌。

use alloc::{string::String, sync::Arc, sync::Weak};

use hdf::{DeviceInfo, DeviceToken, HdfError, HdfResult, ServicePolicy};
use sync::SpinLock;

use crate::host::DeviceHost;
use crate::loader::DriverEntry;
use crate::object::DeviceObject;
use crate::power::{PowerEventListener, PowerStateToken};

/// 交给设备管理器的令牌
#[derive(Debug)]
pub struct HostDeviceToken {
    svc_name: String,
    hardware_id: u32,
}

impl HostDeviceToken {
    /// 驱动实例的硬件 ID
    pub fn hardware_id(&self) -> u32 {
        self.hardware_id
    }
}

impl DeviceToken for HostDeviceToken {
    fn service_name(&self) -> &str {
        &self.svc_name
    }
}

/// 驱动实例
pub struct DeviceNode {
    info: Arc<DeviceInfo>,
    driver: Arc<dyn DriverEntry>,
    object: Arc<DeviceObject>,
    host: SpinLock<Weak<DeviceHost>>,
    power_token: SpinLock<Option<Arc<PowerStateToken>>>,
}

impl DeviceNode {
    /// 创建驱动实例，尚未绑定到宿主
    pub fn new(info: Arc<DeviceInfo>, driver: Arc<dyn DriverEntry>) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            info,
            driver,
            object: Arc::new(DeviceObject::new(weak.clone())),
            host: SpinLock::new(Weak::new()),
            power_token: SpinLock::new(None),
        })
    }

    /// 设备描述
    pub fn info(&self) -> &Arc<DeviceInfo> {
        &self.info
    }

    /// 驱动入口
    pub fn driver(&self) -> &Arc<dyn DriverEntry> {
        &self.driver
    }

    /// 设备对象
    pub fn object(&self) -> &Arc<DeviceObject> {
        &self.object
    }

    /// 所属宿主
    pub fn host(&self) -> Option<Arc<DeviceHost>> {
        self.host.lock().upgrade()
    }

    pub(crate) fn set_host(&self, host: Weak<DeviceHost>) {
        *self.host.lock() = host;
    }

    /// 电源状态令牌
    pub fn power_token(&self) -> Option<Arc<PowerStateToken>> {
        self.power_token.lock().clone()
    }

    pub(crate) fn add_power_state_listener(
        &self,
        listener: Arc<dyn PowerEventListener>,
    ) -> HdfResult {
        let host = self.host().ok_or_else(|| {
            log::error!("node: {} has no host", self.info.svc_name);
            HdfError::Failure
        })?;

        let mut slot = self.power_token.lock();
        if slot.is_some() {
            log::warn!(
                "node: {} already has a power listener",
                self.info.svc_name
            );
            return Err(HdfError::AlreadyInState);
        }
        let devmgr = Arc::downgrade(&host.context().devmgr);
        *slot = Some(PowerStateToken::new(
            Arc::downgrade(&self.object),
            listener,
            devmgr,
        ));
        Ok(())
    }

    /// 启动驱动实例：初始化驱动、发布服务并向设备管理器登记
    pub(crate) fn launch(&self, host: &DeviceHost) -> HdfResult {
        log::info!("node: launch {} ({})", self.info.svc_name, self.info.module_name);

        if let Err(e) = self.driver.init(&self.object) {
            log::error!("node: init {} failed: {:?}", self.info.module_name, e);
            return Err(HdfError::DeviceInitFailed);
        }

        self.publish_service(host)?;

        let token = Arc::new(HostDeviceToken {
            svc_name: self.info.svc_name.clone(),
            hardware_id: self.info.hardware_id(),
        });
        host.context()
            .devmgr
            .attach_device(&self.info, token)
            .inspect_err(|e| {
                log::error!("node: attach {} failed: {:?}", self.info.svc_name, e);
            })
    }

    fn publish_service(&self, host: &DeviceHost) -> HdfResult {
        let policy = self.info.policy;
        if policy == ServicePolicy::None {
            return Ok(());
        }

        let Some(service) = self.object.service() else {
            if policy.is_global() {
                log::error!("node: {} has no service to publish", self.info.svc_name);
                return Err(HdfError::PublishFailed);
            }
            return Ok(());
        };

        host.observer().publish(
            &self.info.svc_name,
            self.info.hardware_id(),
            policy,
            Arc::clone(&service),
        )?;

        if policy.is_global() {
            host.context()
                .svcmgr
                .add_service(&self.info.svc_name, self.object.device_class(), service)
                .map_err(|e| {
                    log::error!("node: publish {} failed: {:?}", self.info.svc_name, e);
                    HdfError::PublishFailed
                })?;
        }
        Ok(())
    }

    /// 撤销 [`launch`](Self::launch) 的效果
    ///
    /// 宿主内的发布被撤回，其它驱动对该服务的订阅保留。
    pub(crate) fn unlaunch(&self, host: &DeviceHost) {
        host.observer().withdraw(&self.info.svc_name, self.info.hardware_id());
        if self.info.policy.is_global() {
            host.context().svcmgr.remove_service(&self.info.svc_name);
        }
        if let Err(e) = host.context().devmgr.detach_device(&self.info) {
            log::debug!("node: detach {} returned {:?}", self.info.svc_name, e);
        }
        self.power_token.lock().take();
        self.set_host(Weak::new());
    }
}

impl core::fmt::Debug for DeviceNode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DeviceNode")
            .field("svc_name", &self.info.svc_name)
            .field("module_name", &self.info.module_name)
            .field("device_id", &self.info.device_id)
            .finish()
    }
}
