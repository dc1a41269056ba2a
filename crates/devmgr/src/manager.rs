//! 设备管理器
//!
//! [`DeviceManager`] 负责拉起宿主进程、在宿主回调登记后安装驱动、
//! 按服务名加载/卸载设备，并向所有宿主下发电源状态。
//!
//! # 启动流程
//!
//! 1. [`start_device_hosts`]: 为每个配置的主机创建 [`HostClient`] 并请求安装器启动宿主进程
//! 2. 宿主进程启动后调用 [`DevmgrService::attach_device_host`] 回调登记，
//!    管理器随即安装所有立即加载的设备
//! 3. [`load_left_driver`]: 第二阶段加载延迟设备
//!
//! # 锁
//!
//! 宿主列表由读写锁保护，只在查找和增删时持有，调用宿主之前先取出所需的记录。
//! 同一设备的加载与卸载由 [`HostClient`] 上的激活权串行化，激活权在调用宿主期间持有。
//!
//! [`start_device_hosts`]: DeviceManager::start_device_hosts
//! [`load_left_driver`]: DeviceManager::load_left_driver

use alloc::{string::String, sync::Arc, vec::Vec};

use hdf::{
    AttributeManager, DevHostService, DeviceClass, DeviceInfo, DeviceService, DeviceToken,
    DevmgrService, DriverInstaller, HdfError, HdfResult, PowerState, PowerStateManager,
    PowerStateTokenIf, PreloadMode, ServiceManager, ServiceSubscriber,
};
use sync::RwLock;

use crate::attribute::host_names;
use crate::host_client::HostClient;
use crate::registry::ServiceRegistry;
use crate::token_client::DeviceTokenClient;

/// 管理器的外部协作者
#[derive(Clone)]
pub struct ManagerContext {
    /// 主机与设备配置
    pub attributes: Arc<dyn AttributeManager>,
    /// 宿主进程安装器，缺失时无法启动宿主
    pub installer: Option<Arc<dyn DriverInstaller>>,
    /// 全局电源状态管理器，缺失时唤醒锁请求被忽略
    pub power: Option<Arc<dyn PowerStateManager>>,
}

/// 设备管理器
pub struct DeviceManager {
    hosts: RwLock<Vec<Arc<HostClient>>>,
    registry: ServiceRegistry,
    ctx: ManagerContext,
}

impl DeviceManager {
    /// 创建设备管理器
    pub fn new(ctx: ManagerContext) -> Arc<Self> {
        Arc::new(Self {
            hosts: RwLock::new(Vec::new()),
            registry: ServiceRegistry::new(),
            ctx,
        })
    }

    /// 服务注册表
    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// 按主机 ID 查找宿主客户端
    pub fn host_client(&self, host_id: u16) -> Option<Arc<HostClient>> {
        self.hosts
            .read()
            .iter()
            .find(|c| c.host_id() == host_id)
            .cloned()
    }

    /// 已登记宿主的主机 ID，按启动顺序
    pub fn host_ids(&self) -> Vec<u16> {
        self.hosts.read().iter().map(|c| c.host_id()).collect()
    }

    /// 已登记宿主的数量
    pub fn host_count(&self) -> usize {
        self.hosts.read().len()
    }

    fn snapshot(&self) -> Vec<Arc<HostClient>> {
        self.hosts.read().clone()
    }

    /// 启动全部配置的宿主
    ///
    /// 单个宿主启动失败时撤销它的客户端并继续启动其余宿主。
    pub fn start_device_hosts(&self) -> HdfResult {
        let installer = self.ctx.installer.as_ref().ok_or_else(|| {
            log::error!("devmgr: driver installer is missing");
            HdfError::Failure
        })?;

        let host_list = self.ctx.attributes.host_list();
        if host_list.is_empty() {
            log::warn!("devmgr: no host configured");
            return Ok(());
        }
        log::info!("devmgr: starting hosts {:?}", host_names(&host_list));

        for info in &host_list {
            let client = Arc::new(HostClient::new(info));
            self.hosts.write().push(Arc::clone(&client));

            match installer.start_device_host(info.host_id, &info.host_name) {
                Ok(pid) => {
                    client.set_pid(pid);
                    log::info!(
                        "devmgr: host {}({}) started, pid {}",
                        info.host_name,
                        info.host_id,
                        pid
                    );
                }
                Err(e) => {
                    log::warn!(
                        "devmgr: failed to start host {}({}): {:?}",
                        info.host_name,
                        info.host_id,
                        e
                    );
                    self.hosts.write().retain(|c| !Arc::ptr_eq(c, &client));
                }
            }
        }
        Ok(())
    }

    /// 第二阶段加载全部延迟设备
    pub fn load_left_driver(&self) -> HdfResult {
        for client in self.snapshot() {
            for info in client.infos() {
                if info.preload() != PreloadMode::EnabledDeferred {
                    continue;
                }
                if let Err(e) = self.activate_device(&client, &info, true) {
                    log::error!("devmgr: deferred load of {} failed: {:?}", info.svc_name, e);
                }
            }
        }
        Ok(())
    }

    /// 向全部宿主下发电源状态
    ///
    /// 唤醒类状态按启动顺序的逆序，睡眠类状态按启动顺序。
    /// 单个宿主失败只记录日志。
    pub fn pm_notify(&self, state: PowerState) -> HdfResult {
        log::debug!("devmgr: power state {:?}", state);
        let hosts = self.snapshot();
        let notify = |client: &Arc<HostClient>| {
            let Some(proxy) = client.proxy() else {
                return;
            };
            if let Err(e) = proxy.pm_notify(state) {
                log::error!(
                    "devmgr: host {} failed to enter {:?}: {:?}",
                    client.host_name(),
                    state,
                    e
                );
            }
        };
        if state.is_wake() {
            hosts.iter().rev().for_each(notify);
        } else {
            hosts.iter().for_each(notify);
        }
        Ok(())
    }

    /// 在已配置该模块的宿主上动态注册并加载一个设备
    ///
    /// 服务名检查与设备描述的追加在宿主列表的写锁内完成，
    /// 并发注册同一服务名时只有一个成功。加载失败时撤销设备描述。
    pub fn register_device(&self, module_name: &str, svc_name: &str) -> HdfResult {
        if module_name.is_empty() || svc_name.is_empty() {
            return Err(HdfError::InvalidParameter);
        }
        let hosts = self.hosts.write();
        if hosts.iter().any(|c| c.find_info(svc_name).is_some()) {
            log::warn!("devmgr: service {} already registered", svc_name);
            return Err(HdfError::AlreadyInState);
        }
        let client = hosts
            .iter()
            .find(|c| c.has_module(module_name))
            .cloned()
            .ok_or_else(|| {
                log::error!("devmgr: no host serves module {}", module_name);
                HdfError::NotFound
            })?;
        let (info, activation) = client.push_dynamic(module_name, svc_name);
        drop(hosts);

        let result = self.apply_activation(&client, &info, true);
        if let Err(e) = result {
            log::error!("devmgr: register {} failed: {:?}", svc_name, e);
            client.remove_info(&info);
            drop(activation);
            return Err(e);
        }
        drop(activation);
        log::info!(
            "devmgr: registered {} on host {}",
            svc_name,
            client.host_name()
        );
        Ok(())
    }

    /// 卸载并删除动态注册的设备
    ///
    /// 设备已卸载时只删除描述。加载/卸载进行中时返回 `Busy`，描述保留。
    pub fn unregister_device(&self, module_name: &str, svc_name: &str) -> HdfResult {
        let (client, info) = self
            .find_device(svc_name)
            .filter(|(_, info)| info.is_dynamic && info.module_name == module_name)
            .ok_or(HdfError::NotFound)?;

        let activation = client.claim_removal(&info)?;
        let result = if info.preload() == PreloadMode::Disabled {
            Ok(())
        } else {
            self.apply_activation(&client, &info, false)
        };
        client.remove_info(&info);
        drop(activation);
        result
    }

    /// 移除宿主客户端，注销它发布的服务
    pub fn remove_device_host(&self, host_id: u16) -> HdfResult {
        let client = {
            let mut hosts = self.hosts.write();
            let pos = hosts
                .iter()
                .position(|c| c.host_id() == host_id)
                .ok_or(HdfError::NotFound)?;
            hosts.remove(pos)
        };
        self.release_client(&client);
        log::info!("devmgr: host {}({}) removed", client.host_name(), host_id);
        Ok(())
    }

    /// 关闭管理器，移除全部宿主并清空服务注册表
    ///
    /// 宿主客户端持有的宿主句柄在此释放，进程内直连时它与宿主互相引用，
    /// 必须显式调用本方法才能回收。
    pub fn shutdown(&self) {
        let hosts = core::mem::take(&mut *self.hosts.write());
        for client in &hosts {
            self.release_client(client);
        }
        self.registry.clear();
        log::info!("devmgr: shut down, {} host(s) released", hosts.len());
    }

    fn release_client(&self, client: &HostClient) {
        for token in client.detach() {
            self.registry.remove(token.service_name());
        }
    }

    fn find_device(&self, svc_name: &str) -> Option<(Arc<HostClient>, Arc<DeviceInfo>)> {
        self.snapshot()
            .into_iter()
            .find_map(|c| c.find_info(svc_name).map(|info| (c, info)))
    }

    /// 加载或卸载设备并更新预加载标记
    ///
    /// 同一设备的加载/卸载互斥：已有请求在进行中时返回 `Busy`，
    /// 已处于目标状态时返回 `AlreadyInState`，两种情况都不会调用宿主。
    fn activate_device(&self, client: &HostClient, info: &Arc<DeviceInfo>, load: bool) -> HdfResult {
        let target = if load {
            PreloadMode::Enabled
        } else {
            PreloadMode::Disabled
        };
        let _activation = client.claim(info, target)?;
        self.apply_activation(client, info, load)
    }

    /// 调用宿主并写入预加载标记，调用者必须持有设备的激活权
    ///
    /// 加载只在成功时标记为 `Enabled`，卸载无论结果如何都标记为 `Disabled`。
    fn apply_activation(&self, client: &HostClient, info: &Arc<DeviceInfo>, load: bool) -> HdfResult {
        let proxy = client.proxy().ok_or_else(|| {
            log::error!("devmgr: host {} is not attached", client.host_name());
            HdfError::NoDevice
        })?;

        if load {
            proxy.add_device(info)?;
            info.set_preload(PreloadMode::Enabled);
            Ok(())
        } else {
            let result = proxy.del_device(info);
            info.set_preload(PreloadMode::Disabled);
            result
        }
    }
}

impl DevmgrService for DeviceManager {
    fn attach_device_host(&self, host_id: u16, host: Arc<dyn DevHostService>) -> HdfResult {
        let client = self.host_client(host_id).ok_or_else(|| {
            log::error!("devmgr: unexpected host {} attached", host_id);
            HdfError::NotFound
        })?;

        let infos = self
            .ctx
            .attributes
            .device_list(host_id, client.host_name())
            .ok_or_else(|| {
                log::error!("devmgr: no device list for host {}", client.host_name());
                HdfError::Failure
            })?;

        client.attach(host, infos);
        log::info!(
            "devmgr: host {}({}) attached with {} device(s)",
            client.host_name(),
            host_id,
            client.dev_count()
        );
        client.install_drivers();
        Ok(())
    }

    fn attach_device(&self, info: &Arc<DeviceInfo>, token: Arc<dyn DeviceToken>) -> HdfResult {
        let client = self.host_client(info.host_id).ok_or_else(|| {
            log::error!("devmgr: attach {} to unknown host {}", info.svc_name, info.host_id);
            HdfError::NotFound
        })?;
        client.add_token(DeviceTokenClient::new(Arc::clone(info), token));
        log::info!("devmgr: device {} attached", info.svc_name);
        Ok(())
    }

    fn detach_device(&self, info: &DeviceInfo) -> HdfResult {
        let client = self.host_client(info.host_id).ok_or(HdfError::NotFound)?;
        client
            .remove_token(info)
            .map(|_| ())
            .ok_or(HdfError::NotFound)
    }

    fn load_device(&self, svc_name: &str) -> HdfResult {
        let (client, info) = self.find_device(svc_name).ok_or_else(|| {
            log::error!("devmgr: no device serves {}", svc_name);
            HdfError::NotFound
        })?;
        self.activate_device(&client, &info, true)
    }

    fn unload_device(&self, svc_name: &str) -> HdfResult {
        let (client, info) = self.find_device(svc_name).ok_or_else(|| {
            log::error!("devmgr: no device serves {}", svc_name);
            HdfError::NotFound
        })?;
        self.activate_device(&client, &info, false)
    }

    fn acquire_wake_lock(&self, token: &dyn PowerStateTokenIf) {
        if let Some(power) = &self.ctx.power {
            power.acquire_wake_lock(token);
        }
    }

    fn release_wake_lock(&self, token: &dyn PowerStateTokenIf) {
        if let Some(power) = &self.ctx.power {
            power.release_wake_lock(token);
        }
    }
}

impl ServiceManager for DeviceManager {
    fn add_service(
        &self,
        svc_name: &str,
        class: DeviceClass,
        service: Arc<dyn DeviceService>,
    ) -> HdfResult {
        self.registry.add(svc_name, class, service)
    }

    fn remove_service(&self, svc_name: &str) {
        self.registry.remove(svc_name);
    }

    fn get_service(&self, svc_name: &str) -> Option<Arc<dyn DeviceService>> {
        self.registry.get(svc_name)
    }

    fn subscribe_service(
        &self,
        svc_name: &str,
        subscriber: Arc<dyn ServiceSubscriber>,
    ) -> HdfResult {
        if svc_name.is_empty() {
            return Err(HdfError::InvalidParameter);
        }
        if let Some(service) = self.registry.get_or_wait(svc_name, &subscriber) {
            return subscriber.on_service_connected(&service);
        }
        match self.load_device(svc_name) {
            Ok(()) | Err(HdfError::AlreadyInState) | Err(HdfError::Busy) => Ok(()),
            Err(e) => {
                self.registry.cancel_wait(svc_name, &subscriber);
                Err(e)
            }
        }
    }

    fn list_service(&self, class: DeviceClass) -> Vec<String> {
        self.registry.list(class)
    }
}
