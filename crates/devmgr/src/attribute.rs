//! 静态属性管理器
//!
//! 从内存中的主机配置表提供主机列表和设备列表。

use alloc::{string::String, sync::Arc, vec::Vec};

use hdf::{AttributeManager, DEVMGR_HOST_ID, DeviceInfo, HostInfo};

/// 单个主机的配置
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// 主机描述
    pub info: HostInfo,
    /// 主机上的设备
    pub devices: Vec<DeviceInfo>,
}

impl HostConfig {
    /// 创建没有设备的主机配置
    pub fn new(host_id: u16, host_name: &str, priority: u16) -> Self {
        Self {
            info: HostInfo::new(host_id, host_name, priority),
            devices: Vec::new(),
        }
    }

    /// 追加设备，设备的主机 ID 被改写为本主机
    pub fn with_device(mut self, mut device: DeviceInfo) -> Self {
        device.host_id = self.info.host_id;
        self.devices.push(device);
        self
    }
}

/// 内存中的属性管理器
#[derive(Debug, Default)]
pub struct StaticAttributeManager {
    hosts: Vec<HostConfig>,
}

impl StaticAttributeManager {
    /// 从主机配置表创建
    ///
    /// 使用保留主机 ID 的配置会被丢弃。
    pub fn new(hosts: Vec<HostConfig>) -> Self {
        let hosts = hosts
            .into_iter()
            .filter(|h| {
                if h.info.host_id == DEVMGR_HOST_ID {
                    log::warn!("attribute: host {} uses a reserved id", h.info.host_name);
                    return false;
                }
                true
            })
            .collect();
        Self { hosts }
    }

    fn find(&self, host_id: u16, host_name: &str) -> Option<&HostConfig> {
        self.hosts
            .iter()
            .find(|h| h.info.host_id == host_id && h.info.host_name == host_name)
    }
}

impl AttributeManager for StaticAttributeManager {
    fn host_list(&self) -> Vec<HostInfo> {
        let mut list: Vec<HostInfo> = self.hosts.iter().map(|h| h.info.clone()).collect();
        list.sort_by_key(|h| h.priority);
        list
    }

    fn device_list(&self, host_id: u16, host_name: &str) -> Option<Vec<Arc<DeviceInfo>>> {
        let Some(host) = self.find(host_id, host_name) else {
            log::error!("attribute: no host {}({})", host_name, host_id);
            return None;
        };
        let mut devices: Vec<Arc<DeviceInfo>> =
            host.devices.iter().cloned().map(Arc::new).collect();
        devices.sort_by_key(|d| d.priority);
        Some(devices)
    }
}

/// 主机名列表，仅用于日志
pub(crate) fn host_names(hosts: &[HostInfo]) -> Vec<String> {
    hosts.iter().map(|h| h.host_name.clone()).collect()
}
