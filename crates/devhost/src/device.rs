//! 逻辑设备
//!
//! 一个 [`Device`] 对应配置中的一个设备 ID，其上可以加载多个驱动实例。
//! 实例按加载顺序保存，电源状态下发依赖这个顺序。

use alloc::{sync::Arc, vec::Vec};

use hdf::{DeviceInfo, HdfResult, PowerState, make_hardware_id};

use crate::host::DeviceHost;
use crate::node::DeviceNode;

/// 逻辑设备
#[derive(Debug)]
pub struct Device {
    host_id: u16,
    device_id: u16,
    nodes: Vec<Arc<DeviceNode>>,
}

impl Device {
    /// 创建空设备
    pub fn new(host_id: u16, device_id: u16) -> Self {
        Self {
            host_id,
            device_id,
            nodes: Vec::new(),
        }
    }

    /// 设备 ID
    pub fn device_id(&self) -> u16 {
        self.device_id
    }

    /// 硬件 ID
    pub fn hardware_id(&self) -> u32 {
        make_hardware_id(self.host_id, self.device_id)
    }

    /// 按加载顺序排列的驱动实例
    pub fn nodes(&self) -> &[Arc<DeviceNode>] {
        &self.nodes
    }

    /// 驱动实例数量
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// 是否没有驱动实例
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// 查找与 `info` 服务名、模块名均相同的实例
    pub fn find_node(&self, info: &DeviceInfo) -> Option<&Arc<DeviceNode>> {
        self.nodes.iter().find(|n| n.info().same_service(info))
    }

    /// 挂载并启动驱动实例
    ///
    /// 启动失败时撤销已完成的部分并把实例移出设备，设备上原有的实例不受影响。
    pub(crate) fn attach(&mut self, node: Arc<DeviceNode>, host: &DeviceHost) -> HdfResult {
        self.nodes.push(Arc::clone(&node));
        if let Err(e) = node.launch(host) {
            self.nodes.retain(|n| !Arc::ptr_eq(n, &node));
            node.unlaunch(host);
            return Err(e);
        }
        Ok(())
    }

    /// 移出驱动实例
    pub(crate) fn detach(&mut self, info: &DeviceInfo) -> Option<Arc<DeviceNode>> {
        let pos = self.nodes.iter().position(|n| n.info().same_service(info))?;
        Some(self.nodes.remove(pos))
    }

    /// 移出全部驱动实例
    pub(crate) fn take_nodes(&mut self) -> Vec<Arc<DeviceNode>> {
        core::mem::take(&mut self.nodes)
    }

    /// 向全部实例下发电源状态
    ///
    /// 唤醒类状态按加载顺序，睡眠类状态按加载顺序的逆序。
    /// 单个实例失败只记录日志。
    pub(crate) fn apply_power_state(&self, state: PowerState) {
        let notify = |node: &Arc<DeviceNode>| {
            let Some(token) = node.power_token() else {
                return;
            };
            if let Err(e) = token.power_state_change(state) {
                log::error!(
                    "device {:#x}: {} failed to enter {:?}: {:?}",
                    self.hardware_id(),
                    node.info().svc_name,
                    state,
                    e
                );
            }
        };
        if state.is_wake() {
            self.nodes.iter().for_each(notify);
        } else {
            self.nodes.iter().rev().for_each(notify);
        }
    }
}
