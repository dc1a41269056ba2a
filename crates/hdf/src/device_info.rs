//! 设备描述
//!
//! [`DeviceInfo`] 在主机挂接时从配置读取一次，之后以 `Arc` 在管理器与宿主之间共享。
//! 其中只有预加载模式会在设备激活/去激活时原地修改。

use alloc::string::String;
use core::sync::atomic::{AtomicU8, Ordering};

use crate::config::HOST_ID_SHIFT;

/// 预加载模式
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreloadMode {
    /// 主机挂接后立即加载
    Enabled = 0,
    /// 推迟到第二阶段加载
    EnabledDeferred = 1,
    /// 不加载
    Disabled = 2,
}

impl PreloadMode {
    /// 从原始值转换，未知值视为 `Disabled`
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => PreloadMode::Enabled,
            1 => PreloadMode::EnabledDeferred,
            _ => PreloadMode::Disabled,
        }
    }
}

/// 服务发布策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServicePolicy {
    /// 不发布服务
    None,
    /// 对所有使用者公开
    Public,
    /// 公开并提供能力接口
    Capacity,
    /// 仅在宿主内可见，但不限制订阅者
    FrictionPrivate,
    /// 仅对相同硬件 ID 的订阅者可见
    Private,
}

impl ServicePolicy {
    /// 是否需要绑定驱动并发布到全局服务注册表
    pub fn is_global(&self) -> bool {
        matches!(self, ServicePolicy::Public | ServicePolicy::Capacity)
    }
}

/// 由主机 ID 和设备 ID 组成硬件 ID
///
/// 订阅者与发布者通过硬件 ID 匹配。
#[inline]
pub fn make_hardware_id(host_id: u16, device_id: u16) -> u32 {
    ((host_id as u32) << HOST_ID_SHIFT) | device_id as u32
}

/// 设备描述
#[derive(Debug)]
pub struct DeviceInfo {
    /// 所属主机 ID
    pub host_id: u16,
    /// 设备 ID
    pub device_id: u16,
    /// 发布的服务名
    pub svc_name: String,
    /// 驱动模块名
    pub module_name: String,
    /// 服务发布策略
    pub policy: ServicePolicy,
    /// 加载优先级
    pub priority: u16,
    /// 设备节点权限
    pub permission: u16,
    /// 私有配置匹配属性
    pub match_attr: String,
    /// 是否为运行期动态注册的设备
    pub is_dynamic: bool,
    preload: AtomicU8,
}

impl DeviceInfo {
    /// 创建设备描述，默认公开发布且立即加载
    pub fn new(host_id: u16, device_id: u16, module_name: &str, svc_name: &str) -> Self {
        Self {
            host_id,
            device_id,
            svc_name: String::from(svc_name),
            module_name: String::from(module_name),
            policy: ServicePolicy::Public,
            priority: 0,
            permission: 0o664,
            match_attr: String::new(),
            is_dynamic: false,
            preload: AtomicU8::new(PreloadMode::Enabled as u8),
        }
    }

    /// 设置预加载模式
    pub fn with_preload(self, preload: PreloadMode) -> Self {
        self.preload.store(preload as u8, Ordering::Relaxed);
        self
    }

    /// 设置发布策略
    pub fn with_policy(mut self, policy: ServicePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// 设置加载优先级
    pub fn with_priority(mut self, priority: u16) -> Self {
        self.priority = priority;
        self
    }

    /// 设置私有配置匹配属性
    pub fn with_match_attr(mut self, match_attr: &str) -> Self {
        self.match_attr = String::from(match_attr);
        self
    }

    /// 标记为动态注册的设备
    pub fn dynamic(mut self) -> Self {
        self.is_dynamic = true;
        self
    }

    /// 当前预加载模式
    pub fn preload(&self) -> PreloadMode {
        PreloadMode::from_raw(self.preload.load(Ordering::Acquire))
    }

    /// 修改预加载模式
    pub fn set_preload(&self, preload: PreloadMode) {
        self.preload.store(preload as u8, Ordering::Release);
    }

    /// 本设备的硬件 ID
    pub fn hardware_id(&self) -> u32 {
        make_hardware_id(self.host_id, self.device_id)
    }

    /// 服务名与模块名是否都与 `other` 相同
    pub fn same_service(&self, other: &DeviceInfo) -> bool {
        self.svc_name == other.svc_name && self.module_name == other.module_name
    }
}

impl Clone for DeviceInfo {
    fn clone(&self) -> Self {
        Self {
            host_id: self.host_id,
            device_id: self.device_id,
            svc_name: self.svc_name.clone(),
            module_name: self.module_name.clone(),
            policy: self.policy,
            priority: self.priority,
            permission: self.permission,
            match_attr: self.match_attr.clone(),
            is_dynamic: self.is_dynamic,
            preload: AtomicU8::new(self.preload.load(Ordering::Acquire)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hardware_id_layout() {
        assert_eq!(make_hardware_id(1, 2), 0x0001_0002);
        assert_eq!(make_hardware_id(0xffff, 0), 0xffff_0000);
        let info = DeviceInfo::new(3, 7, "sample_driver", "sample_service");
        assert_eq!(info.hardware_id(), 0x0003_0007);
    }

    #[test]
    fn test_preload_is_mutable_in_place() {
        let info = DeviceInfo::new(1, 1, "m", "s").with_preload(PreloadMode::EnabledDeferred);
        assert_eq!(info.preload(), PreloadMode::EnabledDeferred);
        info.set_preload(PreloadMode::Disabled);
        assert_eq!(info.preload(), PreloadMode::Disabled);
        assert_eq!(info.clone().preload(), PreloadMode::Disabled);
    }

    #[test]
    fn test_same_service_needs_both_names() {
        let a = DeviceInfo::new(1, 1, "mod_a", "svc");
        let b = DeviceInfo::new(1, 2, "mod_a", "svc");
        let c = DeviceInfo::new(1, 1, "mod_b", "svc");
        assert!(a.same_service(&b));
        assert!(!a.same_service(&c));
    }

    #[test]
    fn test_unknown_preload_is_disabled() {
        assert_eq!(PreloadMode::from_raw(9), PreloadMode::Disabled);
        assert!(ServicePolicy::Capacity.is_global());
        assert!(!ServicePolicy::Private.is_global());
    }
}
