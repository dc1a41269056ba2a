//! 设备令牌客户端

use alloc::sync::Arc;

use hdf::{DeviceInfo, DeviceToken};

/// 管理器侧的设备令牌记录
///
/// 关联宿主发来的令牌与对应的设备描述。
#[derive(Clone)]
pub struct DeviceTokenClient {
    info: Arc<DeviceInfo>,
    token: Arc<dyn DeviceToken>,
}

impl DeviceTokenClient {
    /// 创建记录
    pub fn new(info: Arc<DeviceInfo>, token: Arc<dyn DeviceToken>) -> Self {
        Self { info, token }
    }

    /// 设备描述
    pub fn info(&self) -> &Arc<DeviceInfo> {
        &self.info
    }

    /// 宿主侧的令牌
    pub fn token(&self) -> &Arc<dyn DeviceToken> {
        &self.token
    }

    /// 令牌对应的服务名
    pub fn service_name(&self) -> &str {
        self.token.service_name()
    }

    /// 是否对应 `info` 描述的设备
    pub fn matches(&self, info: &DeviceInfo) -> bool {
        self.info.device_id == info.device_id && self.info.same_service(info)
    }
}

impl core::fmt::Debug for DeviceTokenClient {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DeviceTokenClient")
            .field("device_id", &self.info.device_id)
            .field("service_name", &self.service_name())
            .finish()
    }
}
