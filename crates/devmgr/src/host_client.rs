//! 宿主客户端
//!
//! [`HostClient`] 是设备管理器对一个宿主进程的记录：配置中的设备列表、
//! 进程号、远端宿主句柄以及宿主登记过来的设备令牌。

use alloc::{string::String, sync::Arc, vec::Vec};
use core::sync::atomic::{AtomicI32, Ordering};

use hdf::{
    DevHostService, DeviceInfo, HdfError, HdfResult, HostInfo, INVALID_HOST_PID, PreloadMode,
};
use sync::SpinLock;

use crate::token_client::DeviceTokenClient;

#[derive(Default)]
struct ClientState {
    infos: Vec<Arc<DeviceInfo>>,
    dev_count: usize,
    proxy: Option<Arc<dyn DevHostService>>,
    tokens: Vec<DeviceTokenClient>,
    /// 正在加载或卸载的设备 ID
    activating: Vec<u16>,
}

/// 设备激活权
///
/// 持有期间同一设备的其它加载/卸载请求被拒绝，离开作用域时释放。
#[must_use]
pub(crate) struct Activation<'a> {
    client: &'a HostClient,
    device_id: u16,
}

impl Drop for Activation<'_> {
    fn drop(&mut self) {
        self.client
            .state
            .lock()
            .activating
            .retain(|&id| id != self.device_id);
    }
}

/// 宿主客户端
pub struct HostClient {
    host_id: u16,
    host_name: String,
    pid: AtomicI32,
    state: SpinLock<ClientState>,
}

impl HostClient {
    /// 按主机描述创建，尚未关联宿主进程
    pub fn new(info: &HostInfo) -> Self {
        Self {
            host_id: info.host_id,
            host_name: info.host_name.clone(),
            pid: AtomicI32::new(INVALID_HOST_PID),
            state: SpinLock::new(ClientState::default()),
        }
    }

    /// 主机 ID
    pub fn host_id(&self) -> u16 {
        self.host_id
    }

    /// 主机名
    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    /// 宿主进程号，未启动时为 [`INVALID_HOST_PID`]
    pub fn pid(&self) -> i32 {
        self.pid.load(Ordering::Acquire)
    }

    pub(crate) fn set_pid(&self, pid: i32) {
        self.pid.store(pid, Ordering::Release);
    }

    /// 宿主是否已回调登记
    pub fn is_attached(&self) -> bool {
        self.state.lock().proxy.is_some()
    }

    /// 远端宿主句柄
    pub fn proxy(&self) -> Option<Arc<dyn DevHostService>> {
        self.state.lock().proxy.clone()
    }

    /// 设备列表的快照
    pub fn infos(&self) -> Vec<Arc<DeviceInfo>> {
        self.state.lock().infos.clone()
    }

    /// 设备数量
    pub fn dev_count(&self) -> usize {
        self.state.lock().dev_count
    }

    /// 按服务名查找设备描述
    pub fn find_info(&self, svc_name: &str) -> Option<Arc<DeviceInfo>> {
        self.state
            .lock()
            .infos
            .iter()
            .find(|i| i.svc_name == svc_name)
            .cloned()
    }

    /// 是否配置了指定模块
    pub fn has_module(&self, module_name: &str) -> bool {
        self.state
            .lock()
            .infos
            .iter()
            .any(|i| i.module_name == module_name)
    }

    /// 记录宿主句柄和设备列表
    pub(crate) fn attach(&self, proxy: Arc<dyn DevHostService>, infos: Vec<Arc<DeviceInfo>>) {
        let mut state = self.state.lock();
        state.dev_count = infos.len();
        state.infos = infos;
        state.proxy = Some(proxy);
    }

    /// 占用设备的激活权
    ///
    /// 已有加载/卸载在进行中时返回 `Busy`，设备已处于 `target` 时返回 `AlreadyInState`。
    /// 检查和占用在同一把锁内完成。
    pub(crate) fn claim(
        &self,
        info: &DeviceInfo,
        target: PreloadMode,
    ) -> HdfResult<Activation<'_>> {
        self.claim_with(info, Some(target))
    }

    /// 为删除设备描述占用激活权，不检查预加载标记
    pub(crate) fn claim_removal(&self, info: &DeviceInfo) -> HdfResult<Activation<'_>> {
        self.claim_with(info, None)
    }

    fn claim_with(
        &self,
        info: &DeviceInfo,
        target: Option<PreloadMode>,
    ) -> HdfResult<Activation<'_>> {
        let mut state = self.state.lock();
        if state.activating.contains(&info.device_id) {
            log::warn!("host client {}: {} is busy", self.host_name, info.svc_name);
            return Err(HdfError::Busy);
        }
        if let Some(target) = target {
            if info.preload() == target {
                log::warn!(
                    "host client {}: {} is already {:?}",
                    self.host_name,
                    info.svc_name,
                    target
                );
                return Err(HdfError::AlreadyInState);
            }
        }
        state.activating.push(info.device_id);
        Ok(Activation {
            client: self,
            device_id: info.device_id,
        })
    }

    /// 追加动态设备并占用它的激活权
    pub(crate) fn push_dynamic(
        &self,
        module_name: &str,
        svc_name: &str,
    ) -> (Arc<DeviceInfo>, Activation<'_>) {
        let mut state = self.state.lock();
        let device_id = state
            .infos
            .iter()
            .map(|i| i.device_id)
            .max()
            .map_or(1, |id| id.saturating_add(1));
        let info = Arc::new(
            DeviceInfo::new(self.host_id, device_id, module_name, svc_name)
                .with_preload(PreloadMode::Disabled)
                .dynamic(),
        );
        state.infos.push(Arc::clone(&info));
        state.dev_count = state.infos.len();
        state.activating.push(device_id);
        let activation = Activation {
            client: self,
            device_id,
        };
        (info, activation)
    }

    /// 删除设备描述
    pub(crate) fn remove_info(&self, info: &Arc<DeviceInfo>) {
        let mut state = self.state.lock();
        state.infos.retain(|i| !Arc::ptr_eq(i, info));
        state.dev_count = state.infos.len();
    }

    /// 记录设备令牌，同一设备的旧令牌被替换
    pub(crate) fn add_token(&self, token: DeviceTokenClient) {
        let mut state = self.state.lock();
        state.tokens.retain(|t| !t.matches(token.info()));
        state.tokens.push(token);
    }

    /// 移除设备令牌
    pub(crate) fn remove_token(&self, info: &DeviceInfo) -> Option<DeviceTokenClient> {
        let mut state = self.state.lock();
        let pos = state.tokens.iter().position(|t| t.matches(info))?;
        Some(state.tokens.remove(pos))
    }

    /// 已登记令牌的服务名
    pub fn token_names(&self) -> Vec<String> {
        self.state
            .lock()
            .tokens
            .iter()
            .map(|t| String::from(t.service_name()))
            .collect()
    }

    /// 安装全部立即加载的设备
    ///
    /// 单个设备失败只记录日志。
    pub fn install_drivers(&self) {
        let Some(proxy) = self.proxy() else {
            log::error!("host client {}: host is not attached", self.host_name);
            return;
        };
        for info in self.infos() {
            if info.preload() != PreloadMode::Enabled {
                continue;
            }
            if let Err(e) = proxy.add_device(&info) {
                log::error!(
                    "host client {}: install {} failed: {:?}",
                    self.host_name,
                    info.svc_name,
                    e
                );
            }
        }
    }

    /// 断开宿主，清空句柄和令牌，返回令牌记录
    pub(crate) fn detach(&self) -> Vec<DeviceTokenClient> {
        let mut state = self.state.lock();
        state.proxy = None;
        self.set_pid(INVALID_HOST_PID);
        core::mem::take(&mut state.tokens)
    }
}

impl core::fmt::Debug for HostClient {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HostClient")
            .field("host_id", &self.host_id)
            .field("host_name", &self.host_name)
            .field("pid", &self.pid())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdf::DeviceToken;

    struct Token(&'static str);

    impl DeviceToken for Token {
        fn service_name(&self) -> &str {
            self.0
        }
    }

    fn client() -> HostClient {
        HostClient::new(&HostInfo::new(3, "audio_host", 1))
    }

    #[test]
    fn test_new_client_is_detached() {
        let client = client();
        assert_eq!(client.pid(), INVALID_HOST_PID);
        assert!(!client.is_attached());
        assert_eq!(client.dev_count(), 0);
    }

    #[test]
    fn test_tokens_replace_and_remove() {
        let client = client();
        let info = Arc::new(DeviceInfo::new(3, 1, "codec_drv", "codec"));
        client.add_token(DeviceTokenClient::new(info.clone(), Arc::new(Token("codec"))));
        client.add_token(DeviceTokenClient::new(info.clone(), Arc::new(Token("codec"))));
        assert_eq!(client.token_names(), ["codec"]);

        assert!(client.remove_token(&info).is_some());
        assert!(client.remove_token(&info).is_none());
    }

    #[test]
    fn test_push_dynamic_allocates_next_id() {
        let client = client();
        let (first, _) = client.push_dynamic("dyn_drv", "dyn0");
        let (second, _) = client.push_dynamic("dyn_drv", "dyn1");
        assert_eq!(first.device_id, 1);
        assert_eq!(second.device_id, 2);
        assert!(second.is_dynamic);
        assert_eq!(second.preload(), PreloadMode::Disabled);
        assert_eq!(client.dev_count(), 2);
        assert!(client.has_module("dyn_drv"));

        client.remove_info(&first);
        assert_eq!(client.dev_count(), 1);
        assert!(client.find_info("dyn0").is_none());
    }

    #[test]
    fn test_claim_is_exclusive_until_dropped() {
        let client = client();
        let info =
            DeviceInfo::new(3, 1, "codec_drv", "codec").with_preload(PreloadMode::Disabled);

        let claim = client.claim(&info, PreloadMode::Enabled).unwrap();
        assert_eq!(
            client.claim(&info, PreloadMode::Enabled).err(),
            Some(HdfError::Busy)
        );
        assert_eq!(
            client.claim(&info, PreloadMode::Disabled).err(),
            Some(HdfError::Busy)
        );
        drop(claim);

        assert!(client.claim(&info, PreloadMode::Enabled).is_ok());
        assert_eq!(
            client.claim(&info, PreloadMode::Disabled).err(),
            Some(HdfError::AlreadyInState)
        );
    }

    #[test]
    fn test_dynamic_device_is_claimed_on_push() {
        let client = client();
        let (info, claim) = client.push_dynamic("dyn_drv", "dyn0");
        assert_eq!(
            client.claim(&info, PreloadMode::Enabled).err(),
            Some(HdfError::Busy)
        );
        drop(claim);
        assert!(client.claim(&info, PreloadMode::Enabled).is_ok());
    }
}
