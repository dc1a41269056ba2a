//! 设备管理器的 Mock 实现
//!
//! 只记录宿主发来的请求，不做任何转发。

use alloc::{string::String, sync::Arc, vec::Vec};
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use hdf::{
    DevHostService, DeviceInfo, DeviceToken, DevmgrService, HdfError, HdfResult,
    PowerStateTokenIf,
};
use sync::SpinLock;

/// 记录请求的设备管理器
#[derive(Default)]
pub struct RecordingDevmgr {
    hosts: SpinLock<Vec<u16>>,
    attached: SpinLock<Vec<String>>,
    detached: SpinLock<Vec<String>>,
    fail_attach: AtomicBool,
    wake_acquired: AtomicUsize,
    wake_released: AtomicUsize,
}

impl RecordingDevmgr {
    /// 创建管理器
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// 让之后的 `attach_device` 失败
    pub fn set_fail_attach(&self, fail: bool) {
        self.fail_attach.store(fail, Ordering::SeqCst);
    }

    /// 回调登记过的主机 ID
    pub fn hosts(&self) -> Vec<u16> {
        self.hosts.lock().clone()
    }

    /// 已登记的令牌服务名
    pub fn attached(&self) -> Vec<String> {
        self.attached.lock().clone()
    }

    /// 注销过的设备服务名
    pub fn detached(&self) -> Vec<String> {
        self.detached.lock().clone()
    }

    /// 转发到全局的唤醒锁获取次数
    pub fn wake_acquired(&self) -> usize {
        self.wake_acquired.load(Ordering::SeqCst)
    }

    /// 转发到全局的唤醒锁释放次数
    pub fn wake_released(&self) -> usize {
        self.wake_released.load(Ordering::SeqCst)
    }
}

impl DevmgrService for RecordingDevmgr {
    fn attach_device_host(&self, host_id: u16, _host: Arc<dyn DevHostService>) -> HdfResult {
        self.hosts.lock().push(host_id);
        Ok(())
    }

    fn attach_device(&self, _info: &Arc<DeviceInfo>, token: Arc<dyn DeviceToken>) -> HdfResult {
        if self.fail_attach.load(Ordering::SeqCst) {
            return Err(HdfError::Failure);
        }
        self.attached.lock().push(String::from(token.service_name()));
        Ok(())
    }

    fn detach_device(&self, info: &DeviceInfo) -> HdfResult {
        let mut attached = self.attached.lock();
        let pos = attached
            .iter()
            .position(|s| *s == info.svc_name)
            .ok_or(HdfError::NotFound)?;
        attached.remove(pos);
        self.detached.lock().push(info.svc_name.clone());
        Ok(())
    }

    fn load_device(&self, _svc_name: &str) -> HdfResult {
        Err(HdfError::NotSupported)
    }

    fn unload_device(&self, _svc_name: &str) -> HdfResult {
        Err(HdfError::NotSupported)
    }

    fn acquire_wake_lock(&self, _token: &dyn PowerStateTokenIf) {
        self.wake_acquired.fetch_add(1, Ordering::SeqCst);
    }

    fn release_wake_lock(&self, _token: &dyn PowerStateTokenIf) {
        self.wake_released.fetch_add(1, Ordering::SeqCst);
    }
}
