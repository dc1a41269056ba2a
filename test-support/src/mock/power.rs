//! 电源相关的 Mock 实现

use alloc::{format, string::String, vec::Vec};

use devhost::{DeviceObject, PowerEventListener};
use hdf::{HdfError, HdfResult, PowerStateManager, PowerStateTokenIf};
use sync::SpinLock;

use crate::EventLog;

/// 记录电源事件的监听者
///
/// 事件格式为 `<事件>:<服务名>`，事件为 `resume`、`suspend`、`doze_resume`、
/// `doze_suspend` 之一。对 `fail_for` 中的服务先记录再返回失败。
pub struct RecordingPowerListener {
    log: EventLog,
    fail_for: SpinLock<Vec<String>>,
}

impl RecordingPowerListener {
    /// 创建监听者，事件写入 `log`
    pub fn new(log: &EventLog) -> Self {
        Self {
            log: log.clone(),
            fail_for: SpinLock::new(Vec::new()),
        }
    }

    /// 让指定服务的回调返回失败
    pub fn fail_for(&self, svc_name: &str) {
        self.fail_for.lock().push(String::from(svc_name));
    }

    fn record(&self, event: &str, object: &DeviceObject) -> HdfResult {
        let name = object.service_name().unwrap_or_default();
        self.log.push(format!("{}:{}", event, name));
        if self.fail_for.lock().contains(&name) {
            return Err(HdfError::Failure);
        }
        Ok(())
    }
}

impl PowerEventListener for RecordingPowerListener {
    fn resume(&self, object: &DeviceObject) -> HdfResult {
        self.record("resume", object)
    }

    fn suspend(&self, object: &DeviceObject) -> HdfResult {
        self.record("suspend", object)
    }

    fn doze_resume(&self, object: &DeviceObject) -> HdfResult {
        self.record("doze_resume", object)
    }

    fn doze_suspend(&self, object: &DeviceObject) -> HdfResult {
        self.record("doze_suspend", object)
    }
}

/// 记录唤醒锁请求的全局电源状态管理器
#[derive(Default)]
pub struct RecordingPowerManager {
    acquired: SpinLock<Vec<usize>>,
    released: SpinLock<Vec<usize>>,
}

impl RecordingPowerManager {
    /// 创建空的记录器
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取过唤醒锁的令牌 ID
    pub fn acquired(&self) -> Vec<usize> {
        self.acquired.lock().clone()
    }

    /// 释放过唤醒锁的令牌 ID
    pub fn released(&self) -> Vec<usize> {
        self.released.lock().clone()
    }
}

impl PowerStateManager for RecordingPowerManager {
    fn acquire_wake_lock(&self, token: &dyn PowerStateTokenIf) {
        self.acquired.lock().push(token.token_id());
    }

    fn release_wake_lock(&self, token: &dyn PowerStateTokenIf) {
        self.released.lock().push(token.token_id());
    }
}
