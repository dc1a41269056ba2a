//! 宿主进程安装器的 Mock 实现

use alloc::vec::Vec;
use core::sync::atomic::{AtomicI32, Ordering};

use hdf::{DriverInstaller, HdfError, HdfResult};
use sync::SpinLock;

/// 记录启动请求的安装器，对登记为失败的主机返回错误
pub struct MockInstaller {
    started: SpinLock<Vec<u16>>,
    failing: SpinLock<Vec<u16>>,
    next_pid: AtomicI32,
}

impl MockInstaller {
    /// 创建安装器，进程号从 100 开始分配
    pub fn new() -> Self {
        Self {
            started: SpinLock::new(Vec::new()),
            failing: SpinLock::new(Vec::new()),
            next_pid: AtomicI32::new(100),
        }
    }

    /// 让指定主机启动失败
    pub fn fail_host(&self, host_id: u16) {
        self.failing.lock().push(host_id);
    }

    /// 收到过启动请求的主机，包括失败的
    pub fn started(&self) -> Vec<u16> {
        self.started.lock().clone()
    }
}

impl Default for MockInstaller {
    fn default() -> Self {
        Self::new()
    }
}

impl DriverInstaller for MockInstaller {
    fn start_device_host(&self, host_id: u16, _host_name: &str) -> HdfResult<i32> {
        self.started.lock().push(host_id);
        if self.failing.lock().contains(&host_id) {
            return Err(HdfError::Failure);
        }
        Ok(self.next_pid.fetch_add(1, Ordering::SeqCst))
    }
}
