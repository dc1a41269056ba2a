//! 服务注册表与订阅者的 Mock 实现

use alloc::{string::String, sync::Arc, vec::Vec};
use core::sync::atomic::{AtomicUsize, Ordering};

use hdf::{DeviceClass, DeviceService, HdfError, HdfResult, ServiceManager, ServiceSubscriber};
use sync::SpinLock;

struct Entry {
    name: String,
    class: DeviceClass,
    service: Arc<dyn DeviceService>,
}

/// 内存中的服务注册表
#[derive(Default)]
pub struct MockServiceManager {
    entries: SpinLock<Vec<Entry>>,
}

impl MockServiceManager {
    /// 创建空的服务管理器
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// 服务是否已注册
    pub fn contains(&self, svc_name: &str) -> bool {
        self.entries.lock().iter().any(|e| e.name == svc_name)
    }

    /// 已注册服务数量
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// 是否没有注册任何服务
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ServiceManager for MockServiceManager {
    fn add_service(
        &self,
        svc_name: &str,
        class: DeviceClass,
        service: Arc<dyn DeviceService>,
    ) -> HdfResult {
        let mut entries = self.entries.lock();
        entries.retain(|e| e.name != svc_name);
        entries.push(Entry {
            name: String::from(svc_name),
            class,
            service,
        });
        Ok(())
    }

    fn remove_service(&self, svc_name: &str) {
        self.entries.lock().retain(|e| e.name != svc_name);
    }

    fn get_service(&self, svc_name: &str) -> Option<Arc<dyn DeviceService>> {
        self.entries
            .lock()
            .iter()
            .find(|e| e.name == svc_name)
            .map(|e| Arc::clone(&e.service))
    }

    fn subscribe_service(
        &self,
        svc_name: &str,
        subscriber: Arc<dyn ServiceSubscriber>,
    ) -> HdfResult {
        let service = self.get_service(svc_name).ok_or(HdfError::NotFound)?;
        subscriber.on_service_connected(&service)
    }

    fn list_service(&self, class: DeviceClass) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.class == class)
            .map(|e| e.name.clone())
            .collect()
    }
}

/// 统计回调次数的订阅者
#[derive(Default)]
pub struct RecordingSubscriber {
    hits: AtomicUsize,
}

impl RecordingSubscriber {
    /// 创建订阅者
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// 收到的通知次数
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl ServiceSubscriber for RecordingSubscriber {
    fn on_service_connected(&self, _service: &Arc<dyn DeviceService>) -> HdfResult {
        self.hits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
