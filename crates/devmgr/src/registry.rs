//! 全局服务注册表
//!
//! 保存宿主发布的公开服务。订阅尚未发布的服务时，订阅者在此排队，
//! 服务登记时统一回调。

use alloc::{string::String, sync::Arc, vec::Vec};

use hashbrown::HashMap;
use hdf::{DeviceClass, DeviceService, HdfError, HdfResult, ServiceSubscriber};
use sync::SpinLock;

struct ServiceRecord {
    class: DeviceClass,
    service: Arc<dyn DeviceService>,
}

#[derive(Default)]
struct RegistryInner {
    services: HashMap<String, ServiceRecord>,
    pending: HashMap<String, Vec<Arc<dyn ServiceSubscriber>>>,
}

/// 服务注册表
#[derive(Default)]
pub struct ServiceRegistry {
    inner: SpinLock<RegistryInner>,
}

impl ServiceRegistry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记服务，同名服务被替换
    ///
    /// 返回前回调所有等待该服务的订阅者。
    pub fn add(
        &self,
        svc_name: &str,
        class: DeviceClass,
        service: Arc<dyn DeviceService>,
    ) -> HdfResult {
        if svc_name.is_empty() {
            return Err(HdfError::InvalidParameter);
        }
        let waiting = {
            let mut inner = self.inner.lock();
            inner.services.insert(
                String::from(svc_name),
                ServiceRecord {
                    class,
                    service: Arc::clone(&service),
                },
            );
            inner.pending.remove(svc_name).unwrap_or_default()
        };

        for subscriber in waiting {
            if let Err(e) = subscriber.on_service_connected(&service) {
                log::warn!("registry: subscriber of {} failed: {:?}", svc_name, e);
            }
        }
        Ok(())
    }

    /// 注销服务
    pub fn remove(&self, svc_name: &str) -> Option<Arc<dyn DeviceService>> {
        self.inner
            .lock()
            .services
            .remove(svc_name)
            .map(|r| r.service)
    }

    /// 查找服务
    pub fn get(&self, svc_name: &str) -> Option<Arc<dyn DeviceService>> {
        self.inner
            .lock()
            .services
            .get(svc_name)
            .map(|r| Arc::clone(&r.service))
    }

    /// 服务已登记时返回服务，否则把订阅者加入等待队列
    pub fn get_or_wait(
        &self,
        svc_name: &str,
        subscriber: &Arc<dyn ServiceSubscriber>,
    ) -> Option<Arc<dyn DeviceService>> {
        let mut inner = self.inner.lock();
        if let Some(record) = inner.services.get(svc_name) {
            return Some(Arc::clone(&record.service));
        }
        let queue = inner.pending.entry(String::from(svc_name)).or_default();
        if !queue.iter().any(|s| Arc::ptr_eq(s, subscriber)) {
            queue.push(Arc::clone(subscriber));
        }
        None
    }

    /// 放弃等待
    pub fn cancel_wait(&self, svc_name: &str, subscriber: &Arc<dyn ServiceSubscriber>) {
        let mut inner = self.inner.lock();
        if let Some(queue) = inner.pending.get_mut(svc_name) {
            queue.retain(|s| !Arc::ptr_eq(s, subscriber));
            if queue.is_empty() {
                inner.pending.remove(svc_name);
            }
        }
    }

    /// 等待指定服务的订阅者数量
    pub fn waiting(&self, svc_name: &str) -> usize {
        self.inner.lock().pending.get(svc_name).map_or(0, Vec::len)
    }

    /// 列出指定类别的服务名，按名称排序
    pub fn list(&self, class: DeviceClass) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .lock()
            .services
            .iter()
            .filter(|(_, r)| r.class == class)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// 已登记的服务数量
    pub fn len(&self) -> usize {
        self.inner.lock().services.len()
    }

    /// 是否没有登记任何服务
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 清空服务和等待队列
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.services.clear();
        inner.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::any::Any;
    use core::sync::atomic::{AtomicUsize, Ordering};

    struct Named(&'static str);

    impl DeviceService for Named {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl ServiceSubscriber for Counter {
        fn on_service_connected(&self, _service: &Arc<dyn DeviceService>) -> HdfResult {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_add_get_remove() {
        let registry = ServiceRegistry::new();
        registry
            .add("uart0", DeviceClass::Plat, Arc::new(Named("uart0")))
            .unwrap();
        let svc = registry.get("uart0").unwrap();
        let named = svc.as_any().downcast_ref::<Named>().unwrap();
        assert_eq!(named.0, "uart0");

        assert!(registry.remove("uart0").is_some());
        assert!(registry.get("uart0").is_none());
        assert!(registry.remove("uart0").is_none());
    }

    #[test]
    fn test_list_by_class() {
        let registry = ServiceRegistry::new();
        registry
            .add("touch", DeviceClass::Input, Arc::new(Named("touch")))
            .unwrap();
        registry
            .add("keys", DeviceClass::Input, Arc::new(Named("keys")))
            .unwrap();
        registry
            .add("lcd", DeviceClass::Display, Arc::new(Named("lcd")))
            .unwrap();
        assert_eq!(registry.list(DeviceClass::Input), ["keys", "touch"]);
        assert_eq!(registry.list(DeviceClass::Audio).len(), 0);
    }

    #[test]
    fn test_waiting_subscriber_notified_once() {
        let registry = ServiceRegistry::new();
        let counter = Arc::new(Counter::default());
        let subscriber: Arc<dyn ServiceSubscriber> = counter.clone();

        assert!(registry.get_or_wait("codec", &subscriber).is_none());
        assert!(registry.get_or_wait("codec", &subscriber).is_none());
        assert_eq!(registry.waiting("codec"), 1);

        registry
            .add("codec", DeviceClass::Audio, Arc::new(Named("codec")))
            .unwrap();
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
        assert_eq!(registry.waiting("codec"), 0);

        registry
            .add("codec", DeviceClass::Audio, Arc::new(Named("codec")))
            .unwrap();
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cancel_wait() {
        let registry = ServiceRegistry::new();
        let subscriber: Arc<dyn ServiceSubscriber> = Arc::new(Counter::default());
        registry.get_or_wait("cam", &subscriber);
        registry.cancel_wait("cam", &subscriber);
        assert_eq!(registry.waiting("cam"), 0);
    }

    #[test]
    fn test_empty_name_rejected() {
        let registry = ServiceRegistry::new();
        assert_eq!(
            registry.add("", DeviceClass::Default, Arc::new(Named(""))),
            Err(HdfError::InvalidParameter)
        );
    }
}
