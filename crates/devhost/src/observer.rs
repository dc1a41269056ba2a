//! 宿主内服务观察表
//!
//! 宿主内的驱动可以按服务名订阅同一宿主中其它驱动发布的服务。
//! 订阅可以早于发布；服务发布时，所有可见且尚未收到通知的订阅者被回调一次。

use alloc::{string::String, sync::Arc, vec::Vec};

use hashbrown::HashMap;
use hdf::{DeviceService, HdfError, HdfResult, ServicePolicy, ServiceSubscriber};
use sync::SpinLock;

struct Subscriber {
    match_id: u32,
    callback: Arc<dyn ServiceSubscriber>,
    ready: bool,
}

struct ObserverRecord {
    publisher: Option<Arc<dyn DeviceService>>,
    match_id: u32,
    policy: ServicePolicy,
    subscribers: Vec<Subscriber>,
}

impl ObserverRecord {
    fn new() -> Self {
        Self {
            publisher: None,
            match_id: 0,
            policy: ServicePolicy::None,
            subscribers: Vec::new(),
        }
    }

    /// 私有服务只对同一设备可见
    fn visible_to(&self, match_id: u32) -> bool {
        self.policy != ServicePolicy::Private || self.match_id == match_id
    }
}

/// 服务观察表
pub struct ServiceObserver {
    services: SpinLock<HashMap<String, ObserverRecord>>,
}

impl ServiceObserver {
    /// 创建空表
    pub fn new() -> Self {
        Self {
            services: SpinLock::new(HashMap::new()),
        }
    }

    /// 订阅服务
    ///
    /// 同一 `match_id` 重复订阅时替换旧的回调。
    /// 服务已发布且对订阅者可见时立即回调。
    pub fn subscribe(
        &self,
        svc_name: &str,
        match_id: u32,
        callback: Arc<dyn ServiceSubscriber>,
    ) -> HdfResult {
        if svc_name.is_empty() {
            return Err(HdfError::InvalidParameter);
        }

        let ready_service = {
            let mut services = self.services.lock();
            let record = services
                .entry(String::from(svc_name))
                .or_insert_with(ObserverRecord::new);
            let ready_service = record
                .publisher
                .clone()
                .filter(|_| record.visible_to(match_id));
            record.subscribers.retain(|s| s.match_id != match_id);
            record.subscribers.push(Subscriber {
                match_id,
                callback: Arc::clone(&callback),
                ready: ready_service.is_some(),
            });
            ready_service
        };

        if let Some(service) = ready_service {
            if let Err(e) = callback.on_service_connected(&service) {
                log::warn!("observer: subscriber of {} failed: {:?}", svc_name, e);
            }
        }
        Ok(())
    }

    /// 发布服务并通知等待中的订阅者
    pub fn publish(
        &self,
        svc_name: &str,
        match_id: u32,
        policy: ServicePolicy,
        service: Arc<dyn DeviceService>,
    ) -> HdfResult {
        if svc_name.is_empty() {
            return Err(HdfError::InvalidParameter);
        }

        let pending: Vec<Arc<dyn ServiceSubscriber>> = {
            let mut services = self.services.lock();
            let record = services
                .entry(String::from(svc_name))
                .or_insert_with(ObserverRecord::new);
            record.publisher = Some(Arc::clone(&service));
            record.match_id = match_id;
            record.policy = policy;

            let mut pending = Vec::new();
            for i in 0..record.subscribers.len() {
                let sub_match = record.subscribers[i].match_id;
                if record.subscribers[i].ready || !record.visible_to(sub_match) {
                    continue;
                }
                record.subscribers[i].ready = true;
                pending.push(Arc::clone(&record.subscribers[i].callback));
            }
            pending
        };

        log::debug!(
            "observer: publish {} to {} subscriber(s)",
            svc_name,
            pending.len()
        );
        for callback in pending {
            if let Err(e) = callback.on_service_connected(&service) {
                log::warn!("observer: subscriber of {} failed: {:?}", svc_name, e);
            }
        }
        Ok(())
    }

    /// 撤销 `match_id` 发布的服务
    ///
    /// 订阅者保留下来并重新进入等待，服务再次发布时会再收到一次通知。
    /// 发布者不是 `match_id` 时什么也不做。
    pub fn withdraw(&self, svc_name: &str, match_id: u32) {
        let mut services = self.services.lock();
        let Some(record) = services.get_mut(svc_name) else {
            return;
        };
        if record.publisher.is_none() || record.match_id != match_id {
            return;
        }
        record.publisher = None;
        record.match_id = 0;
        record.policy = ServicePolicy::None;
        record.subscribers.iter_mut().for_each(|s| s.ready = false);
        if record.subscribers.is_empty() {
            services.remove(svc_name);
        }
    }

    /// 删除 `match_id` 在所有服务名下的订阅
    pub fn unsubscribe_all(&self, match_id: u32) {
        self.services.lock().retain(|_, record| {
            record.subscribers.retain(|s| s.match_id != match_id);
            record.publisher.is_some() || !record.subscribers.is_empty()
        });
    }

    /// 清空全部记录
    pub fn clear(&self) {
        self.services.lock().clear();
    }

    /// 服务是否已发布
    pub fn is_published(&self, svc_name: &str) -> bool {
        self.services
            .lock()
            .get(svc_name)
            .is_some_and(|r| r.publisher.is_some())
    }

    /// 服务名下的订阅者数量
    pub fn subscriber_count(&self, svc_name: &str) -> usize {
        self.services
            .lock()
            .get(svc_name)
            .map_or(0, |r| r.subscribers.len())
    }

    /// 记录数量
    pub fn len(&self) -> usize {
        self.services.lock().len()
    }

    /// 是否没有任何记录
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ServiceObserver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use core::any::Any;
    use core::sync::atomic::{AtomicUsize, Ordering};

    struct DummyService;

    impl DeviceService for DummyService {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[derive(Default)]
    struct CountingSubscriber {
        hits: AtomicUsize,
    }

    impl ServiceSubscriber for CountingSubscriber {
        fn on_service_connected(&self, _service: &Arc<dyn DeviceService>) -> HdfResult {
            self.hits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn service() -> Arc<dyn DeviceService> {
        Arc::new(DummyService)
    }

    #[test]
    fn test_subscribe_before_publish() {
        let observer = ServiceObserver::new();
        let sub = Arc::new(CountingSubscriber::default());
        observer.subscribe("uart", 7, sub.clone()).unwrap();
        assert_eq!(sub.hits.load(Ordering::SeqCst), 0);
        assert!(!observer.is_published("uart"));

        observer
            .publish("uart", 1, ServicePolicy::Public, service())
            .unwrap();
        assert_eq!(sub.hits.load(Ordering::SeqCst), 1);

        // 再次发布不会重复通知
        observer
            .publish("uart", 1, ServicePolicy::Public, service())
            .unwrap();
        assert_eq!(sub.hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_subscribe_after_publish() {
        let observer = ServiceObserver::new();
        observer
            .publish("i2c", 1, ServicePolicy::Capacity, service())
            .unwrap();
        let sub = Arc::new(CountingSubscriber::default());
        observer.subscribe("i2c", 9, sub.clone()).unwrap();
        assert_eq!(sub.hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_private_service_visibility() {
        let observer = ServiceObserver::new();
        let other = Arc::new(CountingSubscriber::default());
        let owner = Arc::new(CountingSubscriber::default());
        observer.subscribe("secret", 2, other.clone()).unwrap();
        observer.subscribe("secret", 1, owner.clone()).unwrap();

        observer
            .publish("secret", 1, ServicePolicy::Private, service())
            .unwrap();
        assert_eq!(other.hits.load(Ordering::SeqCst), 0);
        assert_eq!(owner.hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_resubscribe_replaces_callback() {
        let observer = ServiceObserver::new();
        let first = Arc::new(CountingSubscriber::default());
        let second = Arc::new(CountingSubscriber::default());
        observer.subscribe("spi", 3, first.clone()).unwrap();
        observer.subscribe("spi", 3, second.clone()).unwrap();
        assert_eq!(observer.subscriber_count("spi"), 1);

        observer
            .publish("spi", 1, ServicePolicy::Public, service())
            .unwrap();
        assert_eq!(first.hits.load(Ordering::SeqCst), 0);
        assert_eq!(second.hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_withdraw_only_by_publisher() {
        let observer = ServiceObserver::new();
        observer
            .publish("gpio", 1, ServicePolicy::Public, service())
            .unwrap();
        assert_eq!(observer.len(), 1);

        observer.withdraw("gpio", 2);
        assert!(observer.is_published("gpio"));

        observer.withdraw("gpio", 1);
        assert!(!observer.is_published("gpio"));
        assert!(observer.is_empty());
        observer.withdraw("gpio", 1);
    }

    #[test]
    fn test_withdraw_keeps_other_subscribers_waiting() {
        let observer = ServiceObserver::new();
        let sub = Arc::new(CountingSubscriber::default());
        observer.subscribe("gpio", 5, sub.clone()).unwrap();
        observer
            .publish("gpio", 1, ServicePolicy::Public, service())
            .unwrap();
        assert_eq!(sub.hits.load(Ordering::SeqCst), 1);

        observer.withdraw("gpio", 1);
        assert_eq!(observer.subscriber_count("gpio"), 1);

        observer
            .publish("gpio", 1, ServicePolicy::Public, service())
            .unwrap();
        assert_eq!(sub.hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unsubscribe_all_drops_stale_callbacks() {
        let observer = ServiceObserver::new();
        let gone = Arc::new(CountingSubscriber::default());
        let kept = Arc::new(CountingSubscriber::default());
        observer.subscribe("i2c", 3, gone.clone()).unwrap();
        observer.subscribe("spi", 3, gone.clone()).unwrap();
        observer.subscribe("spi", 4, kept.clone()).unwrap();

        observer.unsubscribe_all(3);
        assert_eq!(observer.subscriber_count("i2c"), 0);
        assert_eq!(observer.subscriber_count("spi"), 1);
        assert_eq!(observer.len(), 1);

        observer
            .publish("spi", 9, ServicePolicy::Public, service())
            .unwrap();
        observer
            .publish("i2c", 9, ServicePolicy::Public, service())
            .unwrap();
        assert_eq!(gone.hits.load(Ordering::SeqCst), 0);
        assert_eq!(kept.hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_empty_name_rejected() {
        let observer = ServiceObserver::new();
        let sub = Arc::new(CountingSubscriber::default());
        assert_eq!(
            observer.subscribe("", 1, sub),
            Err(HdfError::InvalidParameter)
        );
        assert_eq!(
            observer.publish("", 1, ServicePolicy::Public, service()),
            Err(HdfError::InvalidParameter)
        );
    }
}
