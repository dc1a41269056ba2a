//! 驱动与驱动加载器的 Mock 实现
//!
//! 驱动在 `bind` 中发布 [`MockService`]，并把生命周期事件写入 [`EventLog`]：
//! `bind:<服务名>`、`init:<服务名>`、`release:<服务名>`。

use alloc::{format, string::String, sync::Arc, vec::Vec};
use core::any::Any;
use core::sync::atomic::{AtomicBool, Ordering};

use devhost::{DeviceObject, DriverEntry, DriverLoader, PowerEventListener};
use hdf::{DeviceClass, DeviceInfo, DeviceService, HdfError, HdfResult};
use sync::SpinLock;

use crate::EventLog;

/// Mock 服务对象
#[derive(Debug)]
pub struct MockService {
    /// 发布时的服务名
    pub name: String,
}

impl DeviceService for MockService {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Mock 驱动
pub struct MockDriver {
    module: String,
    log: EventLog,
    fail_bind: AtomicBool,
    fail_init: AtomicBool,
    hold_init: AtomicBool,
    in_init: AtomicBool,
    class: SpinLock<DeviceClass>,
    power_listener: SpinLock<Option<Arc<dyn PowerEventListener>>>,
}

impl MockDriver {
    /// 创建驱动，生命周期事件写入 `log`
    pub fn new(module: &str, log: &EventLog) -> Arc<Self> {
        Arc::new(Self {
            module: String::from(module),
            log: log.clone(),
            fail_bind: AtomicBool::new(false),
            fail_init: AtomicBool::new(false),
            hold_init: AtomicBool::new(false),
            in_init: AtomicBool::new(false),
            class: SpinLock::new(DeviceClass::Default),
            power_listener: SpinLock::new(None),
        })
    }

    /// `bind` 返回失败
    pub fn set_fail_bind(&self, fail: bool) {
        self.fail_bind.store(fail, Ordering::SeqCst);
    }

    /// `init` 返回失败
    pub fn set_fail_init(&self, fail: bool) {
        self.fail_init.store(fail, Ordering::SeqCst);
    }

    /// 让之后的 `init` 停在入口处，直到 [`open_init`](Self::open_init)
    pub fn hold_init(&self) {
        self.hold_init.store(true, Ordering::SeqCst);
    }

    /// 放行停住的 `init`
    pub fn open_init(&self) {
        self.hold_init.store(false, Ordering::SeqCst);
    }

    /// 是否有 `init` 停在入口处
    pub fn init_waiting(&self) -> bool {
        self.in_init.load(Ordering::SeqCst)
    }

    /// `init` 时设置的设备类别
    pub fn set_device_class(&self, class: DeviceClass) {
        *self.class.lock() = class;
    }

    /// `init` 时注册的电源监听者
    pub fn set_power_listener(&self, listener: Arc<dyn PowerEventListener>) {
        *self.power_listener.lock() = Some(listener);
    }

    fn name_of(object: &DeviceObject) -> String {
        object.service_name().unwrap_or_default()
    }
}

impl DriverEntry for MockDriver {
    fn module_name(&self) -> &str {
        &self.module
    }

    fn bind(&self, object: &Arc<DeviceObject>) -> HdfResult {
        let name = Self::name_of(object);
        self.log.push(format!("bind:{}", name));
        if self.fail_bind.load(Ordering::SeqCst) {
            return Err(HdfError::Failure);
        }
        object.set_service(Arc::new(MockService { name }));
        Ok(())
    }

    fn init(&self, object: &Arc<DeviceObject>) -> HdfResult {
        if self.hold_init.load(Ordering::SeqCst) {
            self.in_init.store(true, Ordering::SeqCst);
            while self.hold_init.load(Ordering::SeqCst) {
                core::hint::spin_loop();
            }
            self.in_init.store(false, Ordering::SeqCst);
        }
        self.log.push(format!("init:{}", Self::name_of(object)));
        if self.fail_init.load(Ordering::SeqCst) {
            return Err(HdfError::Failure);
        }
        object.set_device_class(*self.class.lock());
        let listener = self.power_listener.lock().clone();
        if let Some(listener) = listener {
            object.register_power_listener(listener)?;
        }
        Ok(())
    }

    fn release(&self, object: &Arc<DeviceObject>) {
        self.log.push(format!("release:{}", Self::name_of(object)));
    }
}

/// Mock 驱动加载器，按模块名查找已登记的驱动
#[derive(Default)]
pub struct MockLoader {
    drivers: SpinLock<Vec<Arc<MockDriver>>>,
}

impl MockLoader {
    /// 创建空加载器
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// 登记驱动，同名模块先登记者优先
    pub fn register(&self, driver: Arc<MockDriver>) {
        self.drivers.lock().push(driver);
    }
}

impl DriverLoader for MockLoader {
    fn get_driver_entry(&self, info: &DeviceInfo) -> Option<Arc<dyn DriverEntry>> {
        self.drivers
            .lock()
            .iter()
            .find(|d| d.module == info.module_name)
            .map(|d| Arc::clone(d) as Arc<dyn DriverEntry>)
    }
}
