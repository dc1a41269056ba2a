//! 电源状态令牌
//!
//! 每个注册了电源监听者的驱动实例持有一个 [`PowerStateToken`]。
//! 令牌通过 [`WakeLockRef`] 统计唤醒锁引用，在首次获取时向设备管理器登记，
//! 在最后一次释放时注销并回调驱动的 `suspend`。首次获取不会回调 `resume`，
//! 只有此前释放过（`Inactive`）的令牌在重新获取时才会回调。
//!
//! 回调在唤醒锁引用的内部锁之外执行，驱动可以在 `resume` 中
//! 获取或释放自己的唤醒锁。

use alloc::sync::{Arc, Weak};
use core::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use hdf::{DevmgrService, HdfError, HdfResult, PowerState, PowerStateTokenIf, PowerTokenState};

use crate::object::DeviceObject;
use crate::sref::{WakeLockRef, WakeRefListener};

/// 驱动的电源事件监听者
pub trait PowerEventListener: Send + Sync {
    /// 系统唤醒
    fn resume(&self, object: &DeviceObject) -> HdfResult;

    /// 系统挂起
    fn suspend(&self, object: &DeviceObject) -> HdfResult;

    /// 从浅睡眠唤醒
    fn doze_resume(&self, _object: &DeviceObject) -> HdfResult {
        Ok(())
    }

    /// 进入浅睡眠
    fn doze_suspend(&self, _object: &DeviceObject) -> HdfResult {
        Ok(())
    }
}

static NEXT_TOKEN_ID: AtomicUsize = AtomicUsize::new(1);

const STATE_IDLE: u8 = 0;
const STATE_ACTIVE: u8 = 1;
const STATE_INACTIVE: u8 = 2;

/// 电源状态令牌
pub struct PowerStateToken {
    id: usize,
    wake_ref: WakeLockRef,
    /// 只在边沿回调中写入，`wake_ref` 保证回调不会并发执行
    state: AtomicU8,
    listener: Arc<dyn PowerEventListener>,
    object: Weak<DeviceObject>,
    devmgr: Weak<dyn DevmgrService>,
}

impl PowerStateToken {
    /// 创建令牌，初始状态为 `Idle`
    pub fn new(
        object: Weak<DeviceObject>,
        listener: Arc<dyn PowerEventListener>,
        devmgr: Weak<dyn DevmgrService>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: NEXT_TOKEN_ID.fetch_add(1, Ordering::Relaxed),
            wake_ref: WakeLockRef::new(),
            state: AtomicU8::new(STATE_IDLE),
            listener,
            object,
            devmgr,
        })
    }

    /// 当前唤醒锁引用计数
    pub fn wake_count(&self) -> usize {
        self.wake_ref.count()
    }

    /// 把系统电源状态分发到驱动的监听者
    pub fn power_state_change(&self, state: PowerState) -> HdfResult {
        let object = self.object.upgrade().ok_or(HdfError::NoDevice)?;
        match state {
            PowerState::Resume => self.listener.resume(&object),
            PowerState::Suspend => self.listener.suspend(&object),
            PowerState::DozeResume => self.listener.doze_resume(&object),
            PowerState::DozeSuspend => self.listener.doze_suspend(&object),
        }
    }

    fn set_state(&self, state: PowerTokenState) {
        let raw = match state {
            PowerTokenState::Idle => STATE_IDLE,
            PowerTokenState::Active => STATE_ACTIVE,
            PowerTokenState::Inactive => STATE_INACTIVE,
        };
        self.state.store(raw, Ordering::Release);
    }
}

impl PowerStateTokenIf for PowerStateToken {
    fn token_id(&self) -> usize {
        self.id
    }

    fn state(&self) -> PowerTokenState {
        match self.state.load(Ordering::Acquire) {
            STATE_ACTIVE => PowerTokenState::Active,
            STATE_INACTIVE => PowerTokenState::Inactive,
            _ => PowerTokenState::Idle,
        }
    }

    fn acquire_wake_lock(&self) {
        self.wake_ref.acquire(self);
    }

    fn release_wake_lock(&self) {
        self.wake_ref.release(self);
    }
}

impl WakeRefListener for PowerStateToken {
    fn on_first_acquire(&self) {
        let state = self.state();
        if state == PowerTokenState::Active {
            return;
        }
        let Some(devmgr) = self.devmgr.upgrade() else {
            log::warn!("power token {}: device manager unreachable", self.id);
            return;
        };
        devmgr.acquire_wake_lock(self);
        if state == PowerTokenState::Inactive {
            match self.object.upgrade() {
                Some(object) => {
                    if let Err(e) = self.listener.resume(&object) {
                        log::error!("power token {}: resume failed: {:?}", self.id, e);
                    }
                }
                None => log::warn!("power token {}: device object is gone", self.id),
            }
        }
        self.set_state(PowerTokenState::Active);
    }

    fn on_last_release(&self) {
        if self.state() != PowerTokenState::Active {
            return;
        }
        let Some(devmgr) = self.devmgr.upgrade() else {
            log::warn!("power token {}: device manager unreachable", self.id);
            return;
        };
        devmgr.release_wake_lock(self);
        match self.object.upgrade() {
            Some(object) => {
                if let Err(e) = self.listener.suspend(&object) {
                    log::error!("power token {}: suspend failed: {:?}", self.id, e);
                }
            }
            None => log::warn!("power token {}: device object is gone", self.id),
        }
        self.set_state(PowerTokenState::Inactive);
    }
}

impl core::fmt::Debug for PowerStateToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PowerStateToken")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("wake_count", &self.wake_ref.count())
            .finish()
    }
}
