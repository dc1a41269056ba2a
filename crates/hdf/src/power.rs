//! 电源状态定义
//!
//! 包含系统电源状态、唤醒令牌状态以及全局电源状态管理器接口。

/// 系统电源状态
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    /// 从浅睡眠唤醒
    DozeResume = 0,
    /// 进入浅睡眠
    DozeSuspend = 1,
    /// 唤醒
    Resume = 2,
    /// 挂起
    Suspend = 3,
}

impl PowerState {
    /// 从原始值转换
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(PowerState::DozeResume),
            1 => Some(PowerState::DozeSuspend),
            2 => Some(PowerState::Resume),
            3 => Some(PowerState::Suspend),
            _ => None,
        }
    }

    /// 是否为唤醒类状态
    ///
    /// 唤醒类状态按加载顺序的逆序通知设备，睡眠类状态按加载顺序通知。
    pub fn is_wake(&self) -> bool {
        matches!(self, PowerState::DozeResume | PowerState::Resume)
    }
}

/// 唤醒令牌状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerTokenState {
    /// 初始状态，从未持有过唤醒锁
    Idle,
    /// 持有唤醒锁
    Active,
    /// 曾经持有，现已全部释放
    Inactive,
}

/// 唤醒令牌接口
///
/// 设备管理器和全局电源状态管理器通过此接口识别令牌。
pub trait PowerStateTokenIf: Send + Sync {
    /// 令牌的唯一标识
    fn token_id(&self) -> usize;

    /// 令牌当前状态
    fn state(&self) -> PowerTokenState;

    /// 增加唤醒锁引用
    fn acquire_wake_lock(&self);

    /// 减少唤醒锁引用
    fn release_wake_lock(&self);
}

/// 全局电源状态管理器
///
/// 由框架外部实现，负责汇总所有令牌的唤醒锁以决定系统能否进入低功耗状态。
pub trait PowerStateManager: Send + Sync {
    /// 令牌开始持有唤醒锁
    fn acquire_wake_lock(&self, token: &dyn PowerStateTokenIf);

    /// 令牌释放唤醒锁
    fn release_wake_lock(&self, token: &dyn PowerStateTokenIf);
}
