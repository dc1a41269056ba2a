//! 测试支持 crate
//!
//! 提供驱动框架各个外部协作者的 Mock 实现和测试工具

#![no_std]

extern crate alloc;

pub mod mock;

use alloc::{string::String, sync::Arc, vec::Vec};

use sync::SpinLock;

/// 按发生顺序记录事件的共享日志
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<SpinLock<Vec<String>>>,
}

impl EventLog {
    /// 创建空日志
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一条事件
    pub fn push(&self, event: String) {
        self.events.lock().push(event);
    }

    /// 全部事件的副本
    pub fn snapshot(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    /// 以 `prefix` 开头的事件，去掉前缀
    pub fn with_prefix(&self, prefix: &str) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| e.strip_prefix(prefix))
            .map(String::from)
            .collect()
    }

    /// 清空全部事件
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}
