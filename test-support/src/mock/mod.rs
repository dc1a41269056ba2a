//! Mock 实现模块
//!
//! 提供驱动、加载器、设备管理器和各类外部管理器的 Mock 实现，用于测试

pub mod devmgr;
pub mod driver;
pub mod installer;
pub mod power;
pub mod service;

pub use devmgr::RecordingDevmgr;
pub use driver::{MockDriver, MockLoader, MockService};
pub use installer::MockInstaller;
pub use power::{RecordingPowerListener, RecordingPowerManager};
pub use service::{MockServiceManager, RecordingSubscriber};
