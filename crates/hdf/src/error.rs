//! 驱动框架错误类型
//!
//! 定义了设备管理器与设备宿主之间传递的错误码，可通过 [`HdfError::code()`]
//! 转换为跨进程调用使用的数值状态码。

/// 驱动框架错误类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HdfError {
    /// 通用失败 (-1)
    Failure,
    /// 操作不支持 (-2)
    NotSupported,
    /// 参数无效或缺少必需的协作者 (-3)
    InvalidParameter,
    /// 内存分配失败 (-6)
    AllocationFailure,
    /// 设备正在加载或卸载 (-8)
    Busy,

    // 设备相关
    /// 无法获取设备对象 (-202)
    NoDevice,
    /// 驱动加载器没有返回设备节点 (-203)
    NoDeviceService,
    /// 驱动初始化失败 (-204)
    DeviceInitFailed,
    /// 服务发布失败 (-205)
    PublishFailed,

    // 管理器相关
    /// 设备已处于目标状态，重复激活/去激活 (-210)
    AlreadyInState,
    /// 主机、设备或服务不存在 (-211)
    NotFound,
}

impl HdfError {
    /// 转换为数值状态码（负数）
    pub fn code(&self) -> i32 {
        match self {
            HdfError::Failure => -1,
            HdfError::NotSupported => -2,
            HdfError::InvalidParameter => -3,
            HdfError::AllocationFailure => -6,
            HdfError::Busy => -8,
            HdfError::NoDevice => -202,
            HdfError::NoDeviceService => -203,
            HdfError::DeviceInitFailed => -204,
            HdfError::PublishFailed => -205,
            HdfError::AlreadyInState => -210,
            HdfError::NotFound => -211,
        }
    }

    /// 从数值状态码还原错误，`0` 与未知值返回 `None`
    pub fn from_code(code: i32) -> Option<Self> {
        let err = match code {
            -1 => HdfError::Failure,
            -2 => HdfError::NotSupported,
            -3 => HdfError::InvalidParameter,
            -6 => HdfError::AllocationFailure,
            -8 => HdfError::Busy,
            -202 => HdfError::NoDevice,
            -203 => HdfError::NoDeviceService,
            -204 => HdfError::DeviceInitFailed,
            -205 => HdfError::PublishFailed,
            -210 => HdfError::AlreadyInState,
            -211 => HdfError::NotFound,
            _ => return None,
        };
        Some(err)
    }
}

/// 驱动框架结果类型
pub type HdfResult<T = ()> = Result<T, HdfError>;
