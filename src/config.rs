//! 配置常量模块
//!
//! 所有可配置的库相关常量都在这里定义，便于后期修改

/// 库名称
pub const LIB_NAME: &str = "deepcopy";

/// 版本号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// tracing 事件的 target
pub const LOG_TARGET: &str = "deepcopy";

/// 循环表初始容量（大多数对象图只有少量可寻址结构体）
pub const CYCLE_TABLE_CAPACITY: usize = 16;
