//! 类型系统模块
//!
//! 声明类型、值种类以及结构体布局注册表

pub mod structs;
pub mod types;

pub use structs::{lookup_struct, register_struct, FieldInfo, StructType};
pub use types::{Category, Type};
