//! 深拷贝模块
//!
//! 分派核心、循环表与字段访问策略

pub mod cloner;
pub mod policy;
pub mod table;

pub use cloner::{Cloner, CopyStats};
pub use policy::{AllFields, ExportedOnly, FieldAccess};
pub use table::CycleTable;
