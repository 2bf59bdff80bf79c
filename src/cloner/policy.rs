//! 字段访问策略
//!
//! 拷贝结构体时，每个字段写入前都会询问策略是否允许设置。
//! 不允许的字段保持零值，静默跳过

use crate::types::{FieldInfo, StructType};

/// 字段可写性检查
pub trait FieldAccess {
    fn can_set(&self, owner: &StructType, field: &FieldInfo) -> bool;
}

/// 只拷贝公开字段（默认策略）
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportedOnly;

impl FieldAccess for ExportedOnly {
    fn can_set(&self, _owner: &StructType, field: &FieldInfo) -> bool {
        field.is_public
    }
}

/// 拷贝所有字段
#[derive(Debug, Clone, Copy, Default)]
pub struct AllFields;

impl FieldAccess for AllFields {
    fn can_set(&self, _owner: &StructType, _field: &FieldInfo) -> bool {
        true
    }
}

impl<F> FieldAccess for F
where
    F: Fn(&StructType, &FieldInfo) -> bool,
{
    fn can_set(&self, owner: &StructType, field: &FieldInfo) -> bool {
        self(owner, field)
    }
}
