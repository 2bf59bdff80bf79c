//! 结构体实例

use std::fmt;
use std::sync::Arc;

use crate::error::{ValueError, ValueErrorKind, ValueResult};
use crate::types::{lookup_struct, StructType};

use super::Value;

/// Struct 实例
///
/// 字段按布局顺序存放，`fields.len()` 始终等于布局字段数
#[derive(Clone)]
pub struct StructInstance {
    layout: Arc<StructType>,
    fields: Vec<Value>,
}

impl StructInstance {
    /// 所有字段取零值
    pub fn zeroed(layout: Arc<StructType>) -> Self {
        let fields = layout.fields.iter().map(|f| f.ty.zero_value()).collect();
        Self { layout, fields }
    }

    /// 按注册名称创建零值实例
    pub fn named(name: &str) -> ValueResult<Self> {
        lookup_struct(name)
            .map(Self::zeroed)
            .ok_or_else(|| ValueError::new(ValueErrorKind::UnknownStruct(name.to_string())))
    }

    /// 链式设置字段
    pub fn with(mut self, name: &str, value: Value) -> ValueResult<Self> {
        self.set(name, value)?;
        Ok(self)
    }

    pub fn layout(&self) -> &Arc<StructType> {
        &self.layout
    }

    pub fn type_name(&self) -> &str {
        &self.layout.name
    }

    pub fn fields(&self) -> &[Value] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.layout.field_index(name).and_then(|i| self.fields.get(i))
    }

    /// 设置字段（值必须符合字段的声明类型）
    pub fn set(&mut self, name: &str, value: Value) -> ValueResult<()> {
        let index = self
            .layout
            .field_index(name)
            .ok_or_else(|| ValueError::unknown_field(&self.layout.name, name))?;
        let declared = &self.layout.fields[index].ty;
        let actual = value.type_of();
        let value = declared
            .admit(value)
            .ok_or_else(|| ValueError::type_mismatch(declared, actual))?;
        self.fields[index] = value;
        Ok(())
    }

    /// 按下标写入已符合声明类型的值
    pub(crate) fn put(&mut self, index: usize, value: Value) {
        if let Some(slot) = self.fields.get_mut(index) {
            *slot = value;
        }
    }
}

impl fmt::Debug for StructInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct(&self.layout.name);
        for (info, value) in self.layout.fields.iter().zip(&self.fields) {
            s.field(&info.name, value);
        }
        s.finish()
    }
}
