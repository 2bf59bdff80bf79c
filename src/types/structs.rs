//! 结构体布局与全局注册表
//!
//! 结构体字段可以通过 `Type::Struct(name)` 引用其他结构体（包括自身），
//! 因此布局按名称登记在进程级注册表中，求零值时再按名称查找

use std::sync::{Arc, OnceLock};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rustc_hash::FxHashSet;

use crate::error::{ValueError, ValueErrorKind, ValueResult};

use super::Type;

/// 字段信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    /// 字段名称
    pub name: String,
    /// 字段声明类型
    pub ty: Type,
    /// 是否是公开的（未导出字段在默认策略下不会被拷贝）
    pub is_public: bool,
}

impl FieldInfo {
    pub fn public(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            is_public: true,
        }
    }

    pub fn private(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            is_public: false,
        }
    }
}

/// 结构体布局
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructType {
    /// 类型名称
    pub name: String,
    /// 有序字段列表
    pub fields: Vec<FieldInfo>,
}

impl StructType {
    pub fn new(name: impl Into<String>, fields: Vec<FieldInfo>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// 查找字段下标
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// 查找字段信息
    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// 对应的声明类型
    pub fn as_type(&self) -> Type {
        Type::Struct(self.name.clone())
    }
}

// ============================================================================
// 结构体注册表
// ============================================================================

/// 全局结构体注册表
/// 使用 DashMap 实现线程安全的并发访问
static STRUCT_REGISTRY: OnceLock<DashMap<String, Arc<StructType>>> = OnceLock::new();

/// 获取注册表实例
#[inline]
fn get_registry() -> &'static DashMap<String, Arc<StructType>> {
    STRUCT_REGISTRY.get_or_init(|| DashMap::with_capacity(64))
}

/// 注册结构体布局
///
/// 同名同布局重复注册返回已有实例；同名不同布局返回 `ConflictingLayout`。
/// 按值包含自身（直接或经由其他已注册结构体）的布局没有有限零值，返回 `RecursiveLayout`。
pub fn register_struct(layout: StructType) -> ValueResult<Arc<StructType>> {
    if embeds_itself(&layout) {
        return Err(ValueErrorKind::RecursiveLayout(layout.name).into());
    }

    match get_registry().entry(layout.name.clone()) {
        Entry::Occupied(entry) => {
            if **entry.get() == layout {
                Ok(Arc::clone(entry.get()))
            } else {
                Err(ValueError::new(ValueErrorKind::ConflictingLayout(layout.name)))
            }
        }
        Entry::Vacant(entry) => {
            let layout = Arc::new(layout);
            entry.insert(Arc::clone(&layout));
            Ok(layout)
        }
    }
}

/// 沿按值嵌入的字段逐层查找已注册布局，判断是否会回到 `layout` 自身
///
/// 必须在持有注册表条目之前调用
fn embeds_itself(layout: &StructType) -> bool {
    let mut visited = FxHashSet::default();
    let mut pending: Vec<String> = layout
        .fields
        .iter()
        .filter_map(|f| f.ty.embedded_struct())
        .map(str::to_string)
        .collect();

    while let Some(name) = pending.pop() {
        if name == layout.name {
            return true;
        }
        if !visited.insert(name.clone()) {
            continue;
        }
        // 尚未注册的结构体暂时没有字段可查
        if let Some(inner) = lookup_struct(&name) {
            pending.extend(
                inner
                    .fields
                    .iter()
                    .filter_map(|f| f.ty.embedded_struct())
                    .map(str::to_string),
            );
        }
    }
    false
}

/// 按名称查找结构体布局
pub fn lookup_struct(name: &str) -> Option<Arc<StructType>> {
    get_registry().get(name).map(|entry| Arc::clone(entry.value()))
}
