//! 值构造错误定义
//!
//! 只有构造/修改值的 API 会返回这些错误，深拷贝本身永远不会失败

use thiserror::Error;

use crate::types::Type;

/// 错误种类
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueErrorKind {
    /// 结构体没有该字段
    #[error("type `{type_name}` has no field `{field}`")]
    UnknownField {
        type_name: String,
        field: String,
    },
    /// 值与声明类型不匹配
    #[error("type mismatch: expected `{expected}`, found `{}`", describe(.actual))]
    TypeMismatch {
        expected: Type,
        actual: Option<Type>,
    },
    /// 同名结构体已注册为不同的布局
    #[error("struct `{0}` is already registered with a different layout")]
    ConflictingLayout(String),
    /// 对空指针解引用
    #[error("null pointer dereference")]
    NullPointer,
    /// 期望结构体
    #[error("`{0}` is not a struct")]
    NotAStruct(Type),
    /// 下标越界
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds {
        index: usize,
        len: usize,
    },
    /// 向 nil 切片/Map 写入
    #[error("write to nil `{0}`")]
    NilCollection(Type),
    /// 结构体未注册
    #[error("struct `{0}` is not registered")]
    UnknownStruct(String),
    /// 结构体按值包含自身
    #[error("struct `{0}` contains itself by value")]
    RecursiveLayout(String),
    /// 定长数组不能追加元素
    #[error("cannot grow fixed-length `{0}`")]
    FixedLength(Type),
}

fn describe(ty: &Option<Type>) -> String {
    match ty {
        Some(ty) => ty.to_string(),
        None => "invalid".to_string(),
    }
}

/// 值错误
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}")]
pub struct ValueError {
    pub kind: ValueErrorKind,
}

impl ValueError {
    pub fn new(kind: ValueErrorKind) -> Self {
        Self { kind }
    }

    pub fn unknown_field(type_name: impl Into<String>, field: impl Into<String>) -> Self {
        Self::new(ValueErrorKind::UnknownField {
            type_name: type_name.into(),
            field: field.into(),
        })
    }

    pub fn type_mismatch(expected: &Type, actual: Option<Type>) -> Self {
        Self::new(ValueErrorKind::TypeMismatch {
            expected: expected.clone(),
            actual,
        })
    }
}

impl From<ValueErrorKind> for ValueError {
    fn from(kind: ValueErrorKind) -> Self {
        Self::new(kind)
    }
}

pub type ValueResult<T> = Result<T, ValueError>;
