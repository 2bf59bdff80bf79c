//! 类型定义
//!
//! 描述运行时值的声明类型：每个槽位（切片元素、Map 键值、指针目标、结构体字段）
//! 都带有一个 `Type`，即便值为 nil 也不丢失

use std::fmt;

use crate::value::{Handle, MapValue, Pointer, Scalar, Sequence, StructInstance, Value};

use super::structs::lookup_struct;

/// 值的种类（深拷贝按种类分派）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// 无值
    Invalid,
    /// 原始类型（bool、各宽度整数、浮点、复数、字符串）
    Primitive,
    /// 数组/切片
    Sequence,
    /// Map
    Map,
    /// 指针
    Pointer,
    /// 结构体
    Record,
    /// 动态类型（运行时才知道具体种类）
    Dynamic,
    /// 可调用对象
    Callable,
    /// 不透明资源句柄
    Opaque,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Invalid => "invalid",
            Category::Primitive => "primitive",
            Category::Sequence => "sequence",
            Category::Map => "map",
            Category::Pointer => "pointer",
            Category::Record => "record",
            Category::Dynamic => "dynamic",
            Category::Callable => "callable",
            Category::Opaque => "opaque",
        };
        f.write_str(name)
    }
}

/// 类型表示
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    // ============ 原始类型 ============
    /// 平台相关整数
    Int,
    /// 平台相关无符号整数
    Uint,
    /// 8位有符号整数
    I8,
    /// 16位有符号整数
    I16,
    /// 32位有符号整数
    I32,
    /// 64位有符号整数
    I64,
    /// 8位无符号整数
    U8,
    /// 16位无符号整数
    U16,
    /// 32位无符号整数
    U32,
    /// 64位无符号整数
    U64,
    /// 32位浮点数
    F32,
    /// 64位浮点数
    F64,
    /// 由两个 f32 组成的复数
    Complex64,
    /// 由两个 f64 组成的复数
    Complex128,
    /// 布尔类型
    Bool,
    /// 字符串类型
    String,

    // ============ 特殊类型 ============
    /// 动态类型，可装入任何值
    Dynamic,
    /// 函数/闭包类型
    Function,
    /// 不透明资源句柄（连接、系统句柄等），参数为句柄种类名
    Handle(String),

    // ============ 复合类型 ============
    /// 数组类型（固定长度）
    Array {
        element_type: Box<Type>,
        size: usize,
    },
    /// 切片类型（动态长度）
    Slice {
        element_type: Box<Type>,
    },
    /// Map 类型
    Map {
        key_type: Box<Type>,
        value_type: Box<Type>,
    },
    /// 指针类型
    Pointer(Box<Type>),
    /// 结构体类型（布局在注册表中按名称查找）
    Struct(String),
}

impl Type {
    pub fn array(element_type: Type, size: usize) -> Self {
        Type::Array {
            element_type: Box::new(element_type),
            size,
        }
    }

    pub fn slice(element_type: Type) -> Self {
        Type::Slice {
            element_type: Box::new(element_type),
        }
    }

    pub fn map(key_type: Type, value_type: Type) -> Self {
        Type::Map {
            key_type: Box::new(key_type),
            value_type: Box::new(value_type),
        }
    }

    pub fn pointer(pointee: Type) -> Self {
        Type::Pointer(Box::new(pointee))
    }

    pub fn structure(name: impl Into<String>) -> Self {
        Type::Struct(name.into())
    }

    /// 判断是否是原始类型
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Type::Int | Type::Uint |
            Type::I8 | Type::I16 | Type::I32 | Type::I64 |
            Type::U8 | Type::U16 | Type::U32 | Type::U64 |
            Type::F32 | Type::F64 |
            Type::Complex64 | Type::Complex128 |
            Type::Bool | Type::String
        )
    }

    /// 类型所属的种类
    pub fn category(&self) -> Category {
        match self {
            ty if ty.is_primitive() => Category::Primitive,
            Type::Array { .. } | Type::Slice { .. } => Category::Sequence,
            Type::Map { .. } => Category::Map,
            Type::Pointer(_) => Category::Pointer,
            Type::Struct(_) => Category::Record,
            Type::Dynamic => Category::Dynamic,
            Type::Function => Category::Callable,
            Type::Handle(_) => Category::Opaque,
            _ => Category::Invalid,
        }
    }

    /// 数组/切片的元素类型
    pub fn element_type(&self) -> Option<&Type> {
        match self {
            Type::Array { element_type, .. } | Type::Slice { element_type } => Some(element_type),
            _ => None,
        }
    }

    /// 类型的零值
    ///
    /// 切片、Map、指针的零值是 nil；数组按长度填充元素零值；
    /// 结构体所有字段取零值。未注册的结构体没有零值，返回 `Value::Invalid`。
    pub fn zero_value(&self) -> Value {
        match self {
            Type::Array { element_type, size } => {
                let items = (0..*size).map(|_| element_type.zero_value()).collect();
                Value::Sequence(Sequence::from_parts(self.clone(), items))
            }
            Type::Slice { .. } => Value::Sequence(Sequence::nil(self.clone())),
            Type::Map { .. } => Value::Map(MapValue::nil_of(self.clone())),
            Type::Pointer(pointee) => Value::Pointer(Pointer::null((**pointee).clone())),
            Type::Struct(name) => match lookup_struct(name) {
                Some(layout) => Value::Struct(StructInstance::zeroed(layout)),
                None => Value::Invalid,
            },
            Type::Dynamic => Value::Dynamic(None),
            Type::Function => Value::Function(None),
            Type::Handle(kind) => Value::Handle(Handle::null(kind.clone())),
            primitive => Scalar::zero(primitive).map(Value::Scalar).unwrap_or(Value::Invalid),
        }
    }

    /// 把值放入声明为本类型的槽位
    ///
    /// 动态槽位会把具体值重新装箱；其他类型要求值的类型完全一致。
    /// 无值或类型不符时返回 `None`，由调用方决定保留零值还是报错。
    pub fn admit(&self, value: Value) -> Option<Value> {
        match (self, value) {
            (_, Value::Invalid) => None,
            (Type::Dynamic, value @ Value::Dynamic(_)) => Some(value),
            (Type::Dynamic, value) => Some(Value::Dynamic(Some(Box::new(value)))),
            (ty, value) => {
                if value.type_of().as_ref() == Some(ty) {
                    Some(value)
                } else {
                    None
                }
            }
        }
    }

    /// 本类型按值包含的结构体名称（不经过指针、切片或 Map）
    pub(crate) fn embedded_struct(&self) -> Option<&str> {
        match self {
            Type::Struct(name) => Some(name),
            Type::Array { element_type, .. } => element_type.embedded_struct(),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Uint => write!(f, "uint"),
            Type::I8 => write!(f, "i8"),
            Type::I16 => write!(f, "i16"),
            Type::I32 => write!(f, "i32"),
            Type::I64 => write!(f, "i64"),
            Type::U8 => write!(f, "u8"),
            Type::U16 => write!(f, "u16"),
            Type::U32 => write!(f, "u32"),
            Type::U64 => write!(f, "u64"),
            Type::F32 => write!(f, "f32"),
            Type::F64 => write!(f, "f64"),
            Type::Complex64 => write!(f, "complex64"),
            Type::Complex128 => write!(f, "complex128"),
            Type::Bool => write!(f, "bool"),
            Type::String => write!(f, "string"),
            Type::Dynamic => write!(f, "dynamic"),
            Type::Function => write!(f, "fn"),
            Type::Handle(kind) => write!(f, "handle<{}>", kind),
            Type::Array { element_type, size } => write!(f, "{}[{}]", element_type, size),
            Type::Slice { element_type } => write!(f, "{}[]", element_type),
            Type::Map { key_type, value_type } => write!(f, "map[{}]{}", key_type, value_type),
            Type::Pointer(inner) => write!(f, "*{}", inner),
            Type::Struct(name) => write!(f, "{}", name),
        }
    }
}
