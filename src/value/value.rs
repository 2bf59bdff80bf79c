//! 运行时值定义
//!
//! `Value` 是一个句柄：`Clone` 只复制句柄，与原值共享底层存储；
//! 需要完全独立的副本时使用 `crate::copy`

use std::fmt;
use std::sync::Arc;

use crate::types::{Category, Type};

use super::{Function, Handle, MapValue, Pointer, Scalar, Sequence, StructInstance};

/// 运行时值
#[derive(Clone, Default)]
pub enum Value {
    /// 无值
    #[default]
    Invalid,
    /// 原始值
    Scalar(Scalar),
    /// 数组/切片
    Sequence(Sequence),
    /// Map
    Map(MapValue),
    /// 指针
    Pointer(Pointer),
    /// 结构体（按值）
    Struct(StructInstance),
    /// 动态槽位，`None` 表示空
    Dynamic(Option<Box<Value>>),
    /// 可调用对象，`None` 表示空函数
    Function(Option<Arc<Function>>),
    /// 不透明资源句柄
    Handle(Handle),
}

impl Value {
    pub fn int(v: isize) -> Self {
        Value::Scalar(Scalar::Int(v))
    }

    pub fn uint(v: usize) -> Self {
        Value::Scalar(Scalar::Uint(v))
    }

    /// 装入动态槽位
    pub fn dynamic(value: Value) -> Self {
        Value::Dynamic(Some(Box::new(value)))
    }

    pub fn function(function: Arc<Function>) -> Self {
        Value::Function(Some(function))
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Value::Invalid)
    }

    /// 值所属的种类
    pub fn category(&self) -> Category {
        match self {
            Value::Invalid => Category::Invalid,
            Value::Scalar(_) => Category::Primitive,
            Value::Sequence(_) => Category::Sequence,
            Value::Map(_) => Category::Map,
            Value::Pointer(_) => Category::Pointer,
            Value::Struct(_) => Category::Record,
            Value::Dynamic(_) => Category::Dynamic,
            Value::Function(_) => Category::Callable,
            Value::Handle(_) => Category::Opaque,
        }
    }

    /// 值的声明类型，无值返回 `None`
    ///
    /// 不会加锁，可以在持有任意槽位锁时调用
    pub fn type_of(&self) -> Option<Type> {
        match self {
            Value::Invalid => None,
            Value::Scalar(s) => Some(s.ty()),
            Value::Sequence(seq) => Some(seq.ty().clone()),
            Value::Map(map) => Some(map.ty().clone()),
            Value::Pointer(ptr) => Some(Type::pointer(ptr.pointee_type().clone())),
            Value::Struct(s) => Some(s.layout().as_type()),
            Value::Dynamic(_) => Some(Type::Dynamic),
            Value::Function(_) => Some(Type::Function),
            Value::Handle(h) => Some(Type::Handle(h.kind().to_string())),
        }
    }

    /// 底层存储的身份（地址），没有独立存储的值返回 `None`
    pub fn storage_id(&self) -> Option<usize> {
        match self {
            Value::Invalid | Value::Scalar(_) => None,
            Value::Sequence(seq) => seq.storage().map(|data| Arc::as_ptr(data) as usize),
            Value::Map(map) => map.storage().map(|data| Arc::as_ptr(data) as usize),
            Value::Pointer(ptr) => ptr.target().map(|slot| Arc::as_ptr(slot) as usize),
            Value::Struct(s) => {
                let fields = s.fields();
                (!fields.is_empty()).then(|| fields.as_ptr() as usize)
            }
            Value::Dynamic(inner) => inner.as_ref().map(|b| &**b as *const Value as usize),
            Value::Function(f) => f.as_ref().map(|f| Arc::as_ptr(f) as usize),
            Value::Handle(h) => h.address(),
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Value::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Sequence> {
        match self {
            Value::Sequence(seq) => Some(seq),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapValue> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_pointer(&self) -> Option<&Pointer> {
        match self {
            Value::Pointer(ptr) => Some(ptr),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructInstance> {
        match self {
            Value::Struct(s) => Some(s),
            _ => None,
        }
    }

    /// 动态槽位中的具体值
    pub fn as_dynamic(&self) -> Option<&Value> {
        match self {
            Value::Dynamic(Some(inner)) => Some(inner),
            _ => None,
        }
    }
}

// ============================================================================
// 原始值构造
// ============================================================================

macro_rules! impl_from_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::Scalar(Scalar::$variant(v.into()))
                }
            }
        )*
    };
}

impl_from_scalar! {
    bool => Bool,
    isize => Int,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    usize => Uint,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => String,
    &str => String,
}

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Self {
        Value::Scalar(s)
    }
}

impl From<Sequence> for Value {
    fn from(seq: Sequence) -> Self {
        Value::Sequence(seq)
    }
}

impl From<MapValue> for Value {
    fn from(map: MapValue) -> Self {
        Value::Map(map)
    }
}

impl From<Pointer> for Value {
    fn from(ptr: Pointer) -> Self {
        Value::Pointer(ptr)
    }
}

impl From<StructInstance> for Value {
    fn from(s: StructInstance) -> Self {
        Value::Struct(s)
    }
}

impl From<Handle> for Value {
    fn from(h: Handle) -> Self {
        Value::Handle(h)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Invalid => write!(f, "<invalid>"),
            Value::Scalar(s) => write!(f, "{}", s),
            Value::Sequence(seq) => write!(f, "{:?}", seq),
            Value::Map(map) => write!(f, "{:?}", map),
            // 指针只打印地址，避免环形结构无限展开
            Value::Pointer(ptr) => write!(f, "{:?}", ptr),
            Value::Struct(s) => write!(f, "{:?}", s),
            Value::Dynamic(None) => write!(f, "dynamic(nil)"),
            Value::Dynamic(Some(inner)) => write!(f, "dynamic({:?})", inner),
            Value::Function(None) => write!(f, "fn(nil)"),
            Value::Function(Some(func)) => write!(f, "{:?}", func),
            Value::Handle(h) => write!(f, "{:?}", h),
        }
    }
}
