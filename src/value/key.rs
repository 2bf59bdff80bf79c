//! Map 键
//!
//! 标量按值比较，指针、切片、Map、函数和句柄按存储身份比较，
//! 结构体逐字段比较，动态值比较其内部值

use std::hash::{Hash, Hasher};
use std::mem;
use std::sync::Arc;

use super::{Scalar, Value};

/// 可作为 Map 键的值
#[derive(Clone, Debug)]
pub struct MapKey(Value);

impl MapKey {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

/// -0.0 与 0.0 相等，哈希也必须相同
fn float_bits(v: f64) -> u64 {
    if v == 0.0 {
        0
    } else {
        v.to_bits()
    }
}

fn hash_scalar<H: Hasher>(scalar: &Scalar, state: &mut H) {
    mem::discriminant(scalar).hash(state);
    match scalar {
        Scalar::Bool(v) => v.hash(state),
        Scalar::Int(v) => v.hash(state),
        Scalar::I8(v) => v.hash(state),
        Scalar::I16(v) => v.hash(state),
        Scalar::I32(v) => v.hash(state),
        Scalar::I64(v) => v.hash(state),
        Scalar::Uint(v) => v.hash(state),
        Scalar::U8(v) => v.hash(state),
        Scalar::U16(v) => v.hash(state),
        Scalar::U32(v) => v.hash(state),
        Scalar::U64(v) => v.hash(state),
        Scalar::F32(v) => float_bits(f64::from(*v)).hash(state),
        Scalar::F64(v) => float_bits(*v).hash(state),
        Scalar::Complex64(c) => {
            float_bits(f64::from(c.re)).hash(state);
            float_bits(f64::from(c.im)).hash(state);
        }
        Scalar::Complex128(c) => {
            float_bits(c.re).hash(state);
            float_bits(c.im).hash(state);
        }
        Scalar::String(s) => s.hash(state),
    }
}

fn hash_value<H: Hasher>(value: &Value, state: &mut H) {
    mem::discriminant(value).hash(state);
    match value {
        Value::Invalid => {}
        Value::Scalar(s) => hash_scalar(s, state),
        Value::Sequence(seq) => {
            seq.ty().hash(state);
            seq.storage().map(|d| Arc::as_ptr(d) as usize).hash(state);
        }
        Value::Map(map) => {
            map.ty().hash(state);
            map.storage().map(|d| Arc::as_ptr(d) as usize).hash(state);
        }
        Value::Pointer(ptr) => {
            ptr.pointee_type().hash(state);
            ptr.address().hash(state);
        }
        Value::Struct(s) => {
            s.type_name().hash(state);
            for field in s.fields() {
                hash_value(field, state);
            }
        }
        Value::Dynamic(inner) => {
            if let Some(inner) = inner {
                hash_value(inner, state);
            }
        }
        Value::Function(f) => f.as_ref().map(|f| Arc::as_ptr(f) as usize).hash(state),
        Value::Handle(h) => {
            h.kind().hash(state);
            h.address().hash(state);
        }
    }
}

fn key_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Invalid, Value::Invalid) => true,
        (Value::Scalar(x), Value::Scalar(y)) => x == y,
        (Value::Sequence(x), Value::Sequence(y)) => {
            x.ty() == y.ty()
                && match (x.storage(), y.storage()) {
                    (Some(p), Some(q)) => Arc::ptr_eq(p, q),
                    (None, None) => true,
                    _ => false,
                }
        }
        (Value::Map(x), Value::Map(y)) => {
            x.ty() == y.ty()
                && match (x.storage(), y.storage()) {
                    (Some(p), Some(q)) => Arc::ptr_eq(p, q),
                    (None, None) => true,
                    _ => false,
                }
        }
        (Value::Pointer(x), Value::Pointer(y)) => {
            x.pointee_type() == y.pointee_type() && x.ptr_eq(y)
        }
        (Value::Struct(x), Value::Struct(y)) => {
            x.type_name() == y.type_name()
                && x.fields().len() == y.fields().len()
                && x.fields().iter().zip(y.fields()).all(|(p, q)| key_eq(p, q))
        }
        (Value::Dynamic(x), Value::Dynamic(y)) => match (x, y) {
            (Some(p), Some(q)) => key_eq(p, q),
            (None, None) => true,
            _ => false,
        },
        (Value::Function(x), Value::Function(y)) => match (x, y) {
            (Some(p), Some(q)) => Arc::ptr_eq(p, q),
            (None, None) => true,
            _ => false,
        },
        (Value::Handle(x), Value::Handle(y)) => x.kind() == y.kind() && x.address() == y.address(),
        _ => false,
    }
}

impl Hash for MapKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_value(&self.0, state);
    }
}

impl PartialEq for MapKey {
    fn eq(&self, other: &Self) -> bool {
        key_eq(&self.0, &other.0)
    }
}

// NaN 键与自身不相等，与宿主语言的 map 语义一致
impl Eq for MapKey {}
