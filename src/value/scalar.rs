//! 原始值（标量）
//!
//! 每个整数/浮点宽度都是独立的变体，拷贝时宽度与位模式原样保留

use std::fmt;

use crate::types::Type;

/// 复数
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Complex<T> {
    pub re: T,
    pub im: T,
}

impl<T> Complex<T> {
    pub fn new(re: T, im: T) -> Self {
        Self { re, im }
    }
}

/// 标量值
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    /// 平台相关整数
    Int(isize),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    /// 平台相关无符号整数
    Uint(usize),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Complex64(Complex<f32>),
    Complex128(Complex<f64>),
    String(String),
}

impl Scalar {
    /// 标量的声明类型
    pub fn ty(&self) -> Type {
        match self {
            Scalar::Bool(_) => Type::Bool,
            Scalar::Int(_) => Type::Int,
            Scalar::I8(_) => Type::I8,
            Scalar::I16(_) => Type::I16,
            Scalar::I32(_) => Type::I32,
            Scalar::I64(_) => Type::I64,
            Scalar::Uint(_) => Type::Uint,
            Scalar::U8(_) => Type::U8,
            Scalar::U16(_) => Type::U16,
            Scalar::U32(_) => Type::U32,
            Scalar::U64(_) => Type::U64,
            Scalar::F32(_) => Type::F32,
            Scalar::F64(_) => Type::F64,
            Scalar::Complex64(_) => Type::Complex64,
            Scalar::Complex128(_) => Type::Complex128,
            Scalar::String(_) => Type::String,
        }
    }

    /// 原始类型的零值，非原始类型返回 `None`
    pub fn zero(ty: &Type) -> Option<Scalar> {
        let zero = match ty {
            Type::Bool => Scalar::Bool(false),
            Type::Int => Scalar::Int(0),
            Type::I8 => Scalar::I8(0),
            Type::I16 => Scalar::I16(0),
            Type::I32 => Scalar::I32(0),
            Type::I64 => Scalar::I64(0),
            Type::Uint => Scalar::Uint(0),
            Type::U8 => Scalar::U8(0),
            Type::U16 => Scalar::U16(0),
            Type::U32 => Scalar::U32(0),
            Type::U64 => Scalar::U64(0),
            Type::F32 => Scalar::F32(0.0),
            Type::F64 => Scalar::F64(0.0),
            Type::Complex64 => Scalar::Complex64(Complex::default()),
            Type::Complex128 => Scalar::Complex128(Complex::default()),
            Type::String => Scalar::String(String::new()),
            _ => return None,
        };
        Some(zero)
    }

    /// 按位比较（区分 -0.0 与 0.0，NaN 载荷相同即相等）
    pub fn bit_eq(&self, other: &Scalar) -> bool {
        match (self, other) {
            (Scalar::F32(a), Scalar::F32(b)) => a.to_bits() == b.to_bits(),
            (Scalar::F64(a), Scalar::F64(b)) => a.to_bits() == b.to_bits(),
            (Scalar::Complex64(a), Scalar::Complex64(b)) => {
                a.re.to_bits() == b.re.to_bits() && a.im.to_bits() == b.im.to_bits()
            }
            (Scalar::Complex128(a), Scalar::Complex128(b)) => {
                a.re.to_bits() == b.re.to_bits() && a.im.to_bits() == b.im.to_bits()
            }
            (a, b) => a == b,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(v) => write!(f, "{}", v),
            Scalar::Int(v) => write!(f, "{}", v),
            Scalar::I8(v) => write!(f, "{}", v),
            Scalar::I16(v) => write!(f, "{}", v),
            Scalar::I32(v) => write!(f, "{}", v),
            Scalar::I64(v) => write!(f, "{}", v),
            Scalar::Uint(v) => write!(f, "{}", v),
            Scalar::U8(v) => write!(f, "{}", v),
            Scalar::U16(v) => write!(f, "{}", v),
            Scalar::U32(v) => write!(f, "{}", v),
            Scalar::U64(v) => write!(f, "{}", v),
            Scalar::F32(v) => write!(f, "{}", v),
            Scalar::F64(v) => write!(f, "{}", v),
            Scalar::Complex64(c) => write!(f, "({}{:+}i)", c.re, c.im),
            Scalar::Complex128(c) => write!(f, "({}{:+}i)", c.re, c.im),
            Scalar::String(s) => write!(f, "{:?}", s),
        }
    }
}
