//! 深度相等比较
//!
//! 结构相等：nil 与空集合不相等，宽度不同的标量不相等，
//! 函数和句柄只在指向同一对象时相等。
//! 已经比较过的 (指针, 指针) 对会被记录，环形结构可以终止

use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::types::Category;

use super::{MapValue, Pointer, Sequence, Value};

/// 判断两个值是否深度相等
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    DeepEqual::default().eq(a, b)
}

#[derive(Default)]
struct DeepEqual {
    /// (种类, 左地址, 右地址)
    visited: FxHashSet<(Category, usize, usize)>,
}

impl DeepEqual {
    /// 首次遇到返回 true；再次遇到说明处在环中，视为相等
    fn first_visit(&mut self, category: Category, a: usize, b: usize) -> bool {
        self.visited.insert((category, a, b))
    }

    fn eq(&mut self, a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Invalid, Value::Invalid) => true,
            (Value::Scalar(x), Value::Scalar(y)) => x == y,
            (Value::Sequence(x), Value::Sequence(y)) => self.eq_sequence(x, y),
            (Value::Map(x), Value::Map(y)) => self.eq_map(x, y),
            (Value::Pointer(x), Value::Pointer(y)) => self.eq_pointer(x, y),
            (Value::Struct(x), Value::Struct(y)) => {
                x.type_name() == y.type_name()
                    && x.fields().len() == y.fields().len()
                    && x.fields().iter().zip(y.fields()).all(|(p, q)| self.eq(p, q))
            }
            (Value::Dynamic(x), Value::Dynamic(y)) => match (x, y) {
                (Some(p), Some(q)) => self.eq(p, q),
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

    fn eq_sequence(&mut self, x: &Sequence, y: &Sequence) -> bool {
        if x.ty() != y.ty() {
            return false;
        }
        let (p, q) = match (x.storage(), y.storage()) {
            (None, None) => return true,
            (Some(p), Some(q)) => (p, q),
            _ => return false,
        };
        if Arc::ptr_eq(p, q) {
            return true;
        }
        if !self.first_visit(Category::Sequence, Arc::as_ptr(p) as usize, Arc::as_ptr(q) as usize) {
            return true;
        }

        let left = x.snapshot();
        let right = y.snapshot();
        left.len() == right.len() && left.iter().zip(&right).all(|(l, r)| self.eq(l, r))
    }

    fn eq_map(&mut self, x: &MapValue, y: &MapValue) -> bool {
        if x.ty() != y.ty() {
            return false;
        }
        let (p, q) = match (x.storage(), y.storage()) {
            (None, None) => return true,
            (Some(p), Some(q)) => (p, q),
            _ => return false,
        };
        if Arc::ptr_eq(p, q) {
            return true;
        }
        if !self.first_visit(Category::Map, Arc::as_ptr(p) as usize, Arc::as_ptr(q) as usize) {
            return true;
        }

        let left = x.entries();
        if left.len() != y.len() {
            return false;
        }
        left.iter().all(|(key, value)| match y.get(key) {
            Some(other) => self.eq(value, &other),
            None => false,
        })
    }

    fn eq_pointer(&mut self, x: &Pointer, y: &Pointer) -> bool {
        if x.pointee_type() != y.pointee_type() {
            return false;
        }
        if x.ptr_eq(y) {
            return true;
        }
        if !self.first_visit(Category::Pointer, x.address(), y.address()) {
            return true;
        }
        match (x.load(), y.load()) {
            (Some(l), Some(r)) => self.eq(&l, &r),
            _ => false,
        }
    }
}
