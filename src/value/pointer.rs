//! 指针
//!
//! 指针指向一个共享槽位；槽位的地址就是指针目标的存储身份。
//! 只有位于槽位中的结构体才是可寻址的

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{ValueError, ValueErrorKind, ValueResult};
use crate::types::Type;

use super::{StructInstance, Value};

/// 指针目标的存储槽位
pub type Slot = Arc<Mutex<Value>>;

/// 指针
#[derive(Clone)]
pub struct Pointer {
    /// 声明的指向类型
    pointee: Type,
    /// `None` 表示空指针
    target: Option<Slot>,
}

impl Pointer {
    /// 分配新槽位并指向它
    pub fn new(pointee: Type, value: Value) -> ValueResult<Self> {
        let actual = value.type_of();
        let value = pointee
            .admit(value)
            .ok_or_else(|| ValueError::type_mismatch(&pointee, actual))?;
        Ok(Self {
            pointee,
            target: Some(Arc::new(Mutex::new(value))),
        })
    }

    /// 指向结构体实例的新指针
    pub fn from_struct(instance: StructInstance) -> Self {
        Self {
            pointee: instance.layout().as_type(),
            target: Some(Arc::new(Mutex::new(Value::Struct(instance)))),
        }
    }

    /// 空指针
    pub fn null(pointee: Type) -> Self {
        Self {
            pointee,
            target: None,
        }
    }

    /// 指向一个存放零值的新槽位
    pub(crate) fn zeroed(pointee: Type) -> Self {
        let zero = pointee.zero_value();
        Self {
            pointee,
            target: Some(Arc::new(Mutex::new(zero))),
        }
    }

    pub fn pointee_type(&self) -> &Type {
        &self.pointee
    }

    pub fn is_null(&self) -> bool {
        self.target.is_none()
    }

    pub(crate) fn target(&self) -> Option<&Slot> {
        self.target.as_ref()
    }

    /// 目标槽位地址，空指针为 0
    pub fn address(&self) -> usize {
        self.target.as_ref().map_or(0, |slot| Arc::as_ptr(slot) as usize)
    }

    /// 是否指向同一槽位（两个空指针也视为相同）
    pub fn ptr_eq(&self, other: &Pointer) -> bool {
        match (&self.target, &other.target) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    /// 读取目标值（句柄拷贝），返回时已释放锁
    pub fn load(&self) -> Option<Value> {
        self.target.as_ref().map(|slot| slot.lock().clone())
    }

    /// 写入目标值
    pub fn store(&self, value: Value) -> ValueResult<()> {
        let slot = self.target.as_ref().ok_or_else(|| ValueError::new(ValueErrorKind::NullPointer))?;
        let actual = value.type_of();
        let value = self
            .pointee
            .admit(value)
            .ok_or_else(|| ValueError::type_mismatch(&self.pointee, actual))?;
        *slot.lock() = value;
        Ok(())
    }

    /// 不做类型检查直接写入（值已经符合指向类型）
    pub(crate) fn put(&self, value: Value) {
        if let Some(slot) = &self.target {
            *slot.lock() = value;
        }
    }

    /// 读取目标结构体的字段
    pub fn field(&self, name: &str) -> ValueResult<Value> {
        let slot = self.target.as_ref().ok_or_else(|| ValueError::new(ValueErrorKind::NullPointer))?;
        let guard = slot.lock();
        match &*guard {
            Value::Struct(instance) => instance
                .get(name)
                .cloned()
                .ok_or_else(|| ValueError::unknown_field(instance.type_name(), name)),
            _ => Err(ValueErrorKind::NotAStruct(self.pointee.clone()).into()),
        }
    }

    /// 修改目标结构体的字段
    pub fn set_field(&self, name: &str, value: Value) -> ValueResult<()> {
        let slot = self.target.as_ref().ok_or_else(|| ValueError::new(ValueErrorKind::NullPointer))?;
        let mut guard = slot.lock();
        match &mut *guard {
            Value::Struct(instance) => instance.set(name, value),
            _ => Err(ValueErrorKind::NotAStruct(self.pointee.clone()).into()),
        }
    }
}

impl fmt::Debug for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Some(_) => write!(f, "*{}({:#x})", self.pointee, self.address()),
            None => write!(f, "*{}(nil)", self.pointee),
        }
    }
}
