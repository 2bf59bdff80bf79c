//! 数组、切片与 Map
//!
//! 底层存储是 `Arc<Mutex<..>>`，句柄之间共享；nil 切片/Map 没有存储

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{ValueError, ValueErrorKind, ValueResult};
use crate::types::Type;

use super::{MapKey, Value};

/// 共享的元素存储
pub type SharedVec = Arc<Mutex<Vec<Value>>>;

/// 共享的 Map 存储
pub type SharedMap = Arc<Mutex<HashMap<MapKey, Value>>>;

/// 把一组值逐个放入元素类型，失败时报告第一个不匹配的值
fn admit_all(element_type: &Type, items: Vec<Value>) -> ValueResult<Vec<Value>> {
    items
        .into_iter()
        .map(|item| {
            let actual = item.type_of();
            element_type
                .admit(item)
                .ok_or_else(|| ValueError::type_mismatch(element_type, actual))
        })
        .collect()
}

// ============================================================================
// 数组/切片
// ============================================================================

/// 数组或切片
#[derive(Clone)]
pub struct Sequence {
    /// `Type::Array` 或 `Type::Slice`
    ty: Type,
    data: Option<SharedVec>,
}

impl Sequence {
    /// 创建定长数组，长度取 `items.len()`
    pub fn array(element_type: Type, items: Vec<Value>) -> ValueResult<Self> {
        let items = admit_all(&element_type, items)?;
        let ty = Type::array(element_type, items.len());
        Ok(Self::from_parts(ty, items))
    }

    /// 创建切片
    pub fn slice(element_type: Type, items: Vec<Value>) -> ValueResult<Self> {
        let items = admit_all(&element_type, items)?;
        Ok(Self::from_parts(Type::slice(element_type), items))
    }

    /// 创建 nil 切片
    pub fn nil_slice(element_type: Type) -> Self {
        Self::nil(Type::slice(element_type))
    }

    /// 不做类型检查，直接组装（元素必须已经符合元素类型）
    pub(crate) fn from_parts(ty: Type, items: Vec<Value>) -> Self {
        Self {
            ty,
            data: Some(Arc::new(Mutex::new(items))),
        }
    }

    pub(crate) fn nil(ty: Type) -> Self {
        Self { ty, data: None }
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    pub fn element_type(&self) -> &Type {
        self.ty.element_type().unwrap_or(&Type::Dynamic)
    }

    pub fn is_nil(&self) -> bool {
        self.data.is_none()
    }

    pub fn len(&self) -> usize {
        self.data.as_ref().map_or(0, |data| data.lock().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 读取元素（句柄拷贝）
    pub fn get(&self, index: usize) -> Option<Value> {
        self.data.as_ref()?.lock().get(index).cloned()
    }

    /// 覆盖元素
    pub fn set(&self, index: usize, value: Value) -> ValueResult<()> {
        let data = self
            .data
            .as_ref()
            .ok_or_else(|| ValueError::new(ValueErrorKind::IndexOutOfBounds { index, len: 0 }))?;
        let actual = value.type_of();
        let value = self
            .element_type()
            .admit(value)
            .ok_or_else(|| ValueError::type_mismatch(self.element_type(), actual))?;

        let mut items = data.lock();
        let len = items.len();
        let slot = items
            .get_mut(index)
            .ok_or_else(|| ValueError::new(ValueErrorKind::IndexOutOfBounds { index, len }))?;
        *slot = value;
        Ok(())
    }

    /// 追加元素；nil 切片会先分配存储
    pub fn push(&mut self, value: Value) -> ValueResult<()> {
        if matches!(self.ty, Type::Array { .. }) {
            return Err(ValueErrorKind::FixedLength(self.ty.clone()).into());
        }
        let actual = value.type_of();
        let value = self
            .element_type()
            .admit(value)
            .ok_or_else(|| ValueError::type_mismatch(self.element_type(), actual))?;

        self.data
            .get_or_insert_with(|| Arc::new(Mutex::new(Vec::new())))
            .lock()
            .push(value);
        Ok(())
    }

    /// 当前元素的句柄快照，返回时已释放锁
    pub fn snapshot(&self) -> Vec<Value> {
        self.data.as_ref().map_or_else(Vec::new, |data| data.lock().clone())
    }

    /// 按下标写入已符合元素类型的值
    pub(crate) fn put(&self, index: usize, value: Value) {
        if let Some(data) = &self.data {
            if let Some(slot) = data.lock().get_mut(index) {
                *slot = value;
            }
        }
    }

    pub(crate) fn storage(&self) -> Option<&SharedVec> {
        self.data.as_ref()
    }
}

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_nil() {
            return write!(f, "{}(nil)", self.ty);
        }
        write!(f, "{}", self.ty)?;
        f.debug_list().entries(self.snapshot().iter()).finish()
    }
}

// ============================================================================
// Map
// ============================================================================

/// Map 值
#[derive(Clone)]
pub struct MapValue {
    /// `Type::Map`
    ty: Type,
    data: Option<SharedMap>,
}

impl MapValue {
    /// 创建空 Map
    pub fn new(key_type: Type, value_type: Type) -> Self {
        Self::from_parts(Type::map(key_type, value_type), HashMap::new())
    }

    /// 创建 nil Map
    pub fn nil(key_type: Type, value_type: Type) -> Self {
        Self::nil_of(Type::map(key_type, value_type))
    }

    pub(crate) fn nil_of(ty: Type) -> Self {
        Self { ty, data: None }
    }

    pub(crate) fn from_parts(ty: Type, entries: HashMap<MapKey, Value>) -> Self {
        Self {
            ty,
            data: Some(Arc::new(Mutex::new(entries))),
        }
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    pub fn key_type(&self) -> &Type {
        match &self.ty {
            Type::Map { key_type, .. } => key_type,
            _ => &Type::Dynamic,
        }
    }

    pub fn value_type(&self) -> &Type {
        match &self.ty {
            Type::Map { value_type, .. } => value_type,
            _ => &Type::Dynamic,
        }
    }

    pub fn is_nil(&self) -> bool {
        self.data.is_none()
    }

    pub fn len(&self) -> usize {
        self.data.as_ref().map_or(0, |data| data.lock().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 插入键值对，返回被替换的旧值
    pub fn insert(&self, key: Value, value: Value) -> ValueResult<Option<Value>> {
        let data = self
            .data
            .as_ref()
            .ok_or_else(|| ValueError::new(ValueErrorKind::NilCollection(self.ty.clone())))?;

        let actual = key.type_of();
        let key = self
            .key_type()
            .admit(key)
            .ok_or_else(|| ValueError::type_mismatch(self.key_type(), actual))?;
        let actual = value.type_of();
        let value = self
            .value_type()
            .admit(value)
            .ok_or_else(|| ValueError::type_mismatch(self.value_type(), actual))?;

        Ok(data.lock().insert(MapKey::new(key), value))
    }

    /// 按键查找；键会先按键类型装箱，因此动态键可以直接传具体值
    pub fn get(&self, key: &Value) -> Option<Value> {
        let data = self.data.as_ref()?;
        let key = self.key_type().admit(key.clone())?;
        data.lock().get(&MapKey::new(key)).cloned()
    }

    /// 所有键值对的句柄快照，返回时已释放锁
    pub fn entries(&self) -> Vec<(Value, Value)> {
        self.data.as_ref().map_or_else(Vec::new, |data| {
            data.lock()
                .iter()
                .map(|(k, v)| (k.value().clone(), v.clone()))
                .collect()
        })
    }

    /// 写入已符合键/值类型的条目
    pub(crate) fn put(&self, key: MapKey, value: Value) {
        if let Some(data) = &self.data {
            data.lock().insert(key, value);
        }
    }

    pub(crate) fn storage(&self) -> Option<&SharedMap> {
        self.data.as_ref()
    }
}

impl fmt::Debug for MapValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_nil() {
            return write!(f, "{}(nil)", self.ty);
        }
        write!(f, "{}", self.ty)?;
        let entries = self.entries();
        f.debug_map()
            .entries(entries.iter().map(|(k, v)| (k, v)))
            .finish()
    }
}
