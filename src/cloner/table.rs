//! 循环表
//!
//! 记录 (声明的指向类型, 原槽位地址) -> 已分配的副本指针。
//! 按类型分区：同一地址在不同声明类型下是互不相干的条目。
//!
//! 切片和 Map 的底层存储同样可以被多处共享（经由动态槽位还能包含自身），
//! 因此也按 (种类, 存储地址) 记录已分配的副本

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::config::CYCLE_TABLE_CAPACITY;
use crate::types::{Category, Type};
use crate::value::{Pointer, Slot, Value};

/// 单次深拷贝期间的身份 -> 副本映射
#[derive(Debug, Default)]
pub struct CycleTable {
    scopes: FxHashMap<Type, FxHashMap<usize, Pointer>>,
    /// 切片/Map 存储 -> 副本
    storages: FxHashMap<(Category, usize), Value>,
}

#[inline]
fn identity(slot: &Slot) -> usize {
    Arc::as_ptr(slot) as usize
}

impl CycleTable {
    pub fn new() -> Self {
        let mut scopes = FxHashMap::default();
        scopes.reserve(CYCLE_TABLE_CAPACITY);
        Self {
            scopes,
            storages: FxHashMap::default(),
        }
    }

    /// 查找已登记的副本
    pub fn lookup(&self, pointee: &Type, slot: &Slot) -> Option<Pointer> {
        self.scopes.get(pointee)?.get(&identity(slot)).cloned()
    }

    /// 登记副本（必须在递归拷贝目标之前调用）
    pub fn register(&mut self, pointee: &Type, slot: &Slot, copy: Pointer) {
        if let Some(scope) = self.scopes.get_mut(pointee) {
            scope.insert(identity(slot), copy);
            return;
        }
        self.scopes
            .entry(pointee.clone())
            .or_default()
            .insert(identity(slot), copy);
    }

    /// 查找已登记的切片/Map 副本
    pub fn lookup_storage(&self, category: Category, id: usize) -> Option<Value> {
        self.storages.get(&(category, id)).cloned()
    }

    /// 登记切片/Map 副本（必须在拷贝元素之前调用）
    pub fn register_storage(&mut self, category: Category, id: usize, copy: Value) {
        self.storages.insert((category, id), copy);
    }

    /// 已登记的条目总数
    pub fn len(&self) -> usize {
        self.scopes.values().map(|scope| scope.len()).sum::<usize>() + self.storages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storages.is_empty() && self.scopes.values().all(|scope| scope.is_empty())
    }

    pub fn clear(&mut self) {
        self.scopes.clear();
        self.storages.clear();
    }
}
