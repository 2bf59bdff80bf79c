//! 深拷贝分派核心
//!
//! 按值的种类递归拷贝。指针目标、切片和 Map 的存储在递归之前先分配零值副本并登记到循环表，
//! 递归途中再遇到同一目标（自引用、互相引用、多处共享）直接复用该副本。
//!
//! 拷贝不会失败：不支持的子树退化为 `Value::Invalid`，
//! 由外层按规则留下零值（字段、切片元素）或写入零值（Map 值）。

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::config::LOG_TARGET;
use crate::types::{Category, Type};
use crate::value::{Handle, MapKey, MapValue, Pointer, Sequence, StructInstance, Value};

use super::policy::{ExportedOnly, FieldAccess};
use super::table::CycleTable;

static EXPORTED_ONLY: ExportedOnly = ExportedOnly;

/// 单次拷贝的统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyStats {
    /// 访问过的值
    pub values: usize,
    /// 拷贝的结构体
    pub structs: usize,
    /// 拷贝的非空指针
    pub pointers: usize,
    /// 循环表命中次数
    pub cycle_hits: usize,
    /// 被策略跳过的字段
    pub skipped_fields: usize,
    /// 退化为无值或零值的子树
    pub degraded: usize,
}

/// 深拷贝器
pub struct Cloner<'p> {
    table: CycleTable,
    policy: &'p dyn FieldAccess,
    stats: CopyStats,
}

impl Cloner<'static> {
    /// 使用默认策略（只拷贝公开字段）
    pub fn new() -> Self {
        Self::with_policy(&EXPORTED_ONLY)
    }
}

impl Default for Cloner<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'p> Cloner<'p> {
    pub fn with_policy(policy: &'p dyn FieldAccess) -> Self {
        Self {
            table: CycleTable::new(),
            policy,
            stats: CopyStats::default(),
        }
    }

    /// 上一次 `copy` 的统计
    pub fn stats(&self) -> &CopyStats {
        &self.stats
    }

    /// 深拷贝一个值
    ///
    /// 每次调用使用全新的循环表，调用结束即丢弃
    pub fn copy(&mut self, value: &Value) -> Value {
        self.table.clear();
        self.stats = CopyStats::default();

        let copied = self.copy_value(value);

        debug!(
            target: LOG_TARGET,
            category = %value.category(),
            values = self.stats.values,
            structs = self.stats.structs,
            pointers = self.stats.pointers,
            cycle_hits = self.stats.cycle_hits,
            skipped_fields = self.stats.skipped_fields,
            degraded = self.stats.degraded,
            "deep copy finished"
        );
        self.table.clear();
        copied
    }

    fn copy_value(&mut self, value: &Value) -> Value {
        self.stats.values += 1;
        match value {
            Value::Invalid => Value::Invalid,
            Value::Scalar(s) => Value::Scalar(s.clone()),
            Value::Sequence(seq) => self.copy_sequence(seq),
            Value::Map(map) => self.copy_map(map),
            Value::Pointer(ptr) => self.copy_pointer(ptr),
            Value::Struct(s) => Value::Struct(self.copy_struct(s)),
            Value::Dynamic(inner) => self.copy_dynamic(inner.as_deref()),
            // 函数不复制，共享同一个对象
            Value::Function(f) => Value::Function(f.clone()),
            Value::Handle(h) => self.copy_handle(h),
        }
    }

    /// 把拷贝结果放入声明类型的槽位，放不进去就用零值
    fn admit_or_zero(&mut self, ty: &Type, value: Value, slot: &'static str) -> Value {
        if value.is_invalid() {
            return ty.zero_value();
        }
        let actual = value.type_of();
        match ty.admit(value) {
            Some(value) => value,
            None => {
                self.degrade(slot, ty, actual.as_ref());
                ty.zero_value()
            }
        }
    }

    fn degrade(&mut self, slot: &'static str, expected: &Type, actual: Option<&Type>) {
        self.stats.degraded += 1;
        debug!(
            target: LOG_TARGET,
            slot,
            expected = %expected,
            actual = ?actual,
            "copied value does not fit its slot, keeping zero value"
        );
    }

    fn copy_sequence(&mut self, seq: &Sequence) -> Value {
        // nil 切片原样返回，不分配
        let Some(data) = seq.storage() else {
            return Value::Sequence(seq.clone());
        };
        let id = Arc::as_ptr(data) as usize;
        if let Some(existing) = self.table.lookup_storage(Category::Sequence, id) {
            self.stats.cycle_hits += 1;
            trace!(target: LOG_TARGET, ty = %seq.ty(), "shared sequence hit");
            return existing;
        }

        let element_type = seq.element_type().clone();
        let items = seq.snapshot();
        let zeros = items.iter().map(|_| element_type.zero_value()).collect();
        let fresh = Sequence::from_parts(seq.ty().clone(), zeros);
        self.table
            .register_storage(Category::Sequence, id, Value::Sequence(fresh.clone()));

        for (index, item) in items.iter().enumerate() {
            let value = self.copy_value(item);
            let value = self.admit_or_zero(&element_type, value, "sequence element");
            fresh.put(index, value);
        }
        Value::Sequence(fresh)
    }

    fn copy_map(&mut self, map: &MapValue) -> Value {
        let Some(data) = map.storage() else {
            return Value::Map(map.clone());
        };
        let id = Arc::as_ptr(data) as usize;
        if let Some(existing) = self.table.lookup_storage(Category::Map, id) {
            self.stats.cycle_hits += 1;
            trace!(target: LOG_TARGET, ty = %map.ty(), "shared map hit");
            return existing;
        }

        let key_type = map.key_type().clone();
        let value_type = map.value_type().clone();
        let entries = map.entries();
        let fresh = MapValue::from_parts(map.ty().clone(), HashMap::with_capacity(entries.len()));
        self.table
            .register_storage(Category::Map, id, Value::Map(fresh.clone()));

        for (key, value) in &entries {
            let key = self.copy_value(key);
            let key = self.admit_or_zero(&key_type, key, "map key");
            // 值退化时写入零值，键始终保留
            let value = self.copy_value(value);
            let value = self.admit_or_zero(&value_type, value, "map value");
            fresh.put(MapKey::new(key), value);
        }
        Value::Map(fresh)
    }

    fn copy_pointer(&mut self, ptr: &Pointer) -> Value {
        let pointee = ptr.pointee_type();
        let Some(slot) = ptr.target() else {
            return Value::Pointer(Pointer::null(pointee.clone()));
        };

        if let Some(existing) = self.table.lookup(pointee, slot) {
            self.stats.cycle_hits += 1;
            trace!(target: LOG_TARGET, pointee = %pointee, "cycle table hit");
            return Value::Pointer(existing);
        }

        // 先登记再递归：目标内部指回自身的指针会命中这个尚未填充的副本
        let fresh = Pointer::zeroed(pointee.clone());
        self.table.register(pointee, slot, fresh.clone());
        self.stats.pointers += 1;

        // 取快照后立即释放锁，递归途中可能再次访问同一槽位
        let target = slot.lock().clone();
        let copied = self.copy_value(&target);
        if !copied.is_invalid() {
            let actual = copied.type_of();
            match pointee.admit(copied) {
                Some(value) => fresh.put(value),
                None => self.degrade("pointer target", pointee, actual.as_ref()),
            }
        }
        Value::Pointer(fresh)
    }

    fn copy_struct(&mut self, source: &StructInstance) -> StructInstance {
        self.stats.structs += 1;

        let layout = source.layout().clone();
        let mut copied = StructInstance::zeroed(layout.clone());
        for (index, (field, value)) in layout.fields.iter().zip(source.fields()).enumerate() {
            if !self.policy.can_set(&layout, field) {
                self.stats.skipped_fields += 1;
                debug!(
                    target: LOG_TARGET,
                    owner = %layout.name,
                    field = %field.name,
                    "field is not settable, leaving zero value"
                );
                continue;
            }

            let value = self.copy_value(value);
            if value.is_invalid() {
                continue;
            }
            let actual = value.type_of();
            match field.ty.admit(value) {
                Some(value) => copied.put(index, value),
                None => self.degrade("struct field", &field.ty, actual.as_ref()),
            }
        }
        copied
    }

    fn copy_dynamic(&mut self, inner: Option<&Value>) -> Value {
        let Some(inner) = inner else {
            return Value::Dynamic(None);
        };
        match self.copy_value(inner) {
            Value::Invalid => Value::Invalid,
            copied => Value::dynamic(copied),
        }
    }

    fn copy_handle(&mut self, handle: &Handle) -> Value {
        if handle.is_null() {
            return Value::Handle(Handle::null(handle.kind()));
        }
        self.stats.degraded += 1;
        debug!(target: LOG_TARGET, kind = handle.kind(), "resource handle is not copyable");
        Value::Invalid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloner::AllFields;
    use crate::types::{register_struct, FieldInfo, StructType};
    use crate::value::{deep_equal, Complex, Function, Scalar};
    use proptest::prelude::*;

    fn node_type() -> Type {
        register_struct(StructType::new(
            "cloner_test_Node",
            vec![
                FieldInfo::public("Value", Type::I64),
                FieldInfo::public("Next", Type::pointer(Type::structure("cloner_test_Node"))),
            ],
        ))
        .unwrap()
        .as_type()
    }

    fn new_node(value: i64) -> Pointer {
        node_type();
        let node = Pointer::from_struct(StructInstance::named("cloner_test_Node").unwrap());
        node.set_field("Value", Value::from(value)).unwrap();
        node
    }

    fn next_of(node: &Pointer) -> Pointer {
        match node.field("Next").unwrap() {
            Value::Pointer(next) => next,
            other => panic!("Next is not a pointer: {:?}", other),
        }
    }

    fn pointer_of(value: &Value) -> &Pointer {
        value.as_pointer().expect("expected a pointer")
    }

    #[test]
    fn test_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Value>();
    }

    #[test]
    fn test_invalid() {
        assert!(crate::copy(&Value::Invalid).is_invalid());
    }

    #[test]
    fn test_primitives_keep_width() {
        let values = vec![
            Value::from(true),
            Value::int(-3),
            Value::from(-8i8),
            Value::from(-16i16),
            Value::from(-32i32),
            Value::from(-64i64),
            Value::uint(3),
            Value::from(8u8),
            Value::from(16u16),
            Value::from(32u32),
            Value::from(64u64),
            Value::from(3.5f32),
            Value::from(-0.0f64),
            Value::Scalar(Scalar::Complex64(Complex::new(1.0, -1.0))),
            Value::Scalar(Scalar::Complex128(Complex::new(2.0, 0.5))),
            Value::from("text"),
        ];
        for value in values {
            let copied = crate::copy(&value);
            let (Value::Scalar(a), Value::Scalar(b)) = (&value, &copied) else {
                panic!("scalar became {:?}", copied);
            };
            assert_eq!(a.ty(), b.ty());
            assert!(a.bit_eq(b), "{:?} != {:?}", a, b);
        }
    }

    proptest! {
        #[test]
        fn prop_i8_width(v in any::<i8>()) {
            let copied = crate::copy(&Value::from(v));
            prop_assert!(matches!(copied, Value::Scalar(Scalar::I8(c)) if c == v));
        }

        #[test]
        fn prop_i64_width(v in any::<i64>()) {
            let copied = crate::copy(&Value::from(v));
            prop_assert!(matches!(copied, Value::Scalar(Scalar::I64(c)) if c == v));
        }

        #[test]
        fn prop_u16_width(v in any::<u16>()) {
            let copied = crate::copy(&Value::from(v));
            prop_assert!(matches!(copied, Value::Scalar(Scalar::U16(c)) if c == v));
        }

        #[test]
        fn prop_f32_bits(bits in any::<u32>()) {
            let copied = crate::copy(&Value::from(f32::from_bits(bits)));
            prop_assert!(matches!(copied, Value::Scalar(Scalar::F32(c)) if c.to_bits() == bits));
        }

        #[test]
        fn prop_f64_bits(bits in any::<u64>()) {
            let copied = crate::copy(&Value::from(f64::from_bits(bits)));
            prop_assert!(matches!(copied, Value::Scalar(Scalar::F64(c)) if c.to_bits() == bits));
        }

        #[test]
        fn prop_complex128_bits(re in any::<u64>(), im in any::<u64>()) {
            let source = Scalar::Complex128(Complex::new(f64::from_bits(re), f64::from_bits(im)));
            let copied = crate::copy(&Value::Scalar(source.clone()));
            prop_assert!(matches!(copied, Value::Scalar(ref c) if c.bit_eq(&source)));
        }
    }

    #[test]
    fn test_nil_collections_stay_nil() {
        let nil_slice = Value::Sequence(Sequence::nil_slice(Type::String));
        match crate::copy(&nil_slice) {
            Value::Sequence(seq) => {
                assert!(seq.is_nil());
                assert_eq!(seq.ty(), &Type::slice(Type::String));
            }
            other => panic!("unexpected copy: {:?}", other),
        }

        let nil_map = Value::Map(MapValue::nil(Type::String, Type::Int));
        match crate::copy(&nil_map) {
            Value::Map(map) => {
                assert!(map.is_nil());
                assert_eq!(map.ty(), &Type::map(Type::String, Type::Int));
            }
            other => panic!("unexpected copy: {:?}", other),
        }

        let null = Value::Pointer(Pointer::null(Type::F32));
        match crate::copy(&null) {
            Value::Pointer(ptr) => {
                assert!(ptr.is_null());
                assert_eq!(ptr.pointee_type(), &Type::F32);
            }
            other => panic!("unexpected copy: {:?}", other),
        }
    }

    #[test]
    fn test_sequence_is_independent() {
        let original = Sequence::slice(Type::I32, vec![Value::from(1i32), Value::from(2i32)]).unwrap();
        let copied = crate::copy(&Value::Sequence(original.clone()));
        let copied = copied.as_sequence().unwrap().clone();

        assert_ne!(
            Value::Sequence(original.clone()).storage_id(),
            Value::Sequence(copied.clone()).storage_id()
        );

        original.set(0, Value::from(100i32)).unwrap();
        assert!(matches!(copied.get(0), Some(Value::Scalar(Scalar::I32(1)))));
        assert_eq!(copied.ty(), original.ty());
    }

    #[test]
    fn test_array_keeps_length() {
        let original = Sequence::array(Type::U8, vec![Value::from(1u8), Value::from(2u8), Value::from(3u8)]).unwrap();
        let copied = crate::copy(&Value::Sequence(original.clone()));
        assert!(deep_equal(&Value::Sequence(original), &copied));
        assert_eq!(copied.type_of(), Some(Type::array(Type::U8, 3)));
    }

    #[test]
    fn test_degraded_elements_keep_zero() {
        let handles = Sequence::slice(
            Type::Handle("conn".into()),
            vec![Value::Handle(Handle::new("conn", 7u8)), Value::Handle(Handle::null("conn"))],
        )
        .unwrap();

        let mut cloner = Cloner::new();
        let copied = cloner.copy(&Value::Sequence(handles));
        let copied = copied.as_sequence().unwrap();
        assert_eq!(copied.len(), 2);
        for item in copied.snapshot() {
            assert!(matches!(item, Value::Handle(ref h) if h.is_null()));
        }
        assert_eq!(cloner.stats().degraded, 1);

        // 动态槽位中的句柄同样退化为空槽位
        let mixed = Sequence::slice(
            Type::Dynamic,
            vec![Value::from(1i32), Value::Handle(Handle::new("conn", ()))],
        )
        .unwrap();
        let copied = crate::copy(&Value::Sequence(mixed));
        let copied = copied.as_sequence().unwrap();
        assert!(matches!(copied.get(0), Some(Value::Dynamic(Some(_)))));
        assert!(matches!(copied.get(1), Some(Value::Dynamic(None))));
    }

    #[test]
    fn test_map_keeps_size_when_values_degrade() {
        let map = MapValue::new(Type::String, Type::Handle("conn".into()));
        map.insert(Value::from("a"), Value::Handle(Handle::new("conn", 1u8))).unwrap();
        map.insert(Value::from("b"), Value::Handle(Handle::new("conn", 2u8))).unwrap();

        let copied = crate::copy(&Value::Map(map.clone()));
        let copied = copied.as_map().unwrap();
        assert_eq!(copied.len(), 2);
        assert!(matches!(copied.get(&Value::from("a")), Some(Value::Handle(h)) if h.is_null()));
        assert!(matches!(copied.get(&Value::from("b")), Some(Value::Handle(h)) if h.is_null()));
    }

    #[test]
    fn test_map_is_independent() {
        let map = MapValue::new(Type::String, Type::slice(Type::Int));
        let inner = Sequence::slice(Type::Int, vec![Value::int(1)]).unwrap();
        map.insert(Value::from("xs"), Value::Sequence(inner.clone())).unwrap();

        let copied = crate::copy(&Value::Map(map.clone()));
        assert!(deep_equal(&Value::Map(map.clone()), &copied));

        inner.set(0, Value::int(2)).unwrap();
        map.insert(Value::from("ys"), Value::Sequence(Sequence::nil_slice(Type::Int))).unwrap();

        let copied = copied.as_map().unwrap();
        assert_eq!(copied.len(), 1);
        match copied.get(&Value::from("xs")) {
            Some(Value::Sequence(seq)) => assert!(matches!(seq.get(0), Some(Value::Scalar(Scalar::Int(1))))),
            other => panic!("unexpected value: {:?}", other),
        }
    }

    #[test]
    fn test_map_nil_keys_are_kept() {
        let by_dynamic = MapValue::new(Type::Dynamic, Type::Int);
        by_dynamic.insert(Value::Dynamic(None), Value::int(1)).unwrap();
        by_dynamic.insert(Value::from("k"), Value::int(2)).unwrap();

        let copied = crate::copy(&Value::Map(by_dynamic.clone()));
        let copied = copied.as_map().unwrap();
        assert_eq!(copied.len(), 2);
        assert!(matches!(copied.get(&Value::Dynamic(None)), Some(Value::Scalar(Scalar::Int(1)))));
        assert!(matches!(copied.get(&Value::from("k")), Some(Value::Scalar(Scalar::Int(2)))));

        let by_pointer = MapValue::new(Type::pointer(Type::Int), Type::String);
        by_pointer.insert(Value::Pointer(Pointer::null(Type::Int)), Value::from("nil")).unwrap();
        let copied = crate::copy(&Value::Map(by_pointer));
        let copied = copied.as_map().unwrap();
        assert_eq!(copied.len(), 1);
        assert!(copied.get(&Value::Pointer(Pointer::null(Type::Int))).is_some());
    }

    #[test]
    fn test_map_pointer_keys_follow_aliasing() {
        let shared = Pointer::new(Type::Int, Value::int(5)).unwrap();
        let map = MapValue::new(Type::pointer(Type::Int), Type::pointer(Type::Int));
        map.insert(Value::Pointer(shared.clone()), Value::Pointer(shared.clone())).unwrap();

        let copied = crate::copy(&Value::Map(map));
        let (key, value) = copied.as_map().unwrap().entries().pop().unwrap();
        let (key, value) = (pointer_of(&key), pointer_of(&value));
        assert!(key.ptr_eq(value));
        assert!(!key.ptr_eq(&shared));
    }

    #[test]
    fn test_pointer_to_scalar() {
        let original = Pointer::new(Type::U32, Value::from(9u32)).unwrap();
        let copied = crate::copy(&Value::Pointer(original.clone()));
        let copied = pointer_of(&copied);

        assert!(!copied.ptr_eq(&original));
        original.store(Value::from(10u32)).unwrap();
        assert!(matches!(copied.load(), Some(Value::Scalar(Scalar::U32(9)))));
    }

    #[test]
    fn test_aliasing_preserved() {
        let node = node_type();
        let pair = register_struct(StructType::new(
            "cloner_test_Pair",
            vec![
                FieldInfo::public("A", Type::pointer(node.clone())),
                FieldInfo::public("B", Type::pointer(node)),
            ],
        ))
        .unwrap();

        let shared = new_node(42);
        let original = StructInstance::zeroed(pair)
            .with("A", Value::Pointer(shared.clone()))
            .unwrap()
            .with("B", Value::Pointer(shared.clone()))
            .unwrap();

        let mut cloner = Cloner::new();
        let copied = cloner.copy(&Value::Struct(original.clone()));
        let copied = copied.as_struct().unwrap();

        let a = pointer_of(copied.get("A").unwrap());
        let b = pointer_of(copied.get("B").unwrap());
        assert!(a.ptr_eq(b));
        assert!(!a.ptr_eq(&shared));
        assert!(deep_equal(&Value::Pointer(a.clone()), &Value::Pointer(shared.clone())));
        assert_eq!(cloner.stats().cycle_hits, 1);

        // 修改副本不影响原值
        a.set_field("Value", Value::from(0i64)).unwrap();
        assert!(matches!(shared.field("Value"), Ok(Value::Scalar(Scalar::I64(42)))));
    }

    #[test]
    fn test_self_reference_terminates() {
        let original = new_node(1);
        original.set_field("Next", Value::Pointer(original.clone())).unwrap();

        let copied = crate::copy(&Value::Pointer(original.clone()));
        let copied = pointer_of(&copied);

        assert!(!copied.ptr_eq(&original));
        assert!(next_of(copied).ptr_eq(copied));
        assert!(!next_of(copied).ptr_eq(&original));
        assert!(matches!(copied.field("Value"), Ok(Value::Scalar(Scalar::I64(1)))));
    }

    #[test]
    fn test_mutual_reference() {
        let a = new_node(1);
        let b = new_node(2);
        a.set_field("Next", Value::Pointer(b.clone())).unwrap();
        b.set_field("Next", Value::Pointer(a.clone())).unwrap();

        let copied = crate::copy(&Value::Pointer(a.clone()));
        let a2 = pointer_of(&copied).clone();
        let b2 = next_of(&a2);

        assert!(next_of(&b2).ptr_eq(&a2));
        assert!(!b2.ptr_eq(&b));
        assert!(matches!(b2.field("Value"), Ok(Value::Scalar(Scalar::I64(2)))));
        assert!(deep_equal(&Value::Pointer(a), &copied));
    }

    #[test]
    fn test_by_value_struct_is_not_registered() {
        node_type();
        let original = StructInstance::named("cloner_test_Node").unwrap();
        let mut cloner = Cloner::new();
        cloner.copy(&Value::Struct(original));
        assert_eq!(cloner.stats().structs, 1);
        assert_eq!(cloner.stats().pointers, 0);
    }

    #[test]
    fn test_private_fields() {
        let layout = register_struct(StructType::new(
            "cloner_test_Account",
            vec![
                FieldInfo::public("Name", Type::String),
                FieldInfo::private("secret", Type::String),
            ],
        ))
        .unwrap();
        let original = StructInstance::zeroed(layout)
            .with("Name", Value::from("alice"))
            .unwrap()
            .with("secret", Value::from("hunter2"))
            .unwrap();

        let mut cloner = Cloner::new();
        let copied = cloner.copy(&Value::Struct(original.clone()));
        let copied = copied.as_struct().unwrap();
        assert!(matches!(copied.get("Name"), Some(Value::Scalar(Scalar::String(s))) if s == "alice"));
        assert!(matches!(copied.get("secret"), Some(Value::Scalar(Scalar::String(s))) if s.is_empty()));
        assert_eq!(cloner.stats().skipped_fields, 1);

        let copied = crate::copy_with(&Value::Struct(original.clone()), &AllFields);
        assert!(deep_equal(&Value::Struct(original), &copied));
    }

    #[test]
    fn test_null_and_nil_fields() {
        let layout = register_struct(StructType::new(
            "cloner_test_Holder",
            vec![
                FieldInfo::public("Ptr", Type::pointer(Type::Int)),
                FieldInfo::public("List", Type::slice(Type::Int)),
                FieldInfo::public("Index", Type::map(Type::String, Type::Int)),
            ],
        ))
        .unwrap();

        let copied = crate::copy(&Value::Struct(StructInstance::zeroed(layout)));
        let copied = copied.as_struct().unwrap();
        assert!(pointer_of(copied.get("Ptr").unwrap()).is_null());
        assert!(copied.get("List").unwrap().as_sequence().unwrap().is_nil());
        assert!(copied.get("Index").unwrap().as_map().unwrap().is_nil());
    }

    #[test]
    fn test_handle_field_left_zero() {
        let layout = register_struct(StructType::new(
            "cloner_test_Session",
            vec![
                FieldInfo::public("Id", Type::U64),
                FieldInfo::public("Conn", Type::Handle("tcp".into())),
            ],
        ))
        .unwrap();
        let original = StructInstance::zeroed(layout)
            .with("Id", Value::from(7u64))
            .unwrap()
            .with("Conn", Value::Handle(Handle::new("tcp", 3i32)))
            .unwrap();

        let copied = crate::copy(&Value::Struct(original));
        let copied = copied.as_struct().unwrap();
        assert!(matches!(copied.get("Id"), Some(Value::Scalar(Scalar::U64(7)))));
        assert!(matches!(copied.get("Conn"), Some(Value::Handle(h)) if h.is_null()));
    }

    #[test]
    fn test_top_level_handle() {
        assert!(crate::copy(&Value::Handle(Handle::new("fd", 0i32))).is_invalid());
        assert!(matches!(
            crate::copy(&Value::Handle(Handle::null("fd"))),
            Value::Handle(h) if h.is_null() && h.kind() == "fd"
        ));
        assert!(crate::copy(&Value::dynamic(Value::Handle(Handle::new("fd", 0i32)))).is_invalid());
    }

    #[test]
    fn test_dynamic_is_reboxed() {
        assert!(matches!(crate::copy(&Value::Dynamic(None)), Value::Dynamic(None)));

        let inner = Sequence::slice(Type::Int, vec![Value::int(1)]).unwrap();
        let original = Value::dynamic(Value::Sequence(inner));
        let copied = crate::copy(&original);

        assert!(deep_equal(&original, &copied));
        assert_ne!(original.storage_id(), copied.storage_id());
        assert_ne!(
            original.as_dynamic().unwrap().storage_id(),
            copied.as_dynamic().unwrap().storage_id()
        );
    }

    #[test]
    fn test_function_is_shared() {
        let f = Function::new(Some("id"), 1, |args| args.first().cloned().unwrap_or_default());
        let copied = crate::copy(&Value::function(f.clone()));
        match copied {
            Value::Function(Some(g)) => assert!(Arc::ptr_eq(&f, &g)),
            other => panic!("unexpected copy: {:?}", other),
        }
        assert!(matches!(crate::copy(&Value::Function(None)), Value::Function(None)));
    }

    #[test]
    fn test_table_is_fresh_per_call() {
        let original = new_node(3);
        let mut cloner = Cloner::new();
        let first = cloner.copy(&Value::Pointer(original.clone()));
        let second = cloner.copy(&Value::Pointer(original));
        assert!(!pointer_of(&first).ptr_eq(pointer_of(&second)));
        assert_eq!(cloner.stats().cycle_hits, 0);
        assert_eq!(cloner.stats().pointers, 1);
    }

    #[test]
    fn test_closure_policy() {
        let layout = register_struct(StructType::new(
            "cloner_test_Labels",
            vec![
                FieldInfo::public("Keep", Type::I8),
                FieldInfo::public("Drop", Type::I8),
            ],
        ))
        .unwrap();
        let original = StructInstance::zeroed(layout)
            .with("Keep", Value::from(1i8))
            .unwrap()
            .with("Drop", Value::from(2i8))
            .unwrap();

        let policy = |_: &StructType, f: &FieldInfo| f.name != "Drop";
        let mut cloner = Cloner::with_policy(&policy);
        let copied = cloner.copy(&Value::Struct(original));
        let copied = copied.as_struct().unwrap();
        assert!(matches!(copied.get("Keep"), Some(Value::Scalar(Scalar::I8(1)))));
        assert!(matches!(copied.get("Drop"), Some(Value::Scalar(Scalar::I8(0)))));
    }

    #[test]
    fn test_self_containing_slice_terminates() {
        let list = Sequence::slice(Type::Dynamic, vec![Value::int(1), Value::Dynamic(None)]).unwrap();
        list.set(1, Value::Sequence(list.clone())).unwrap();

        let mut cloner = Cloner::new();
        let copied = cloner.copy(&Value::Sequence(list.clone()));
        let seq = copied.as_sequence().unwrap();
        let inner = seq.get(1).unwrap();
        let inner = inner.as_dynamic().unwrap();

        assert_eq!(inner.storage_id(), copied.storage_id());
        assert_ne!(copied.storage_id(), Value::Sequence(list).storage_id());
        assert_eq!(cloner.stats().cycle_hits, 1);
    }

    #[test]
    fn test_self_containing_map_terminates() {
        let map = MapValue::new(Type::String, Type::Dynamic);
        map.insert(Value::from("self"), Value::Map(map.clone())).unwrap();

        let copied = crate::copy(&Value::Map(map.clone()));
        let inner = copied.as_map().unwrap().get(&Value::from("self")).unwrap();
        assert_eq!(inner.as_dynamic().unwrap().storage_id(), copied.storage_id());
        assert!(deep_equal(&Value::Map(map), &copied));
    }

    #[test]
    fn test_shared_slice_stays_shared() {
        let layout = register_struct(StructType::new(
            "cloner_test_Views",
            vec![
                FieldInfo::public("Left", Type::slice(Type::U8)),
                FieldInfo::public("Right", Type::slice(Type::U8)),
            ],
        ))
        .unwrap();
        let bytes = Sequence::slice(Type::U8, vec![Value::from(1u8)]).unwrap();
        let original = StructInstance::zeroed(layout)
            .with("Left", Value::Sequence(bytes.clone()))
            .unwrap()
            .with("Right", Value::Sequence(bytes.clone()))
            .unwrap();

        let copied = crate::copy(&Value::Struct(original));
        let copied = copied.as_struct().unwrap();
        let left = copied.get("Left").unwrap();
        let right = copied.get("Right").unwrap();
        assert_eq!(left.storage_id(), right.storage_id());
        assert_ne!(left.storage_id(), Value::Sequence(bytes).storage_id());
    }

    #[test]
    fn test_copy_of_copy_is_equal() {
        let graph = Type::structure("cloner_test_Graph");
        register_struct(StructType::new(
            "cloner_test_Graph",
            vec![
                FieldInfo::public("Name", Type::String),
                FieldInfo::public("Next", Type::pointer(graph.clone())),
                FieldInfo::public("Tags", Type::slice(Type::String)),
                FieldInfo::public("Index", Type::map(Type::String, Type::pointer(graph.clone()))),
            ],
        ))
        .unwrap();

        let node = Pointer::from_struct(StructInstance::named("cloner_test_Graph").unwrap());
        let index = MapValue::new(Type::String, Type::pointer(graph));
        index.insert(Value::from("self"), Value::Pointer(node.clone())).unwrap();
        node.set_field("Name", Value::from("g")).unwrap();
        node.set_field("Next", Value::Pointer(node.clone())).unwrap();
        node.set_field(
            "Tags",
            Value::Sequence(Sequence::slice(Type::String, vec![Value::from("a"), Value::from("b")]).unwrap()),
        )
        .unwrap();
        node.set_field("Index", Value::Map(index)).unwrap();

        let original = Value::Pointer(node);
        let once = crate::copy(&original);
        let twice = crate::copy(&once);

        assert!(deep_equal(&original, &twice));
        assert!(deep_equal(&once, &twice));
        assert_ne!(once.storage_id(), twice.storage_id());

        // 第二次拷贝的环指回第二次拷贝自身
        let twice = pointer_of(&twice);
        assert!(next_of(twice).ptr_eq(twice));
        match twice.field("Index").unwrap().as_map().unwrap().get(&Value::from("self")) {
            Some(Value::Pointer(p)) => assert!(p.ptr_eq(twice)),
            other => panic!("unexpected index entry: {:?}", other),
        }
    }

    #[test]
    fn test_concurrent_copies_of_shared_graph() {
        let a = new_node(1);
        let b = new_node(2);
        a.set_field("Next", Value::Pointer(b.clone())).unwrap();
        b.set_field("Next", Value::Pointer(a.clone())).unwrap();
        let original = Value::Pointer(a);

        let copies: Vec<Value> = crossbeam::scope(|s| {
            let workers: Vec<_> = (0..4).map(|_| s.spawn(|_| crate::copy(&original))).collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        })
        .unwrap();

        for (i, copied) in copies.iter().enumerate() {
            assert!(deep_equal(&original, copied));
            assert_ne!(original.storage_id(), copied.storage_id());
            for other in &copies[i + 1..] {
                assert_ne!(copied.storage_id(), other.storage_id());
            }
        }
    }
}
