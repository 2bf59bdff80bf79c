//! 通用深拷贝
//!
//! 对任意形状的运行时值做结构化深拷贝：副本与原值不共享任何可变存储，
//! 但原值中的共享关系（多处指向同一对象、环形引用）在副本中原样保留。
//!
//! ```
//! use deepcopy::{copy, deep_equal, Sequence, Type, Value};
//!
//! let original = Value::Sequence(Sequence::slice(Type::String, vec!["a".into(), "b".into()]).unwrap());
//! let copied = copy(&original);
//! assert!(deep_equal(&original, &copied));
//! assert_ne!(original.storage_id(), copied.storage_id());
//! ```

pub mod cloner;
pub mod config;
pub mod error;
pub mod types;
pub mod value;

pub use cloner::{AllFields, Cloner, CopyStats, ExportedOnly, FieldAccess};
pub use error::{ValueError, ValueErrorKind, ValueResult};
pub use types::{lookup_struct, register_struct, Category, FieldInfo, StructType, Type};
pub use value::{
    deep_equal, Complex, Function, Handle, MapKey, MapValue, Pointer, Scalar, Sequence,
    StructInstance, Value,
};

/// 深拷贝任意值（只拷贝公开字段）
///
/// 不会失败；无法拷贝的子树（资源句柄等）退化为无值，整体退化时返回 `Value::Invalid`
pub fn copy(value: &Value) -> Value {
    Cloner::new().copy(value)
}

/// 使用指定的字段访问策略深拷贝
pub fn copy_with(value: &Value, policy: &dyn FieldAccess) -> Value {
    Cloner::with_policy(policy).copy(value)
}
