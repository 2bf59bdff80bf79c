//! 运行时值模块
//!
//! 值的各个种类、Map 键语义以及深度相等比较

pub mod collections;
pub mod equal;
pub mod function;
pub mod instance;
pub mod key;
pub mod pointer;
pub mod scalar;
pub mod value;

pub use collections::{MapValue, Sequence, SharedMap, SharedVec};
pub use equal::deep_equal;
pub use function::{Function, Handle, NativeFn};
pub use instance::StructInstance;
pub use key::MapKey;
pub use pointer::{Pointer, Slot};
pub use scalar::{Complex, Scalar};
pub use value::Value;
