//! 可调用对象与不透明资源句柄
//!
//! 两者都不会被深拷贝：函数按引用共享，句柄在拷贝时退化为无值

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::Value;

/// 原生函数体
pub type NativeFn = dyn Fn(&[Value]) -> Value + Send + Sync;

/// 函数对象
pub struct Function {
    /// 函数名（闭包可能没有名字）
    pub name: Option<String>,
    /// 参数数量
    pub arity: usize,
    body: Box<NativeFn>,
}

impl Function {
    pub fn new<F>(name: Option<&str>, arity: usize, body: F) -> Arc<Self>
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        Arc::new(Self {
            name: name.map(str::to_string),
            arity,
            body: Box::new(body),
        })
    }

    pub fn call(&self, args: &[Value]) -> Value {
        (self.body)(args)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "fn {}/{}", name, self.arity),
            None => write!(f, "fn <closure>/{}", self.arity),
        }
    }
}

/// 不透明资源句柄（连接、文件描述符、通道等）
#[derive(Clone)]
pub struct Handle {
    /// 句柄种类
    kind: String,
    resource: Option<Arc<dyn Any + Send + Sync>>,
}

impl Handle {
    pub fn new<T: Any + Send + Sync>(kind: impl Into<String>, resource: T) -> Self {
        Self {
            kind: kind.into(),
            resource: Some(Arc::new(resource)),
        }
    }

    /// 空句柄
    pub fn null(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            resource: None,
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn is_null(&self) -> bool {
        self.resource.is_none()
    }

    /// 资源地址，空句柄返回 `None`
    pub fn address(&self) -> Option<usize> {
        self.resource
            .as_ref()
            .map(|r| Arc::as_ptr(r) as *const () as usize)
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.resource.as_ref()?.downcast_ref::<T>()
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.address() {
            Some(addr) => write!(f, "handle<{}>({:#x})", self.kind, addr),
            None => write!(f, "handle<{}>(nil)", self.kind),
        }
    }
}
