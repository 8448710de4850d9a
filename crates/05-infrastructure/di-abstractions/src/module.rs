//! 模块抽象
//!
//! 模块把一组相关的服务注册打包在一起，构建作用域时整体加载。

use crate::registry::ComponentRegistry;
use infrastructure_common::DependencyResult;
use std::fmt;
use std::sync::Arc;

/// 模块 trait
///
/// 模块以 [`ModuleHandle`] 的形式传递，同一个模块的身份由句柄指针决定，
/// 而不是由模块内容决定。
pub trait Module: Send + Sync {
    /// 模块名称，仅用于日志和诊断
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// 把模块中的服务注册到注册表
    fn load(&self, registry: &mut dyn ComponentRegistry) -> DependencyResult<()>;
}

/// 模块句柄
pub type ModuleHandle = Arc<dyn Module>;

/// 判断两个句柄是否指向同一个模块实例
pub fn same_module(left: &ModuleHandle, right: &ModuleHandle) -> bool {
    std::ptr::eq(
        Arc::as_ptr(left) as *const (),
        Arc::as_ptr(right) as *const (),
    )
}

/// 基于闭包的模块
pub struct FnModule<F>
where
    F: Fn(&mut dyn ComponentRegistry) -> DependencyResult<()> + Send + Sync,
{
    name: String,
    load_fn: F,
}

impl<F> FnModule<F>
where
    F: Fn(&mut dyn ComponentRegistry) -> DependencyResult<()> + Send + Sync + 'static,
{
    /// 创建新的闭包模块
    pub fn new(name: impl Into<String>, load_fn: F) -> Self {
        Self {
            name: name.into(),
            load_fn,
        }
    }

    /// 创建闭包模块并直接包装为句柄
    pub fn handle(name: impl Into<String>, load_fn: F) -> ModuleHandle {
        Arc::new(Self::new(name, load_fn))
    }
}

impl<F> Module for FnModule<F>
where
    F: Fn(&mut dyn ComponentRegistry) -> DependencyResult<()> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self, registry: &mut dyn ComponentRegistry) -> DependencyResult<()> {
        (self.load_fn)(registry)
    }
}

impl<F> fmt::Debug for FnModule<F>
where
    F: Fn(&mut dyn ComponentRegistry) -> DependencyResult<()> + Send + Sync,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnModule")
            .field("name", &self.name)
            .field("load_fn", &"<function>")
            .finish()
    }
}

/// 空模块，不注册任何服务
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyModule;

impl Module for EmptyModule {
    fn name(&self) -> &str {
        "EmptyModule"
    }

    fn load(&self, _registry: &mut dyn ComponentRegistry) -> DependencyResult<()> {
        Ok(())
    }
}
