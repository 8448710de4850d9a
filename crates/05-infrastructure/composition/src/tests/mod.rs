//! 组合层单元测试

mod verification_tests;

use di_abstractions::{ComponentRegistry, ComponentRegistryExt, Module, ModuleHandle};
use infrastructure_common::DependencyResult;
use std::sync::Arc;

/// 用于识别作用域内容的标记
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Marker(pub &'static str);

/// 注册一个 [`Marker`] 的模块
pub(crate) struct MarkerModule(pub &'static str);

impl Module for MarkerModule {
    fn name(&self) -> &str {
        self.0
    }

    fn load(&self, registry: &mut dyn ComponentRegistry) -> DependencyResult<()> {
        registry.register_instance(Arc::new(Marker(self.0)));
        Ok(())
    }
}

pub(crate) fn marker(name: &'static str) -> ModuleHandle {
    Arc::new(MarkerModule(name))
}
