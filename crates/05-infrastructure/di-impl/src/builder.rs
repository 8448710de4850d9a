//! 容器构建器

use crate::scope::LifetimeScopeImpl;
use di_abstractions::{ComponentRegistry, ContainerConfig, Module, ModuleHandle, ServiceRegistration};
use infrastructure_common::DependencyResult;
use std::sync::Arc;
use tracing::{debug, info};

/// 容器构建器
///
/// 收集注册信息，最终构建根作用域。子作用域的注册同样先写入一个构建器。
#[derive(Debug, Default)]
pub struct ContainerBuilder {
    registrations: Vec<ServiceRegistration>,
    config: ContainerConfig,
}

impl ContainerBuilder {
    /// 创建新的构建器
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置容器配置
    pub fn with_config(mut self, config: ContainerConfig) -> Self {
        self.config = config;
        self
    }

    /// 获取容器配置
    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// 依次加载多个模块
    pub fn register_modules(&mut self, modules: &[ModuleHandle]) -> DependencyResult<()> {
        for module in modules {
            self.register_module(module.as_ref())?;
        }
        Ok(())
    }

    /// 构建根作用域
    pub fn build(self) -> Arc<LifetimeScopeImpl> {
        info!("构建根作用域，注册数量: {}", self.registrations.len());
        LifetimeScopeImpl::root(self.registrations, self.config)
    }

    pub(crate) fn into_parts(self) -> (Vec<ServiceRegistration>, ContainerConfig) {
        (self.registrations, self.config)
    }
}

impl ComponentRegistry for ContainerBuilder {
    fn add_registration(&mut self, registration: ServiceRegistration) {
        debug!(
            "注册组件: {} -> {} ({:?})",
            registration.service.name, registration.implementation.name, registration.lifetime
        );
        self.registrations.push(registration);
    }

    fn register_module(&mut self, module: &dyn Module) -> DependencyResult<()> {
        info!("加载模块: {}", module.name());
        module.load(self)
    }

    fn registrations(&self) -> &[ServiceRegistration] {
        &self.registrations
    }
}
