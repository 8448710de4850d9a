//! 同一服务多个实现的列表适配器
//!
//! 只枚举注册信息，不实例化组件。

use crate::container::LifetimeScope;
use crate::registry::{Activator, ServiceRegistration};
use crate::resolver::downcast_instance;
use infrastructure_common::{DependencyResult, TypeInfo};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// 服务的全部自动装配实现类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeList {
    service: TypeInfo,
    types: Vec<TypeInfo>,
}

impl TypeList {
    /// 创建类型列表
    pub fn new(service: TypeInfo, types: Vec<TypeInfo>) -> Self {
        Self { service, types }
    }

    /// 服务类型
    pub fn service(&self) -> &TypeInfo {
        &self.service
    }
}

impl Deref for TypeList {
    type Target = [TypeInfo];

    fn deref(&self) -> &Self::Target {
        &self.types
    }
}

/// 按需创建实例的工厂
pub type ServiceFactory<S> = Arc<dyn Fn() -> DependencyResult<Arc<S>> + Send + Sync>;

/// 实现类型及其工厂
pub struct TypeAndFactory<S: ?Sized> {
    /// 实现类型
    pub implementation: TypeInfo,
    factory: ServiceFactory<S>,
}

impl<S: ?Sized> TypeAndFactory<S> {
    /// 从作用域中解析该实现的实例
    pub fn create(&self) -> DependencyResult<Arc<S>> {
        (self.factory)()
    }
}

impl<S: ?Sized> Clone for TypeAndFactory<S> {
    fn clone(&self) -> Self {
        Self {
            implementation: self.implementation.clone(),
            factory: self.factory.clone(),
        }
    }
}

impl<S: ?Sized> fmt::Debug for TypeAndFactory<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeAndFactory")
            .field("implementation", &self.implementation.name)
            .finish_non_exhaustive()
    }
}

/// 服务的全部自动装配实现类型及其工厂
pub struct TypeAndFactoryList<S: ?Sized> {
    entries: Vec<TypeAndFactory<S>>,
}

impl<S> TypeAndFactoryList<S>
where
    S: ?Sized + Send + Sync + 'static,
{
    /// 从作用域中收集服务 `S` 的实现
    ///
    /// 工厂持有作用域句柄，每次调用都按注册的生命周期解析实例。
    pub fn from_scope(scope: &Arc<dyn LifetimeScope>) -> Self {
        let service = TypeInfo::of::<S>();
        let entries = scope
            .registrations_for(service.id)
            .into_iter()
            .filter(|registration| registration.activator == Activator::Constructor)
            .map(|registration| Self::entry(scope.clone(), service.clone(), registration))
            .collect();
        Self { entries }
    }

    fn entry(
        scope: Arc<dyn LifetimeScope>,
        service: TypeInfo,
        registration: Arc<ServiceRegistration>,
    ) -> TypeAndFactory<S> {
        let implementation = registration.implementation.clone();
        TypeAndFactory {
            implementation,
            factory: Arc::new(move || {
                let instance = scope.as_resolver().resolve_registration(&registration)?;
                downcast_instance::<S>(&instance, &service)
            }),
        }
    }

    /// 实现类型列表
    pub fn types(&self) -> Vec<TypeInfo> {
        self.entries
            .iter()
            .map(|entry| entry.implementation.clone())
            .collect()
    }
}

impl<S: ?Sized> Deref for TypeAndFactoryList<S> {
    type Target = [TypeAndFactory<S>];

    fn deref(&self) -> &Self::Target {
        &self.entries
    }
}

impl<S: ?Sized> fmt::Debug for TypeAndFactoryList<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.iter()).finish()
    }
}
