//! 作用域内部解析器
//!
//! 组件工厂拿到的解析器。它与发起解析的调用共享同一个解析上下文，
//! 因此嵌套解析可以检测循环依赖和深度限制。

use crate::scope::LifetimeScopeImpl;
use di_abstractions::{ComponentResolver, ErasedInstance, ResolveContext, ServiceRegistration};
use infrastructure_common::{DependencyResult, TypeInfo};
use parking_lot::Mutex;
use std::any::TypeId;
use std::sync::Arc;

pub(crate) struct ScopeResolver<'a> {
    scope: &'a LifetimeScopeImpl,
    context: &'a Mutex<ResolveContext>,
}

impl<'a> ScopeResolver<'a> {
    pub(crate) fn new(scope: &'a LifetimeScopeImpl, context: &'a Mutex<ResolveContext>) -> Self {
        Self { scope, context }
    }
}

impl ComponentResolver for ScopeResolver<'_> {
    fn resolve_service(&self, service: &TypeInfo) -> DependencyResult<ErasedInstance> {
        self.scope.resolve_with(service, self.context)
    }

    fn resolve_all_services(&self, service: &TypeInfo) -> DependencyResult<Vec<ErasedInstance>> {
        self.scope.resolve_all_with(service, self.context)
    }

    fn resolve_registration(
        &self,
        registration: &ServiceRegistration,
    ) -> DependencyResult<ErasedInstance> {
        self.scope.activate(registration, self.context)
    }

    fn registrations_for(&self, service: TypeId) -> Vec<Arc<ServiceRegistration>> {
        self.scope.registrations_for(service)
    }
}
