//! 组件解析器抽象接口
//!
//! 提供依赖解析和组件实例化的能力

use crate::lists::TypeList;
use crate::registry::{Activator, ErasedInstance, ServiceRegistration};
use infrastructure_common::{DependencyError, DependencyResult, TypeInfo};
use std::any::TypeId;
use std::sync::Arc;

/// 组件解析器 trait
///
/// 负责解析组件依赖并创建组件实例。该 trait 保持对象安全，
/// 泛型便捷方法见 [`ResolverExt`]。
pub trait ComponentResolver: Send + Sync {
    /// 解析服务的一个实例（最近注册的优先）
    fn resolve_service(&self, service: &TypeInfo) -> DependencyResult<ErasedInstance>;

    /// 解析服务的全部实例，按注册顺序返回（祖先作用域的注册在前）
    fn resolve_all_services(&self, service: &TypeInfo) -> DependencyResult<Vec<ErasedInstance>>;

    /// 按指定注册解析实例，遵循该注册的生命周期
    fn resolve_registration(&self, registration: &ServiceRegistration)
        -> DependencyResult<ErasedInstance>;

    /// 获取对当前解析器可见的某服务的全部注册
    fn registrations_for(&self, service: TypeId) -> Vec<Arc<ServiceRegistration>>;

    /// 检查是否已注册（使用 TypeId）
    fn is_registered_by_type_id(&self, service: TypeId) -> bool {
        !self.registrations_for(service).is_empty()
    }
}

/// 把类型擦除的实例还原为 `Arc<S>`
pub fn downcast_instance<S>(instance: &ErasedInstance, service: &TypeInfo) -> DependencyResult<Arc<S>>
where
    S: ?Sized + Send + Sync + 'static,
{
    instance.downcast_ref::<Arc<S>>().cloned().ok_or_else(|| {
        DependencyError::invalid_configuration(format!(
            "实例类型与服务类型 {} 不匹配",
            service.module_path
        ))
    })
}

/// 组件解析器的泛型便捷方法
pub trait ResolverExt: ComponentResolver {
    /// 解析指定类型的组件
    fn resolve<S>(&self) -> DependencyResult<Arc<S>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        let service = TypeInfo::of::<S>();
        let instance = self.resolve_service(&service)?;
        downcast_instance(&instance, &service)
    }

    /// 解析指定类型的全部组件
    fn resolve_all<S>(&self) -> DependencyResult<Vec<Arc<S>>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        let service = TypeInfo::of::<S>();
        self.resolve_all_services(&service)?
            .iter()
            .map(|instance| downcast_instance(instance, &service))
            .collect()
    }

    /// 尝试解析组件，未注册时返回 `None`
    fn try_resolve<S>(&self) -> DependencyResult<Option<Arc<S>>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        match self.resolve::<S>() {
            Ok(instance) => Ok(Some(instance)),
            Err(DependencyError::ComponentNotRegistered { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// 检查是否可以解析指定类型
    fn is_registered<S>(&self) -> bool
    where
        S: ?Sized + 'static,
    {
        self.is_registered_by_type_id(TypeId::of::<S>())
    }

    /// 获取服务 `S` 全部自动装配实现的类型列表
    fn type_list<S>(&self) -> TypeList
    where
        S: ?Sized + 'static,
    {
        let service = TypeInfo::of::<S>();
        let types = self
            .registrations_for(service.id)
            .iter()
            .filter(|registration| registration.activator == Activator::Constructor)
            .map(|registration| registration.implementation.clone())
            .collect();
        TypeList::new(service, types)
    }
}

impl<R: ComponentResolver + ?Sized> ResolverExt for R {}

/// 解析上下文
///
/// 记录当前解析链，用于检测循环依赖和限制递归深度
#[derive(Debug, Clone, Default)]
pub struct ResolveContext {
    /// 当前解析链
    pub resolution_chain: Vec<TypeInfo>,
    /// 解析选项
    pub options: ResolveOptions,
}

impl ResolveContext {
    /// 创建新的解析上下文
    pub fn new(options: ResolveOptions) -> Self {
        Self {
            resolution_chain: Vec::new(),
            options,
        }
    }

    /// 添加类型到解析链
    pub fn push_type(&mut self, service: &TypeInfo) -> DependencyResult<()> {
        if self.options.detect_circular_dependencies
            && self.resolution_chain.iter().any(|t| t.id == service.id)
        {
            let chain = self
                .resolution_chain
                .iter()
                .chain(std::iter::once(service))
                .map(|t| t.name.as_str())
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(DependencyError::CircularDependency {
                dependency_chain: chain,
            });
        }
        if self.resolution_chain.len() >= self.options.max_depth {
            return Err(DependencyError::ResolutionDepthExceeded {
                type_name: service.name.clone(),
                max_depth: self.options.max_depth,
            });
        }
        self.resolution_chain.push(service.clone());
        Ok(())
    }

    /// 从解析链中移除类型
    pub fn pop_type(&mut self) {
        self.resolution_chain.pop();
    }

    /// 当前解析深度
    pub fn depth(&self) -> usize {
        self.resolution_chain.len()
    }
}

/// 解析选项
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// 是否检测循环依赖
    pub detect_circular_dependencies: bool,
    /// 最大递归深度
    pub max_depth: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            detect_circular_dependencies: true,
            max_depth: 100,
        }
    }
}
