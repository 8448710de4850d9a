//! 组件注册表抽象接口

use crate::factory::Constructible;
use crate::module::Module;
use crate::resolver::ComponentResolver;
use infrastructure_common::{DependencyResult, Lifetime, TypeInfo};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// 类型擦除后的组件实例
///
/// 服务 `S` 的实例总是以 `Arc<S>` 的形式装入，解析时再还原。
pub type ErasedInstance = Arc<dyn Any + Send + Sync>;

/// 组件工厂函数类型
pub type InstanceFactory =
    Arc<dyn Fn(&dyn ComponentResolver) -> DependencyResult<ErasedInstance> + Send + Sync>;

/// 把闭包包装为 [`InstanceFactory`]
pub fn instance_factory<F>(factory: F) -> InstanceFactory
where
    F: Fn(&dyn ComponentResolver) -> DependencyResult<ErasedInstance> + Send + Sync + 'static,
{
    Arc::new(factory)
}

/// 组件的激活方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Activator {
    /// 注册时已提供实例
    Instance,
    /// 由调用方提供的委托创建
    Delegate,
    /// 由 [`Constructible`] 实现自动装配
    Constructor,
}

/// 组件注册信息
#[derive(Clone)]
pub struct ServiceRegistration {
    /// 注册唯一标识
    pub id: Uuid,
    /// 服务类型
    pub service: TypeInfo,
    /// 实现类型
    pub implementation: TypeInfo,
    /// 生命周期
    pub lifetime: Lifetime,
    /// 激活方式
    pub activator: Activator,
    factory: InstanceFactory,
}

impl ServiceRegistration {
    /// 创建新的注册信息
    pub fn new(
        service: TypeInfo,
        implementation: TypeInfo,
        lifetime: Lifetime,
        activator: Activator,
        factory: InstanceFactory,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            service,
            implementation,
            lifetime,
            activator,
            factory,
        }
    }

    /// 调用工厂创建实例（不处理共享，由作用域负责缓存）
    pub fn activate(&self, resolver: &dyn ComponentResolver) -> DependencyResult<ErasedInstance> {
        (self.factory)(resolver)
    }
}

impl fmt::Debug for ServiceRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistration")
            .field("id", &self.id)
            .field("service", &self.service.name)
            .field("implementation", &self.implementation.name)
            .field("lifetime", &self.lifetime)
            .field("activator", &self.activator)
            .field("factory", &"<function>")
            .finish()
    }
}

/// 组件注册表 trait
///
/// 模块通过它登记服务。该 trait 保持对象安全，泛型便捷方法见 [`ComponentRegistryExt`]。
pub trait ComponentRegistry: Send {
    /// 添加一条注册
    fn add_registration(&mut self, registration: ServiceRegistration);

    /// 加载模块中的全部注册
    fn register_module(&mut self, module: &dyn Module) -> DependencyResult<()>;

    /// 获取已添加的注册
    fn registrations(&self) -> &[ServiceRegistration];
}

/// 组件注册表的泛型便捷方法
pub trait ComponentRegistryExt: ComponentRegistry {
    /// 注册已创建的实例（单例）
    fn register_instance<S>(&mut self, instance: Arc<S>) -> &mut Self
    where
        S: ?Sized + Send + Sync + 'static,
    {
        let erased: ErasedInstance = Arc::new(instance);
        self.add_registration(ServiceRegistration::new(
            TypeInfo::of::<S>(),
            TypeInfo::of::<S>(),
            Lifetime::Singleton,
            Activator::Instance,
            instance_factory(move |_| Ok(erased.clone())),
        ));
        self
    }

    /// 注册委托工厂
    fn register_factory<S, F>(&mut self, lifetime: Lifetime, factory: F) -> &mut Self
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(&dyn ComponentResolver) -> DependencyResult<Arc<S>> + Send + Sync + 'static,
    {
        self.add_registration(ServiceRegistration::new(
            TypeInfo::of::<S>(),
            TypeInfo::of::<S>(),
            lifetime,
            Activator::Delegate,
            instance_factory(move |resolver| {
                let instance = factory(resolver)?;
                Ok(Arc::new(instance) as ErasedInstance)
            }),
        ));
        self
    }

    /// 注册自动装配的实现类型 `I`，以服务 `S` 的身份对外提供
    ///
    /// `upcast` 负责把 `Arc<I>` 转换为 `Arc<S>`，通常写作 `|instance| instance`。
    fn register_type<S, I>(&mut self, lifetime: Lifetime, upcast: fn(Arc<I>) -> Arc<S>) -> &mut Self
    where
        S: ?Sized + Send + Sync + 'static,
        I: Constructible,
    {
        self.add_registration(ServiceRegistration::new(
            TypeInfo::of::<S>(),
            TypeInfo::of::<I>(),
            lifetime,
            Activator::Constructor,
            instance_factory(move |resolver| {
                let instance = Arc::new(I::construct(resolver)?);
                Ok(Arc::new(upcast(instance)) as ErasedInstance)
            }),
        ));
        self
    }

    /// 以自身类型注册自动装配的组件
    fn register_self<I>(&mut self, lifetime: Lifetime) -> &mut Self
    where
        I: Constructible,
    {
        self.register_type::<I, I>(lifetime, |instance| instance)
    }
}

impl<R: ComponentRegistry + ?Sized> ComponentRegistryExt for R {}
