//! 组件工厂抽象接口

use crate::resolver::ComponentResolver;
use infrastructure_common::DependencyResult;

/// 可自动装配的组件
///
/// 实现类型从解析器中取得自己的依赖并构造自身。
/// 通过 [`ComponentRegistryExt::register_type`](crate::ComponentRegistryExt::register_type)
/// 注册的实现会出现在 [`TypeList`](crate::TypeList) 中。
pub trait Constructible: Sized + Send + Sync + 'static {
    /// 构造组件实例
    fn construct(resolver: &dyn ComponentResolver) -> DependencyResult<Self>;
}
