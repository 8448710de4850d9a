//! 生命周期作用域抽象接口
//!
//! 作用域组成一棵树：子作用域可以看到祖先作用域的全部注册，
//! 自身的注册只对自己和后代可见。

use crate::module::ModuleHandle;
use crate::resolver::{ComponentResolver, ResolveOptions};
use infrastructure_common::DependencyResult;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// 生命周期作用域 trait
pub trait LifetimeScope: ComponentResolver {
    /// 作用域唯一标识
    fn id(&self) -> Uuid;

    /// 作用域标签
    fn tag(&self) -> &str;

    /// 父作用域，根作用域返回 `None`
    fn parent(&self) -> Option<Arc<dyn LifetimeScope>>;

    /// 作用域在树中的深度，根作用域为 0
    fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.parent();
        while let Some(scope) = current {
            depth += 1;
            current = scope.parent();
        }
        depth
    }

    /// 创建子作用域，并在其中加载给定模块的注册
    fn begin_child_scope(
        self: Arc<Self>,
        tag: &str,
        modules: &[ModuleHandle],
    ) -> DependencyResult<Arc<dyn LifetimeScope>>;

    /// 释放作用域，清空缓存的实例
    fn dispose(&self);

    /// 是否已释放
    fn is_disposed(&self) -> bool;

    /// 以解析器身份访问作用域
    fn as_resolver(&self) -> &dyn ComponentResolver;
}

/// 判断两个作用域句柄是否为同一个作用域
pub fn same_scope(left: &Arc<dyn LifetimeScope>, right: &Arc<dyn LifetimeScope>) -> bool {
    left.id() == right.id()
}

/// 容器配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// 是否启用循环依赖检测
    pub enable_circular_dependency_detection: bool,
    /// 最大解析深度
    pub max_resolution_depth: usize,
}

impl ContainerConfig {
    /// 转换为解析选项
    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            detect_circular_dependencies: self.enable_circular_dependency_detection,
            max_depth: self.max_resolution_depth,
        }
    }
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            enable_circular_dependency_detection: true,
            max_resolution_depth: 100,
        }
    }
}
