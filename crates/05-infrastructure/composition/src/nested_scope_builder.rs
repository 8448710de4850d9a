//! 嵌套作用域构建器
//!
//! 模块先被加入待定列表，再放入具名分组；构建时按分组顺序逐层创建子作用域，
//! 每个分组对应一层。
//!
//! ```rust,ignore
//! let builder = NestedScopeBuilder::default();
//! let token = CancellationToken::new();
//!
//! builder.add_module(core_module).to_group("Core", &token).await?;
//! builder.add_module(db_module).after_group("Core", &token).await?;
//! let scope = builder.build(&token).await?;
//! ```

use crate::module_group::{ModuleGroups, Placement};
use di_abstractions::{LifetimeScope, Module, ModuleHandle};
use di_impl::{ContainerBuilder, LifetimeScopeImpl};
use infrastructure_common::{CompositionError, CompositionResult, DependencyResult};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// 嵌套作用域构建器
pub struct NestedScopeBuilder {
    scope: RwLock<Arc<dyn LifetimeScope>>,
    pending: Mutex<Vec<ModuleHandle>>,
    groups: tokio::sync::Mutex<ModuleGroups>,
}

impl NestedScopeBuilder {
    /// 以已有作用域作为起点创建构建器
    pub fn new(scope: Arc<dyn LifetimeScope>) -> Self {
        Self {
            scope: RwLock::new(scope),
            pending: Mutex::new(Vec::new()),
            groups: tokio::sync::Mutex::new(ModuleGroups::new()),
        }
    }

    /// 先用给定模块构建根作用域，再以它作为起点
    pub fn with_modules(modules: &[ModuleHandle]) -> DependencyResult<Self> {
        let mut builder = ContainerBuilder::new();
        builder.register_modules(modules)?;
        Ok(Self::new(builder.build()))
    }

    /// 当前的起点作用域，每次成功构建后更新为最后创建的作用域
    pub fn scope(&self) -> Arc<dyn LifetimeScope> {
        self.scope.read().clone()
    }

    /// 当前分组的快照
    pub async fn module_groups(&self) -> ModuleGroups {
        self.groups.lock().await.clone()
    }

    /// 尚未放入分组的模块数量
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// 添加一个模块，随后需要指定分组
    pub fn add_module(&self, module: ModuleHandle) -> GroupSpecifier<'_> {
        self.pending.lock().push(module);
        GroupSpecifier { builder: self }
    }

    /// 添加多个模块，随后需要指定分组
    pub fn add_modules<I>(&self, modules: I) -> GroupSpecifier<'_>
    where
        I: IntoIterator<Item = ModuleHandle>,
    {
        self.pending.lock().extend(modules);
        GroupSpecifier { builder: self }
    }

    /// 添加一个默认构造的模块
    pub fn add_module_of<M>(&self) -> GroupSpecifier<'_>
    where
        M: Module + Default + 'static,
    {
        self.add_module(Arc::new(M::default()))
    }

    /// 按分组顺序逐层创建子作用域，返回最后一层
    ///
    /// 成功后清空分组，并以返回的作用域作为之后构建的起点。
    pub async fn build(&self, token: &CancellationToken) -> CompositionResult<Arc<dyn LifetimeScope>> {
        let mut groups = self.lock_groups(token).await?;
        self.fold_groups(&mut groups)
    }

    /// [`build`](Self::build) 的阻塞版本，不能在异步上下文中调用
    pub fn build_blocking(&self) -> CompositionResult<Arc<dyn LifetimeScope>> {
        let mut groups = self.groups.blocking_lock();
        self.fold_groups(&mut groups)
    }

    async fn lock_groups(
        &self,
        token: &CancellationToken,
    ) -> CompositionResult<tokio::sync::MutexGuard<'_, ModuleGroups>> {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!("等待分组锁时操作被取消");
                Err(CompositionError::Canceled)
            }
            guard = self.groups.lock() => Ok(guard),
        }
    }

    async fn place_pending<F>(&self, token: &CancellationToken, anchor: F) -> CompositionResult<()>
    where
        F: FnOnce(&mut ModuleGroups) -> String,
    {
        let mut groups = self.lock_groups(token).await?;
        self.place_pending_locked(&mut groups, anchor);
        Ok(())
    }

    fn place_pending_blocking<F>(&self, anchor: F)
    where
        F: FnOnce(&mut ModuleGroups) -> String,
    {
        let mut groups = self.groups.blocking_lock();
        self.place_pending_locked(&mut groups, anchor);
    }

    fn place_pending_locked<F>(&self, groups: &mut ModuleGroups, anchor: F)
    where
        F: FnOnce(&mut ModuleGroups) -> String,
    {
        let target = anchor(groups);
        let modules = std::mem::take(&mut *self.pending.lock());
        for module in &modules {
            match groups.place(module, &target) {
                Placement::Added => debug!("模块 {} 加入分组 {}", module.name(), target),
                Placement::Moved { from } => {
                    debug!("模块 {} 从分组 {} 移动到分组 {}", module.name(), from, target)
                }
                Placement::Unchanged => {
                    debug!("模块 {} 已在更靠前的分组中，保持不变", module.name())
                }
            }
        }
    }

    fn fold_groups(&self, groups: &mut ModuleGroups) -> CompositionResult<Arc<dyn LifetimeScope>> {
        let mut current = self.scope();
        let mut created: Vec<Arc<dyn LifetimeScope>> = Vec::with_capacity(groups.len());

        for group in groups.iter() {
            match current.clone().begin_child_scope(group.name(), group.modules()) {
                Ok(child) => {
                    created.push(child.clone());
                    current = child;
                }
                Err(e) => {
                    warn!("分组 {} 创建子作用域失败: {}", group.name(), e);
                    for scope in created.iter().rev() {
                        scope.dispose();
                    }
                    return Err(e.into());
                }
            }
        }

        if !created.is_empty() {
            info!(
                "嵌套作用域构建完成，新增层数: {}，最终作用域: {}",
                created.len(),
                current.tag()
            );
        }
        groups.clear();
        *self.scope.write() = current.clone();
        Ok(current)
    }
}

impl Default for NestedScopeBuilder {
    fn default() -> Self {
        Self::new(LifetimeScopeImpl::empty())
    }
}

impl fmt::Debug for NestedScopeBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NestedScopeBuilder")
            .field("scope", &self.scope.read().tag())
            .field("pending", &self.pending_count())
            .finish_non_exhaustive()
    }
}

/// 添加模块后返回的句柄
///
/// 只能继续添加模块或指定分组，不能直接构建。
/// 待定模块属于构建器而不是句柄，任何一个句柄放入分组时都会取走构建器上全部待定模块。
#[must_use = "添加的模块需要通过 to_group / before_group / after_group 放入分组"]
pub struct GroupSpecifier<'a> {
    builder: &'a NestedScopeBuilder,
}

impl<'a> GroupSpecifier<'a> {
    /// 继续添加一个模块
    pub fn add_module(self, module: ModuleHandle) -> Self {
        self.builder.add_module(module)
    }

    /// 继续添加多个模块
    pub fn add_modules<I>(self, modules: I) -> Self
    where
        I: IntoIterator<Item = ModuleHandle>,
    {
        self.builder.add_modules(modules)
    }

    /// 继续添加一个默认构造的模块
    pub fn add_module_of<M>(self) -> Self
    where
        M: Module + Default + 'static,
    {
        self.builder.add_module_of::<M>()
    }

    /// 把待定模块放入分组 `name`
    pub async fn to_group(
        self,
        name: &str,
        token: &CancellationToken,
    ) -> CompositionResult<&'a NestedScopeBuilder> {
        self.builder
            .place_pending(token, |_| name.to_string())
            .await?;
        Ok(self.builder)
    }

    /// 把待定模块放入紧挨在分组 `name` 之前的分组
    pub async fn before_group(
        self,
        name: &str,
        token: &CancellationToken,
    ) -> CompositionResult<&'a NestedScopeBuilder> {
        self.builder
            .place_pending(token, |groups| groups.anchor_before(name))
            .await?;
        Ok(self.builder)
    }

    /// 把待定模块放入紧挨在分组 `name` 之后的分组
    pub async fn after_group(
        self,
        name: &str,
        token: &CancellationToken,
    ) -> CompositionResult<&'a NestedScopeBuilder> {
        self.builder
            .place_pending(token, |groups| groups.anchor_after(name))
            .await?;
        Ok(self.builder)
    }

    /// [`to_group`](Self::to_group) 的阻塞版本
    pub fn to_group_blocking(self, name: &str) -> &'a NestedScopeBuilder {
        self.builder.place_pending_blocking(|_| name.to_string());
        self.builder
    }

    /// [`before_group`](Self::before_group) 的阻塞版本
    pub fn before_group_blocking(self, name: &str) -> &'a NestedScopeBuilder {
        self.builder
            .place_pending_blocking(|groups| groups.anchor_before(name));
        self.builder
    }

    /// [`after_group`](Self::after_group) 的阻塞版本
    pub fn after_group_blocking(self, name: &str) -> &'a NestedScopeBuilder {
        self.builder
            .place_pending_blocking(|groups| groups.anchor_after(name));
        self.builder
    }
}

impl fmt::Debug for GroupSpecifier<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupSpecifier")
            .field("pending", &self.builder.pending_count())
            .finish()
    }
}
