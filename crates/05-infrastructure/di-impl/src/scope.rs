//! 生命周期作用域实现

use crate::builder::ContainerBuilder;
use crate::resolver::ScopeResolver;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use di_abstractions::{
    ComponentResolver, ContainerConfig, ErasedInstance, LifetimeScope, ModuleHandle,
    ResolveContext, ServiceRegistration,
};
use infrastructure_common::{DependencyError, DependencyResult, Lifetime, TypeInfo};
use parking_lot::Mutex;
use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};
use uuid::Uuid;

/// 根作用域的标签
pub const ROOT_TAG: &str = "root";

type InstanceCache = DashMap<Uuid, ErasedInstance>;

/// 生命周期作用域实现
///
/// - `Singleton` 实例缓存在持有该注册的作用域中
/// - `Scoped` 实例缓存在发起解析的作用域中
/// - `Transient` 实例从不缓存
pub struct LifetimeScopeImpl {
    id: Uuid,
    tag: String,
    parent: Option<Arc<LifetimeScopeImpl>>,
    registrations: HashMap<TypeId, Vec<Arc<ServiceRegistration>>>,
    owned: HashSet<Uuid>,
    singletons: InstanceCache,
    scoped: InstanceCache,
    config: ContainerConfig,
    disposed: AtomicBool,
    created_at: DateTime<Utc>,
}

impl LifetimeScopeImpl {
    pub(crate) fn root(registrations: Vec<ServiceRegistration>, config: ContainerConfig) -> Arc<Self> {
        Arc::new(Self::create(ROOT_TAG, None, registrations, config))
    }

    /// 创建没有任何注册的根作用域
    pub fn empty() -> Arc<Self> {
        ContainerBuilder::new().build()
    }

    fn create(
        tag: &str,
        parent: Option<Arc<LifetimeScopeImpl>>,
        registrations: Vec<ServiceRegistration>,
        config: ContainerConfig,
    ) -> Self {
        let mut by_service: HashMap<TypeId, Vec<Arc<ServiceRegistration>>> = HashMap::new();
        let mut owned = HashSet::with_capacity(registrations.len());
        for registration in registrations {
            owned.insert(registration.id);
            by_service
                .entry(registration.service.id)
                .or_default()
                .push(Arc::new(registration));
        }

        Self {
            id: Uuid::new_v4(),
            tag: tag.to_string(),
            parent,
            registrations: by_service,
            owned,
            singletons: DashMap::new(),
            scoped: DashMap::new(),
            config,
            disposed: AtomicBool::new(false),
            created_at: Utc::now(),
        }
    }

    /// 创建子作用域，`configure` 用于向子作用域添加注册
    pub fn begin_lifetime_scope<F>(self: &Arc<Self>, tag: &str, configure: F) -> DependencyResult<Arc<Self>>
    where
        F: FnOnce(&mut ContainerBuilder) -> DependencyResult<()>,
    {
        self.ensure_not_disposed()?;

        let mut builder = ContainerBuilder::new().with_config(self.config.clone());
        configure(&mut builder)?;
        let (registrations, config) = builder.into_parts();

        let child = Arc::new(Self::create(tag, Some(self.clone()), registrations, config));
        debug!(
            "创建子作用域: {} ({})，父作用域: {} ({})，注册数量: {}",
            child.tag,
            child.id,
            self.tag,
            self.id,
            child.owned.len()
        );
        Ok(child)
    }

    /// 创建时间
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// 容器配置
    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// 本作用域自身持有的注册数量（不含祖先）
    pub fn own_registration_count(&self) -> usize {
        self.owned.len()
    }

    fn describe(&self) -> String {
        format!("{} ({})", self.tag, self.id)
    }

    fn ensure_not_disposed(&self) -> DependencyResult<()> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(DependencyError::ScopeDisposed {
                scope: self.describe(),
            });
        }
        Ok(())
    }

    fn new_context(&self) -> Mutex<ResolveContext> {
        Mutex::new(ResolveContext::new(self.config.resolve_options()))
    }

    /// 从本作用域到根作用域
    fn ancestry(&self) -> impl Iterator<Item = &LifetimeScopeImpl> {
        std::iter::successors(Some(self), |scope| scope.parent.as_deref())
    }

    fn owner_of(&self, registration: &ServiceRegistration) -> &LifetimeScopeImpl {
        self.ancestry()
            .find(|scope| scope.owned.contains(&registration.id))
            .unwrap_or(self)
    }

    pub(crate) fn resolve_with(
        &self,
        service: &TypeInfo,
        context: &Mutex<ResolveContext>,
    ) -> DependencyResult<ErasedInstance> {
        self.ensure_not_disposed()?;
        let registration = self.registrations_for(service.id).pop().ok_or_else(|| {
            DependencyError::ComponentNotRegistered {
                type_name: service.name.clone(),
            }
        })?;
        self.activate(&registration, context)
    }

    pub(crate) fn resolve_all_with(
        &self,
        service: &TypeInfo,
        context: &Mutex<ResolveContext>,
    ) -> DependencyResult<Vec<ErasedInstance>> {
        self.ensure_not_disposed()?;
        self.registrations_for(service.id)
            .iter()
            .map(|registration| self.activate(registration, context))
            .collect()
    }

    pub(crate) fn activate(
        &self,
        registration: &ServiceRegistration,
        context: &Mutex<ResolveContext>,
    ) -> DependencyResult<ErasedInstance> {
        self.ensure_not_disposed()?;
        context.lock().push_type(&registration.service)?;
        let result = self.share(registration, context);
        context.lock().pop_type();
        result
    }

    fn share(
        &self,
        registration: &ServiceRegistration,
        context: &Mutex<ResolveContext>,
    ) -> DependencyResult<ErasedInstance> {
        match registration.lifetime {
            Lifetime::Transient => self.instantiate(registration, context),
            Lifetime::Scoped => Self::cached(&self.scoped, registration, || {
                self.instantiate(registration, context)
            }),
            Lifetime::Singleton => {
                let owner = self.owner_of(registration);
                Self::cached(&owner.singletons, registration, || {
                    owner.instantiate(registration, context)
                })
            }
        }
    }

    fn instantiate(
        &self,
        registration: &ServiceRegistration,
        context: &Mutex<ResolveContext>,
    ) -> DependencyResult<ErasedInstance> {
        trace!(
            "在作用域 {} 中创建实例: {}",
            self.tag,
            registration.implementation.name
        );
        registration.activate(&ScopeResolver::new(self, context))
    }

    fn cached<F>(
        cache: &InstanceCache,
        registration: &ServiceRegistration,
        create: F,
    ) -> DependencyResult<ErasedInstance>
    where
        F: FnOnce() -> DependencyResult<ErasedInstance>,
    {
        if let Some(instance) = cache.get(&registration.id) {
            return Ok(instance.value().clone());
        }
        // 工厂在锁外执行，并发创建时以先写入者为准
        let instance = create()?;
        Ok(cache.entry(registration.id).or_insert(instance).value().clone())
    }
}

impl ComponentResolver for LifetimeScopeImpl {
    fn resolve_service(&self, service: &TypeInfo) -> DependencyResult<ErasedInstance> {
        self.resolve_with(service, &self.new_context())
    }

    fn resolve_all_services(&self, service: &TypeInfo) -> DependencyResult<Vec<ErasedInstance>> {
        self.resolve_all_with(service, &self.new_context())
    }

    fn resolve_registration(
        &self,
        registration: &ServiceRegistration,
    ) -> DependencyResult<ErasedInstance> {
        self.activate(registration, &self.new_context())
    }

    fn registrations_for(&self, service: TypeId) -> Vec<Arc<ServiceRegistration>> {
        let mut scopes: Vec<&LifetimeScopeImpl> = self.ancestry().collect();
        scopes.reverse();
        scopes
            .into_iter()
            .filter_map(|scope| scope.registrations.get(&service))
            .flatten()
            .cloned()
            .collect()
    }
}

impl LifetimeScope for LifetimeScopeImpl {
    fn id(&self) -> Uuid {
        self.id
    }

    fn tag(&self) -> &str {
        &self.tag
    }

    fn parent(&self) -> Option<Arc<dyn LifetimeScope>> {
        self.parent
            .clone()
            .map(|parent| parent as Arc<dyn LifetimeScope>)
    }

    fn begin_child_scope(
        self: Arc<Self>,
        tag: &str,
        modules: &[ModuleHandle],
    ) -> DependencyResult<Arc<dyn LifetimeScope>> {
        let child = self.begin_lifetime_scope(tag, |builder| builder.register_modules(modules))?;
        Ok(child as Arc<dyn LifetimeScope>)
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.scoped.clear();
        self.singletons.clear();
        debug!("释放作用域: {}", self.describe());
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn as_resolver(&self) -> &dyn ComponentResolver {
        self
    }
}

impl fmt::Debug for LifetimeScopeImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifetimeScopeImpl")
            .field("id", &self.id)
            .field("tag", &self.tag)
            .field("parent", &self.parent.as_ref().map(|parent| parent.id))
            .field("registrations", &self.owned.len())
            .field("disposed", &self.is_disposed())
            .field("created_at", &self.created_at)
            .finish()
    }
}
