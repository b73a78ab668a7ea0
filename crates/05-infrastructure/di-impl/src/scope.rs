//! 作用域与解析器实现
//!
//! 作用域构成一棵树：子作用域只持有父作用域的弱引用，父作用域不知道子作用域。
//! 单例和作用域实例缓存在拥有该注册的作用域中，构造过程在该作用域的可重入锁内完成

use crate::builder::DiContainerBuilder;
use crate::circular::ResolutionGuard;
use crate::diagnostics::DiagnosticsCollector;
use crate::providers::CollectionInstanceProvider;
use crate::registration::{Registration, RegistrationId};
use crate::registry::Registry;
use chrono::Utc;
use di_abstractions::{
    downcast_service, AnyArc, BoxedService, ContainerConfig, ContainerStats, GenericRequest, InjectContext,
    Injectable, InjectionPlanCache, ObjectResolver, ReflectionInjector, RequestShape, Resolved,
    ServiceRequest, SpawnedInstance,
};
use infrastructure_common::{DependencyError, DependencyResult, Lifetime, TypeKey};
use parking_lot::ReentrantMutex;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Default)]
struct ScopeState {
    instances: HashMap<RegistrationId, AnyArc>,
    disposables: Vec<SpawnedInstance>,
}

/// 作用域内部状态
pub struct ScopeCore {
    id: Uuid,
    name: String,
    registry: Registry,
    parent: Option<Weak<ScopeCore>>,
    state: ReentrantMutex<RefCell<ScopeState>>,
    disposed: AtomicBool,
    config: Arc<ContainerConfig>,
    plan_cache: Arc<InjectionPlanCache>,
    diagnostics: Arc<DiagnosticsCollector>,
    self_ref: Weak<ScopeCore>,
}

impl ScopeCore {
    pub(crate) fn new(
        name: String,
        registry: Registry,
        parent: Option<&Arc<ScopeCore>>,
        config: Arc<ContainerConfig>,
        plan_cache: Arc<InjectionPlanCache>,
        diagnostics: Arc<DiagnosticsCollector>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            id: Uuid::new_v4(),
            name,
            registry,
            parent: parent.map(Arc::downgrade),
            state: ReentrantMutex::new(RefCell::new(ScopeState::default())),
            disposed: AtomicBool::new(false),
            config,
            plan_cache,
            diagnostics,
            self_ref: self_ref.clone(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &Arc<ContainerConfig> {
        &self.config
    }

    pub fn diagnostics(&self) -> &Arc<DiagnosticsCollector> {
        &self.diagnostics
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn arc(&self) -> DependencyResult<Arc<ScopeCore>> {
        self.self_ref
            .upgrade()
            .ok_or_else(|| DependencyError::ScopeDisposed {
                scope: self.name.clone(),
            })
    }

    fn ensure_alive(&self) -> DependencyResult<()> {
        if self.is_disposed() {
            return Err(DependencyError::ScopeDisposed {
                scope: self.name.clone(),
            });
        }
        Ok(())
    }

    /// 父作用域，已被释放时返回 `ScopeDisposed`
    pub(crate) fn parent_scope(&self) -> DependencyResult<Option<Arc<ScopeCore>>> {
        let Some(weak) = &self.parent else {
            return Ok(None);
        };
        let parent = weak
            .upgrade()
            .ok_or_else(|| DependencyError::ScopeDisposed {
                scope: format!("{} 的父作用域", self.name),
            })?;
        parent.ensure_alive()?;
        Ok(Some(parent))
    }

    /// 沿作用域链查找直接解析使用的注册，返回拥有它的作用域
    fn find_registration(
        &self,
        request: &ServiceRequest,
    ) -> DependencyResult<Option<(Arc<ScopeCore>, Arc<Registration>)>> {
        let mut current = self.arc()?;
        loop {
            if let Some(registration) = current
                .registry
                .find_single(request.contract(), request.name())
            {
                let registration = registration.clone();
                return Ok(Some((current, registration)));
            }
            match current.parent_scope()? {
                Some(parent) => current = parent,
                None => return Ok(None),
            }
        }
    }

    fn is_resolver_request(request: &ServiceRequest) -> bool {
        request.shape() == RequestShape::Single
            && request.name().is_none()
            && request.contract() == TypeKey::of::<dyn ObjectResolver>()
    }

    fn resolve_optional(&self, request: &ServiceRequest) -> DependencyResult<Option<Resolved>> {
        self.ensure_alive()?;

        if Self::is_resolver_request(request) {
            let resolver: Arc<dyn ObjectResolver> = self.arc()?;
            return Ok(Some(Resolved::Single(Box::new(resolver))));
        }

        match request.shape() {
            RequestShape::Single => {
                let Some((owner, registration)) = self.find_registration(request)? else {
                    return Ok(None);
                };
                let instance = self.direct_instance(&owner, &registration)?;
                registration
                    .cast(request.contract(), &instance)
                    .map(|service| Some(Resolved::Single(service)))
            }
            RequestShape::Sequence | RequestShape::ReadOnlyList => {
                let requester = self.arc()?;
                CollectionInstanceProvider::new(request.contract())
                    .resolve(&requester)
                    .map(|services| services.map(Resolved::Many))
            }
        }
    }

    /// 直接解析：单例和作用域实例由拥有者缓存，瞬时实例由请求者创建
    fn direct_instance(&self, owner: &ScopeCore, registration: &Arc<Registration>) -> DependencyResult<AnyArc> {
        match registration.lifetime() {
            Lifetime::Transient => self.spawn_transient(registration),
            Lifetime::Scoped | Lifetime::Singleton => owner.get_or_create(registration),
        }
    }

    /// 集合元素：单例由拥有者缓存，作用域和瞬时实例由请求者负责
    pub(crate) fn collection_element(
        &self,
        owner: &ScopeCore,
        registration: &Arc<Registration>,
    ) -> DependencyResult<AnyArc> {
        match registration.lifetime() {
            Lifetime::Singleton => owner.get_or_create(registration),
            Lifetime::Scoped => self.get_or_create(registration),
            Lifetime::Transient => self.spawn_transient(registration),
        }
    }

    /// 取得缓存实例，不存在时在本作用域的锁内创建
    fn get_or_create(&self, registration: &Arc<Registration>) -> DependencyResult<AnyArc> {
        self.ensure_alive()?;
        let guard = self.state.lock();
        if let Some(existing) = guard.borrow().instances.get(&registration.id()) {
            return Ok(existing.clone());
        }

        let spawned = self.spawn(registration)?;
        self.reject_if_disposed(&spawned)?;

        let mut state = guard.borrow_mut();
        if let Some(existing) = state.instances.get(&registration.id()) {
            return Ok(existing.clone());
        }
        state
            .instances
            .insert(registration.id(), spawned.instance.clone());
        let instance = spawned.instance.clone();
        if spawned.disposer.is_some() {
            state.disposables.push(spawned);
        }
        Ok(instance)
    }

    fn spawn_transient(&self, registration: &Arc<Registration>) -> DependencyResult<AnyArc> {
        let spawned = self.spawn(registration)?;
        let instance = spawned.instance.clone();
        if spawned.disposer.is_some() {
            self.track(spawned)?;
        }
        Ok(instance)
    }

    fn track(&self, spawned: SpawnedInstance) -> DependencyResult<()> {
        let guard = self.state.lock();
        self.reject_if_disposed(&spawned)?;
        guard.borrow_mut().disposables.push(spawned);
        Ok(())
    }

    /// 构造期间作用域被释放时，立即释放新实例，不写入缓存
    ///
    /// 调用方必须持有状态锁，`dispose` 在同一把锁内清空释放栈
    fn reject_if_disposed(&self, spawned: &SpawnedInstance) -> DependencyResult<()> {
        if !self.is_disposed() {
            return Ok(());
        }
        warn!("作用域 {} 在构造期间被释放，丢弃新实例", self.name);
        spawned.dispose();
        Err(DependencyError::ScopeDisposed {
            scope: self.name.clone(),
        })
    }

    /// 以本作用域为解析器运行提供者
    fn spawn(&self, registration: &Registration) -> DependencyResult<SpawnedInstance> {
        let _guard = ResolutionGuard::enter(registration, &self.config)?;
        let depth = ResolutionGuard::depth();
        let started_at = Utc::now();
        let started = Instant::now();

        debug!("创建实例: {} @ {}", registration.describe(), self.name);
        let result = registration.spawn(self);

        self.diagnostics.record(
            registration,
            &self.name,
            depth,
            started_at,
            started.elapsed(),
            result.is_ok(),
        );
        result
    }

    fn resolve_generic(&self, request: &GenericRequest) -> DependencyResult<BoxedService> {
        self.ensure_alive()?;
        let mut current = self.arc()?;
        loop {
            if let Some(open) = current.registry.open_generic(request.definition()) {
                let registration = open.close(request, &current.plan_cache)?;
                let instance = self.direct_instance(&current, &registration)?;
                return registration.cast(request.closed_type(), &instance);
            }
            match current.parent_scope()? {
                Some(parent) => current = parent,
                None => break,
            }
        }

        Err(DependencyError::not_registered(
            request.closed_type().name(),
            format!("开放泛型 {} 未注册，请求自作用域 {}", request.definition(), self.name),
        ))
    }

    /// 释放作用域：按构造顺序的逆序释放实例并清空缓存，重复调用无效
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            warn!("作用域 {} 已经释放过", self.name);
            return;
        }

        let disposables = {
            let guard = self.state.lock();
            let mut state = guard.borrow_mut();
            state.instances.clear();
            std::mem::take(&mut state.disposables)
        };

        let count = disposables.len();
        for spawned in disposables.into_iter().rev() {
            spawned.dispose();
        }
        info!("作用域已释放: {} ({} 个可释放实例)", self.name, count);
    }

    fn stats(&self) -> ContainerStats {
        let guard = self.state.lock();
        let state = guard.borrow();
        ContainerStats {
            registered_components: self.registry.len(),
            resolved_components: self.diagnostics.resolved_count(),
            active_instances: state.instances.len(),
            pending_disposables: state.disposables.len(),
            resolution_errors: self.diagnostics.error_count(),
            total_resolution_time_us: self.diagnostics.total_resolution_time_us(),
        }
    }
}

impl ObjectResolver for ScopeCore {
    fn resolve_request(&self, request: &ServiceRequest) -> DependencyResult<Resolved> {
        self.resolve_optional(request)?.ok_or_else(|| {
            DependencyError::not_registered(
                request.describe(),
                format!("请求自作用域 {}", self.name),
            )
        })
    }

    fn try_resolve_request(&self, request: &ServiceRequest) -> DependencyResult<Option<Resolved>> {
        self.resolve_optional(request)
    }

    fn is_registered(&self, request: &ServiceRequest) -> bool {
        if Self::is_resolver_request(request) {
            return true;
        }
        let mut current = match self.arc() {
            Ok(scope) => scope,
            Err(_) => return false,
        };
        loop {
            let found = match request.shape() {
                RequestShape::Single => current
                    .registry
                    .find_single(request.contract(), request.name())
                    .is_some(),
                RequestShape::Sequence | RequestShape::ReadOnlyList => !current
                    .registry
                    .registrations_for(request.contract())
                    .is_empty(),
            };
            if found {
                return true;
            }
            match current.parent_scope() {
                Ok(Some(parent)) => current = parent,
                _ => return false,
            }
        }
    }

    fn resolve_generic_request(&self, request: &GenericRequest) -> DependencyResult<BoxedService> {
        self.resolve_generic(request)
    }

    fn plan_cache(&self) -> Arc<InjectionPlanCache> {
        self.plan_cache.clone()
    }

    fn scope_name(&self) -> &str {
        &self.name
    }
}

/// 对外暴露的作用域容器
///
/// 克隆得到的是同一个作用域的另一个句柄
#[derive(Clone)]
pub struct ScopedContainer {
    core: Arc<ScopeCore>,
}

impl ScopedContainer {
    pub(crate) fn from_core(core: Arc<ScopeCore>) -> Self {
        Self { core }
    }

    /// 创建根容器构建器
    pub fn builder() -> DiContainerBuilder {
        DiContainerBuilder::new()
    }

    pub fn id(&self) -> Uuid {
        self.core.id
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    pub(crate) fn core(&self) -> &Arc<ScopeCore> {
        &self.core
    }

    /// 父作用域（如果仍然存活）
    pub fn parent(&self) -> Option<ScopedContainer> {
        self.core
            .parent
            .as_ref()
            .and_then(Weak::upgrade)
            .map(Self::from_core)
    }

    /// 创建子作用域，`configure` 向子作用域添加本地注册
    pub fn create_scope<F>(&self, configure: F) -> DependencyResult<ScopedContainer>
    where
        F: FnOnce(&mut DiContainerBuilder),
    {
        let name = format!("{}/child", self.core.name);
        self.create_named_scope(name, configure)
    }

    /// 创建具名子作用域
    pub fn create_named_scope<F>(
        &self,
        name: impl Into<String>,
        configure: F,
    ) -> DependencyResult<ScopedContainer>
    where
        F: FnOnce(&mut DiContainerBuilder),
    {
        self.try_create_named_scope(name, |builder| {
            configure(builder);
            Ok(())
        })
    }

    /// 创建具名子作用域，`configure` 失败时不构建子作用域，也不运行构建回调
    pub fn try_create_named_scope<F>(
        &self,
        name: impl Into<String>,
        configure: F,
    ) -> DependencyResult<ScopedContainer>
    where
        F: FnOnce(&mut DiContainerBuilder) -> DependencyResult<()>,
    {
        self.core.ensure_alive()?;
        let mut builder = DiContainerBuilder::named(name)
            .with_config((*self.core.config).clone())
            .with_plan_cache(self.core.plan_cache.clone());
        configure(&mut builder)?;
        builder.build_child(self)
    }

    /// 对宿主创建的对象做成员注入
    pub fn inject<T: Injectable>(&self, instance: &mut T) -> DependencyResult<()> {
        self.core.ensure_alive()?;
        let injector = ReflectionInjector::<T>::new(self.core.plan_cache.clone());
        let ctx = InjectContext::without_parameters(self.core.as_ref());
        injector.inject(instance, &ctx)
    }

    /// 只解析本作用域注册表中的实现（按注册顺序），不含父作用域的注册
    pub fn resolve_local<T: ?Sized + Send + Sync + 'static>(&self) -> DependencyResult<Vec<Arc<T>>> {
        self.core.ensure_alive()?;
        let contract = TypeKey::of::<T>();
        self.core
            .registry
            .registrations_for(contract)
            .iter()
            .map(|registration| {
                let instance = self.core.collection_element(&self.core, registration)?;
                registration
                    .cast(contract, &instance)
                    .and_then(downcast_service::<T>)
            })
            .collect()
    }

    /// 作为类型擦除的解析器
    pub fn as_resolver(&self) -> Arc<dyn ObjectResolver> {
        self.core.clone()
    }

    pub fn stats(&self) -> ContainerStats {
        self.core.stats()
    }

    pub fn diagnostics(&self) -> &Arc<DiagnosticsCollector> {
        &self.core.diagnostics
    }

    pub fn registry(&self) -> &Registry {
        &self.core.registry
    }

    pub fn is_disposed(&self) -> bool {
        self.core.is_disposed()
    }

    /// 释放作用域
    pub fn dispose(&self) {
        self.core.dispose();
    }
}

impl ObjectResolver for ScopedContainer {
    fn resolve_request(&self, request: &ServiceRequest) -> DependencyResult<Resolved> {
        self.core.resolve_request(request)
    }

    fn try_resolve_request(&self, request: &ServiceRequest) -> DependencyResult<Option<Resolved>> {
        self.core.try_resolve_request(request)
    }

    fn is_registered(&self, request: &ServiceRequest) -> bool {
        self.core.is_registered(request)
    }

    fn resolve_generic_request(&self, request: &GenericRequest) -> DependencyResult<BoxedService> {
        self.core.resolve_generic_request(request)
    }

    fn plan_cache(&self) -> Arc<InjectionPlanCache> {
        self.core.plan_cache()
    }

    fn scope_name(&self) -> &str {
        self.core.scope_name()
    }
}

impl fmt::Debug for ScopedContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedContainer")
            .field("id", &self.core.id)
            .field("name", &self.core.name)
            .field("registrations", &self.core.registry.len())
            .field("disposed", &self.core.is_disposed())
            .finish()
    }
}
