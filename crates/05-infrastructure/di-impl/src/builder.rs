//! 容器构建器
//!
//! 构建阶段收集注册声明，`build` 时冻结为只读注册表并创建根作用域

use crate::diagnostics::DiagnosticsCollector;
use crate::providers::{
    ConstructProvider, ExistingInstanceProvider, FactoryProvider, NativeObjectProvider,
    NativeSource, OpenGenericProvider,
};
use crate::registration::{PendingRegistration, RegistrationBuilder};
use crate::registry::{Registry, RegistryBuilder};
use crate::scope::{ScopeCore, ScopedContainer};
use di_abstractions::{
    AnyArc, ContainerConfig, GenericDefinition, InjectParameter, Injectable, InjectionPlanCache,
    InstanceProvider, ObjectResolver, ReflectionInjector,
};
use infrastructure_common::{DependencyResult, Lifetime, TypeKey};
use std::sync::Arc;
use tracing::{info, warn};

type BuildCallback = Box<dyn FnOnce(&ScopedContainer) -> DependencyResult<()> + Send>;

struct PendingOpenGeneric {
    definition: GenericDefinition,
    lifetime: Lifetime,
    parameters: Vec<InjectParameter>,
}

/// 依赖注入容器构建器
pub struct DiContainerBuilder {
    name: String,
    pending: Vec<PendingRegistration>,
    open_generics: Vec<PendingOpenGeneric>,
    build_callbacks: Vec<BuildCallback>,
    config: ContainerConfig,
    plan_cache: Option<Arc<InjectionPlanCache>>,
}

impl DiContainerBuilder {
    /// 创建根作用域构建器
    pub fn new() -> Self {
        Self::named("root")
    }

    /// 创建具名作用域构建器
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pending: Vec::new(),
            open_generics: Vec::new(),
            build_callbacks: Vec::new(),
            config: ContainerConfig::default(),
            plan_cache: None,
        }
    }

    /// 设置容器配置
    pub fn with_config(mut self, config: ContainerConfig) -> Self {
        self.config = config;
        self
    }

    /// 使用独立的注入计划缓存（默认使用进程级缓存）
    pub fn with_plan_cache(mut self, plan_cache: Arc<InjectionPlanCache>) -> Self {
        self.plan_cache = Some(plan_cache);
        self
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ContainerConfig {
        &mut self.config
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 注册按注入计划构造的组件
    pub fn register<I: Injectable>(&mut self, lifetime: Lifetime) -> RegistrationBuilder<'_, I> {
        self.push(PendingRegistration::new::<I, _>(
            lifetime,
            |plan_cache, parameters| -> Arc<dyn InstanceProvider> {
                Arc::new(ConstructProvider::new(
                    ReflectionInjector::<I>::erased(plan_cache),
                    parameters,
                ))
            },
        ))
    }

    /// 注册已有实例（单例）
    pub fn register_instance<I: Send + Sync + 'static>(
        &mut self,
        instance: Arc<I>,
    ) -> RegistrationBuilder<'_, I> {
        let instance: AnyArc = instance;
        self.push(PendingRegistration::new::<I, _>(
            Lifetime::Singleton,
            move |_, _| -> Arc<dyn InstanceProvider> {
                Arc::new(ExistingInstanceProvider::new(instance))
            },
        ))
    }

    /// 注册工厂函数
    pub fn register_factory<I, F>(&mut self, lifetime: Lifetime, factory: F) -> RegistrationBuilder<'_, I>
    where
        I: Send + Sync + 'static,
        F: Fn(&dyn ObjectResolver) -> DependencyResult<I> + Send + Sync + 'static,
    {
        self.push(PendingRegistration::new::<I, _>(
            lifetime,
            move |_, _| -> Arc<dyn InstanceProvider> { Arc::new(FactoryProvider::new(factory)) },
        ))
    }

    /// 注册开放泛型定义，闭合类型通过 `resolve_generic` 或 `Generic<C>` 请求
    pub fn register_open_generic(
        &mut self,
        definition: GenericDefinition,
        lifetime: Lifetime,
    ) -> &mut Self {
        self.register_open_generic_with(definition, lifetime, Vec::new())
    }

    /// 注册开放泛型定义并附加自定义参数
    pub fn register_open_generic_with(
        &mut self,
        definition: GenericDefinition,
        lifetime: Lifetime,
        parameters: Vec<InjectParameter>,
    ) -> &mut Self {
        self.open_generics.push(PendingOpenGeneric {
            definition,
            lifetime,
            parameters,
        });
        self
    }

    /// 注册宿主中已存在的原生对象
    pub fn register_native_existing<I, F>(&mut self, lifetime: Lifetime, find: F) -> RegistrationBuilder<'_, I>
    where
        I: Injectable,
        F: Fn(&dyn ObjectResolver) -> DependencyResult<Arc<I>> + Send + Sync + 'static,
    {
        self.push_native(lifetime, NativeSource::find_existing(find))
    }

    /// 注册由宿主新建的原生对象，创建后做成员注入
    pub fn register_native_spawn<I, F>(&mut self, lifetime: Lifetime, spawn: F) -> RegistrationBuilder<'_, I>
    where
        I: Injectable,
        F: Fn(&dyn ObjectResolver) -> DependencyResult<I> + Send + Sync + 'static,
    {
        self.push_native(lifetime, NativeSource::spawn_new(spawn))
    }

    /// 注册从模板克隆的原生对象，克隆后做成员注入
    pub fn register_native_template<I>(&mut self, lifetime: Lifetime, template: I) -> RegistrationBuilder<'_, I>
    where
        I: Injectable + Clone,
    {
        self.push_native(lifetime, NativeSource::clone_template(template))
    }

    /// 构建完成后以根解析器调用
    pub fn register_build_callback<F>(&mut self, callback: F) -> &mut Self
    where
        F: FnOnce(&ScopedContainer) -> DependencyResult<()> + Send + 'static,
    {
        self.build_callbacks.push(Box::new(callback));
        self
    }

    /// 已声明的注册数量（不含开放泛型）
    pub fn registration_count(&self) -> usize {
        self.pending.len()
    }

    /// 是否已声明可按 `T` 解析的注册
    pub fn is_registered<T: ?Sized + 'static>(&self) -> bool {
        let contract = TypeKey::of::<T>();
        self.pending.iter().any(|pending| pending.exposes(contract))
    }

    /// 构建根作用域
    pub fn build(self) -> DependencyResult<ScopedContainer> {
        self.build_scope(None)
    }

    pub(crate) fn build_child(self, parent: &ScopedContainer) -> DependencyResult<ScopedContainer> {
        self.build_scope(Some(parent))
    }

    fn build_scope(self, parent: Option<&ScopedContainer>) -> DependencyResult<ScopedContainer> {
        let Self {
            name,
            pending,
            open_generics,
            build_callbacks,
            config,
            plan_cache,
        } = self;
        let plan_cache = plan_cache.unwrap_or_else(InjectionPlanCache::global);

        let mut registry = RegistryBuilder::new();
        for registration in pending {
            registry.add(Arc::new(registration.finalize(&plan_cache)))?;
        }
        for open in open_generics {
            registry.add_open_generic(Arc::new(OpenGenericProvider::new(
                open.definition,
                open.lifetime,
                open.parameters,
            )));
        }
        let registry = registry.build();

        if config.validate_on_build {
            validate(&registry)?;
        }

        let registration_count = registry.len();
        let open_generic_count = registry.open_generic_count();
        let diagnostics = Arc::new(DiagnosticsCollector::new(config.enable_diagnostics));
        let core = ScopeCore::new(
            name,
            registry,
            parent.map(ScopedContainer::core),
            Arc::new(config),
            plan_cache,
            diagnostics,
        );
        let container = ScopedContainer::from_core(core);

        info!(
            "容器构建完成: {} ({} 个注册, {} 个开放泛型)",
            container.name(),
            registration_count,
            open_generic_count
        );

        for callback in build_callbacks {
            callback(&container)?;
        }
        Ok(container)
    }

    fn push<I: Send + Sync + 'static>(&mut self, pending: PendingRegistration) -> RegistrationBuilder<'_, I> {
        self.pending.push(pending);
        let index = self.pending.len() - 1;
        RegistrationBuilder::new(&mut self.pending[index])
    }

    fn push_native<I: Injectable>(&mut self, lifetime: Lifetime, source: NativeSource<I>) -> RegistrationBuilder<'_, I> {
        self.push(PendingRegistration::new::<I, _>(
            lifetime,
            move |plan_cache, parameters| -> Arc<dyn InstanceProvider> {
                Arc::new(NativeObjectProvider::new(source, plan_cache, parameters))
            },
        ))
    }
}

impl Default for DiContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn validate(registry: &Registry) -> DependencyResult<()> {
    for registration in registry.registrations() {
        if let Err(error) = registration.provider().validate() {
            warn!("注册校验失败: {}: {}", registration.describe(), error);
            return Err(error);
        }
    }
    Ok(())
}
