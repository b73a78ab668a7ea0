//! 宿主原生对象提供者
//!
//! 原生对象不能由容器直接构造，只能从宿主查找、由宿主新建或克隆模板

use di_abstractions::{
    AnyArc, InjectContext, InjectParameter, Injectable, InjectionPlanCache, InstanceProvider,
    ObjectResolver, ProviderKind, ReflectionInjector, SpawnedInstance,
};
use infrastructure_common::DependencyResult;
use std::sync::Arc;

type FindFn<T> = Arc<dyn Fn(&dyn ObjectResolver) -> DependencyResult<Arc<T>> + Send + Sync>;
type SpawnFn<T> = Arc<dyn Fn(&dyn ObjectResolver) -> DependencyResult<T> + Send + Sync>;
type CloneFn<T> = Arc<dyn Fn() -> T + Send + Sync>;

/// 原生对象来源
pub enum NativeSource<T> {
    /// 查找宿主中已存在的对象，不做成员注入
    FindExisting(FindFn<T>),
    /// 由宿主新建对象，随后做成员注入
    SpawnNew(SpawnFn<T>),
    /// 克隆模板对象，随后做成员注入
    CloneTemplate(CloneFn<T>),
}

impl<T: Send + Sync + 'static> NativeSource<T> {
    pub fn find_existing<F>(find: F) -> Self
    where
        F: Fn(&dyn ObjectResolver) -> DependencyResult<Arc<T>> + Send + Sync + 'static,
    {
        Self::FindExisting(Arc::new(find))
    }

    pub fn spawn_new<F>(spawn: F) -> Self
    where
        F: Fn(&dyn ObjectResolver) -> DependencyResult<T> + Send + Sync + 'static,
    {
        Self::SpawnNew(Arc::new(spawn))
    }

    pub fn clone_template(template: T) -> Self
    where
        T: Clone,
    {
        Self::CloneTemplate(Arc::new(move || template.clone()))
    }

    fn kind(&self) -> ProviderKind {
        match self {
            Self::FindExisting(_) => ProviderKind::NativeFindExisting,
            Self::SpawnNew(_) => ProviderKind::NativeSpawnNew,
            Self::CloneTemplate(_) => ProviderKind::NativeCloneTemplate,
        }
    }
}

/// 原生对象提供者
pub struct NativeObjectProvider<T> {
    source: NativeSource<T>,
    injector: ReflectionInjector<T>,
    parameters: Vec<InjectParameter>,
}

impl<T: Injectable> NativeObjectProvider<T> {
    pub fn new(
        source: NativeSource<T>,
        plan_cache: Arc<InjectionPlanCache>,
        parameters: Vec<InjectParameter>,
    ) -> Self {
        Self {
            source,
            injector: ReflectionInjector::new(plan_cache),
            parameters,
        }
    }

    fn finish(&self, mut object: T, resolver: &dyn ObjectResolver) -> DependencyResult<SpawnedInstance> {
        let ctx = InjectContext::new(resolver, &self.parameters);
        self.injector.inject(&mut object, &ctx)?;
        let instance: AnyArc = Arc::new(object);
        Ok(SpawnedInstance::new(instance).with_disposer(self.injector.disposer()?))
    }
}

impl<T: Injectable> InstanceProvider for NativeObjectProvider<T> {
    fn kind(&self) -> ProviderKind {
        self.source.kind()
    }

    fn spawn_instance(&self, resolver: &dyn ObjectResolver) -> DependencyResult<SpawnedInstance> {
        match &self.source {
            NativeSource::FindExisting(find) => {
                let existing: AnyArc = find(resolver)?;
                Ok(SpawnedInstance::new(existing))
            }
            NativeSource::SpawnNew(spawn) => {
                let object = spawn(resolver)?;
                self.finish(object, resolver)
            }
            NativeSource::CloneTemplate(clone) => self.finish(clone(), resolver),
        }
    }

    fn validate(&self) -> DependencyResult<()> {
        self.injector.plan().map(|_| ())
    }
}
