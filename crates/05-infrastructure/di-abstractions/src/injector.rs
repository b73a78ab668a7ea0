//! 注入器
//!
//! 按注入计划创建实例

use crate::descriptor::{DisposeFn, Injectable};
use crate::injection::InjectContext;
use crate::plan::{InjectTypeInfo, InjectionPlanCache};
use crate::resolver::AnyArc;
use infrastructure_common::{DependencyResult, TypeKey};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// 类型擦除后的释放调用
pub type Disposer = Arc<dyn Fn(&AnyArc) + Send + Sync>;

/// 新创建的实例及其释放方式
#[derive(Clone)]
pub struct SpawnedInstance {
    pub instance: AnyArc,
    pub disposer: Option<Disposer>,
}

impl SpawnedInstance {
    /// 不需要释放的实例
    pub fn new(instance: AnyArc) -> Self {
        Self {
            instance,
            disposer: None,
        }
    }

    pub fn with_disposer(mut self, disposer: Option<Disposer>) -> Self {
        self.disposer = disposer;
        self
    }

    /// 调用释放逻辑（如果有）
    pub fn dispose(&self) {
        if let Some(disposer) = &self.disposer {
            disposer(&self.instance);
        }
    }
}

impl fmt::Debug for SpawnedInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpawnedInstance")
            .field("disposable", &self.disposer.is_some())
            .finish()
    }
}

/// 将类型化的释放调用擦除为 [`Disposer`]
pub fn erase_disposer<T: Send + Sync + 'static>(dispose: DisposeFn<T>) -> Disposer {
    Arc::new(move |instance: &AnyArc| {
        if let Some(typed) = instance.downcast_ref::<T>() {
            dispose(typed);
        }
    })
}

/// 注入器 trait
pub trait Injector: Send + Sync {
    /// 实现类型
    fn implementation(&self) -> TypeKey;

    /// 创建实例并完成成员注入
    fn create_instance(&self, ctx: &InjectContext<'_>) -> DependencyResult<SpawnedInstance>;

    /// 检查实现类型能否生成有效的注入计划
    fn validate(&self) -> DependencyResult<()>;
}

/// 基于注入计划的注入器
pub struct ReflectionInjector<T> {
    plan_cache: Arc<InjectionPlanCache>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Injectable> ReflectionInjector<T> {
    pub fn new(plan_cache: Arc<InjectionPlanCache>) -> Self {
        Self {
            plan_cache,
            _marker: PhantomData,
        }
    }

    /// 创建类型擦除的注入器
    pub fn erased(plan_cache: Arc<InjectionPlanCache>) -> Arc<dyn Injector> {
        Arc::new(Self::new(plan_cache))
    }

    /// 获取注入计划
    pub fn plan(&self) -> DependencyResult<Arc<InjectTypeInfo<T>>> {
        self.plan_cache.get_or_analyze::<T>()
    }

    /// 只做成员注入，用于宿主已经创建好的对象
    pub fn inject(&self, instance: &mut T, ctx: &InjectContext<'_>) -> DependencyResult<()> {
        self.plan()?.inject_members(instance, ctx)
    }

    /// 释放调用，未标记为可释放时为 `None`
    pub fn disposer(&self) -> DependencyResult<Option<Disposer>> {
        Ok(self.plan()?.disposer().cloned().map(erase_disposer::<T>))
    }
}

impl<T: Injectable> Injector for ReflectionInjector<T> {
    fn implementation(&self) -> TypeKey {
        TypeKey::of::<T>()
    }

    fn create_instance(&self, ctx: &InjectContext<'_>) -> DependencyResult<SpawnedInstance> {
        let plan = self.plan()?;
        let instance: AnyArc = Arc::new(plan.create(ctx)?);
        let disposer = plan.disposer().cloned().map(erase_disposer::<T>);
        Ok(SpawnedInstance { instance, disposer })
    }

    fn validate(&self) -> DependencyResult<()> {
        self.plan().map(|_| ())
    }
}
