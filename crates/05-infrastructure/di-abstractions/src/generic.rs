//! 开放泛型支持
//!
//! 一个开放泛型定义（例如 `Repository<_>`）对应若干闭合类型，
//! 闭合类型通过 [`GenericService`] 报告自己所属的定义和类型参数

use crate::descriptor::Injectable;
use crate::injector::{Injector, ReflectionInjector};
use crate::plan::InjectionPlanCache;
use crate::resolver::{AnyArc, BoxedService};
use infrastructure_common::TypeKey;
use std::fmt;
use std::sync::Arc;

/// 开放泛型定义标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GenericDefinition(&'static str);

impl GenericDefinition {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for GenericDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<..>", self.0)
    }
}

/// 开放泛型的闭合类型
///
/// ```ignore
/// impl<T: Send + Sync + 'static> GenericService for Repository<T> {
///     fn definition() -> GenericDefinition {
///         GenericDefinition::new("Repository")
///     }
///
///     fn type_arguments() -> Vec<TypeKey> {
///         vec![TypeKey::of::<T>()]
///     }
/// }
/// ```
pub trait GenericService: Injectable {
    /// 所属的开放泛型定义
    fn definition() -> GenericDefinition;

    /// 闭合时使用的类型参数
    fn type_arguments() -> Vec<TypeKey>;
}

/// 开放泛型解析请求
#[derive(Clone)]
pub struct GenericRequest {
    definition: GenericDefinition,
    closed_type: TypeKey,
    arguments: Vec<TypeKey>,
    make_injector: fn(Arc<InjectionPlanCache>) -> Arc<dyn Injector>,
    cast: fn(&AnyArc) -> Option<BoxedService>,
}

impl GenericRequest {
    /// 以闭合类型创建请求
    pub fn of<C: GenericService>() -> Self {
        Self {
            definition: C::definition(),
            closed_type: TypeKey::of::<C>(),
            arguments: C::type_arguments(),
            make_injector: ReflectionInjector::<C>::erased,
            cast: cast_closed::<C>,
        }
    }

    pub fn definition(&self) -> GenericDefinition {
        self.definition
    }

    pub fn closed_type(&self) -> TypeKey {
        self.closed_type
    }

    pub fn arguments(&self) -> &[TypeKey] {
        &self.arguments
    }

    /// 为闭合类型创建注入器
    pub fn injector(&self, plan_cache: Arc<InjectionPlanCache>) -> Arc<dyn Injector> {
        (self.make_injector)(plan_cache)
    }

    /// 将闭合类型的实例转换为 `Arc<C>`
    pub fn cast(&self, instance: &AnyArc) -> Option<BoxedService> {
        (self.cast)(instance)
    }
}

fn cast_closed<C: Send + Sync + 'static>(instance: &AnyArc) -> Option<BoxedService> {
    instance
        .clone()
        .downcast::<C>()
        .ok()
        .map(|typed| Box::new(typed) as BoxedService)
}

impl fmt::Debug for GenericRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenericRequest")
            .field("definition", &self.definition)
            .field("closed_type", &self.closed_type)
            .field("arguments", &self.arguments)
            .finish()
    }
}
