//! 依赖声明
//!
//! [`Dependency`] 描述一个构造参数或注入成员如何从解析器获得值

use crate::descriptor::{ParameterInfo, ParameterKind};
use crate::generic::GenericService;
use crate::resolver::{ObjectResolver, ResolverExt};
use infrastructure_common::{DependencyResult, TypeKey};
use std::any::Any;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// 注册时附加的自定义参数
///
/// 按参数类型匹配，优先于容器解析
#[derive(Clone)]
pub struct InjectParameter {
    parameter_type: TypeKey,
    value: Arc<dyn Any + Send + Sync>,
}

impl InjectParameter {
    /// 以参数值创建，`D` 必须与构造参数的类型完全一致
    pub fn new<D: Dependency>(value: D) -> Self {
        Self {
            parameter_type: TypeKey::of::<D>(),
            value: Arc::new(value),
        }
    }

    pub fn parameter_type(&self) -> TypeKey {
        self.parameter_type
    }

    fn value<D: Dependency>(&self) -> Option<D> {
        if self.parameter_type != TypeKey::of::<D>() {
            return None;
        }
        self.value.downcast_ref::<D>().cloned()
    }
}

impl fmt::Debug for InjectParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectParameter")
            .field("parameter_type", &self.parameter_type)
            .finish()
    }
}

/// 注入上下文
///
/// 构造一个实例期间使用的解析器和自定义参数
#[derive(Clone, Copy)]
pub struct InjectContext<'a> {
    resolver: &'a dyn ObjectResolver,
    parameters: &'a [InjectParameter],
}

impl<'a> InjectContext<'a> {
    pub fn new(resolver: &'a dyn ObjectResolver, parameters: &'a [InjectParameter]) -> Self {
        Self {
            resolver,
            parameters,
        }
    }

    /// 不带自定义参数的上下文
    pub fn without_parameters(resolver: &'a dyn ObjectResolver) -> Self {
        Self::new(resolver, &[])
    }

    /// 发起解析的作用域
    pub fn resolver(&self) -> &'a dyn ObjectResolver {
        self.resolver
    }

    /// 查找类型匹配的自定义参数
    pub fn parameter<D: Dependency>(&self) -> Option<D> {
        self.parameters.iter().find_map(InjectParameter::value::<D>)
    }
}

/// 可注入的依赖类型
pub trait Dependency: Clone + Send + Sync + 'static {
    /// 参数元数据
    fn parameter_info() -> ParameterInfo;

    /// 从上下文中获取依赖值
    fn resolve(ctx: &InjectContext<'_>) -> DependencyResult<Self>;
}

impl<T: ?Sized + Send + Sync + 'static> Dependency for Arc<T> {
    fn parameter_info() -> ParameterInfo {
        ParameterInfo::new::<Self>(TypeKey::of::<T>(), ParameterKind::Required)
    }

    fn resolve(ctx: &InjectContext<'_>) -> DependencyResult<Self> {
        if let Some(value) = ctx.parameter::<Self>() {
            return Ok(value);
        }
        ctx.resolver().resolve::<T>()
    }
}

impl<T: ?Sized + Send + Sync + 'static> Dependency for Option<Arc<T>> {
    fn parameter_info() -> ParameterInfo {
        ParameterInfo::new::<Self>(TypeKey::of::<T>(), ParameterKind::Optional)
    }

    fn resolve(ctx: &InjectContext<'_>) -> DependencyResult<Self> {
        if let Some(value) = ctx.parameter::<Self>() {
            return Ok(value);
        }
        ctx.resolver().try_resolve::<T>()
    }
}

impl<T: ?Sized + Send + Sync + 'static> Dependency for Vec<Arc<T>> {
    fn parameter_info() -> ParameterInfo {
        ParameterInfo::new::<Self>(TypeKey::of::<T>(), ParameterKind::Sequence)
    }

    fn resolve(ctx: &InjectContext<'_>) -> DependencyResult<Self> {
        if let Some(value) = ctx.parameter::<Self>() {
            return Ok(value);
        }
        ctx.resolver().resolve_all::<T>()
    }
}

/// 只读服务列表
pub struct ServiceList<T: ?Sized>(Arc<[Arc<T>]>);

impl<T: ?Sized> ServiceList<T> {
    pub fn new(items: Vec<Arc<T>>) -> Self {
        Self(items.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_vec(&self) -> Vec<Arc<T>> {
        self.0.to_vec()
    }
}

impl<T: ?Sized> Clone for ServiceList<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: ?Sized> Deref for ServiceList<T> {
    type Target = [Arc<T>];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: ?Sized> fmt::Debug for ServiceList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceList").field("len", &self.0.len()).finish()
    }
}

impl<T: ?Sized + Send + Sync + 'static> Dependency for ServiceList<T> {
    fn parameter_info() -> ParameterInfo {
        ParameterInfo::new::<Self>(TypeKey::of::<T>(), ParameterKind::ReadOnlyList)
    }

    fn resolve(ctx: &InjectContext<'_>) -> DependencyResult<Self> {
        if let Some(value) = ctx.parameter::<Self>() {
            return Ok(value);
        }
        ctx.resolver().resolve_list::<T>()
    }
}

/// 开放泛型注册的闭合形式
pub struct Generic<C>(Arc<C>);

impl<C> Generic<C> {
    pub fn new(inner: Arc<C>) -> Self {
        Self(inner)
    }

    pub fn into_inner(self) -> Arc<C> {
        self.0
    }
}

impl<C> Clone for Generic<C> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<C> Deref for Generic<C> {
    type Target = C;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<C: GenericService> Dependency for Generic<C> {
    fn parameter_info() -> ParameterInfo {
        ParameterInfo::new::<Self>(TypeKey::of::<C>(), ParameterKind::Generic)
    }

    fn resolve(ctx: &InjectContext<'_>) -> DependencyResult<Self> {
        if let Some(value) = ctx.parameter::<Self>() {
            return Ok(value);
        }
        ctx.resolver().resolve_generic::<C>().map(Generic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_matches_exact_type_only() {
        let parameters = vec![
            InjectParameter::new(Arc::new(42u32)),
            InjectParameter::new(Arc::new(String::from("config"))),
        ];

        let first = parameters[1].value::<Arc<String>>();
        assert_eq!(first.as_deref().map(String::as_str), Some("config"));
        assert!(parameters[0].value::<Arc<String>>().is_none());
        assert!(parameters[0].value::<Option<Arc<u32>>>().is_none());
    }

    #[test]
    fn test_service_list_derefs_to_slice() {
        let list = ServiceList::new(vec![Arc::new(1u8), Arc::new(2u8)]);
        let copy = list.clone();

        assert_eq!(copy.len(), 2);
        assert_eq!(*copy[1], 2);
        assert!(Arc::ptr_eq(&list[0], &copy[0]));
    }

    #[test]
    fn test_parameter_info_kinds() {
        assert_eq!(
            <Option<Arc<u8>> as Dependency>::parameter_info().kind(),
            ParameterKind::Optional
        );
        assert_eq!(
            <Vec<Arc<u8>> as Dependency>::parameter_info().kind(),
            ParameterKind::Sequence
        );
        assert_eq!(
            <ServiceList<u8> as Dependency>::parameter_info().contract(),
            TypeKey::of::<u8>()
        );
    }
}
