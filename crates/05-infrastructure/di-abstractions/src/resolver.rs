//! 组件解析器抽象接口
//!
//! 提供按契约类型解析实例的能力

use crate::generic::{GenericRequest, GenericService};
use crate::injection::ServiceList;
use crate::plan::InjectionPlanCache;
use infrastructure_common::{DependencyError, DependencyResult, ServiceName, TypeKey};
use std::any::Any;
use std::sync::Arc;

/// 类型擦除后的实例，内部为 `Arc<实现类型>`
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// 已按契约类型转换的实例，内部总是 `Arc<契约类型>`
pub type BoxedService = Box<dyn Any + Send + Sync>;

/// 请求形态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestShape {
    /// 单个实例
    Single,
    /// 全部实现的序列
    Sequence,
    /// 全部实现的只读列表
    ReadOnlyList,
}

/// 解析请求
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceRequest {
    contract: TypeKey,
    shape: RequestShape,
    name: Option<ServiceName>,
}

impl ServiceRequest {
    /// 创建新的解析请求
    pub fn new(contract: TypeKey, shape: RequestShape, name: Option<ServiceName>) -> Self {
        Self {
            contract,
            shape,
            name,
        }
    }

    /// 单个实例请求
    pub fn single<T: ?Sized + 'static>() -> Self {
        Self::new(TypeKey::of::<T>(), RequestShape::Single, None)
    }

    /// 具名单个实例请求
    pub fn named<T: ?Sized + 'static>(name: impl Into<ServiceName>) -> Self {
        Self::new(TypeKey::of::<T>(), RequestShape::Single, Some(name.into()))
    }

    /// 序列请求
    pub fn sequence<T: ?Sized + 'static>() -> Self {
        Self::new(TypeKey::of::<T>(), RequestShape::Sequence, None)
    }

    /// 只读列表请求
    pub fn read_only_list<T: ?Sized + 'static>() -> Self {
        Self::new(TypeKey::of::<T>(), RequestShape::ReadOnlyList, None)
    }

    /// 契约类型
    pub fn contract(&self) -> TypeKey {
        self.contract
    }

    /// 请求形态
    pub fn shape(&self) -> RequestShape {
        self.shape
    }

    /// 注册键
    pub fn name(&self) -> Option<&ServiceName> {
        self.name.as_ref()
    }

    /// 是否为集合请求
    pub fn is_collection(&self) -> bool {
        !matches!(self.shape, RequestShape::Single)
    }

    /// 用于错误信息的描述
    pub fn describe(&self) -> String {
        let base = match self.shape {
            RequestShape::Single => self.contract.name().to_string(),
            RequestShape::Sequence => format!("Vec<Arc<{}>>", self.contract.name()),
            RequestShape::ReadOnlyList => format!("ServiceList<{}>", self.contract.name()),
        };
        match &self.name {
            Some(name) => format!("{} [key = {}]", base, name),
            None => base,
        }
    }
}

/// 解析结果
pub enum Resolved {
    /// 单个实例
    Single(BoxedService),
    /// 集合实例（按解析顺序）
    Many(Vec<BoxedService>),
}

/// 组件解析器 trait
///
/// 对象安全的解析入口，泛型便捷方法见 [`ResolverExt`]
pub trait ObjectResolver: Send + Sync {
    /// 解析请求，找不到注册时返回 `NotRegistered`
    fn resolve_request(&self, request: &ServiceRequest) -> DependencyResult<Resolved>;

    /// 尝试解析请求
    ///
    /// 仅在整条作用域链上都找不到注册时返回 `Ok(None)`，嵌套依赖的错误照常传播
    fn try_resolve_request(&self, request: &ServiceRequest) -> DependencyResult<Option<Resolved>>;

    /// 检查请求是否可以在作用域链上找到注册
    fn is_registered(&self, request: &ServiceRequest) -> bool;

    /// 解析开放泛型的闭合形式
    fn resolve_generic_request(&self, request: &GenericRequest) -> DependencyResult<BoxedService>;

    /// 注入计划缓存
    fn plan_cache(&self) -> Arc<InjectionPlanCache>;

    /// 当前作用域名称
    fn scope_name(&self) -> &str;
}

/// 泛型解析便捷方法
pub trait ResolverExt: ObjectResolver {
    /// 解析契约类型的单个实例
    fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> DependencyResult<Arc<T>> {
        let request = ServiceRequest::single::<T>();
        let resolved = self.resolve_request(&request)?;
        downcast_single::<T>(resolved, &request)
    }

    /// 按注册键解析契约类型的实例
    fn resolve_named<T: ?Sized + Send + Sync + 'static>(
        &self,
        name: impl Into<ServiceName>,
    ) -> DependencyResult<Arc<T>> {
        let request = ServiceRequest::named::<T>(name);
        let resolved = self.resolve_request(&request)?;
        downcast_single::<T>(resolved, &request)
    }

    /// 尝试解析，未注册时返回 `None`
    fn try_resolve<T: ?Sized + Send + Sync + 'static>(&self) -> DependencyResult<Option<Arc<T>>> {
        let request = ServiceRequest::single::<T>();
        match self.try_resolve_request(&request)? {
            Some(resolved) => downcast_single::<T>(resolved, &request).map(Some),
            None => Ok(None),
        }
    }

    /// 解析契约类型的全部实现
    fn resolve_all<T: ?Sized + Send + Sync + 'static>(&self) -> DependencyResult<Vec<Arc<T>>> {
        let request = ServiceRequest::sequence::<T>();
        let resolved = self.resolve_request(&request)?;
        downcast_many::<T>(resolved, &request)
    }

    /// 以只读列表形式解析契约类型的全部实现
    fn resolve_list<T: ?Sized + Send + Sync + 'static>(&self) -> DependencyResult<ServiceList<T>> {
        let request = ServiceRequest::read_only_list::<T>();
        let resolved = self.resolve_request(&request)?;
        downcast_many::<T>(resolved, &request).map(ServiceList::new)
    }

    /// 解析开放泛型注册的闭合形式
    fn resolve_generic<C: GenericService>(&self) -> DependencyResult<Arc<C>> {
        let request = GenericRequest::of::<C>();
        let service = self.resolve_generic_request(&request)?;
        downcast_service::<C>(service)
    }

    /// 检查契约类型是否已注册
    fn contains<T: ?Sized + 'static>(&self) -> bool {
        self.is_registered(&ServiceRequest::single::<T>())
    }
}

impl<R: ObjectResolver + ?Sized> ResolverExt for R {}

/// 将已转换的实例还原为 `Arc<T>`
pub fn downcast_service<T: ?Sized + Send + Sync + 'static>(
    service: BoxedService,
) -> DependencyResult<Arc<T>> {
    service
        .downcast::<Arc<T>>()
        .map(|boxed| *boxed)
        .map_err(|_| DependencyError::TypeMismatch {
            expected: std::any::type_name::<Arc<T>>().to_string(),
            actual: "未知的已转换实例".to_string(),
        })
}

fn downcast_single<T: ?Sized + Send + Sync + 'static>(
    resolved: Resolved,
    request: &ServiceRequest,
) -> DependencyResult<Arc<T>> {
    match resolved {
        Resolved::Single(service) => downcast_service::<T>(service),
        Resolved::Many(_) => Err(DependencyError::TypeMismatch {
            expected: request.describe(),
            actual: "集合实例".to_string(),
        }),
    }
}

fn downcast_many<T: ?Sized + Send + Sync + 'static>(
    resolved: Resolved,
    request: &ServiceRequest,
) -> DependencyResult<Vec<Arc<T>>> {
    match resolved {
        Resolved::Many(services) => services.into_iter().map(downcast_service::<T>).collect(),
        Resolved::Single(_) => Err(DependencyError::TypeMismatch {
            expected: request.describe(),
            actual: "单个实例".to_string(),
        }),
    }
}
