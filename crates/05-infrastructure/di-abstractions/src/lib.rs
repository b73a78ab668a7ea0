//! # Dependency Injection Abstractions
//!
//! 依赖注入抽象层，定义依赖解析和注入元数据的核心接口。
//!
//! ## 核心接口
//!
//! - [`ObjectResolver`] / [`ResolverExt`] - 依赖解析器接口
//! - [`Injectable`] / [`TypeDescriptor`] - 组件注入声明
//! - [`Dependency`] - 可注入的参数类型
//! - [`InjectTypeInfo`] / [`InjectionPlanCache`] - 注入计划及其缓存
//! - [`Injector`] - 按计划创建实例
//! - [`InstanceProvider`] - 实例提供者接口
//! - [`GenericService`] - 开放泛型的闭合类型

pub mod container;
pub mod descriptor;
pub mod generic;
pub mod injection;
pub mod injector;
pub mod plan;
pub mod provider;
pub mod resolver;

pub use container::*;
pub use descriptor::*;
pub use generic::*;
pub use injection::*;
pub use injector::*;
pub use plan::*;
pub use provider::*;
pub use resolver::*;

// 派生宏生成的代码只引用本 crate
pub use infrastructure_common::{
    DependencyError, DependencyResult, Disposable, Lifetime, ServiceName, TypeKey,
};
