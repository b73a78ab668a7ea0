//! # 依赖注入具体实现
//!
//! 提供注册表、作用域容器、实例提供者和循环依赖检测
//!
//! ```ignore
//! use di_impl::prelude::*;
//!
//! let mut builder = DiContainerBuilder::new();
//! builder
//!     .register::<Foo>(Lifetime::Singleton)
//!     .as_contract::<dyn IFoo>(|it| it);
//! let container = builder.build()?;
//! let foo = container.resolve::<dyn IFoo>()?;
//! ```

pub mod builder;
mod circular;
pub mod diagnostics;
pub mod providers;
pub mod registration;
pub mod registry;
pub mod scope;

pub use builder::DiContainerBuilder;
pub use diagnostics::{DiagnosticsCollector, ResolveRecord};
pub use registration::{caster, Caster, Registration, RegistrationBuilder, RegistrationId};
pub use registry::{CollectionRegistration, ContractKey, Registry, RegistryBuilder, RegistryEntry};
pub use scope::{ScopeCore, ScopedContainer};

/// 常用类型
pub mod prelude {
    pub use crate::{DiContainerBuilder, ScopedContainer};
    pub use di_abstractions::{
        ContainerConfig, Generic, GenericDefinition, GenericService, InjectParameter, Injectable,
        ObjectResolver, ResolverExt, ServiceList, TypeDescriptor,
    };
    pub use infrastructure_common::{
        DependencyError, DependencyResult, Disposable, Lifetime, ServiceName, TypeKey,
    };
    pub use std::sync::Arc;
}
