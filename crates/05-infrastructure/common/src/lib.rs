//! # Infrastructure Common
//!
//! 这个 crate 提供了依赖注入容器各层共享的基础类型。
//!
//! ## 核心类型
//!
//! - [`DependencyError`] - 依赖注入错误分类
//! - [`Lifetime`] - 组件生命周期
//! - [`Disposable`] - 可释放组件 trait
//! - [`TypeKey`] - 契约类型键
//! - [`ServiceName`] - 具名注册键

pub mod errors;
pub mod lifecycle;
pub mod metadata;

pub use errors::*;
pub use lifecycle::*;
pub use metadata::*;
