//! # 基础设施组合层
//!
//! 把依赖注入容器接入宿主：生命周期作用域、入口点调度、帧回调和日志/配置引导。
//!
//! ## 主要功能
//!
//! - **生命周期作用域**: 由安装器组装，启动时调度入口点，停止时释放
//! - **入口点**: Initialize / Start / AsyncStart / Tick 等阶段回调
//! - **帧回调调度**: 通过 [`TickScheduler`] 接入宿主的帧循环
//! - **配置与日志**: TOML 文件加 `DI_` 环境变量，按需初始化 tracing
//!
//! ## 基本使用
//!
//! ```rust,no_run
//! use infrastructure_composition::LifetimeScope;
//! use infrastructure_common::Lifetime;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let scope = LifetimeScope::builder()
//!         .named("game")
//!         .install("core", |builder| {
//!             builder.register_instance(std::sync::Arc::new(42_u32));
//!             Ok(())
//!         })
//!         .build()?;
//!
//!     scope.start().await?;
//!     let answer = scope.resolve::<u32>()?;
//!     println!("answer = {}", answer);
//!     scope.stop().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod dispatcher;
pub mod entry_points;
pub mod exception;
pub mod installer;
pub mod lifetime_scope;
pub mod logging;
pub mod scheduler;
pub mod settings;

// 重新导出主要类型
pub use builder::LifetimeScopeBuilder;
pub use dispatcher::EntryPointDispatcher;
pub use entry_points::{
    AsyncStartable, EntryPointKind, EntryPointRegistrationExt, Initializable, LateTickable,
    PostInitializable, PostStartable, Startable, Tickable,
};
pub use exception::EntryPointExceptionHandler;
pub use installer::{FnInstaller, Installer};
pub use lifetime_scope::{LifetimeScope, ScopeMetrics, ScopeStatus};
pub use logging::LoggingConfig;
pub use scheduler::{ManualTickScheduler, TickDriver, TickScheduler};
pub use settings::{LoggingSettings, ScopeSettings};

// 重新导出错误类型
pub use infrastructure_common::InfrastructureError;
