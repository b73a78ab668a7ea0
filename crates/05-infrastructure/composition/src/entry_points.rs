//! 入口点
//!
//! 组件通过实现这些 trait 并在注册时声明对应契约，参与作用域的启动和帧回调。
//! 调用顺序：Initialize -> PostInitialize -> Start -> PostStart -> AsyncStart，
//! 之后每帧 Tick -> LateTick

use async_trait::async_trait;
use di_impl::RegistrationBuilder;
use infrastructure_common::LifecycleResult;
use std::sync::Arc;

/// 作用域构建后立即调用
pub trait Initializable: Send + Sync {
    fn initialize(&self) -> LifecycleResult<()>;
}

/// 全部 [`Initializable`] 调用完成后调用
pub trait PostInitializable: Send + Sync {
    fn post_initialize(&self) -> LifecycleResult<()>;
}

/// 启动阶段调用
pub trait Startable: Send + Sync {
    fn start(&self) -> LifecycleResult<()>;
}

/// 全部 [`Startable`] 调用完成后调用
pub trait PostStartable: Send + Sync {
    fn post_start(&self) -> LifecycleResult<()>;
}

/// 异步启动，在同步启动阶段之后并发执行
#[async_trait]
pub trait AsyncStartable: Send + Sync {
    async fn start_async(&self) -> LifecycleResult<()>;
}

/// 每帧调用
pub trait Tickable: Send + Sync {
    fn tick(&self) -> LifecycleResult<()>;
}

/// 每帧在全部 [`Tickable`] 之后调用
pub trait LateTickable: Send + Sync {
    fn late_tick(&self) -> LifecycleResult<()>;
}

/// 入口点种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryPointKind {
    Initialize,
    PostInitialize,
    Start,
    PostStart,
    AsyncStart,
    Tick,
    LateTick,
}

impl EntryPointKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::PostInitialize => "post_initialize",
            Self::Start => "start",
            Self::PostStart => "post_start",
            Self::AsyncStart => "start_async",
            Self::Tick => "tick",
            Self::LateTick => "late_tick",
        }
    }

    /// 启动阶段的失败会中止启动
    pub fn is_startup(self) -> bool {
        !matches!(self, Self::Tick | Self::LateTick)
    }
}

impl std::fmt::Display for EntryPointKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 在注册时声明入口点契约
///
/// ```ignore
/// builder
///     .register::<GameLoop>(Lifetime::Singleton)
///     .as_self()
///     .as_startable()
///     .as_tickable();
/// ```
pub trait EntryPointRegistrationExt<I>: Sized {
    fn as_initializable(self) -> Self
    where
        I: Initializable;

    fn as_post_initializable(self) -> Self
    where
        I: PostInitializable;

    fn as_startable(self) -> Self
    where
        I: Startable;

    fn as_post_startable(self) -> Self
    where
        I: PostStartable;

    fn as_async_startable(self) -> Self
    where
        I: AsyncStartable;

    fn as_tickable(self) -> Self
    where
        I: Tickable;

    fn as_late_tickable(self) -> Self
    where
        I: LateTickable;
}

macro_rules! entry_point_contract {
    ($($method:ident => $contract:ident),* $(,)?) => {
        $(
            fn $method(self) -> Self
            where
                I: $contract,
            {
                self.as_contract::<dyn $contract>(|it: Arc<I>| -> Arc<dyn $contract> { it })
            }
        )*
    };
}

impl<'b, I: Send + Sync + 'static> EntryPointRegistrationExt<I> for RegistrationBuilder<'b, I> {
    entry_point_contract! {
        as_initializable => Initializable,
        as_post_initializable => PostInitializable,
        as_startable => Startable,
        as_post_startable => PostStartable,
        as_async_startable => AsyncStartable,
        as_tickable => Tickable,
        as_late_tickable => LateTickable,
    }
}
