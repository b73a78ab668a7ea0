//! 入口点调度
//!
//! 只调度作用域自身注册的入口点，父作用域的入口点由父作用域负责

use crate::entry_points::{
    AsyncStartable, EntryPointKind, Initializable, LateTickable, PostInitializable,
    PostStartable, Startable, Tickable,
};
use crate::exception::EntryPointExceptionHandler;
use crate::scheduler::TickScheduler;
use di_impl::ScopedContainer;
use infrastructure_common::{LifecycleError, LifecycleResult};
use std::sync::Arc;
use tracing::{debug, error, info};

/// 入口点调度器
pub struct EntryPointDispatcher {
    container: ScopedContainer,
    scheduler: Option<Arc<dyn TickScheduler>>,
    handler: Option<EntryPointExceptionHandler>,
}

impl EntryPointDispatcher {
    pub fn new(container: ScopedContainer) -> Self {
        Self {
            container,
            scheduler: None,
            handler: None,
        }
    }

    pub fn with_scheduler(mut self, scheduler: Option<Arc<dyn TickScheduler>>) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn with_exception_handler(mut self, handler: Option<EntryPointExceptionHandler>) -> Self {
        self.handler = handler;
        self
    }

    /// 同步阶段：初始化、启动，并向调度器登记帧回调
    pub fn dispatch(&self) -> LifecycleResult<()> {
        let scope = self.container.name().to_string();
        info!("调度入口点: {}", scope);

        let initializables = self.local::<dyn Initializable>()?;
        self.run_all(EntryPointKind::Initialize, &initializables, |it| it.initialize())?;

        let post_initializables = self.local::<dyn PostInitializable>()?;
        self.run_all(EntryPointKind::PostInitialize, &post_initializables, |it| {
            it.post_initialize()
        })?;

        let startables = self.local::<dyn Startable>()?;
        self.run_all(EntryPointKind::Start, &startables, |it| it.start())?;

        let post_startables = self.local::<dyn PostStartable>()?;
        self.run_all(EntryPointKind::PostStart, &post_startables, |it| it.post_start())?;

        self.schedule_ticks()
    }

    /// 异步阶段：并发执行全部 [`AsyncStartable`]，等待它们结束
    pub async fn dispatch_async(&self) -> LifecycleResult<()> {
        let startables = self.local::<dyn AsyncStartable>()?;
        if startables.is_empty() {
            return Ok(());
        }
        debug!("并发执行 {} 个异步启动入口点", startables.len());

        let handles: Vec<_> = startables
            .into_iter()
            .map(|startable| tokio::spawn(async move { startable.start_async().await }))
            .collect();

        let mut first_failure = None;
        for handle in handles {
            let result = handle.await.unwrap_or_else(|join_error| {
                Err(LifecycleError::entry_point_failed(
                    EntryPointKind::AsyncStart.as_str(),
                    join_error.to_string(),
                ))
            });
            if let Err(error) = self.report(EntryPointKind::AsyncStart, result) {
                first_failure.get_or_insert(error);
            }
        }

        match first_failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn schedule_ticks(&self) -> LifecycleResult<()> {
        let tickables = self.local::<dyn Tickable>()?;
        let late_tickables = self.local::<dyn LateTickable>()?;
        if tickables.is_empty() && late_tickables.is_empty() {
            return Ok(());
        }

        let Some(scheduler) = &self.scheduler else {
            return Err(LifecycleError::LifecycleManagementFailed {
                message: format!(
                    "作用域 {} 注册了帧回调入口点，但没有提供 TickScheduler",
                    self.container.name()
                ),
            });
        };

        if let Some(handler) = &self.handler {
            scheduler.set_exception_handler(handler.clone());
        }
        for tickable in tickables {
            scheduler.schedule_tick(tickable);
        }
        for late_tickable in late_tickables {
            scheduler.schedule_late_tick(late_tickable);
        }
        Ok(())
    }

    fn local<T: ?Sized + Send + Sync + 'static>(&self) -> LifecycleResult<Vec<Arc<T>>> {
        self.container.resolve_local::<T>().map_err(|e| {
            LifecycleError::entry_point_failed(std::any::type_name::<T>(), e.to_string())
        })
    }

    fn run_all<T: ?Sized>(
        &self,
        kind: EntryPointKind,
        entries: &[Arc<T>],
        call: impl Fn(&T) -> LifecycleResult<()>,
    ) -> LifecycleResult<()> {
        for entry in entries {
            self.report(kind, call(&**entry))?;
        }
        Ok(())
    }

    /// 有处理器时交给处理器并继续，否则记录日志并返回错误
    fn report(&self, kind: EntryPointKind, result: LifecycleResult<()>) -> LifecycleResult<()> {
        let Err(error) = result else {
            return Ok(());
        };
        match &self.handler {
            Some(handler) => {
                handler.handle(kind, &error);
                Ok(())
            }
            None => {
                error!("入口点 {} 执行失败: {}", kind, error);
                Err(error)
            }
        }
    }
}
