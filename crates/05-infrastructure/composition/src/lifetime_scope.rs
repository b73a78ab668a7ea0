//! 生命周期作用域

use crate::builder::LifetimeScopeBuilder;
use crate::dispatcher::EntryPointDispatcher;
use crate::exception::EntryPointExceptionHandler;
use crate::installer::Installer;
use crate::scheduler::{ManualTickScheduler, TickDriver, TickScheduler};
use di_abstractions::{ContainerStats, ResolverExt};
use di_impl::ScopedContainer;
use infrastructure_common::{InfrastructureError, InfrastructureResult};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// 生命周期作用域
///
/// 包装一个作用域容器，负责调度入口点、驱动帧回调和释放
pub struct LifetimeScope {
    container: ScopedContainer,
    scheduler: Option<Arc<dyn TickScheduler>>,
    exception_handler: Option<EntryPointExceptionHandler>,
    driven: Option<(Arc<ManualTickScheduler>, Duration)>,
    driver: Mutex<Option<TickDriver>>,
    status: RwLock<ScopeStatus>,
    metrics: RwLock<ScopeMetrics>,
}

impl LifetimeScope {
    /// 创建生命周期作用域构建器
    pub fn builder() -> LifetimeScopeBuilder {
        LifetimeScopeBuilder::new()
    }

    pub(crate) fn new(
        container: ScopedContainer,
        scheduler: Option<Arc<dyn TickScheduler>>,
        exception_handler: Option<EntryPointExceptionHandler>,
        driven: Option<(Arc<ManualTickScheduler>, Duration)>,
    ) -> Self {
        Self {
            container,
            scheduler,
            exception_handler,
            driven,
            driver: Mutex::new(None),
            status: RwLock::new(ScopeStatus::Built),
            metrics: RwLock::new(ScopeMetrics::default()),
        }
    }

    pub fn name(&self) -> &str {
        self.container.name()
    }

    /// 作用域容器
    pub fn container(&self) -> &ScopedContainer {
        &self.container
    }

    /// 解析组件
    pub fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> InfrastructureResult<Arc<T>> {
        self.container
            .resolve::<T>()
            .map_err(|source| InfrastructureError::DependencyError { source })
    }

    /// 内置调度器（配置了帧间隔时存在）
    pub fn tick_scheduler(&self) -> Option<&Arc<ManualTickScheduler>> {
        self.driven.as_ref().map(|(scheduler, _)| scheduler)
    }

    /// 启动：调度同步入口点，等待异步入口点，然后启动帧驱动
    pub async fn start(&self) -> InfrastructureResult<()> {
        {
            let mut status = self.status.write();
            if *status != ScopeStatus::Built {
                return Err(InfrastructureError::BootstrapFailed {
                    message: format!("作用域 {} 当前状态为 {:?}，不能启动", self.name(), *status),
                });
            }
            *status = ScopeStatus::Starting;
        }
        info!("启动生命周期作用域: {}", self.name());

        let dispatcher = EntryPointDispatcher::new(self.container.clone())
            .with_scheduler(self.scheduler.clone())
            .with_exception_handler(self.exception_handler.clone());

        let dispatched = match dispatcher.dispatch() {
            Ok(()) => dispatcher.dispatch_async().await,
            Err(error) => Err(error),
        };
        if let Err(error) = dispatched {
            error!("生命周期作用域启动失败: {}: {}", self.name(), error);
            *self.status.write() = ScopeStatus::Failed;
            return Err(error.into());
        }

        if let Some((scheduler, period)) = &self.driven {
            *self.driver.lock() = Some(scheduler.spawn_driver(*period));
        }

        *self.status.write() = ScopeStatus::Running;
        self.metrics.write().start_time = Some(chrono::Utc::now());
        info!("生命周期作用域启动完成: {}", self.name());
        Ok(())
    }

    /// 停止帧驱动并释放作用域
    pub async fn stop(&self) -> InfrastructureResult<()> {
        if self.status() == ScopeStatus::Stopped {
            warn!("生命周期作用域 {} 已经停止", self.name());
            return Ok(());
        }
        info!("停止生命周期作用域: {}", self.name());
        *self.status.write() = ScopeStatus::Stopping;

        let driver = self.driver.lock().take();
        if let Some(driver) = driver {
            driver.stop().await;
        }
        self.container.dispose();

        *self.status.write() = ScopeStatus::Stopped;
        self.metrics.write().stop_time = Some(chrono::Utc::now());
        info!("生命周期作用域停止完成: {}", self.name());
        Ok(())
    }

    /// 创建子作用域，安装器只作用于子作用域
    ///
    /// 子作用域共享父作用域的调度器和异常处理器，需要单独调用 [`LifetimeScope::start`]
    pub fn create_child(
        &self,
        name: impl Into<String>,
        installers: Vec<Box<dyn Installer>>,
    ) -> InfrastructureResult<LifetimeScope> {
        let child = self.container.try_create_named_scope(name, |builder| {
            installers
                .iter()
                .try_for_each(|installer| installer.install(builder))
        })?;

        info!("创建子生命周期作用域: {} ({} 个安装器)", child.name(), installers.len());
        Ok(LifetimeScope::new(
            child,
            self.scheduler.clone(),
            self.exception_handler.clone(),
            None,
        ))
    }

    pub fn status(&self) -> ScopeStatus {
        *self.status.read()
    }

    /// 运行统计
    pub fn metrics(&self) -> ScopeMetrics {
        let mut metrics = self.metrics.read().clone();
        metrics.container = self.container.stats();
        metrics
    }
}

/// 生命周期作用域状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScopeStatus {
    /// 已构建，尚未启动
    Built,
    /// 启动中
    Starting,
    /// 运行中
    Running,
    /// 停止中
    Stopping,
    /// 已停止
    Stopped,
    /// 启动失败
    Failed,
}

/// 生命周期作用域统计信息
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScopeMetrics {
    /// 启动时间
    pub start_time: Option<chrono::DateTime<chrono::Utc>>,
    /// 停止时间
    pub stop_time: Option<chrono::DateTime<chrono::Utc>>,
    /// 容器统计
    pub container: ContainerStats,
}

impl ScopeMetrics {
    /// 计算运行时间
    pub fn uptime(&self) -> Option<chrono::Duration> {
        match (self.start_time, self.stop_time) {
            (Some(start), Some(stop)) => Some(stop - start),
            (Some(start), None) => Some(chrono::Utc::now() - start),
            _ => None,
        }
    }
}
