//! 生命周期作用域构建器

use crate::exception::EntryPointExceptionHandler;
use crate::installer::{FnInstaller, Installer};
use crate::lifetime_scope::LifetimeScope;
use crate::logging::LoggingConfig;
use crate::scheduler::{ManualTickScheduler, TickScheduler};
use crate::settings::ScopeSettings;
use di_abstractions::{ContainerConfig, InjectionPlanCache};
use di_impl::DiContainerBuilder;
use infrastructure_common::{DependencyResult, InfrastructureResult};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// 生命周期作用域构建器
///
/// 使用建造者模式组装根作用域
pub struct LifetimeScopeBuilder {
    /// 作用域配置
    settings: ScopeSettings,
    /// 安装器列表（按添加顺序执行）
    installers: Vec<Box<dyn Installer>>,
    /// 帧回调调度器
    scheduler: Option<Arc<dyn TickScheduler>>,
    /// 入口点异常处理器
    exception_handler: Option<EntryPointExceptionHandler>,
    /// 显式日志配置，优先于配置文件中的日志节
    logging_config: Option<LoggingConfig>,
    plan_cache: Option<Arc<InjectionPlanCache>>,
}

impl LifetimeScopeBuilder {
    /// 创建新的构建器
    pub fn new() -> Self {
        Self {
            settings: ScopeSettings::default(),
            installers: Vec::new(),
            scheduler: None,
            exception_handler: None,
            logging_config: None,
            plan_cache: None,
        }
    }

    /// 使用已加载的配置
    pub fn with_settings(mut self, settings: ScopeSettings) -> Self {
        self.settings = settings;
        self
    }

    /// 从 TOML 文件和 `DI_` 环境变量加载配置
    pub fn load_settings<P: AsRef<Path>>(mut self, path: P) -> InfrastructureResult<Self> {
        let path = path.as_ref();
        info!("加载作用域配置: {}", path.display());
        self.settings = ScopeSettings::load(Some(path))?;
        Ok(self)
    }

    /// 设置根作用域名称
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.settings.name = name.into();
        self
    }

    /// 设置容器配置
    pub fn with_container_config(mut self, config: ContainerConfig) -> Self {
        self.settings.container = config;
        self
    }

    /// 添加安装器
    pub fn add_installer<T: Installer + 'static>(mut self, installer: T) -> Self {
        debug!("添加安装器: {}", installer.name());
        self.installers.push(Box::new(installer));
        self
    }

    /// 以闭包添加安装器
    pub fn install<F>(self, name: impl Into<String>, install: F) -> Self
    where
        F: Fn(&mut DiContainerBuilder) -> DependencyResult<()> + Send + Sync + 'static,
    {
        self.add_installer(FnInstaller::new(name, install))
    }

    /// 设置帧回调调度器
    pub fn with_tick_scheduler(mut self, scheduler: Arc<dyn TickScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// 设置入口点异常处理器
    pub fn with_exception_handler(mut self, handler: EntryPointExceptionHandler) -> Self {
        self.exception_handler = Some(handler);
        self
    }

    /// 配置日志
    pub fn with_logging(mut self, config: LoggingConfig) -> Self {
        self.logging_config = Some(config);
        self
    }

    /// 使用独立的注入计划缓存
    pub fn with_plan_cache(mut self, plan_cache: Arc<InjectionPlanCache>) -> Self {
        self.plan_cache = Some(plan_cache);
        self
    }

    /// 构建根作用域，入口点在 [`LifetimeScope::start`] 时调度
    pub fn build(self) -> InfrastructureResult<LifetimeScope> {
        // 只有在明确配置了日志时才初始化日志
        let logging = match (&self.logging_config, &self.settings.logging) {
            (Some(config), _) => Some(config.clone()),
            (None, Some(settings)) => Some(LoggingConfig::from_settings(settings)?),
            (None, None) => None,
        };
        if let Some(logging) = logging {
            logging.init()?;
        }

        info!("开始构建生命周期作用域: {}", self.settings.name);

        let mut builder =
            DiContainerBuilder::named(self.settings.name.clone()).with_config(self.settings.container.clone());
        if let Some(plan_cache) = self.plan_cache {
            builder = builder.with_plan_cache(plan_cache);
        }

        for installer in &self.installers {
            debug!("执行安装器: {}", installer.name());
            installer.install(&mut builder)?;
        }

        // 配置了帧间隔但没有提供调度器时，使用内置调度器并在启动时驱动
        let (scheduler, driven) = match (self.scheduler, self.settings.tick_interval()) {
            (Some(scheduler), _) => (Some(scheduler), None),
            (None, Some(period)) => {
                let manual = Arc::new(ManualTickScheduler::new());
                let scheduler: Arc<dyn TickScheduler> = manual.clone();
                (Some(scheduler), Some((manual, period)))
            }
            (None, None) => (None, None),
        };

        let container = builder.build()?;
        info!(
            "生命周期作用域构建完成: {} ({} 个安装器)",
            container.name(),
            self.installers.len()
        );

        Ok(LifetimeScope::new(
            container,
            scheduler,
            self.exception_handler,
            driven,
        ))
    }
}

impl Default for LifetimeScopeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
