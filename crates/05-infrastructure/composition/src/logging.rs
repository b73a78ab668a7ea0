//! 日志初始化

use crate::settings::LoggingSettings;
use infrastructure_common::{ConfigError, InfrastructureError, InfrastructureResult};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 日志配置
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: tracing::Level,
    /// 额外的过滤指令，例如 `di_impl=trace`
    pub filter: Option<String>,
    /// 是否显示目标
    pub show_target: bool,
    /// 是否显示线程ID
    pub show_thread_ids: bool,
    /// 是否显示文件名
    pub show_file: bool,
    /// 是否显示行号
    pub show_line_number: bool,
    /// 是否使用 JSON 格式
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: tracing::Level::INFO,
            filter: None,
            show_target: true,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// 创建开发环境日志配置
    pub fn development() -> Self {
        Self {
            level: tracing::Level::DEBUG,
            filter: None,
            show_target: true,
            show_thread_ids: true,
            show_file: true,
            show_line_number: true,
            json_format: false,
        }
    }

    /// 创建生产环境日志配置
    pub fn production() -> Self {
        Self {
            level: tracing::Level::INFO,
            filter: None,
            show_target: false,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            json_format: true,
        }
    }

    /// 从配置文件中的日志节创建
    pub fn from_settings(settings: &LoggingSettings) -> InfrastructureResult<Self> {
        let level = settings.level.parse::<tracing::Level>().map_err(|_| {
            InfrastructureError::from(ConfigError::ValidationError {
                message: format!("无效的日志级别: {}", settings.level),
            })
        })?;
        let base = if settings.json {
            Self::production()
        } else {
            Self::development()
        };
        Ok(Self {
            level,
            filter: settings.filter.clone(),
            ..base
        })
    }

    fn env_filter(&self) -> InfrastructureResult<EnvFilter> {
        let directives = match &self.filter {
            Some(filter) => format!("{},{}", self.level, filter),
            None => self.level.to_string(),
        };
        EnvFilter::try_new(&directives).map_err(|e| InfrastructureError::BootstrapFailed {
            message: format!("日志过滤指令无效: {}: {}", directives, e),
        })
    }

    /// 安装全局日志订阅者，进程内只能成功一次
    pub fn init(&self) -> InfrastructureResult<()> {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(self.env_filter()?)
            .with_target(self.show_target)
            .with_thread_ids(self.show_thread_ids)
            .with_file(self.show_file)
            .with_line_number(self.show_line_number);

        if self.json_format {
            subscriber.json().try_init()
        } else {
            subscriber.try_init()
        }
        .map_err(|e| InfrastructureError::BootstrapFailed {
            message: format!("日志初始化失败: {}", e),
        })?;

        info!("日志系统初始化完成");
        Ok(())
    }
}
