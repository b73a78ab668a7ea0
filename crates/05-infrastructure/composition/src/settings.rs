//! 作用域配置
//!
//! 从可选的 TOML 文件和 `DI_` 前缀的环境变量加载，环境变量优先。
//! 嵌套键用双下划线分隔，例如 `DI_CONTAINER__MAX_RESOLUTION_DEPTH=50`

use di_abstractions::ContainerConfig;
use infrastructure_common::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// 环境变量前缀
pub const ENV_PREFIX: &str = "DI";

/// 生命周期作用域配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeSettings {
    /// 根作用域名称
    pub name: String,
    /// 容器配置
    pub container: ContainerConfig,
    /// 日志配置，缺省时不初始化日志
    pub logging: Option<LoggingSettings>,
    /// 帧驱动间隔（毫秒），缺省时由宿主手动推进
    pub tick_interval_ms: Option<u64>,
}

impl Default for ScopeSettings {
    fn default() -> Self {
        Self {
            name: "root".to_string(),
            container: ContainerConfig::default(),
            logging: None,
            tick_interval_ms: None,
        }
    }
}

/// 日志配置节
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub filter: Option<String>,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            filter: None,
            json: false,
        }
    }
}

impl ScopeSettings {
    /// 从文件（可选）和环境变量加载
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                });
            }
            debug!("加载作用域配置文件: {}", path.display());
            builder = builder.add_source(config::File::from(path).format(config::FileFormat::Toml));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(parse_error)?;
        Self::finish(settings)
    }

    /// 从 TOML 文本加载，不读取环境变量
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(text, config::FileFormat::Toml))
            .build()
            .map_err(parse_error)?;
        Self::finish(settings)
    }

    pub fn tick_interval(&self) -> Option<Duration> {
        self.tick_interval_ms.map(Duration::from_millis)
    }

    fn finish(settings: config::Config) -> ConfigResult<Self> {
        let loaded: Self = settings.try_deserialize().map_err(parse_error)?;
        loaded.validate()?;
        Ok(loaded)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.container.max_resolution_depth == 0 {
            return Err(ConfigError::ValidationError {
                message: "container.max_resolution_depth 必须大于 0".to_string(),
            });
        }
        if self.tick_interval_ms == Some(0) {
            return Err(ConfigError::ValidationError {
                message: "tick_interval_ms 必须大于 0".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_error(error: config::ConfigError) -> ConfigError {
    ConfigError::ParseError {
        source: Box::new(error),
    }
}
