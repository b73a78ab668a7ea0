//! 依赖注入容器配置与统计

use serde::{Deserialize, Serialize};

/// 容器配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// 是否启用循环依赖检测
    pub enable_circular_dependency_detection: bool,
    /// 最大解析深度
    pub max_resolution_depth: usize,
    /// 构建时是否校验全部注册
    pub validate_on_build: bool,
    /// 是否记录解析诊断信息
    pub enable_diagnostics: bool,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            enable_circular_dependency_detection: true,
            max_resolution_depth: 100,
            validate_on_build: false,
            enable_diagnostics: false,
        }
    }
}

impl ContainerConfig {
    /// 开发环境配置
    pub fn development() -> Self {
        Self {
            validate_on_build: true,
            enable_diagnostics: true,
            ..Self::default()
        }
    }

    /// 生产环境配置
    pub fn production() -> Self {
        Self::default()
    }
}

/// 容器统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerStats {
    /// 已注册组件数量
    pub registered_components: usize,
    /// 已解析次数
    pub resolved_components: usize,
    /// 已缓存的共享实例数量
    pub active_instances: usize,
    /// 待释放的实例数量
    pub pending_disposables: usize,
    /// 解析错误数量
    pub resolution_errors: usize,
    /// 解析总耗时（微秒）
    pub total_resolution_time_us: u64,
}

impl ContainerStats {
    /// 平均解析耗时（微秒）
    pub fn average_resolution_time_us(&self) -> f64 {
        if self.resolved_components == 0 {
            0.0
        } else {
            self.total_resolution_time_us as f64 / self.resolved_components as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_fills_missing_fields_with_defaults() {
        let config: ContainerConfig =
            serde_json::from_str(r#"{ "max_resolution_depth": 8 }"#).unwrap();

        assert_eq!(config.max_resolution_depth, 8);
        assert!(config.enable_circular_dependency_detection);
        assert!(!config.validate_on_build);
        assert!(ContainerConfig::development().enable_diagnostics);
        assert!(ContainerConfig::development().validate_on_build);
    }

    #[test]
    fn test_average_resolution_time() {
        let stats = ContainerStats {
            resolved_components: 4,
            total_resolution_time_us: 10,
            ..ContainerStats::default()
        };
        assert_eq!(stats.average_resolution_time_us(), 2.5);
        assert_eq!(ContainerStats::default().average_resolution_time_us(), 0.0);
    }
}
