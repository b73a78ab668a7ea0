//! 错误类型定义

use thiserror::Error;

/// 依赖注入错误类型
#[derive(Error, Debug)]
pub enum DependencyError {
    #[error("组件未注册: {type_name} ({context})")]
    NotRegistered { type_name: String, context: String },

    #[error("构造函数不明确: {type_name}, 原因: {reason}")]
    AmbiguousConstructor { type_name: String, reason: String },

    #[error("注册冲突: 契约 {contract} 上重复注册了单例实现 {implementation}{key}")]
    RegistrationCollision {
        contract: String,
        implementation: String,
        key: String,
    },

    #[error("循环依赖检测到: {dependency_chain}")]
    CircularDependency { dependency_chain: String },

    #[error("不支持直接构造: {type_name}, 原因: {message}")]
    UnsupportedConstruction { type_name: String, message: String },

    #[error("组件创建失败: {type_name}, 原因: {source}")]
    ComponentCreationFailed {
        type_name: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("类型不匹配: 期望 {expected}, 实际注册为 {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("作用域已释放: {scope}")]
    ScopeDisposed { scope: String },

    #[error("解析深度超过上限 {max_depth}: {type_name}")]
    MaxDepthExceeded { type_name: String, max_depth: usize },

    #[error("组件注册失败: {type_name}, 原因: {message}")]
    RegistrationError { type_name: String, message: String },
}

impl DependencyError {
    /// 创建未注册错误
    pub fn not_registered(type_name: impl Into<String>, context: impl Into<String>) -> Self {
        Self::NotRegistered {
            type_name: type_name.into(),
            context: context.into(),
        }
    }

    /// 创建构造函数不明确错误
    pub fn ambiguous_constructor(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::AmbiguousConstructor {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }

    /// 创建不支持直接构造错误
    pub fn unsupported_construction(
        type_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::UnsupportedConstruction {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    /// 以文本原因创建组件创建失败错误
    pub fn creation_failed(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self::ComponentCreationFailed {
            type_name: type_name.into(),
            source: message.into(),
        }
    }

    /// 创建注册失败错误
    pub fn registration(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RegistrationError {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    /// 是否为未注册错误
    pub fn is_not_registered(&self) -> bool {
        matches!(self, Self::NotRegistered { .. })
    }

    /// 是否为循环依赖错误
    pub fn is_circular_dependency(&self) -> bool {
        matches!(self, Self::CircularDependency { .. })
    }
}

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    #[error("配置解析失败: {source}")]
    ParseError {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("配置验证失败: {message}")]
    ValidationError { message: String },
}

/// 生命周期管理错误类型
#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("入口点执行失败: {entry_point}, 原因: {message}")]
    EntryPointFailed { entry_point: String, message: String },

    #[error("作用域创建失败: {message}")]
    ScopeCreationFailed { message: String },

    #[error("生命周期管理失败: {message}")]
    LifecycleManagementFailed { message: String },
}

impl LifecycleError {
    /// 创建入口点执行失败错误
    pub fn entry_point_failed(entry_point: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EntryPointFailed {
            entry_point: entry_point.into(),
            message: message.into(),
        }
    }
}

/// 基础设施错误类型
#[derive(Error, Debug)]
pub enum InfrastructureError {
    #[error("配置错误: {source}")]
    ConfigError {
        #[from]
        source: ConfigError,
    },

    #[error("依赖注入错误: {source}")]
    DependencyError {
        #[from]
        source: DependencyError,
    },

    #[error("生命周期错误: {source}")]
    LifecycleError {
        #[from]
        source: LifecycleError,
    },

    #[error("基础设施启动失败: {message}")]
    BootstrapFailed { message: String },
}

/// 结果类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type DependencyResult<T> = Result<T, DependencyError>;
pub type LifecycleResult<T> = Result<T, LifecycleError>;
pub type InfrastructureResult<T> = Result<T, InfrastructureError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_registered_message_carries_context() {
        let error = DependencyError::not_registered("app::IFoo", "请求自作用域 root");

        assert!(error.is_not_registered());
        let message = error.to_string();
        assert!(message.contains("app::IFoo"));
        assert!(message.contains("root"));
    }

    #[test]
    fn test_dependency_error_converts_into_infrastructure_error() {
        let error: InfrastructureError = DependencyError::CircularDependency {
            dependency_chain: "A -> B -> A".to_string(),
        }
        .into();

        assert!(matches!(error, InfrastructureError::DependencyError { .. }));
        assert!(error.to_string().contains("A -> B -> A"));
    }
}
