//! 组件生命周期管理

use serde::{Deserialize, Serialize};
use std::fmt;

/// 组件生命周期类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifetime {
    /// 瞬时模式 - 每次请求都创建新实例
    Transient,
    /// 作用域模式 - 在拥有该注册的作用域内共享实例
    Scoped,
    /// 单例模式 - 在拥有该注册的作用域（通常是根作用域）内只创建一个实例
    Singleton,
}

impl Default for Lifetime {
    fn default() -> Self {
        Self::Transient
    }
}

impl Lifetime {
    /// 是否需要缓存实例
    pub fn is_shared(self) -> bool {
        !matches!(self, Self::Transient)
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Transient => "transient",
            Self::Scoped => "scoped",
            Self::Singleton => "singleton",
        };
        f.write_str(name)
    }
}

/// 可释放组件 trait
///
/// 作用域释放时按构造顺序的逆序调用
pub trait Disposable: Send + Sync {
    /// 释放资源
    fn dispose(&self);
}

/// 组件生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// 未初始化
    Uninitialized,
    /// 运行中
    Running,
    /// 已释放
    Disposed,
}

impl Default for LifecycleState {
    fn default() -> Self {
        Self::Uninitialized
    }
}
