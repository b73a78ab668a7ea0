//! 实例提供者抽象接口
//!
//! 每个注册都持有一个提供者，负责在需要时产生新实例

use crate::injector::SpawnedInstance;
use crate::resolver::ObjectResolver;
use infrastructure_common::DependencyResult;
use std::fmt;

/// 提供者种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// 按注入计划构造
    Construct,
    /// 预先创建好的实例
    ExistingInstance,
    /// 用户提供的工厂函数
    Factory,
    /// 开放泛型
    OpenGeneric,
    /// 查找宿主中已存在的原生对象
    NativeFindExisting,
    /// 由宿主新建原生对象
    NativeSpawnNew,
    /// 克隆原生模板对象
    NativeCloneTemplate,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Construct => "construct",
            Self::ExistingInstance => "existing-instance",
            Self::Factory => "factory",
            Self::OpenGeneric => "open-generic",
            Self::NativeFindExisting => "native-find-existing",
            Self::NativeSpawnNew => "native-spawn-new",
            Self::NativeCloneTemplate => "native-clone-template",
        };
        f.write_str(name)
    }
}

/// 实例提供者 trait
pub trait InstanceProvider: Send + Sync {
    /// 提供者种类
    fn kind(&self) -> ProviderKind;

    /// 产生一个新实例，依赖从 `resolver`（发起请求的作用域）解析
    fn spawn_instance(&self, resolver: &dyn ObjectResolver) -> DependencyResult<SpawnedInstance>;

    /// 构建容器时的校验
    fn validate(&self) -> DependencyResult<()> {
        Ok(())
    }
}
