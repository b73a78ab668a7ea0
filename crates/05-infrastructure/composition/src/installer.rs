//! 安装器
//!
//! 安装器把一组相关注册打包，在构建生命周期作用域时写入构建器

use di_impl::DiContainerBuilder;
use infrastructure_common::DependencyResult;

/// 注册安装器
pub trait Installer: Send + Sync {
    /// 安装器名称，用于日志
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn install(&self, builder: &mut DiContainerBuilder) -> DependencyResult<()>;
}

/// 由闭包构成的安装器
pub struct FnInstaller<F> {
    name: String,
    install: F,
}

impl<F> FnInstaller<F>
where
    F: Fn(&mut DiContainerBuilder) -> DependencyResult<()> + Send + Sync,
{
    pub fn new(name: impl Into<String>, install: F) -> Self {
        Self {
            name: name.into(),
            install,
        }
    }
}

impl<F> Installer for FnInstaller<F>
where
    F: Fn(&mut DiContainerBuilder) -> DependencyResult<()> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn install(&self, builder: &mut DiContainerBuilder) -> DependencyResult<()> {
        (self.install)(builder)
    }
}
