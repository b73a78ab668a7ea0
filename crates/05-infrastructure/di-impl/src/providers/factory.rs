//! 工厂函数提供者

use di_abstractions::{AnyArc, InstanceProvider, ObjectResolver, ProviderKind, SpawnedInstance};
use infrastructure_common::DependencyResult;
use std::sync::Arc;

type FactoryFn = Arc<dyn Fn(&dyn ObjectResolver) -> DependencyResult<AnyArc> + Send + Sync>;

/// 工厂提供者
///
/// 工厂函数收到发起请求的作用域，可以自行解析依赖
pub struct FactoryProvider {
    factory: FactoryFn,
}

impl FactoryProvider {
    pub fn new<I, F>(factory: F) -> Self
    where
        I: Send + Sync + 'static,
        F: Fn(&dyn ObjectResolver) -> DependencyResult<I> + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(move |resolver: &dyn ObjectResolver| -> DependencyResult<AnyArc> {
                Ok(Arc::new(factory(resolver)?))
            }),
        }
    }
}

impl InstanceProvider for FactoryProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Factory
    }

    fn spawn_instance(&self, resolver: &dyn ObjectResolver) -> DependencyResult<SpawnedInstance> {
        (self.factory)(resolver).map(SpawnedInstance::new)
    }
}
