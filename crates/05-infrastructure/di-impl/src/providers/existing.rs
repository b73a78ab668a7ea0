//! 预先创建好的实例

use di_abstractions::{AnyArc, InstanceProvider, ObjectResolver, ProviderKind, SpawnedInstance};
use infrastructure_common::DependencyResult;

/// 已有实例提供者，每次都返回同一个实例
pub struct ExistingInstanceProvider {
    instance: AnyArc,
}

impl ExistingInstanceProvider {
    pub fn new(instance: AnyArc) -> Self {
        Self { instance }
    }
}

impl InstanceProvider for ExistingInstanceProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::ExistingInstance
    }

    fn spawn_instance(&self, _resolver: &dyn ObjectResolver) -> DependencyResult<SpawnedInstance> {
        Ok(SpawnedInstance::new(self.instance.clone()))
    }
}
