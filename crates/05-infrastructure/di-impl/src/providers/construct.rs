//! 按注入计划构造实例

use di_abstractions::{
    InjectContext, InjectParameter, Injector, InstanceProvider, ObjectResolver, ProviderKind,
    SpawnedInstance,
};
use infrastructure_common::DependencyResult;
use std::sync::Arc;

/// 构造提供者
///
/// 调用注入器选中的构造函数，再完成方法、属性、字段注入
pub struct ConstructProvider {
    injector: Arc<dyn Injector>,
    parameters: Vec<InjectParameter>,
    kind: ProviderKind,
}

impl ConstructProvider {
    pub fn new(injector: Arc<dyn Injector>, parameters: Vec<InjectParameter>) -> Self {
        Self {
            injector,
            parameters,
            kind: ProviderKind::Construct,
        }
    }

    /// 由开放泛型闭合得到的提供者
    pub fn closed_generic(injector: Arc<dyn Injector>, parameters: Vec<InjectParameter>) -> Self {
        Self {
            kind: ProviderKind::OpenGeneric,
            ..Self::new(injector, parameters)
        }
    }
}

impl InstanceProvider for ConstructProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn spawn_instance(&self, resolver: &dyn ObjectResolver) -> DependencyResult<SpawnedInstance> {
        let ctx = InjectContext::new(resolver, &self.parameters);
        self.injector.create_instance(&ctx)
    }

    fn validate(&self) -> DependencyResult<()> {
        self.injector.validate()
    }
}
