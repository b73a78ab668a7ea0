//! 开放泛型闭合

use crate::registration::Registration;
use crate::providers::ConstructProvider;
use dashmap::DashMap;
use di_abstractions::{
    AnyArc, GenericDefinition, GenericRequest, InjectParameter, InjectionPlanCache,
};
use infrastructure_common::{DependencyError, DependencyResult, Lifetime, TypeKey};
use std::sync::Arc;
use tracing::debug;

/// 开放泛型提供者
///
/// 第一次请求某个闭合形式时生成派生注册，并按类型参数列表缓存，
/// 之后同一闭合形式总是得到同一个派生注册
pub struct OpenGenericProvider {
    definition: GenericDefinition,
    lifetime: Lifetime,
    parameters: Vec<InjectParameter>,
    derived: DashMap<Vec<TypeKey>, Arc<Registration>>,
}

impl OpenGenericProvider {
    pub fn new(
        definition: GenericDefinition,
        lifetime: Lifetime,
        parameters: Vec<InjectParameter>,
    ) -> Self {
        Self {
            definition,
            lifetime,
            parameters,
            derived: DashMap::new(),
        }
    }

    pub fn definition(&self) -> GenericDefinition {
        self.definition
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    /// 已生成的派生注册数量
    pub fn derived_count(&self) -> usize {
        self.derived.len()
    }

    /// 闭合为具体注册
    pub fn close(
        &self,
        request: &GenericRequest,
        plan_cache: &Arc<InjectionPlanCache>,
    ) -> DependencyResult<Arc<Registration>> {
        if request.definition() != self.definition {
            return Err(DependencyError::TypeMismatch {
                expected: self.definition.to_string(),
                actual: request.closed_type().name().to_string(),
            });
        }

        let entry = self
            .derived
            .entry(request.arguments().to_vec())
            .or_insert_with(|| {
                debug!(
                    "闭合开放泛型: {} -> {}",
                    self.definition,
                    request.closed_type().short_name()
                );
                let provider = ConstructProvider::closed_generic(
                    request.injector(plan_cache.clone()),
                    self.parameters.clone(),
                );
                let closed = request.clone();
                Arc::new(
                    Registration::new(request.closed_type(), self.lifetime, Arc::new(provider))
                        .with_contract(
                            request.closed_type(),
                            Arc::new(move |instance: &AnyArc| closed.cast(instance)),
                        ),
                )
            });
        Ok(entry.value().clone())
    }
}
