//! 集合解析
//!
//! 序列和只读列表请求会收集整条作用域链上的注册：
//! 先是请求作用域自己的注册，再依次是父作用域、祖父作用域的注册，
//! 每个作用域内部保持注册顺序

use crate::registration::{Registration, RegistrationId};
use crate::scope::ScopeCore;
use di_abstractions::BoxedService;
use infrastructure_common::{DependencyResult, TypeKey};
use std::collections::HashSet;
use std::sync::Arc;

/// 集合实例提供者
pub struct CollectionInstanceProvider {
    element: TypeKey,
}

impl CollectionInstanceProvider {
    pub fn new(element: TypeKey) -> Self {
        Self { element }
    }

    pub fn element(&self) -> TypeKey {
        self.element
    }

    /// 收集参与集合的注册及其所属作用域
    pub(crate) fn gather(
        &self,
        requester: &Arc<ScopeCore>,
    ) -> DependencyResult<Vec<(Arc<ScopeCore>, Arc<Registration>)>> {
        let mut seen: HashSet<RegistrationId> = HashSet::new();
        let mut elements = Vec::new();
        let mut current = Some(requester.clone());

        while let Some(scope) = current {
            for registration in scope.registry().registrations_for(self.element) {
                if seen.insert(registration.id()) {
                    elements.push((scope.clone(), registration.clone()));
                }
            }
            current = scope.parent_scope()?;
        }

        Ok(elements)
    }

    /// 逐个解析集合元素，整条链上都没有注册时返回 `None`
    pub(crate) fn resolve(
        &self,
        requester: &Arc<ScopeCore>,
    ) -> DependencyResult<Option<Vec<BoxedService>>> {
        let elements = self.gather(requester)?;
        if elements.is_empty() {
            return Ok(None);
        }

        let mut services = Vec::with_capacity(elements.len());
        for (owner, registration) in &elements {
            let instance = requester.collection_element(owner, registration)?;
            services.push(registration.cast(self.element, &instance)?);
        }
        Ok(Some(services))
    }
}
