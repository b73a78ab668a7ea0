//! 循环依赖检测
//!
//! 每个线程维护一条正在构造的注册链，进入构造前检查链上是否已有同一注册

use crate::registration::{Registration, RegistrationId};
use di_abstractions::ContainerConfig;
use infrastructure_common::{DependencyError, DependencyResult};
use std::cell::RefCell;
use std::marker::PhantomData;

struct ChainLink {
    registration: RegistrationId,
    name: &'static str,
}

thread_local! {
    static RESOLUTION_CHAIN: RefCell<Vec<ChainLink>> = const { RefCell::new(Vec::new()) };
}

/// 解析链守卫，离开作用域时自动出链
pub(crate) struct ResolutionGuard {
    // 守卫只能在创建它的线程上释放
    _not_send: PhantomData<*const ()>,
}

impl ResolutionGuard {
    /// 将注册加入当前线程的解析链
    pub(crate) fn enter(registration: &Registration, config: &ContainerConfig) -> DependencyResult<Self> {
        RESOLUTION_CHAIN.with(|chain| {
            let mut chain = chain.borrow_mut();
            let name = registration.implementation().short_name();

            if config.enable_circular_dependency_detection {
                if let Some(start) = chain
                    .iter()
                    .position(|link| link.registration == registration.id())
                {
                    let mut names: Vec<&str> = chain[start..].iter().map(|link| link.name).collect();
                    names.push(name);
                    return Err(DependencyError::CircularDependency {
                        dependency_chain: names.join(" -> "),
                    });
                }
            }

            if chain.len() >= config.max_resolution_depth {
                return Err(DependencyError::MaxDepthExceeded {
                    type_name: registration.implementation().name().to_string(),
                    max_depth: config.max_resolution_depth,
                });
            }

            chain.push(ChainLink {
                registration: registration.id(),
                name,
            });
            Ok(Self {
                _not_send: PhantomData,
            })
        })
    }

    /// 当前线程的解析深度
    pub(crate) fn depth() -> usize {
        RESOLUTION_CHAIN.with(|chain| chain.borrow().len())
    }
}

impl Drop for ResolutionGuard {
    fn drop(&mut self) {
        RESOLUTION_CHAIN.with(|chain| {
            chain.borrow_mut().pop();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ExistingInstanceProvider;
    use infrastructure_common::{Lifetime, TypeKey};
    use std::sync::Arc;

    struct Alpha;
    struct Beta;

    fn registration<T: 'static>() -> Registration {
        Registration::new(
            TypeKey::of::<T>(),
            Lifetime::Transient,
            Arc::new(ExistingInstanceProvider::new(Arc::new(0u8))),
        )
    }

    #[test]
    fn test_reentering_same_registration_reports_chain() {
        let config = ContainerConfig::default();
        let alpha = registration::<Alpha>();
        let beta = registration::<Beta>();

        let _outer = ResolutionGuard::enter(&alpha, &config).unwrap();
        let _inner = ResolutionGuard::enter(&beta, &config).unwrap();
        assert_eq!(ResolutionGuard::depth(), 2);

        match ResolutionGuard::enter(&alpha, &config) {
            Err(DependencyError::CircularDependency { dependency_chain }) => {
                assert_eq!(dependency_chain, "Alpha -> Beta -> Alpha");
            }
            _ => panic!("expected circular dependency"),
        }
    }

    #[test]
    fn test_guard_pops_on_drop() {
        let config = ContainerConfig::default();
        let alpha = registration::<Alpha>();
        {
            let _guard = ResolutionGuard::enter(&alpha, &config).unwrap();
            assert_eq!(ResolutionGuard::depth(), 1);
        }
        assert_eq!(ResolutionGuard::depth(), 0);
        assert!(ResolutionGuard::enter(&alpha, &config).is_ok());
    }

    #[test]
    fn test_depth_limit_applies_without_cycle_detection() {
        let config = ContainerConfig {
            enable_circular_dependency_detection: false,
            max_resolution_depth: 2,
            ..ContainerConfig::default()
        };
        let alpha = registration::<Alpha>();

        let _first = ResolutionGuard::enter(&alpha, &config).unwrap();
        let _second = ResolutionGuard::enter(&alpha, &config).unwrap();
        assert!(matches!(
            ResolutionGuard::enter(&alpha, &config),
            Err(DependencyError::MaxDepthExceeded { max_depth: 2, .. })
        ));
    }
}
