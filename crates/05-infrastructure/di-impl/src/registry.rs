//! 绑定注册表
//!
//! 构建阶段通过 [`RegistryBuilder`] 逐个添加注册，冻结后得到只读的 [`Registry`]

use crate::providers::OpenGenericProvider;
use crate::registration::Registration;
use di_abstractions::{GenericDefinition, RequestShape, ServiceRequest};
use infrastructure_common::{DependencyError, DependencyResult, Lifetime, ServiceName, TypeKey};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// 注册表键
///
/// 构建时就按请求形态区分，解析时不再做类型判断
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContractKey {
    /// 单个实例
    Single {
        contract: TypeKey,
        name: Option<ServiceName>,
    },
    /// 序列
    Sequence(TypeKey),
    /// 只读列表
    ReadOnlyList(TypeKey),
}

impl ContractKey {
    pub fn from_request(request: &ServiceRequest) -> Self {
        match request.shape() {
            RequestShape::Single => Self::Single {
                contract: request.contract(),
                name: request.name().cloned(),
            },
            RequestShape::Sequence => Self::Sequence(request.contract()),
            RequestShape::ReadOnlyList => Self::ReadOnlyList(request.contract()),
        }
    }
}

/// 集合注册：同一契约类型下的全部注册（按注册顺序）
#[derive(Debug)]
pub struct CollectionRegistration {
    element: TypeKey,
    registrations: Vec<Arc<Registration>>,
}

impl CollectionRegistration {
    pub fn element(&self) -> TypeKey {
        self.element
    }

    pub fn registrations(&self) -> &[Arc<Registration>] {
        &self.registrations
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// 直接解析时使用最后一个注册键匹配的注册
    pub fn last_named(&self, name: Option<&ServiceName>) -> Option<&Arc<Registration>> {
        self.registrations
            .iter()
            .rev()
            .find(|registration| registration.name() == name)
    }
}

/// 注册表条目
#[derive(Debug, Clone)]
pub enum RegistryEntry {
    Single(Arc<Registration>),
    Collection(Arc<CollectionRegistration>),
}

impl RegistryEntry {
    /// 直接解析时对应的注册
    pub fn single(&self, name: Option<&ServiceName>) -> Option<&Arc<Registration>> {
        match self {
            Self::Single(registration) => Some(registration),
            Self::Collection(collection) => collection.last_named(name),
        }
    }

    /// 集合解析时对应的全部注册
    pub fn registrations(&self) -> &[Arc<Registration>] {
        match self {
            Self::Single(registration) => std::slice::from_ref(registration),
            Self::Collection(collection) => collection.registrations(),
        }
    }
}

/// 注册表构建器
#[derive(Default)]
pub struct RegistryBuilder {
    registrations: Vec<Arc<Registration>>,
    by_contract: HashMap<TypeKey, Vec<Arc<Registration>>>,
    contract_order: Vec<TypeKey>,
    open_generics: HashMap<GenericDefinition, Arc<OpenGenericProvider>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加注册
    ///
    /// 同一契约下重复注册相同实现、相同注册键的单例会返回 `RegistrationCollision`
    pub fn add(&mut self, registration: Arc<Registration>) -> DependencyResult<()> {
        // 先检查全部契约，冲突时构建器保持不变
        if let Some(contract) = self.colliding_contract(&registration) {
            return Err(DependencyError::RegistrationCollision {
                contract: contract.name().to_string(),
                implementation: registration.implementation().name().to_string(),
                key: registration
                    .name()
                    .map(|name| format!(" (key = {})", name))
                    .unwrap_or_default(),
            });
        }

        for contract in registration.contracts() {
            self.by_contract
                .entry(*contract)
                .or_insert_with(|| {
                    self.contract_order.push(*contract);
                    Vec::new()
                })
                .push(registration.clone());
        }

        debug!("添加注册: {}", registration.describe());
        self.registrations.push(registration);
        Ok(())
    }

    fn colliding_contract(&self, registration: &Registration) -> Option<TypeKey> {
        if registration.lifetime() != Lifetime::Singleton {
            return None;
        }
        registration.contracts().iter().copied().find(|contract| {
            self.by_contract.get(contract).is_some_and(|existing| {
                existing.iter().any(|other| {
                    other.lifetime() == Lifetime::Singleton
                        && other.implementation() == registration.implementation()
                        && other.name() == registration.name()
                })
            })
        })
    }

    /// 添加开放泛型注册，同一定义的后一次注册覆盖前一次
    pub fn add_open_generic(&mut self, provider: Arc<OpenGenericProvider>) {
        let definition = provider.definition();
        if self.open_generics.insert(definition, provider).is_some() {
            warn!("开放泛型 {} 被重复注册，使用最后一次注册", definition);
        }
    }

    /// 冻结为只读注册表
    pub fn build(self) -> Registry {
        let mut entries = HashMap::new();

        for contract in &self.contract_order {
            let registrations = match self.by_contract.get(contract) {
                Some(registrations) => registrations.clone(),
                None => continue,
            };

            let collection = Arc::new(CollectionRegistration {
                element: *contract,
                registrations,
            });

            if let [only] = collection.registrations() {
                entries.insert(
                    ContractKey::Single {
                        contract: *contract,
                        name: only.name().cloned(),
                    },
                    RegistryEntry::Single(only.clone()),
                );
            } else {
                let mut names: Vec<Option<ServiceName>> = Vec::new();
                for registration in collection.registrations() {
                    let name = registration.name().cloned();
                    if !names.contains(&name) {
                        names.push(name);
                    }
                }

                for name in names {
                    let shadowed = collection
                        .registrations()
                        .iter()
                        .filter(|registration| registration.name() == name.as_ref())
                        .count();
                    if shadowed > 1 {
                        if let Some(winner) = collection.last_named(name.as_ref()) {
                            warn!(
                                "契约 {} 有 {} 个同键注册，直接解析将使用最后注册的 {}",
                                contract.short_name(),
                                shadowed,
                                winner.describe()
                            );
                        }
                    }
                    entries.insert(
                        ContractKey::Single {
                            contract: *contract,
                            name,
                        },
                        RegistryEntry::Collection(collection.clone()),
                    );
                }
            }

            entries.insert(
                ContractKey::Sequence(*contract),
                RegistryEntry::Collection(collection.clone()),
            );
            entries.insert(
                ContractKey::ReadOnlyList(*contract),
                RegistryEntry::Collection(collection),
            );
        }

        Registry {
            entries,
            registrations: self.registrations,
            open_generics: self.open_generics,
        }
    }
}

/// 只读注册表
#[derive(Default)]
pub struct Registry {
    entries: HashMap<ContractKey, RegistryEntry>,
    registrations: Vec<Arc<Registration>>,
    open_generics: HashMap<GenericDefinition, Arc<OpenGenericProvider>>,
}

impl Registry {
    /// 查找条目
    pub fn try_get(&self, key: &ContractKey) -> Option<&RegistryEntry> {
        self.entries.get(key)
    }

    /// 查找条目，不存在时返回 `NotRegistered`
    pub fn get(&self, key: &ContractKey) -> DependencyResult<&RegistryEntry> {
        self.try_get(key).ok_or_else(|| {
            DependencyError::not_registered(format!("{:?}", key), "本地注册表中不存在")
        })
    }

    /// 直接解析时使用的注册
    pub fn find_single(
        &self,
        contract: TypeKey,
        name: Option<&ServiceName>,
    ) -> Option<&Arc<Registration>> {
        let key = ContractKey::Single {
            contract,
            name: name.cloned(),
        };
        self.entries.get(&key)?.single(name)
    }

    /// 契约类型在本地的全部注册（按注册顺序）
    pub fn registrations_for(&self, contract: TypeKey) -> &[Arc<Registration>] {
        self.entries
            .get(&ContractKey::Sequence(contract))
            .map(RegistryEntry::registrations)
            .unwrap_or(&[])
    }

    pub fn open_generic(&self, definition: GenericDefinition) -> Option<&Arc<OpenGenericProvider>> {
        self.open_generics.get(&definition)
    }

    /// 全部注册（按注册顺序）
    pub fn registrations(&self) -> &[Arc<Registration>] {
        &self.registrations
    }

    pub fn open_generic_count(&self) -> usize {
        self.open_generics.len()
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty() && self.open_generics.is_empty()
    }
}
