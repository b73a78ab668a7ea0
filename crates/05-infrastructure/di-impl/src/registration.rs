//! 注册模型
//!
//! 一个 [`Registration`] 描述一个可绑定单元：实现类型、契约类型、生命周期和实例提供者

use di_abstractions::{
    AnyArc, BoxedService, Dependency, Disposer, InjectParameter, InjectionPlanCache,
    InstanceProvider, ObjectResolver, SpawnedInstance,
};
use infrastructure_common::{
    DependencyError, DependencyResult, Disposable, Lifetime, ServiceName, TypeKey,
};
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_REGISTRATION_ID: AtomicU64 = AtomicU64::new(1);

/// 注册标识，进程内唯一
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistrationId(u64);

impl RegistrationId {
    fn next() -> Self {
        Self(NEXT_REGISTRATION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 将类型擦除的实例转换为某个契约类型
pub type Caster = Arc<dyn Fn(&AnyArc) -> Option<BoxedService> + Send + Sync>;

/// 创建契约转换器
pub fn caster<I, C>(cast: impl Fn(Arc<I>) -> Arc<C> + Send + Sync + 'static) -> Caster
where
    I: Send + Sync + 'static,
    C: ?Sized + Send + Sync + 'static,
{
    Arc::new(move |instance: &AnyArc| {
        instance
            .clone()
            .downcast::<I>()
            .ok()
            .map(|typed| Box::new(cast(typed)) as BoxedService)
    })
}

/// 注册信息
pub struct Registration {
    id: RegistrationId,
    implementation: TypeKey,
    contracts: Vec<TypeKey>,
    casters: HashMap<TypeId, Caster>,
    lifetime: Lifetime,
    provider: Arc<dyn InstanceProvider>,
    name: Option<ServiceName>,
    disposer: Option<Disposer>,
}

impl Registration {
    /// 创建注册，契约类型通过 [`Registration::with_contract`] 添加
    pub fn new(
        implementation: TypeKey,
        lifetime: Lifetime,
        provider: Arc<dyn InstanceProvider>,
    ) -> Self {
        Self {
            id: RegistrationId::next(),
            implementation,
            contracts: Vec::new(),
            casters: HashMap::new(),
            lifetime,
            provider,
            name: None,
            disposer: None,
        }
    }

    /// 添加一个契约类型
    pub fn with_contract(mut self, contract: TypeKey, caster: Caster) -> Self {
        if self.casters.insert(contract.id(), caster).is_none() {
            self.contracts.push(contract);
        }
        self
    }

    pub fn with_name(mut self, name: Option<ServiceName>) -> Self {
        self.name = name;
        self
    }

    /// 提供者没有给出释放方式时使用的释放调用
    pub fn with_disposer(mut self, disposer: Option<Disposer>) -> Self {
        self.disposer = disposer;
        self
    }

    pub fn id(&self) -> RegistrationId {
        self.id
    }

    pub fn implementation(&self) -> TypeKey {
        self.implementation
    }

    pub fn contracts(&self) -> &[TypeKey] {
        &self.contracts
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    pub fn provider(&self) -> &Arc<dyn InstanceProvider> {
        &self.provider
    }

    pub fn name(&self) -> Option<&ServiceName> {
        self.name.as_ref()
    }

    /// 通过提供者产生新实例
    pub fn spawn(&self, resolver: &dyn ObjectResolver) -> DependencyResult<SpawnedInstance> {
        let mut spawned = self.provider.spawn_instance(resolver)?;
        if spawned.disposer.is_none() {
            spawned.disposer = self.disposer.clone();
        }
        Ok(spawned)
    }

    /// 将实例转换为契约类型
    pub fn cast(&self, contract: TypeKey, instance: &AnyArc) -> DependencyResult<BoxedService> {
        let caster = self
            .casters
            .get(&contract.id())
            .ok_or_else(|| DependencyError::TypeMismatch {
                expected: contract.name().to_string(),
                actual: self.describe(),
            })?;
        caster(instance).ok_or_else(|| DependencyError::TypeMismatch {
            expected: self.implementation.name().to_string(),
            actual: format!("{} 的提供者返回了其他类型", self.describe()),
        })
    }

    /// 用于日志和错误信息的描述
    pub fn describe(&self) -> String {
        match &self.name {
            Some(name) => format!(
                "{} ({}, key = {})",
                self.implementation.short_name(),
                self.lifetime,
                name
            ),
            None => format!("{} ({})", self.implementation.short_name(), self.lifetime),
        }
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("id", &self.id)
            .field("implementation", &self.implementation)
            .field("contracts", &self.contracts)
            .field("lifetime", &self.lifetime)
            .field("provider", &self.provider.kind())
            .field("name", &self.name)
            .finish()
    }
}

type MakeProvider =
    Box<dyn FnOnce(Arc<InjectionPlanCache>, Vec<InjectParameter>) -> Arc<dyn InstanceProvider> + Send>;

/// 构建阶段尚未冻结的注册
pub(crate) struct PendingRegistration {
    implementation: TypeKey,
    lifetime: Lifetime,
    make_provider: MakeProvider,
    self_caster: Caster,
    contracts: Vec<(TypeKey, Caster)>,
    name: Option<ServiceName>,
    parameters: Vec<InjectParameter>,
    disposer: Option<Disposer>,
}

impl PendingRegistration {
    pub(crate) fn new<I, F>(lifetime: Lifetime, make_provider: F) -> Self
    where
        I: Send + Sync + 'static,
        F: FnOnce(Arc<InjectionPlanCache>, Vec<InjectParameter>) -> Arc<dyn InstanceProvider>
            + Send
            + 'static,
    {
        Self {
            implementation: TypeKey::of::<I>(),
            lifetime,
            make_provider: Box::new(make_provider),
            self_caster: caster::<I, I>(|it| it),
            contracts: Vec::new(),
            name: None,
            parameters: Vec::new(),
            disposer: None,
        }
    }

    /// 冻结后是否可以按 `contract` 解析
    pub(crate) fn exposes(&self, contract: TypeKey) -> bool {
        if self.contracts.is_empty() {
            self.implementation == contract
        } else {
            self.contracts.iter().any(|(key, _)| *key == contract)
        }
    }

    /// 冻结为不可变的注册，未声明契约类型时以实现类型自身注册
    pub(crate) fn finalize(self, plan_cache: &Arc<InjectionPlanCache>) -> Registration {
        let provider = (self.make_provider)(plan_cache.clone(), self.parameters);
        let contracts = if self.contracts.is_empty() {
            vec![(self.implementation, self.self_caster)]
        } else {
            self.contracts
        };

        contracts
            .into_iter()
            .fold(
                Registration::new(self.implementation, self.lifetime, provider),
                |registration, (contract, caster)| registration.with_contract(contract, caster),
            )
            .with_name(self.name)
            .with_disposer(self.disposer)
    }
}

/// 注册构建器
///
/// ```ignore
/// builder
///     .register::<Foo>(Lifetime::Singleton)
///     .as_contract::<dyn IFoo>(|it| it)
///     .keyed("primary");
/// ```
pub struct RegistrationBuilder<'b, I> {
    pending: &'b mut PendingRegistration,
    _marker: PhantomData<fn() -> I>,
}

impl<'b, I: Send + Sync + 'static> RegistrationBuilder<'b, I> {
    pub(crate) fn new(pending: &'b mut PendingRegistration) -> Self {
        Self {
            pending,
            _marker: PhantomData,
        }
    }

    /// 以契约类型暴露实现，`cast` 通常写作 `|it| it`
    pub fn as_contract<C: ?Sized + Send + Sync + 'static>(
        self,
        cast: impl Fn(Arc<I>) -> Arc<C> + Send + Sync + 'static,
    ) -> Self {
        self.pending
            .contracts
            .push((TypeKey::of::<C>(), caster::<I, C>(cast)));
        self
    }

    /// 同时以实现类型自身暴露
    pub fn as_self(self) -> Self {
        self.pending
            .contracts
            .push((TypeKey::of::<I>(), caster::<I, I>(|it| it)));
        self
    }

    /// 设置注册键
    pub fn keyed(self, name: impl Into<ServiceName>) -> Self {
        self.pending.name = Some(name.into());
        self
    }

    /// 附加自定义参数，按类型匹配构造函数或注入成员的参数
    pub fn with_parameter<D: Dependency>(self, value: D) -> Self {
        self.pending.parameters.push(InjectParameter::new(value));
        self
    }

    /// 作用域释放时调用 [`Disposable::dispose`]
    pub fn disposable(self) -> Self
    where
        I: Disposable,
    {
        let dispose: Disposer = Arc::new(|instance: &AnyArc| {
            if let Some(typed) = instance.downcast_ref::<I>() {
                typed.dispose();
            }
        });
        self.pending.disposer = Some(dispose);
        self
    }
}
