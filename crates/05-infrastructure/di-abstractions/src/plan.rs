//! 注入计划
//!
//! 对组件类型的描述符做一次分析，选出构造函数并整理注入成员，
//! 结果按类型缓存，所有容器共享

use crate::descriptor::{ConstructorInfo, DisposeFn, Injectable, MemberInfo, MemberKind, TypeDescriptor};
use crate::injection::InjectContext;
use dashmap::DashMap;
use infrastructure_common::{DependencyError, DependencyResult, TypeKey};
use once_cell::sync::Lazy;
use std::any::{Any, TypeId};
use std::sync::Arc;
use tracing::debug;

/// 组件类型的注入计划
pub struct InjectTypeInfo<T> {
    type_key: TypeKey,
    constructor: Option<ConstructorInfo<T>>,
    methods: Vec<MemberInfo<T>>,
    properties: Vec<MemberInfo<T>>,
    fields: Vec<MemberInfo<T>>,
    native: bool,
    disposer: Option<DisposeFn<T>>,
}

impl<T: Injectable> InjectTypeInfo<T> {
    /// 分析组件类型
    pub fn analyze() -> DependencyResult<Self> {
        let mut descriptor = TypeDescriptor::new();
        T::describe(&mut descriptor);
        Self::from_descriptor(descriptor)
    }
}

impl<T: Send + Sync + 'static> InjectTypeInfo<T> {
    /// 由描述符生成计划
    pub fn from_descriptor(descriptor: TypeDescriptor<T>) -> DependencyResult<Self> {
        let type_key = TypeKey::of::<T>();
        let (constructors, members, native, disposer) = descriptor.into_parts();

        // 原生对象由宿主创建，不参与构造函数选择
        let constructor = if native {
            None
        } else {
            Some(select_constructor(type_key, &constructors)?)
        };

        let mut methods = Vec::new();
        let mut properties = Vec::new();
        let mut fields = Vec::new();
        for member in members {
            match member.kind() {
                MemberKind::Method => methods.push(member),
                MemberKind::Property if member.is_writable() => properties.push(member),
                MemberKind::Property => {
                    debug!("跳过只读属性: {}::{}", type_key.short_name(), member.name());
                }
                MemberKind::Field => fields.push(member),
            }
        }

        Ok(Self {
            type_key,
            constructor,
            methods,
            properties,
            fields,
            native,
            disposer,
        })
    }

    pub fn type_key(&self) -> TypeKey {
        self.type_key
    }

    /// 选中的构造函数，原生对象为 `None`
    pub fn constructor(&self) -> Option<&ConstructorInfo<T>> {
        self.constructor.as_ref()
    }

    pub fn methods(&self) -> &[MemberInfo<T>] {
        &self.methods
    }

    pub fn properties(&self) -> &[MemberInfo<T>] {
        &self.properties
    }

    pub fn fields(&self) -> &[MemberInfo<T>] {
        &self.fields
    }

    pub fn is_native(&self) -> bool {
        self.native
    }

    pub fn disposer(&self) -> Option<&DisposeFn<T>> {
        self.disposer.as_ref()
    }

    /// 调用构造函数并完成成员注入
    pub fn create(&self, ctx: &InjectContext<'_>) -> DependencyResult<T> {
        let constructor = self.constructor.as_ref().ok_or_else(|| {
            DependencyError::unsupported_construction(
                self.type_key.name(),
                "宿主原生对象不能由容器直接构造",
            )
        })?;

        let mut instance = constructor.invoke(ctx)?;
        self.inject_members(&mut instance, ctx)?;
        Ok(instance)
    }

    /// 依次注入方法、属性、字段
    pub fn inject_members(&self, instance: &mut T, ctx: &InjectContext<'_>) -> DependencyResult<()> {
        for member in self
            .methods
            .iter()
            .chain(self.properties.iter())
            .chain(self.fields.iter())
        {
            member.inject(instance, ctx)?;
        }
        Ok(())
    }
}

fn select_constructor<T>(
    type_key: TypeKey,
    constructors: &[ConstructorInfo<T>],
) -> DependencyResult<ConstructorInfo<T>> {
    let annotated: Vec<&ConstructorInfo<T>> =
        constructors.iter().filter(|c| c.is_annotated()).collect();
    match annotated.as_slice() {
        [] => {}
        [only] => return Ok((*only).clone()),
        many => {
            return Err(DependencyError::ambiguous_constructor(
                type_key.name(),
                format!(
                    "{} 个构造函数同时标注为注入目标: {}",
                    many.len(),
                    join_names(many)
                ),
            ))
        }
    }

    let explicit: Vec<&ConstructorInfo<T>> =
        constructors.iter().filter(|c| !c.is_implicit()).collect();
    if explicit.is_empty() {
        return constructors
            .iter()
            .find(|c| c.is_implicit())
            .cloned()
            .ok_or_else(|| {
                DependencyError::ambiguous_constructor(
                    type_key.name(),
                    "没有声明任何构造函数，也没有可用的无参构造函数",
                )
            });
    }

    let max_arity = explicit.iter().map(|c| c.arity()).max().unwrap_or(0);
    let richest: Vec<&ConstructorInfo<T>> = explicit
        .into_iter()
        .filter(|c| c.arity() == max_arity)
        .collect();
    match richest.as_slice() {
        [only] => Ok((*only).clone()),
        many => Err(DependencyError::ambiguous_constructor(
            type_key.name(),
            format!(
                "{} 个构造函数具有相同的最大参数个数 {}: {}",
                many.len(),
                max_arity,
                join_names(many)
            ),
        )),
    }
}

fn join_names<T>(constructors: &[&ConstructorInfo<T>]) -> String {
    constructors
        .iter()
        .map(|c| c.name())
        .collect::<Vec<_>>()
        .join(", ")
}

static GLOBAL_PLAN_CACHE: Lazy<Arc<InjectionPlanCache>> =
    Lazy::new(|| Arc::new(InjectionPlanCache::new()));

/// 注入计划缓存
///
/// 每个类型只分析一次，可在线程间共享
#[derive(Default)]
pub struct InjectionPlanCache {
    plans: DashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl InjectionPlanCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 进程级共享缓存
    pub fn global() -> Arc<Self> {
        GLOBAL_PLAN_CACHE.clone()
    }

    /// 获取或分析组件类型的注入计划
    pub fn get_or_analyze<T: Injectable>(&self) -> DependencyResult<Arc<InjectTypeInfo<T>>> {
        let key = TypeId::of::<T>();
        if let Some(existing) = self.plans.get(&key) {
            let erased = existing.value().clone();
            drop(existing);
            return Self::downcast(erased);
        }

        let entry = self.plans.entry(key).or_try_insert_with(|| {
            debug!("分析注入计划: {}", std::any::type_name::<T>());
            InjectTypeInfo::<T>::analyze().map(|plan| Arc::new(plan) as Arc<dyn Any + Send + Sync>)
        })?;
        let erased = entry.value().clone();
        drop(entry);
        Self::downcast(erased)
    }

    /// 是否已缓存组件类型的计划
    pub fn contains<T: 'static>(&self) -> bool {
        self.plans.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    pub fn clear(&self) {
        self.plans.clear();
    }

    fn downcast<T: Injectable>(
        erased: Arc<dyn Any + Send + Sync>,
    ) -> DependencyResult<Arc<InjectTypeInfo<T>>> {
        erased
            .downcast::<InjectTypeInfo<T>>()
            .map_err(|_| DependencyError::TypeMismatch {
                expected: std::any::type_name::<InjectTypeInfo<T>>().to_string(),
                actual: "缓存中的其他计划类型".to_string(),
            })
    }
}
