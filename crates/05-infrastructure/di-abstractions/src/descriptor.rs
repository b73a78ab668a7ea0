//! 注入描述符
//!
//! 组件通过 [`Injectable::describe`] 声明自己的构造函数和注入成员，
//! 容器据此生成注入计划

use crate::injection::{Dependency, InjectContext};
use infrastructure_common::{DependencyResult, Disposable, TypeKey};
use std::fmt;
use std::sync::Arc;

/// 构造函数调用
pub type ConstructFn<T> = Arc<dyn Fn(&InjectContext<'_>) -> DependencyResult<T> + Send + Sync>;

/// 成员注入调用
pub type MemberFn<T> =
    Arc<dyn Fn(&mut T, &InjectContext<'_>) -> DependencyResult<()> + Send + Sync>;

/// 释放调用
pub type DisposeFn<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// 可注入组件 trait
///
/// 由 `#[derive(Injectable)]` 生成，也可以手写
pub trait Injectable: Sized + Send + Sync + 'static {
    /// 声明构造函数与注入成员
    fn describe(descriptor: &mut TypeDescriptor<Self>);
}

/// 参数种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    /// 必需的单个实例
    Required,
    /// 可选的单个实例
    Optional,
    /// 序列
    Sequence,
    /// 只读列表
    ReadOnlyList,
    /// 开放泛型的闭合形式
    Generic,
}

/// 参数元数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterInfo {
    parameter_type: TypeKey,
    contract: TypeKey,
    kind: ParameterKind,
}

impl ParameterInfo {
    /// 创建参数元数据，`P` 为参数本身的类型
    pub fn new<P: 'static>(contract: TypeKey, kind: ParameterKind) -> Self {
        Self {
            parameter_type: TypeKey::of::<P>(),
            contract,
            kind,
        }
    }

    /// 参数类型（例如 `Arc<dyn IFoo>`）
    pub fn parameter_type(&self) -> TypeKey {
        self.parameter_type
    }

    /// 被请求的契约类型
    pub fn contract(&self) -> TypeKey {
        self.contract
    }

    pub fn kind(&self) -> ParameterKind {
        self.kind
    }
}

/// 构造函数元数据
pub struct ConstructorInfo<T> {
    name: &'static str,
    parameters: Vec<ParameterInfo>,
    annotated: bool,
    implicit: bool,
    invoke: ConstructFn<T>,
}

impl<T> ConstructorInfo<T> {
    /// 构造函数名称
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 参数列表
    pub fn parameters(&self) -> &[ParameterInfo] {
        &self.parameters
    }

    /// 参数个数
    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    /// 是否标注为注入构造函数
    pub fn is_annotated(&self) -> bool {
        self.annotated
    }

    /// 是否为隐式的无参构造函数（来自 `Default`）
    pub fn is_implicit(&self) -> bool {
        self.implicit
    }

    /// 解析参数并调用构造函数
    pub fn invoke(&self, ctx: &InjectContext<'_>) -> DependencyResult<T> {
        (self.invoke)(ctx)
    }
}

impl<T> Clone for ConstructorInfo<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            parameters: self.parameters.clone(),
            annotated: self.annotated,
            implicit: self.implicit,
            invoke: self.invoke.clone(),
        }
    }
}

impl<T> fmt::Debug for ConstructorInfo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorInfo")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .field("annotated", &self.annotated)
            .field("implicit", &self.implicit)
            .finish()
    }
}

/// 注入成员种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    /// 注入方法
    Method,
    /// 注入属性
    Property,
    /// 注入字段
    Field,
}

/// 注入成员元数据
pub struct MemberInfo<T> {
    name: &'static str,
    kind: MemberKind,
    parameters: Vec<ParameterInfo>,
    setter: Option<MemberFn<T>>,
}

impl<T> MemberInfo<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    pub fn parameters(&self) -> &[ParameterInfo] {
        &self.parameters
    }

    /// 是否可写（只读属性没有 setter）
    pub fn is_writable(&self) -> bool {
        self.setter.is_some()
    }

    /// 解析依赖并注入到实例，只读成员不做任何事
    pub fn inject(&self, target: &mut T, ctx: &InjectContext<'_>) -> DependencyResult<()> {
        match &self.setter {
            Some(setter) => setter(target, ctx),
            None => Ok(()),
        }
    }
}

impl<T> Clone for MemberInfo<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            kind: self.kind,
            parameters: self.parameters.clone(),
            setter: self.setter.clone(),
        }
    }
}

impl<T> fmt::Debug for MemberInfo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberInfo")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("parameters", &self.parameters)
            .field("writable", &self.is_writable())
            .finish()
    }
}

/// 类型描述符
///
/// 收集一个组件类型的全部注入信息
pub struct TypeDescriptor<T> {
    constructors: Vec<ConstructorInfo<T>>,
    members: Vec<MemberInfo<T>>,
    native: bool,
    disposer: Option<DisposeFn<T>>,
}

impl<T: Send + Sync + 'static> TypeDescriptor<T> {
    /// 创建空的描述符
    pub fn new() -> Self {
        Self {
            constructors: Vec::new(),
            members: Vec::new(),
            native: false,
            disposer: None,
        }
    }

    /// 声明一个显式构造函数
    ///
    /// 闭包参数必须标注类型，例如 `|foo: Arc<dyn IFoo>| Bar { foo }`
    pub fn constructor<Args, C>(&mut self, name: &'static str, constructor: C) -> &mut Self
    where
        C: Constructor<T, Args>,
    {
        self.push_constructor(name, false, constructor)
    }

    /// 声明一个标注为注入目标的构造函数
    pub fn inject_constructor<Args, C>(&mut self, name: &'static str, constructor: C) -> &mut Self
    where
        C: Constructor<T, Args>,
    {
        self.push_constructor(name, true, constructor)
    }

    /// 声明来自 `Default` 的隐式无参构造函数
    pub fn default_constructor(&mut self) -> &mut Self
    where
        T: Default,
    {
        self.constructors.push(ConstructorInfo {
            name: "default",
            parameters: Vec::new(),
            annotated: false,
            implicit: true,
            invoke: Arc::new(|_: &InjectContext<'_>| -> DependencyResult<T> { Ok(T::default()) }),
        });
        self
    }

    /// 以原始形式声明构造函数，供派生宏使用
    pub fn raw_constructor<F>(
        &mut self,
        name: &'static str,
        parameters: Vec<ParameterInfo>,
        annotated: bool,
        invoke: F,
    ) -> &mut Self
    where
        F: Fn(&InjectContext<'_>) -> DependencyResult<T> + Send + Sync + 'static,
    {
        self.constructors.push(ConstructorInfo {
            name,
            parameters,
            annotated,
            implicit: false,
            invoke: Arc::new(invoke),
        });
        self
    }

    /// 声明注入字段
    pub fn field<D, F>(&mut self, name: &'static str, setter: F) -> &mut Self
    where
        D: Dependency,
        F: Fn(&mut T, D) + Send + Sync + 'static,
    {
        self.push_setter(name, MemberKind::Field, setter)
    }

    /// 声明可写的注入属性
    pub fn property<D, F>(&mut self, name: &'static str, setter: F) -> &mut Self
    where
        D: Dependency,
        F: Fn(&mut T, D) + Send + Sync + 'static,
    {
        self.push_setter(name, MemberKind::Property, setter)
    }

    /// 声明只读属性，分析时会被跳过
    pub fn read_only_property<D: Dependency>(&mut self, name: &'static str) -> &mut Self {
        self.members.push(MemberInfo {
            name,
            kind: MemberKind::Property,
            parameters: vec![D::parameter_info()],
            setter: None,
        });
        self
    }

    /// 声明注入方法
    pub fn method<Args, M>(&mut self, name: &'static str, method: M) -> &mut Self
    where
        M: InjectMethod<T, Args>,
    {
        let method = Arc::new(method);
        self.members.push(MemberInfo {
            name,
            kind: MemberKind::Method,
            parameters: M::parameters(),
            setter: Some(Arc::new(move |target: &mut T, ctx: &InjectContext<'_>| {
                method.invoke(target, ctx)
            })),
        });
        self
    }

    /// 标记为宿主原生对象，容器不得直接构造
    pub fn native_object(&mut self) -> &mut Self {
        self.native = true;
        self
    }

    /// 标记为可释放，作用域释放时调用 [`Disposable::dispose`]
    pub fn disposable(&mut self) -> &mut Self
    where
        T: Disposable,
    {
        self.disposer = Some(Arc::new(|instance: &T| instance.dispose()));
        self
    }

    pub fn constructors(&self) -> &[ConstructorInfo<T>] {
        &self.constructors
    }

    pub fn members(&self) -> &[MemberInfo<T>] {
        &self.members
    }

    pub fn is_native(&self) -> bool {
        self.native
    }

    pub fn disposer(&self) -> Option<&DisposeFn<T>> {
        self.disposer.as_ref()
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        Vec<ConstructorInfo<T>>,
        Vec<MemberInfo<T>>,
        bool,
        Option<DisposeFn<T>>,
    ) {
        (self.constructors, self.members, self.native, self.disposer)
    }

    fn push_constructor<Args, C>(&mut self, name: &'static str, annotated: bool, constructor: C) -> &mut Self
    where
        C: Constructor<T, Args>,
    {
        let parameters = C::parameters();
        self.constructors.push(ConstructorInfo {
            name,
            parameters,
            annotated,
            implicit: false,
            invoke: Arc::new(move |ctx: &InjectContext<'_>| constructor.construct(ctx)),
        });
        self
    }

    fn push_setter<D, F>(&mut self, name: &'static str, kind: MemberKind, setter: F) -> &mut Self
    where
        D: Dependency,
        F: Fn(&mut T, D) + Send + Sync + 'static,
    {
        self.members.push(MemberInfo {
            name,
            kind,
            parameters: vec![D::parameter_info()],
            setter: Some(Arc::new(
                move |target: &mut T, ctx: &InjectContext<'_>| -> DependencyResult<()> {
                    let value = D::resolve(ctx)?;
                    setter(target, value);
                    Ok(())
                },
            )),
        });
        self
    }
}

impl<T: Send + Sync + 'static> Default for TypeDescriptor<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// 构造函数 trait
///
/// 为参数均实现了 [`Dependency`] 的 `Fn(A1, .., An) -> T` 闭包实现，最多 8 个参数
pub trait Constructor<T, Args>: Send + Sync + 'static {
    /// 参数元数据
    fn parameters() -> Vec<ParameterInfo>;

    /// 解析参数并构造实例
    fn construct(&self, ctx: &InjectContext<'_>) -> DependencyResult<T>;
}

/// 注入方法 trait
///
/// 为 `Fn(&mut T, A1, .., An)` 闭包实现，最多 8 个参数
pub trait InjectMethod<T, Args>: Send + Sync + 'static {
    fn parameters() -> Vec<ParameterInfo>;

    fn invoke(&self, target: &mut T, ctx: &InjectContext<'_>) -> DependencyResult<()>;
}

macro_rules! impl_injection_arity {
    ($($param:ident),*) => {
        impl<T, F, $($param,)*> Constructor<T, ($($param,)*)> for F
        where
            F: Fn($($param),*) -> T + Send + Sync + 'static,
            $($param: Dependency,)*
        {
            fn parameters() -> Vec<ParameterInfo> {
                vec![$(<$param as Dependency>::parameter_info()),*]
            }

            #[allow(non_snake_case, unused_variables)]
            fn construct(&self, ctx: &InjectContext<'_>) -> DependencyResult<T> {
                $(let $param = <$param as Dependency>::resolve(ctx)?;)*
                Ok((self)($($param),*))
            }
        }

        impl<T, F, $($param,)*> InjectMethod<T, ($($param,)*)> for F
        where
            F: Fn(&mut T, $($param),*) + Send + Sync + 'static,
            $($param: Dependency,)*
        {
            fn parameters() -> Vec<ParameterInfo> {
                vec![$(<$param as Dependency>::parameter_info()),*]
            }

            #[allow(non_snake_case, unused_variables)]
            fn invoke(&self, target: &mut T, ctx: &InjectContext<'_>) -> DependencyResult<()> {
                $(let $param = <$param as Dependency>::resolve(ctx)?;)*
                (self)(target, $($param),*);
                Ok(())
            }
        }
    };
}

impl_injection_arity!();
impl_injection_arity!(A1);
impl_injection_arity!(A1, A2);
impl_injection_arity!(A1, A2, A3);
impl_injection_arity!(A1, A2, A3, A4);
impl_injection_arity!(A1, A2, A3, A4, A5);
impl_injection_arity!(A1, A2, A3, A4, A5, A6);
impl_injection_arity!(A1, A2, A3, A4, A5, A6, A7);
impl_injection_arity!(A1, A2, A3, A4, A5, A6, A7, A8);
