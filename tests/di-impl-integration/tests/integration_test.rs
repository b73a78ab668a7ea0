//! 依赖注入容器的跨 crate 集成测试
use di_abstractions::{ContainerConfig, TypeDescriptor};
use di_impl::prelude::*;
use injection_macros::Injectable;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

trait IFoo: Send + Sync {
    fn id(&self) -> usize;
}

trait IBar: Send + Sync {
    fn foo(&self) -> &Arc<dyn IFoo>;
}

static FOO_IDS: AtomicUsize = AtomicUsize::new(0);

struct Foo {
    id: usize,
}

impl IFoo for Foo {
    fn id(&self) -> usize {
        self.id
    }
}

impl Injectable for Foo {
    fn describe(descriptor: &mut TypeDescriptor<Self>) {
        descriptor.constructor("new", || Foo {
            id: FOO_IDS.fetch_add(1, Ordering::SeqCst),
        });
    }
}

#[derive(Injectable)]
struct Bar {
    foo: Arc<dyn IFoo>,
}

impl IBar for Bar {
    fn foo(&self) -> &Arc<dyn IFoo> {
        &self.foo
    }
}

#[test]
fn test_end_to_end_singleton_shared_by_transients() -> anyhow::Result<()> {
    let mut builder = DiContainerBuilder::new();
    builder
        .register::<Foo>(Lifetime::Singleton)
        .as_contract::<dyn IFoo>(|it| it);
    builder
        .register::<Bar>(Lifetime::Transient)
        .as_contract::<dyn IBar>(|it| it);
    let container = builder.build()?;

    let first = container.resolve::<dyn IBar>()?;
    let second = container.resolve::<dyn IBar>()?;

    assert!(!Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(first.foo(), second.foo()));
    assert_eq!(first.foo().id(), second.foo().id());
    Ok(())
}

struct Expensive;

#[test]
fn test_singleton_constructed_once_under_concurrency() -> anyhow::Result<()> {
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = calls.clone();

    let mut builder = DiContainerBuilder::new();
    builder.register_factory(Lifetime::Singleton, move |_: &dyn ObjectResolver| {
        counted.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        Ok(Expensive)
    });
    let container = builder.build()?;

    let resolved: Vec<Arc<Expensive>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| container.resolve::<Expensive>()))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("解析线程不应崩溃"))
            .collect::<DependencyResult<Vec<_>>>()
    })?;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(resolved.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    Ok(())
}

#[test]
fn test_scoped_constructed_once_per_scope_under_concurrency() -> anyhow::Result<()> {
    let calls = Arc::new(AtomicUsize::new(0));
    let root = DiContainerBuilder::new().build()?;

    let counted = calls.clone();
    let child = root.create_scope(move |child| {
        child.register_factory(Lifetime::Scoped, move |_: &dyn ObjectResolver| {
            counted.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            Ok(Session)
        });
    })?;

    let resolved: Vec<Arc<Session>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| child.resolve::<Session>()))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("解析线程不应崩溃"))
            .collect::<DependencyResult<Vec<_>>>()
    })?;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(resolved.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    assert!(root.try_resolve::<Session>()?.is_none());
    Ok(())
}

#[derive(Injectable)]
struct Fresh;

#[test]
fn test_transient_resolutions_are_distinct() -> anyhow::Result<()> {
    let mut builder = DiContainerBuilder::new();
    builder.register::<Fresh>(Lifetime::Transient);
    let container = builder.build()?;

    let instances = (0..5)
        .map(|_| container.resolve::<Fresh>())
        .collect::<DependencyResult<Vec<_>>>()?;
    for (index, instance) in instances.iter().enumerate() {
        for other in &instances[index + 1..] {
            assert!(!Arc::ptr_eq(instance, other));
        }
    }
    Ok(())
}

#[derive(Injectable)]
struct Session;

#[test]
fn test_scoped_owned_by_parent_is_shared_with_children() -> anyhow::Result<()> {
    let mut builder = DiContainerBuilder::new();
    builder.register::<Session>(Lifetime::Scoped);
    let root = builder.build()?;

    let left = root.create_scope(|_| {})?;
    let right = root.create_scope(|_| {})?;

    let from_root = root.resolve::<Session>()?;
    assert!(Arc::ptr_eq(&from_root, &root.resolve::<Session>()?));
    assert!(Arc::ptr_eq(&from_root, &left.resolve::<Session>()?));
    assert!(Arc::ptr_eq(&from_root, &right.resolve::<Session>()?));
    Ok(())
}

#[test]
fn test_scoped_owned_by_each_child_differs() -> anyhow::Result<()> {
    let root = DiContainerBuilder::new().build()?;

    let left = root.create_scope(|builder| {
        builder.register::<Session>(Lifetime::Scoped);
    })?;
    let right = root.create_scope(|builder| {
        builder.register::<Session>(Lifetime::Scoped);
    })?;

    let from_left = left.resolve::<Session>()?;
    assert!(Arc::ptr_eq(&from_left, &left.resolve::<Session>()?));
    assert!(!Arc::ptr_eq(&from_left, &right.resolve::<Session>()?));
    assert!(root.try_resolve::<Session>()?.is_none());
    Ok(())
}

trait Plugin: Send + Sync {
    fn id(&self) -> &'static str;
}

macro_rules! plugin {
    ($name:ident, $id:literal) => {
        #[derive(Injectable)]
        struct $name;

        impl Plugin for $name {
            fn id(&self) -> &'static str {
                $id
            }
        }
    };
}

plugin!(PluginA, "A");
plugin!(PluginB, "B");
plugin!(PluginC, "C");

#[test]
fn test_collection_lists_local_before_parent() -> anyhow::Result<()> {
    let mut builder = DiContainerBuilder::new();
    builder
        .register::<PluginA>(Lifetime::Singleton)
        .as_contract::<dyn Plugin>(|it| it);
    builder
        .register::<PluginB>(Lifetime::Transient)
        .as_contract::<dyn Plugin>(|it| it);
    let root = builder.build()?;

    let child = root.create_scope(|builder| {
        builder
            .register::<PluginC>(Lifetime::Transient)
            .as_contract::<dyn Plugin>(|it| it);
    })?;

    let ids: Vec<_> = child
        .resolve_all::<dyn Plugin>()?
        .iter()
        .map(|plugin| plugin.id())
        .collect();
    assert_eq!(ids, vec!["C", "A", "B"]);

    let list = child.resolve_list::<dyn Plugin>()?;
    assert_eq!(list.len(), 3);

    // 单例元素经由所属作用域缓存
    let from_root = root.resolve_all::<dyn Plugin>()?;
    assert!(Arc::ptr_eq(&from_root[0], &list[1]));
    Ok(())
}

#[test]
fn test_empty_collection_is_not_registered() -> anyhow::Result<()> {
    let container = DiContainerBuilder::new().build()?;

    assert!(matches!(
        container.resolve_all::<dyn Plugin>(),
        Err(DependencyError::NotRegistered { .. })
    ));
    Ok(())
}

#[derive(Default)]
struct DisposeLog {
    entries: Mutex<Vec<&'static str>>,
}

impl DisposeLog {
    fn record(&self, entry: &'static str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry);
        }
    }

    fn snapshot(&self) -> Vec<&'static str> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

macro_rules! disposable {
    ($name:ident, $label:literal) => {
        #[derive(Injectable)]
        #[inject(disposable)]
        struct $name {
            log: Arc<DisposeLog>,
        }

        impl Disposable for $name {
            fn dispose(&self) {
                self.log.record($label);
            }
        }
    };
}

disposable!(ResourceX, "X");
disposable!(ResourceY, "Y");
disposable!(ResourceZ, "Z");

#[test]
fn test_dispose_runs_in_reverse_construction_order() -> anyhow::Result<()> {
    let log = Arc::new(DisposeLog::default());

    let mut builder = DiContainerBuilder::new();
    builder.register_instance(log.clone());
    builder.register::<ResourceX>(Lifetime::Singleton);
    builder.register::<ResourceY>(Lifetime::Singleton);
    builder.register::<ResourceZ>(Lifetime::Singleton);
    let container = builder.build()?;

    container.resolve::<ResourceX>()?;
    container.resolve::<ResourceY>()?;
    container.resolve::<ResourceZ>()?;
    container.dispose();
    container.dispose();

    assert_eq!(log.snapshot(), vec!["Z", "Y", "X"]);
    Ok(())
}

#[test]
fn test_child_disposal_leaves_parent_alive() -> anyhow::Result<()> {
    let log = Arc::new(DisposeLog::default());

    let mut builder = DiContainerBuilder::new();
    builder.register_instance(log.clone());
    builder.register::<ResourceX>(Lifetime::Singleton);
    let root = builder.build()?;

    let child = root.create_scope(|builder| {
        builder.register::<ResourceY>(Lifetime::Scoped);
    })?;
    child.resolve::<ResourceX>()?;
    child.resolve::<ResourceY>()?;
    child.dispose();

    assert_eq!(log.snapshot(), vec!["Y"]);
    assert!(root.resolve::<ResourceX>().is_ok());

    root.dispose();
    assert_eq!(log.snapshot(), vec!["Y", "X"]);
    Ok(())
}

struct Chicken {
    _egg: Arc<Egg>,
}

struct Egg {
    _chicken: Arc<Chicken>,
}

impl Injectable for Chicken {
    fn describe(descriptor: &mut TypeDescriptor<Self>) {
        descriptor.constructor("new", |egg: Arc<Egg>| Chicken { _egg: egg });
    }
}

impl Injectable for Egg {
    fn describe(descriptor: &mut TypeDescriptor<Self>) {
        descriptor.constructor("new", |chicken: Arc<Chicken>| Egg { _chicken: chicken });
    }
}

#[test]
fn test_circular_dependency_is_reported() -> anyhow::Result<()> {
    for lifetime in [Lifetime::Transient, Lifetime::Singleton] {
        let mut builder = DiContainerBuilder::new();
        builder.register::<Chicken>(lifetime);
        builder.register::<Egg>(lifetime);
        let container = builder.build()?;

        match container.resolve::<Chicken>() {
            Err(DependencyError::CircularDependency { dependency_chain }) => {
                assert!(dependency_chain.contains("Chicken"));
                assert!(dependency_chain.contains("Egg"));
            }
            other => anyhow::bail!("期望循环依赖错误, 实际: {:?}", other.map(|_| ())),
        }

        // 失败的构造不会留下缓存
        assert!(matches!(
            container.resolve::<Egg>(),
            Err(DependencyError::CircularDependency { .. })
        ));
    }
    Ok(())
}

#[derive(Injectable)]
struct Leaf;

#[derive(Injectable)]
struct Middle {
    _leaf: Arc<Leaf>,
}

#[derive(Injectable)]
struct Top {
    _middle: Arc<Middle>,
}

#[test]
fn test_resolution_depth_is_bounded() -> anyhow::Result<()> {
    let config = ContainerConfig {
        max_resolution_depth: 2,
        ..ContainerConfig::default()
    };
    let mut builder = DiContainerBuilder::new().with_config(config);
    builder.register::<Leaf>(Lifetime::Transient);
    builder.register::<Middle>(Lifetime::Transient);
    builder.register::<Top>(Lifetime::Transient);
    let container = builder.build()?;

    assert!(container.resolve::<Middle>().is_ok());
    assert!(matches!(
        container.resolve::<Top>(),
        Err(DependencyError::MaxDepthExceeded { max_depth: 2, .. })
    ));
    Ok(())
}

struct Widget {
    chosen: &'static str,
}

impl Injectable for Widget {
    fn describe(descriptor: &mut TypeDescriptor<Self>) {
        descriptor
            .constructor("empty", || Widget { chosen: "empty" })
            .constructor("one", |_: Arc<Leaf>| Widget { chosen: "one" })
            .constructor("two", |_: Arc<Leaf>, _: Arc<Fresh>| Widget { chosen: "two" });
    }
}

struct Tied;

impl Injectable for Tied {
    fn describe(descriptor: &mut TypeDescriptor<Self>) {
        descriptor
            .constructor("left", |_: Arc<Leaf>, _: Arc<Fresh>| Tied)
            .constructor("right", |_: Arc<Fresh>, _: Arc<Leaf>| Tied);
    }
}

struct Marked {
    chosen: &'static str,
}

impl Injectable for Marked {
    fn describe(descriptor: &mut TypeDescriptor<Self>) {
        descriptor
            .constructor("two", |_: Arc<Leaf>, _: Arc<Fresh>| Marked { chosen: "two" })
            .inject_constructor("one", |_: Arc<Leaf>| Marked { chosen: "one" });
    }
}

#[test]
fn test_constructor_selection() -> anyhow::Result<()> {
    let mut builder = DiContainerBuilder::new();
    builder.register::<Leaf>(Lifetime::Transient);
    builder.register::<Fresh>(Lifetime::Transient);
    builder.register::<Widget>(Lifetime::Transient);
    builder.register::<Tied>(Lifetime::Transient);
    builder.register::<Marked>(Lifetime::Transient);
    let container = builder.build()?;

    assert_eq!(container.resolve::<Widget>()?.chosen, "two");
    assert_eq!(container.resolve::<Marked>()?.chosen, "one");
    assert!(matches!(
        container.resolve::<Tied>(),
        Err(DependencyError::AmbiguousConstructor { .. })
    ));
    Ok(())
}

#[test]
fn test_validate_on_build_reports_ambiguous_constructor() {
    let config = ContainerConfig {
        validate_on_build: true,
        ..ContainerConfig::default()
    };
    let mut builder = DiContainerBuilder::new().with_config(config);
    builder.register::<Tied>(Lifetime::Transient);

    assert!(matches!(
        builder.build(),
        Err(DependencyError::AmbiguousConstructor { .. })
    ));
}

#[test]
fn test_not_registered_versus_try_resolve() -> anyhow::Result<()> {
    let container = DiContainerBuilder::new().build()?;

    assert!(matches!(
        container.resolve::<dyn IFoo>(),
        Err(DependencyError::NotRegistered { .. })
    ));
    assert!(container.try_resolve::<dyn IFoo>()?.is_none());
    assert!(!container.contains::<dyn IFoo>());
    Ok(())
}

#[test]
fn test_failed_dependency_propagates_without_caching() -> anyhow::Result<()> {
    let mut builder = DiContainerBuilder::new();
    builder
        .register::<Bar>(Lifetime::Singleton)
        .as_contract::<dyn IBar>(|it| it);
    let root = builder.build()?;

    assert!(matches!(
        root.resolve::<dyn IBar>(),
        Err(DependencyError::NotRegistered { .. })
    ));
    assert_eq!(root.stats().active_instances, 0);

    // 子作用域补上缺失的依赖后，父作用域的单例仍由父作用域解析
    let child = root.create_scope(|builder| {
        builder
            .register::<Foo>(Lifetime::Singleton)
            .as_contract::<dyn IFoo>(|it| it);
    })?;
    assert!(matches!(
        child.resolve::<dyn IBar>(),
        Err(DependencyError::NotRegistered { .. })
    ));
    Ok(())
}

#[derive(Injectable)]
struct Inspector {
    resolver: Arc<dyn ObjectResolver>,
}

#[test]
fn test_resolver_injects_itself() -> anyhow::Result<()> {
    let mut builder = DiContainerBuilder::named("game");
    builder.register::<Inspector>(Lifetime::Transient);
    let root = builder.build()?;
    let child = root.create_named_scope("level", |_| {})?;

    let inspector = child.resolve::<Inspector>()?;
    assert_eq!(inspector.resolver.scope_name(), "level");
    assert!(inspector.resolver.contains::<Inspector>());
    Ok(())
}

#[derive(Clone, Default, Injectable)]
#[inject(native)]
struct Actor {
    label: &'static str,
    #[inject]
    foo: Option<Arc<dyn IFoo>>,
}

#[test]
fn test_native_objects_are_never_constructed_directly() -> anyhow::Result<()> {
    let mut builder = DiContainerBuilder::new();
    builder
        .register::<Foo>(Lifetime::Singleton)
        .as_contract::<dyn IFoo>(|it| it);
    builder.register::<Actor>(Lifetime::Transient);
    let container = builder.build()?;

    assert!(matches!(
        container.resolve::<Actor>(),
        Err(DependencyError::UnsupportedConstruction { .. })
    ));
    Ok(())
}

#[test]
fn test_native_providers() -> anyhow::Result<()> {
    let existing = Arc::new(Actor {
        label: "existing",
        foo: None,
    });
    let found = existing.clone();

    let mut builder = DiContainerBuilder::new();
    builder
        .register::<Foo>(Lifetime::Singleton)
        .as_contract::<dyn IFoo>(|it| it);
    builder
        .register_native_existing(Lifetime::Singleton, move |_: &dyn ObjectResolver| {
            Ok(found.clone())
        })
        .keyed("existing");
    builder
        .register_native_spawn(Lifetime::Transient, |_: &dyn ObjectResolver| {
            Ok(Actor {
                label: "spawned",
                foo: None,
            })
        })
        .keyed("spawned");
    let container = builder.build()?;

    let from_scene = container.resolve_named::<Actor>("existing")?;
    assert!(Arc::ptr_eq(&from_scene, &existing));
    assert!(from_scene.foo.is_none());

    let spawned = container.resolve_named::<Actor>("spawned")?;
    assert_eq!(spawned.label, "spawned");
    assert!(spawned.foo.is_some());
    Ok(())
}
