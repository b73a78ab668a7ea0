//! 生命周期作用域集成测试

use async_trait::async_trait;
use di_abstractions::ResolverExt;
use di_impl::DiContainerBuilder;
use infrastructure_common::{
    DependencyError, DependencyResult, LifecycleError, LifecycleResult, Lifetime,
};
use infrastructure_composition::{
    AsyncStartable, EntryPointExceptionHandler, EntryPointKind, EntryPointRegistrationExt,
    FnInstaller, InfrastructureError, Initializable, Installer, LateTickable, LifetimeScope,
    ManualTickScheduler, PostInitializable, PostStartable, ScopeStatus, Startable, Tickable,
};
use injection_macros::Injectable;
use parking_lot::Mutex;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct Journal {
    entries: Mutex<Vec<String>>,
}

impl Journal {
    fn push(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }
}

#[derive(Injectable)]
struct Recorder {
    journal: Arc<Journal>,
}

impl Initializable for Recorder {
    fn initialize(&self) -> LifecycleResult<()> {
        self.journal.push("initialize");
        Ok(())
    }
}

impl PostInitializable for Recorder {
    fn post_initialize(&self) -> LifecycleResult<()> {
        self.journal.push("post_initialize");
        Ok(())
    }
}

impl Startable for Recorder {
    fn start(&self) -> LifecycleResult<()> {
        self.journal.push("start");
        Ok(())
    }
}

impl PostStartable for Recorder {
    fn post_start(&self) -> LifecycleResult<()> {
        self.journal.push("post_start");
        Ok(())
    }
}

impl Tickable for Recorder {
    fn tick(&self) -> LifecycleResult<()> {
        self.journal.push("tick");
        Ok(())
    }
}

impl LateTickable for Recorder {
    fn late_tick(&self) -> LifecycleResult<()> {
        self.journal.push("late_tick");
        Ok(())
    }
}

#[derive(Injectable)]
struct Faulty;

impl Startable for Faulty {
    fn start(&self) -> LifecycleResult<()> {
        Err(LifecycleError::entry_point_failed("Faulty", "boom"))
    }
}

fn recorder_installer(
    journal: Arc<Journal>,
) -> impl Fn(&mut DiContainerBuilder) -> DependencyResult<()> + Send + Sync + 'static {
    move |builder| {
        builder.register_instance(journal.clone());
        builder
            .register::<Recorder>(Lifetime::Singleton)
            .as_initializable()
            .as_post_initializable()
            .as_startable()
            .as_post_startable()
            .as_tickable()
            .as_late_tickable();
        Ok(())
    }
}

#[tokio::test]
async fn test_entry_points_run_in_phase_order() -> anyhow::Result<()> {
    let journal = Arc::new(Journal::default());
    let scheduler = Arc::new(ManualTickScheduler::new());

    let scope = LifetimeScope::builder()
        .named("game")
        .install("recorder", recorder_installer(journal.clone()))
        .with_tick_scheduler(scheduler.clone())
        .build()?;
    assert_eq!(scope.status(), ScopeStatus::Built);

    scope.start().await?;
    assert_eq!(scope.status(), ScopeStatus::Running);
    assert_eq!(
        journal.entries(),
        vec!["initialize", "post_initialize", "start", "post_start"]
    );

    assert_eq!(scheduler.tickable_count(), 1);
    assert_eq!(scheduler.late_tickable_count(), 1);
    scheduler.run_frame();
    assert_eq!(&journal.entries()[4..], ["tick", "late_tick"]);
    assert_eq!(scheduler.frame_count(), 1);

    scope.stop().await?;
    scope.stop().await?;
    assert_eq!(scope.status(), ScopeStatus::Stopped);
    assert!(scope.metrics().uptime().is_some());
    Ok(())
}

#[tokio::test]
async fn test_start_failure_without_handler_marks_failed() -> anyhow::Result<()> {
    let scope = LifetimeScope::builder()
        .install("faulty", |builder| {
            builder.register::<Faulty>(Lifetime::Transient).as_startable();
            Ok(())
        })
        .build()?;

    let error = match scope.start().await {
        Ok(()) => anyhow::bail!("入口点失败时启动不应成功"),
        Err(error) => error,
    };
    assert!(matches!(error, InfrastructureError::LifecycleError { .. }));
    assert_eq!(scope.status(), ScopeStatus::Failed);

    // 失败后不能再次启动
    assert!(scope.start().await.is_err());
    Ok(())
}

#[tokio::test]
async fn test_exception_handler_keeps_dispatch_going() -> anyhow::Result<()> {
    let journal = Arc::new(Journal::default());
    let failures = Arc::new(Mutex::new(Vec::new()));
    let sink = failures.clone();
    let recorder = recorder_installer(journal.clone());

    let scope = LifetimeScope::builder()
        .install("faulty", |builder| {
            builder.register::<Faulty>(Lifetime::Transient).as_startable();
            Ok(())
        })
        .install("recorder", recorder)
        .with_tick_scheduler(Arc::new(ManualTickScheduler::new()))
        .with_exception_handler(EntryPointExceptionHandler::new(move |kind, error| {
            sink.lock().push((kind, error.to_string()));
        }))
        .build()?;

    scope.start().await?;

    let failures = failures.lock().clone();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, EntryPointKind::Start);
    assert!(failures[0].1.contains("boom"));
    assert!(journal.entries().contains(&"post_start".to_string()));
    assert_eq!(scope.status(), ScopeStatus::Running);
    Ok(())
}

#[tokio::test]
async fn test_tickables_require_a_scheduler() -> anyhow::Result<()> {
    let journal = Arc::new(Journal::default());
    let scope = LifetimeScope::builder()
        .install("recorder", recorder_installer(journal))
        .build()?;

    match scope.start().await {
        Err(InfrastructureError::LifecycleError {
            source: LifecycleError::LifecycleManagementFailed { .. },
        }) => {}
        other => anyhow::bail!("期望缺少调度器的错误, 实际: {:?}", other),
    }
    assert_eq!(scope.status(), ScopeStatus::Failed);
    Ok(())
}

#[derive(Injectable)]
struct Warmup {
    #[inject(default)]
    done: AtomicBool,
}

#[async_trait]
impl AsyncStartable for Warmup {
    async fn start_async(&self) -> LifecycleResult<()> {
        tokio::time::sleep(Duration::from_millis(10)).await;
        self.done.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_async_startables_finish_before_running() -> anyhow::Result<()> {
    let scope = LifetimeScope::builder()
        .install("warmup", |builder| {
            builder
                .register::<Warmup>(Lifetime::Singleton)
                .as_async_startable()
                .as_self();
            Ok(())
        })
        .build()?;

    scope.start().await?;
    assert!(scope.resolve::<Warmup>()?.done.load(Ordering::SeqCst));
    Ok(())
}

#[derive(Injectable)]
struct Boot {
    counter: Arc<AtomicUsize>,
}

impl Initializable for Boot {
    fn initialize(&self) -> LifecycleResult<()> {
        self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_child_scope_dispatches_only_local_entries() -> anyhow::Result<()> {
    let counter = Arc::new(AtomicUsize::new(0));
    let shared = counter.clone();

    let root = LifetimeScope::builder()
        .named("game")
        .install("boot", move |builder| {
            builder.register_instance(shared.clone());
            builder.register::<Boot>(Lifetime::Transient).as_initializable();
            Ok(())
        })
        .build()?;
    root.start().await?;
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    let level: Vec<Box<dyn Installer>> = vec![Box::new(FnInstaller::new("level", |builder| {
        builder.register::<Boot>(Lifetime::Transient).as_initializable();
        Ok(())
    }))];
    let child = root.create_child("level", level)?;
    assert_eq!(child.name(), "level");
    child.start().await?;
    assert_eq!(counter.load(Ordering::SeqCst), 2);

    // 子作用域的集合请求仍然聚合父作用域的注册
    let all = child.container().resolve_all::<dyn Initializable>()?;
    assert_eq!(all.len(), 2);

    child.stop().await?;
    assert!(child.container().is_disposed());
    assert!(!root.container().is_disposed());
    root.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_child_installer_failure_is_returned() -> anyhow::Result<()> {
    let root = LifetimeScope::builder().build()?;

    let callbacks = Arc::new(AtomicUsize::new(0));
    let later = Arc::new(AtomicUsize::new(0));
    let (seen, skipped) = (callbacks.clone(), later.clone());

    let level: Vec<Box<dyn Installer>> = vec![
        Box::new(FnInstaller::new("hooks", move |builder| {
            let seen = seen.clone();
            builder.register_build_callback(move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
            Ok(())
        })),
        Box::new(FnInstaller::new("broken", |_| {
            Err(DependencyError::registration("level", "missing asset"))
        })),
        Box::new(FnInstaller::new("after", move |_| {
            skipped.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })),
    ];
    let error = match root.create_child("level", level) {
        Ok(_) => anyhow::bail!("安装器失败时不应创建子作用域"),
        Err(error) => error,
    };
    match error {
        InfrastructureError::DependencyError { source } => {
            assert!(source.to_string().contains("missing asset"));
        }
        other => anyhow::bail!("期望安装器错误, 实际: {:?}", other),
    }
    assert_eq!(callbacks.load(Ordering::SeqCst), 0);
    assert_eq!(later.load(Ordering::SeqCst), 0);
    assert!(!root.container().is_disposed());
    Ok(())
}

#[derive(Injectable)]
struct Heartbeat {
    beats: Arc<AtomicUsize>,
}

impl Tickable for Heartbeat {
    fn tick(&self) -> LifecycleResult<()> {
        self.beats.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_tick_interval_drives_frames() -> anyhow::Result<()> {
    let beats = Arc::new(AtomicUsize::new(0));
    let shared = beats.clone();

    let mut file = tempfile::NamedTempFile::new()?;
    writeln!(file, "name = \"world\"")?;
    writeln!(file, "tick_interval_ms = 5")?;
    writeln!(file, "[container]")?;
    writeln!(file, "max_resolution_depth = 16")?;

    let scope = LifetimeScope::builder()
        .load_settings(file.path())?
        .install("heartbeat", move |builder| {
            builder.register_instance(shared.clone());
            builder.register::<Heartbeat>(Lifetime::Singleton).as_tickable();
            Ok(())
        })
        .build()?;
    assert_eq!(scope.name(), "world");

    scope.start().await?;
    tokio::time::sleep(Duration::from_millis(60)).await;
    scope.stop().await?;

    assert!(beats.load(Ordering::SeqCst) > 0);
    let frames = scope
        .tick_scheduler()
        .map(|scheduler| scheduler.frame_count())
        .unwrap_or_default();
    assert!(frames > 0);
    Ok(())
}

#[test]
fn test_installer_failure_aborts_build() {
    let result = LifetimeScope::builder()
        .install("broken", |_| {
            Err(DependencyError::registration("root", "bad binding"))
        })
        .build();

    assert!(matches!(
        result,
        Err(InfrastructureError::DependencyError { .. })
    ));
}
