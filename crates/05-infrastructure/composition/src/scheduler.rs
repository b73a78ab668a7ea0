//! 帧回调调度
//!
//! 容器本身不驱动帧循环，宿主通过 [`TickScheduler`] 接收需要每帧调用的入口点

use crate::entry_points::{EntryPointKind, LateTickable, Tickable};
use crate::exception::EntryPointExceptionHandler;
use infrastructure_common::LifecycleError;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// 帧回调注册钩子
pub trait TickScheduler: Send + Sync {
    fn schedule_tick(&self, tickable: Arc<dyn Tickable>);

    fn schedule_late_tick(&self, tickable: Arc<dyn LateTickable>);

    /// 设置帧回调失败时使用的处理器
    fn set_exception_handler(&self, _handler: EntryPointExceptionHandler) {}
}

/// 由宿主手动推进的调度器
#[derive(Default)]
pub struct ManualTickScheduler {
    tickables: Mutex<Vec<Arc<dyn Tickable>>>,
    late_tickables: Mutex<Vec<Arc<dyn LateTickable>>>,
    handler: Mutex<Option<EntryPointExceptionHandler>>,
    frames: AtomicU64,
}

impl ManualTickScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// 推进一帧：先调用全部 Tick，再调用全部 LateTick
    pub fn run_frame(&self) {
        let tickables = self.tickables.lock().clone();
        for tickable in tickables {
            self.report(EntryPointKind::Tick, tickable.tick());
        }

        let late_tickables = self.late_tickables.lock().clone();
        for late_tickable in late_tickables {
            self.report(EntryPointKind::LateTick, late_tickable.late_tick());
        }

        self.frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frame_count(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    pub fn tickable_count(&self) -> usize {
        self.tickables.lock().len()
    }

    pub fn late_tickable_count(&self) -> usize {
        self.late_tickables.lock().len()
    }

    /// 以固定间隔在 tokio 任务中推进帧
    pub fn spawn_driver(self: &Arc<Self>, period: Duration) -> TickDriver {
        let scheduler = self.clone();
        let (stop_tx, mut stop_rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = interval.tick() => scheduler.run_frame(),
                }
            }
            debug!("帧驱动已停止，共 {} 帧", scheduler.frame_count());
        });
        info!("启动帧驱动，间隔 {:?}", period);
        TickDriver {
            stop: Some(stop_tx),
            handle,
        }
    }

    fn report(&self, kind: EntryPointKind, result: Result<(), LifecycleError>) {
        let Err(error) = result else {
            return;
        };
        let handler = self.handler.lock().clone();
        match handler {
            Some(handler) => handler.handle(kind, &error),
            None => error!("帧回调 {} 执行失败: {}", kind, error),
        }
    }
}

impl TickScheduler for ManualTickScheduler {
    fn schedule_tick(&self, tickable: Arc<dyn Tickable>) {
        self.tickables.lock().push(tickable);
    }

    fn schedule_late_tick(&self, tickable: Arc<dyn LateTickable>) {
        self.late_tickables.lock().push(tickable);
    }

    fn set_exception_handler(&self, handler: EntryPointExceptionHandler) {
        *self.handler.lock() = Some(handler);
    }
}

/// 帧驱动任务句柄
pub struct TickDriver {
    stop: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl TickDriver {
    /// 停止驱动并等待任务结束
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Err(error) = (&mut self.handle).await {
            error!("帧驱动任务异常结束: {}", error);
        }
    }
}
