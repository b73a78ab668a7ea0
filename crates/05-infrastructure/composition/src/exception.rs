//! 入口点异常处理

use crate::entry_points::EntryPointKind;
use infrastructure_common::LifecycleError;
use std::fmt;
use std::sync::Arc;

type HandlerFn = Arc<dyn Fn(EntryPointKind, &LifecycleError) + Send + Sync>;

/// 入口点异常处理器
///
/// 设置后，入口点的失败交给处理器，调度继续执行后续入口点
#[derive(Clone)]
pub struct EntryPointExceptionHandler {
    handler: HandlerFn,
}

impl EntryPointExceptionHandler {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(EntryPointKind, &LifecycleError) + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
        }
    }

    pub fn handle(&self, kind: EntryPointKind, error: &LifecycleError) {
        (self.handler)(kind, error);
    }
}

impl fmt::Debug for EntryPointExceptionHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryPointExceptionHandler").finish_non_exhaustive()
    }
}
