//! 解析诊断
//!
//! 记录每次实例创建的调用信息，供调试和统计使用

use crate::registration::Registration;
use chrono::{DateTime, Utc};
use infrastructure_common::Lifetime;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

const DEFAULT_CAPACITY: usize = 1024;

/// 一次实例创建的记录
#[derive(Debug, Clone, Serialize)]
pub struct ResolveRecord {
    pub registration: u64,
    pub implementation: String,
    pub lifetime: Lifetime,
    pub scope: String,
    pub depth: usize,
    pub started_at: DateTime<Utc>,
    pub elapsed_us: u64,
    pub succeeded: bool,
}

/// 诊断收集器
///
/// 计数总是开启，详细记录只在启用时保留，超过容量后丢弃最早的记录
pub struct DiagnosticsCollector {
    enabled: bool,
    capacity: usize,
    records: Mutex<Vec<ResolveRecord>>,
    resolved: AtomicUsize,
    errors: AtomicUsize,
    total_us: AtomicU64,
}

impl DiagnosticsCollector {
    pub fn new(enabled: bool) -> Self {
        Self::with_capacity(enabled, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(enabled: bool, capacity: usize) -> Self {
        Self {
            enabled,
            capacity,
            records: Mutex::new(Vec::new()),
            resolved: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
            total_us: AtomicU64::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn record(
        &self,
        registration: &Registration,
        scope: &str,
        depth: usize,
        started_at: DateTime<Utc>,
        elapsed: Duration,
        succeeded: bool,
    ) {
        let elapsed_us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        if succeeded {
            self.resolved.fetch_add(1, Ordering::Relaxed);
            self.total_us.fetch_add(elapsed_us, Ordering::Relaxed);
        } else {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }

        if !self.enabled {
            return;
        }

        let mut records = self.records.lock();
        if records.len() >= self.capacity {
            records.remove(0);
        }
        records.push(ResolveRecord {
            registration: registration.id().value(),
            implementation: registration.implementation().name().to_string(),
            lifetime: registration.lifetime(),
            scope: scope.to_string(),
            depth,
            started_at,
            elapsed_us,
            succeeded,
        });
    }

    /// 已记录的调用（按时间顺序）
    pub fn records(&self) -> Vec<ResolveRecord> {
        self.records.lock().clone()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }

    /// 成功创建的实例数量
    pub fn resolved_count(&self) -> usize {
        self.resolved.load(Ordering::Relaxed)
    }

    pub fn error_count(&self) -> usize {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn total_resolution_time_us(&self) -> u64 {
        self.total_us.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ExistingInstanceProvider;
    use infrastructure_common::TypeKey;
    use std::sync::Arc;

    fn registration() -> Registration {
        Registration::new(
            TypeKey::of::<String>(),
            Lifetime::Singleton,
            Arc::new(ExistingInstanceProvider::new(Arc::new(String::new()))),
        )
    }

    #[test]
    fn test_disabled_collector_only_counts() {
        let collector = DiagnosticsCollector::new(false);
        collector.record(&registration(), "root", 1, Utc::now(), Duration::from_micros(5), true);
        collector.record(&registration(), "root", 1, Utc::now(), Duration::from_micros(5), false);

        assert_eq!(collector.resolved_count(), 1);
        assert_eq!(collector.error_count(), 1);
        assert_eq!(collector.total_resolution_time_us(), 5);
        assert!(collector.records().is_empty());
    }

    #[test]
    fn test_enabled_collector_keeps_latest_records() {
        let collector = DiagnosticsCollector::with_capacity(true, 2);
        for depth in 0..3 {
            collector.record(&registration(), "root", depth, Utc::now(), Duration::ZERO, true);
        }

        let depths: Vec<usize> = collector.records().iter().map(|r| r.depth).collect();
        assert_eq!(depths, vec![1, 2]);

        let json = serde_json::to_value(&collector.records()[0]).unwrap();
        assert_eq!(json["lifetime"], "singleton");
    }
}
