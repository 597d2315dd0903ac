//! 崩溃/遥测上报：默认实现写入 tracing

use std::sync::atomic::{AtomicU64, Ordering};

use crate::service::sources::CrashLogger;

#[derive(Default)]
pub struct TracingCrashLogger {
    reported: AtomicU64,
}

impl TracingCrashLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已上报的异常数
    pub fn reported_exceptions(&self) -> u64 {
        self.reported.load(Ordering::Relaxed)
    }
}

impl CrashLogger for TracingCrashLogger {
    fn log_event(&self, message: &str) {
        tracing::warn!(target: "crash", event = %message, "Crash log event");
    }

    fn log_exception(&self, error: &anyhow::Error, context: &str) {
        self.reported.fetch_add(1, Ordering::Relaxed);
        tracing::error!(target: "crash", context = %context, error = ?error, "Non-fatal exception reported");
    }
}
