//! 操作日志
//!
//! 测试器在执行过程中把人类可读的进度写到这里，同时转发给 tracing。
//! 控制台的每个请求拥有独立的日志，随响应一起返回。

use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Default)]
pub struct ActivityLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn info(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!("{}", message);
        self.lock().push(message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.lock().push(format!("⚠️ {}", message));
    }

    /// 当前日志快照
    pub fn entries(&self) -> Vec<String> {
        self.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_entries() {
        let log = ActivityLog::new();
        let other = log.clone();
        log.info("step one");
        other.warn("step two");
        assert_eq!(log.entries(), vec!["step one".to_string(), "⚠️ step two".to_string()]);
        assert!(!other.is_empty());
    }
}
