//! 有界轮询：指数退避 + 硬超时
//!
//! 多步流程中等待远端最终一致时使用，超时返回 `MintError::Timeout`，
//! 不会在条件未满足时继续往下走。

use std::{
    future::Future,
    time::{Duration, Instant},
};

use crate::error::MintError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            timeout: Duration::from_secs(60),
        }
    }
}

impl PollPolicy {
    /// 第 `attempt` 次（从 0 开始）失败后的等待时间
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(16);
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// 反复调用 `check` 直到返回 `Some`
///
/// `check` 返回 `Ok(None)` 表示"尚未就绪"；返回错误时立即中止轮询。
pub async fn poll_until<T, F, Fut>(
    policy: &PollPolicy,
    operation: &str,
    mut check: F,
) -> Result<T, MintError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, MintError>>,
{
    let started = Instant::now();
    let mut attempt = 0u32;

    loop {
        if let Some(value) = check().await? {
            if attempt > 0 {
                tracing::debug!(operation, attempts = attempt + 1, "poll condition met");
            }
            return Ok(value);
        }

        let elapsed = started.elapsed();
        if elapsed >= policy.timeout {
            tracing::warn!(operation, ?elapsed, "poll timed out");
            return Err(MintError::Timeout {
                operation: operation.to_string(),
                waited: elapsed,
            });
        }

        let remaining = policy.timeout - elapsed;
        let delay = policy.delay_for(attempt).min(remaining);
        tracing::debug!(operation, attempt, ?delay, "condition not met yet, backing off");
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    };

    use super::*;

    fn fast_policy() -> PollPolicy {
        PollPolicy {
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            timeout: Duration::from_millis(50),
        }
    }

    #[test]
    fn test_delay_grows_and_caps() {
        let policy = PollPolicy {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
            timeout: Duration::from_secs(1),
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(350));
        assert_eq!(policy.delay_for(40), Duration::from_millis(350));
    }

    #[tokio::test]
    async fn test_returns_once_ready() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let value = poll_until(&fast_policy(), "ready on third try", move || {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                Ok(if n >= 2 { Some(n) } else { None })
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_times_out_with_distinct_error() {
        let result: Result<(), _> =
            poll_until(&fast_policy(), "never ready", || async { Ok(None) }).await;

        match result {
            Err(MintError::Timeout { operation, waited }) => {
                assert_eq!(operation, "never ready");
                assert!(waited >= Duration::from_millis(50));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_check_error_aborts_immediately() {
        let result: Result<(), _> = poll_until(&fast_policy(), "failing", || async {
            Err(MintError::Validation("boom".into()))
        })
        .await;
        assert!(matches!(result, Err(MintError::Validation(_))));
    }
}
