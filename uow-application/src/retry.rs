//! 执行策略（Execution Strategy）
//!
//! 以“整次尝试”为单位执行工作单元：失败时整个单元重新执行，而不是从中途续跑。
//! 是否值得重试由错误自身分类（`AppError::is_transient`），退避参数由 `RetryPolicy` 配置。
//!
//! ```rust
//! use std::time::Duration;
//! use uow_application::retry::RetryPolicy;
//!
//! let policy = RetryPolicy::builder()
//!     .max_retries(5)
//!     .initial_delay(Duration::from_millis(50))
//!     .build();
//! assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
//! ```
use crate::error::AppError;
use async_trait::async_trait;
use bon::Builder;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// 执行策略：运行一次或多次 `unit`，各次尝试严格串行
#[async_trait]
pub trait ExecutionStrategy: Send + Sync {
    async fn execute<R, F, Fut>(&self, unit: F) -> Result<R, AppError>
    where
        R: Send,
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<R, AppError>> + Send;
}

/// 指数退避配置
///
/// 默认值：最多重试 3 次，首次等待 100ms，上限 30s，倍率 2.0。
#[derive(Builder, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// 最大重试次数（不含首次执行）
    #[builder(default = 3)]
    pub max_retries: usize,
    /// 首次重试前的等待
    #[builder(default = Duration::from_millis(100))]
    pub initial_delay: Duration,
    /// 单次等待上限
    #[builder(default = Duration::from_secs(30))]
    pub max_delay: Duration,
    /// 退避倍率
    #[builder(default = 2.0)]
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RetryPolicy {
    /// 第 `attempt` 次重试前的等待：initial_delay * multiplier^attempt，封顶 max_delay
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return self.initial_delay;
        }

        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let delay_ms = self.initial_delay.as_millis() as f64 * self.multiplier.powi(exponent);

        if !delay_ms.is_finite() || delay_ms >= self.max_delay.as_millis() as f64 {
            return self.max_delay;
        }
        Duration::from_millis(delay_ms as u64)
    }
}

/// 不重试：单元只执行一次
#[derive(Clone, Copy, Debug, Default)]
pub struct NoRetryStrategy;

#[async_trait]
impl ExecutionStrategy for NoRetryStrategy {
    async fn execute<R, F, Fut>(&self, mut unit: F) -> Result<R, AppError>
    where
        R: Send,
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<R, AppError>> + Send,
    {
        unit().await
    }
}

/// 对瞬时错误按 `RetryPolicy` 退避重试，其余错误立即返回
#[derive(Clone, Debug, Default)]
pub struct RetryingStrategy {
    policy: RetryPolicy,
}

impl RetryingStrategy {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl ExecutionStrategy for RetryingStrategy {
    async fn execute<R, F, Fut>(&self, mut unit: F) -> Result<R, AppError>
    where
        R: Send,
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<R, AppError>> + Send,
    {
        let mut attempt = 0;

        loop {
            match unit().await {
                Ok(result) => {
                    if attempt > 0 {
                        tracing::info!(attempt, "unit of work succeeded after retry");
                    }
                    return Ok(result);
                }
                Err(err) if !err.is_transient() => return Err(err),
                Err(err) => {
                    if attempt >= self.policy.max_retries {
                        tracing::error!(attempt, error = %err, "unit of work failed after max retries");
                        return Err(err);
                    }

                    let delay = self.policy.delay_for_attempt(attempt);
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient failure, retrying unit of work"
                    );

                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
