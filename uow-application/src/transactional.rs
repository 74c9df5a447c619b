//! 事务管道行为（TransactionalBehavior）
//!
//! 对声明了 `TransactionScope::Required` 的处理器：
//! 1. 从数据访问门面获取执行策略，在策略下执行一次“尝试”：
//!    清空事件收集器 → 以配置的隔离级别开启事务 → 执行下游管道 → 提交；
//! 2. 提交成功后取出本次尝试收集的领域事件，每条事件独立并发发布，等待全部完成；
//! 3. 原样返回处理器的响应。
//!
//! 未声明（或显式关闭）事务标记的处理器直接执行下游，不开启事务，也不发布事件。
//!
//! 尝试期间事务放在 `AppContext` 的事务槽中，处理器通过 `ctx.transaction::<T>()` 租用。
//! 若上下文已处于事务中（事务处理器在同一上下文上再分发事务命令），内层命令加入外层事务：
//! 不开启新事务、不清空也不发布事件，由最外层在提交后统一发布。
//!
//! 发布失败发生在提交之后：状态变更已经持久化，调用整体以 `AppError::EventPublication`
//! 失败。该错误不是瞬时错误，执行策略不会因此重新执行已提交的尝试。
//!
use crate::context::AppContext;
use crate::error::AppError;
use crate::pipeline::{BoxAnySend, Next, PipelineBehavior};
use crate::retry::ExecutionStrategy;
use crate::transaction::{IsolationLevel, Transaction, TransactionController};
use crate::transaction_scope::{HandlerMetadata, requires_transaction};
use async_trait::async_trait;
use bon::Builder;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use uow_domain::domain_event::SerializedEvent;
use uow_domain::error::DomainError;
use uow_domain::eventing::EventPublisher;

/// 事务行为配置
#[derive(Builder, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionalConfig {
    /// 开启事务时使用的隔离级别
    #[builder(default)]
    #[serde(default)]
    pub isolation_level: IsolationLevel,
}

pub struct TransactionalBehavior<T>
where
    T: TransactionController,
{
    controller: Arc<T>,
    publisher: Arc<dyn EventPublisher>,
    config: TransactionalConfig,
}

impl<T> TransactionalBehavior<T>
where
    T: TransactionController,
{
    pub fn new(controller: Arc<T>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self::with_config(controller, publisher, TransactionalConfig::default())
    }

    pub fn with_config(
        controller: Arc<T>,
        publisher: Arc<dyn EventPublisher>,
        config: TransactionalConfig,
    ) -> Self {
        Self {
            controller,
            publisher,
            config,
        }
    }

    pub fn config(&self) -> &TransactionalConfig {
        &self.config
    }

    /// 以事务语义执行 `next`
    ///
    /// `metadata` 为 `None` 时视为未声明事务标记。`next` 在重试时会被再次调用。
    pub async fn execute<R, F, Fut>(
        &self,
        ctx: &AppContext,
        metadata: Option<&HandlerMetadata>,
        next: F,
    ) -> Result<R, AppError>
    where
        R: Send,
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = Result<R, AppError>> + Send,
    {
        let command = metadata.map_or("<unknown>", HandlerMetadata::command);

        if !requires_transaction(metadata) {
            tracing::info!(command, "handler is not transactional, executing without transaction");
            return next().await;
        }

        if ctx.in_transaction() {
            tracing::info!(command, "joining enclosing transaction");
            return next().await;
        }

        tracing::info!(
            command,
            isolation = %self.config.isolation_level,
            "executing command in transaction"
        );

        let strategy = self.controller.execution_strategy();
        let mut attempt = 0_usize;
        let out = strategy
            .execute(|| {
                attempt += 1;
                self.attempt(ctx, command, attempt, &next)
            })
            .await;

        match &out {
            Ok(_) => tracing::info!(command, "transactional command completed"),
            Err(err) => tracing::error!(command, error = %err, "transactional command failed"),
        }
        out
    }

    async fn attempt<R, F, Fut>(
        &self,
        ctx: &AppContext,
        command: &'static str,
        attempt: usize,
        next: &F,
    ) -> Result<R, AppError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<R, AppError>>,
    {
        // 前一次失败尝试中记录的事件不能带入本次
        ctx.events().clear();

        let tx = self.controller.begin(self.config.isolation_level).await?;
        tracing::info!(
            command,
            attempt,
            isolation = %self.config.isolation_level,
            "transaction opened"
        );

        let slot = ctx.transaction_slot();
        slot.put(tx).await;
        let outcome = next().await;
        let tx = slot.take::<T::Transaction>().await?;

        let response = match outcome {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(command, attempt, error = %err, "handler failed, rolling back");
                return Err(err);
            }
        };
        tracing::debug!(command, attempt, "handler executed");

        let cancel = ctx.cancellation();
        if cancel.is_cancelled() {
            tracing::warn!(command, attempt, "cancelled before commit, rolling back");
            return Err(AppError::Cancelled);
        }
        tx.commit(cancel).await?;
        tracing::info!(command, attempt, "transaction committed");

        let events = ctx.events().drain_events();
        self.publish_all(command, events, cancel).await?;

        Ok(response)
    }

    /// 每条事件一个任务，全部结束后再返回；任一失败则返回第一个错误，其余任务照常完成
    async fn publish_all(
        &self,
        command: &'static str,
        events: Vec<SerializedEvent>,
        cancel: &CancellationToken,
    ) -> Result<(), AppError> {
        if events.is_empty() {
            return Ok(());
        }

        tracing::info!(command, count = events.len(), "publishing domain events");

        let mut tasks = JoinSet::new();
        for event in events {
            let publisher = self.publisher.clone();
            let cancel = cancel.clone();
            tasks.spawn(async move {
                tracing::debug!(
                    event_id = event.event_id(),
                    event_type = event.event_type(),
                    "publishing domain event"
                );
                let res = publisher.publish(&event, &cancel).await;
                match &res {
                    Ok(()) => tracing::debug!(
                        event_id = event.event_id(),
                        event_type = event.event_type(),
                        "domain event published"
                    ),
                    Err(err) => tracing::warn!(
                        event_id = event.event_id(),
                        event_type = event.event_type(),
                        error = %err,
                        "domain event publication failed"
                    ),
                }
                res.map_err(|err| publication_error(event.event_type(), err))
            });
        }

        let mut first_err: Option<AppError> = None;
        while let Some(joined) = tasks.join_next().await {
            let err = match joined {
                Ok(Ok(())) => continue,
                Ok(Err(err)) => err,
                Err(join_err) => AppError::EventPublication {
                    event_type: "<unknown>".to_string(),
                    reason: join_err.to_string(),
                },
            };
            if first_err.is_none() {
                first_err = Some(err);
            }
        }

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn publication_error(event_type: &str, err: DomainError) -> AppError {
    match err {
        DomainError::Cancelled => AppError::Cancelled,
        other => AppError::EventPublication {
            event_type: event_type.to_string(),
            reason: other.to_string(),
        },
    }
}

#[async_trait]
impl<T> PipelineBehavior for TransactionalBehavior<T>
where
    T: TransactionController,
{
    async fn handle(
        &self,
        ctx: &AppContext,
        metadata: &HandlerMetadata,
        next: Next<'_>,
    ) -> Result<BoxAnySend, AppError> {
        self.execute(ctx, Some(metadata), || next.run()).await
    }
}
