use crate::error::AppError;
use crate::transaction::{Transaction, TransactionSlot};
use std::fmt;
use std::sync::Arc;
use tokio::sync::MappedMutexGuard;
use tokio_util::sync::CancellationToken;
use uow_domain::domain_event::{BusinessContext, DomainEvent, SerializedEvent};
use uow_domain::{DomainEventCollector, InMemoryEventCollector};

/// 应用层上下文（Application Context）
///
/// 承载一次应用层调用所需的横切信息，例如：
/// - 业务语境（`BusinessContext`）：关联追踪 `correlation_id`、因果链 `causation_id`、
///   执行者类型/ID 等；
/// - 幂等键（`idempotency_key`）：用于在基础设施层实现请求幂等；
/// - 取消令牌：贯穿整个调用，在提交与事件发布处协作式响应；
/// - 领域事件收集器：请求级，每个新建的上下文都持有独立的收集器；
/// - 事务槽：事务处理器执行期间存放当前尝试开启的事务，见 [`AppContext::transaction`]。
///
/// 典型用法：
/// ```rust
/// use uow_application::context::AppContext;
/// use uow_domain::domain_event::BusinessContext;
///
/// let ctx = AppContext::new(
///     BusinessContext::builder()
///         .correlation_id("cor-123".into())
///         .actor_type("user".into())
///         .actor_id("u-1".into())
///         .build(),
/// )
/// .with_idempotency_key("idem-xyz");
/// assert!(ctx.events().is_empty());
/// ```
#[derive(Clone)]
pub struct AppContext {
    /// 业务语境（链路追踪、审计主体、操作因果）
    pub biz: BusinessContext,
    /// 幂等键（可选）：为空则由上层或基础设施决定是否参与幂等
    pub idempotency_key: Option<String>,
    cancellation: CancellationToken,
    events: Arc<dyn DomainEventCollector>,
    transaction: Arc<TransactionSlot>,
}

impl AppContext {
    pub fn new(biz: BusinessContext) -> Self {
        Self {
            biz,
            idempotency_key: None,
            cancellation: CancellationToken::new(),
            events: Arc::new(InMemoryEventCollector::new()),
            transaction: Arc::new(TransactionSlot::default()),
        }
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    /// 使用调用方提供的取消令牌（例如 HTTP 请求断开时触发）
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// 替换事件收集器（例如由仓储层维护的收集器）
    pub fn with_collector(mut self, collector: Arc<dyn DomainEventCollector>) -> Self {
        self.events = collector;
        self
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn events(&self) -> &dyn DomainEventCollector {
        self.events.as_ref()
    }

    /// 是否处于某个已开启的事务中
    pub fn in_transaction(&self) -> bool {
        self.transaction.is_open()
    }

    /// 租用当前尝试开启的事务，在同一事务内执行语句
    ///
    /// 仅在 `#[transactional]` 处理器内可用，否则返回 `AppError::NoActiveTransaction`。
    /// 租约需在处理器返回前释放；在同一上下文上嵌套分发命令前也应先释放。
    pub async fn transaction<T>(&self) -> Result<MappedMutexGuard<'_, T>, AppError>
    where
        T: Transaction,
    {
        self.transaction.lease().await
    }

    pub(crate) fn transaction_slot(&self) -> &TransactionSlot {
        &self.transaction
    }

    /// 记录一条领域事件，业务语境取自当前上下文
    pub fn record_event<E>(
        &self,
        aggregate_type: &str,
        aggregate_id: &str,
        event: &E,
    ) -> Result<(), AppError>
    where
        E: DomainEvent,
    {
        let serialized =
            SerializedEvent::from_domain_event(aggregate_type, aggregate_id, event, &self.biz)?;
        self.events.record(serialized);
        Ok(())
    }
}

impl Default for AppContext {
    fn default() -> Self {
        Self::new(BusinessContext::default())
    }
}

impl fmt::Debug for AppContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppContext")
            .field("biz", &self.biz)
            .field("idempotency_key", &self.idempotency_key)
            .field("cancelled", &self.cancellation.is_cancelled())
            .field("pending_events", &self.events.len())
            .field("in_transaction", &self.transaction.is_open())
            .finish()
    }
}
