use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;
use uow_application::command::Command;
use uow_application::command_bus::CommandBus;
use uow_application::command_handler::CommandHandler;
use uow_application::context::AppContext;
use uow_application::error::AppError;
use uow_application::retry::{RetryPolicy, RetryingStrategy};
use uow_application::transaction::{IsolationLevel, Transaction, TransactionController};
use uow_application::{InMemoryCommandBus, TransactionalBehavior, transactional};
use uow_domain::domain_event::{BusinessContext, DomainEvent, SerializedEvent};
use uow_domain::error::DomainResult;
use uow_domain::eventing::{EventHandler, HandledEventType, InProcessEventPublisher};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum OrderEvent {
    Placed { id: String, sku: String, qty: u32 },
    StockReserved { id: String, sku: String },
}

impl DomainEvent for OrderEvent {
    fn event_id(&self) -> &str {
        match self {
            Self::Placed { id, .. } | Self::StockReserved { id, .. } => id.as_str(),
        }
    }

    fn event_type(&self) -> &str {
        match self {
            Self::Placed { .. } => "OrderEvent.Placed",
            Self::StockReserved { .. } => "OrderEvent.StockReserved",
        }
    }
}

#[derive(Debug, Clone)]
struct PlaceOrder {
    sku: String,
    qty: u32,
}

impl Command for PlaceOrder {
    const NAME: &'static str = "PlaceOrder";
    type Response = String;
}

/// 第一次执行时模拟一次序列化冲突
struct PlaceOrderHandler {
    attempts: AtomicUsize,
}

#[transactional]
#[async_trait]
impl CommandHandler<PlaceOrder> for PlaceOrderHandler {
    async fn handle(&self, ctx: &AppContext, cmd: PlaceOrder) -> Result<String, AppError> {
        let order_id = format!("ord-{}", ulid::Ulid::new());
        ctx.record_event(
            "order",
            &order_id,
            &OrderEvent::Placed {
                id: ulid::Ulid::new().to_string(),
                sku: cmd.sku.clone(),
                qty: cmd.qty,
            },
        )?;
        ctx.record_event(
            "order",
            &order_id,
            &OrderEvent::StockReserved {
                id: ulid::Ulid::new().to_string(),
                sku: cmd.sku,
            },
        )?;

        if self.attempts.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(AppError::Transient("could not serialize access".into()));
        }
        Ok(order_id)
    }
}

/// 只打印日志的内存事务控制器
struct LoggingController;

struct LoggingTransaction;

#[async_trait]
impl Transaction for LoggingTransaction {
    async fn commit(self, _cancel: &CancellationToken) -> Result<(), AppError> {
        tracing::info!("in-memory transaction committed");
        Ok(())
    }
}

#[async_trait]
impl TransactionController for LoggingController {
    type Transaction = LoggingTransaction;
    type Strategy = RetryingStrategy;

    fn execution_strategy(&self) -> Self::Strategy {
        RetryingStrategy::new(RetryPolicy::default())
    }

    async fn begin(&self, isolation: IsolationLevel) -> Result<Self::Transaction, AppError> {
        tracing::info!(%isolation, "in-memory transaction started");
        Ok(LoggingTransaction)
    }
}

struct Notifier;

#[async_trait]
impl EventHandler for Notifier {
    fn handler_name(&self) -> &str {
        "notifier"
    }

    fn handled_event_type(&self) -> HandledEventType {
        HandledEventType::All
    }

    async fn handle(&self, event: &SerializedEvent) -> DomainResult<()> {
        let payload = event.payload_as::<OrderEvent>()?;
        tracing::info!(
            aggregate_id = event.aggregate_id(),
            correlation_id = ?event.correlation_id(),
            ?payload,
            "notified"
        );
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "uow_application=debug,transactional_pipeline=info".into()),
        )
        .with_target(false)
        .init();

    let publisher = InProcessEventPublisher::new(vec![Arc::new(Notifier)]);
    let bus = InMemoryCommandBus::new().with_behavior(Arc::new(TransactionalBehavior::new(
        Arc::new(LoggingController),
        Arc::new(publisher),
    )));
    bus.register::<PlaceOrder, _>(Arc::new(PlaceOrderHandler {
        attempts: AtomicUsize::new(0),
    }))?;

    let ctx = AppContext::new(
        BusinessContext::builder()
            .correlation_id("cor-demo".into())
            .actor_type("user".into())
            .actor_id("u-1".into())
            .build(),
    );
    let order_id = bus
        .dispatch(
            &ctx,
            PlaceOrder {
                sku: "sku-123".into(),
                qty: 2,
            },
        )
        .await?;

    tracing::info!(%order_id, "order placed");
    Ok(())
}
