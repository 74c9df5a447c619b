//! 工作单元领域层基础库（uow-domain）
//!
//! 为事务性命令管道提供领域侧构件：
//! - 领域事件（`domain_event`）：事件载荷约束、业务上下文与序列化形态 `SerializedEvent`
//! - 事件收集器（`collector`）：在一次请求内暂存业务逻辑产生的事件，提交后再取出
//! - 事件系统（`eventing`）：发布协议 `EventPublisher` / `EventBus`、内存总线与进程内订阅者分发
//!
//! 本 crate 不关心事务与命令路由，这些由应用层（`uow-application`）编排。
//!
pub mod collector;
pub mod domain_event;
pub mod error;
pub mod eventing;

pub use collector::{DomainEventCollector, InMemoryEventCollector};
