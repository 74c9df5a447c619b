//! 领域事件（Domain Event）
//!
//! 定义事件载荷需要实现的最小接口（`DomainEvent`）、触发事件时的业务语境
//! （`BusinessContext`），以及事件在发布/传输时使用的统一形态 `SerializedEvent`。

mod business_context;
mod domain_event_trait;
mod serialized_event;

pub use business_context::BusinessContext;
pub use domain_event_trait::DomainEvent;
pub use serialized_event::SerializedEvent;
