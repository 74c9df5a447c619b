//! 事件子系统（eventing）
//!
//! 提供事件发布/订阅与处理的基础抽象：
//! - `EventPublisher`：将一条事件投递给所有感兴趣的订阅者；
//! - `EventBus`：在发布之上提供 'static 事件流订阅；
//! - `InMemoryEventBus`：基于 broadcast 的内存总线；
//! - `EventHandler` / `InProcessEventPublisher`：进程内按事件类型匹配处理器并并发分发。
//!
//! 发布调用均携带 `CancellationToken`，由实现协作式地响应取消。
//!
pub mod bus;
pub mod bus_inmemory;
pub mod handler;
pub mod publisher;

pub use bus::{EventBus, EventPublisher};
pub use bus_inmemory::InMemoryEventBus;
pub use handler::{EventHandler, HandledEventType};
pub use publisher::{InProcessEventPublisher, PublisherConfig};
