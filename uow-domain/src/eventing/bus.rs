//! 事件发布（EventPublisher）与事件总线（EventBus）协议
//!
use crate::{domain_event::SerializedEvent, error::DomainResult as Result};
use async_trait::async_trait;
use futures_core::stream::BoxStream;
use tokio_util::sync::CancellationToken;

/// 事件发布者：将一条事件交付给当前所有订阅者
///
/// 单个订阅者的失败如何处理由实现决定；返回错误即表示本次交付不完整。
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &SerializedEvent, cancel: &CancellationToken) -> Result<()>;

    async fn publish_batch(
        &self,
        events: &[SerializedEvent],
        cancel: &CancellationToken,
    ) -> Result<()> {
        for event in events {
            self.publish(event, cancel).await?;
        }
        Ok(())
    }
}

/// 事件总线：在发布之上提供订阅能力
#[async_trait]
pub trait EventBus: EventPublisher {
    /// 返回一个 'static 生命周期的事件流，便于在 tokio::spawn 中使用
    async fn subscribe(&self) -> BoxStream<'static, Result<SerializedEvent>>;
}
