//! 进程内事件发布者（InProcessEventPublisher）
//!
//! 将一条事件分发给所有匹配其类型的 `EventHandler`：
//! - 处理器按 `HandledEventType` 预先建立索引；
//! - 同一事件的多个处理器并发执行（并发度可配置）；
//! - 所有处理器执行完毕后才返回，任一失败则整体返回错误，其余处理器不受影响。
//!
use super::{EventHandler, EventPublisher, HandledEventType};
use crate::domain_event::SerializedEvent;
use crate::error::{DomainError, DomainResult};
use async_trait::async_trait;
use futures_util::{StreamExt, stream};
use std::{collections::HashMap, sync::Arc};
use tokio_util::sync::CancellationToken;

/// 发布者配置
#[derive(Clone, Copy, Debug)]
pub struct PublisherConfig {
    /// 单事件的处理并发（同一事件广播给多个 handler）
    pub handler_concurrency: usize,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            handler_concurrency: 8,
        }
    }
}

type HandlerFuture<'a> = std::pin::Pin<
    Box<dyn std::future::Future<Output = (String, DomainResult<()>)> + Send + 'a>,
>;

pub struct InProcessEventPublisher {
    registry: HandlerRegistry,
    config: PublisherConfig,
}

impl InProcessEventPublisher {
    pub fn new(handlers: Vec<Arc<dyn EventHandler>>) -> Self {
        Self::with_config(handlers, PublisherConfig::default())
    }

    pub fn with_config(handlers: Vec<Arc<dyn EventHandler>>, config: PublisherConfig) -> Self {
        Self {
            registry: HandlerRegistry::new(handlers),
            config,
        }
    }

    async fn dispatch(&self, event: &SerializedEvent) -> DomainResult<()> {
        let matched = self.registry.matching(event.event_type());
        if matched.is_empty() {
            tracing::debug!(event_type = event.event_type(), "no handler subscribed");
            return Ok(());
        }

        // 先构造（惰性的）future 再交给 stream，规避编译器对高阶生命周期的推断限制
        let futures: Vec<HandlerFuture<'_>> = matched
            .into_iter()
            .map(|h| -> HandlerFuture<'_> {
                Box::pin(async move {
                    let res = h.handle(event).await;
                    (h.handler_name().to_string(), res)
                })
            })
            .collect();

        let failures: Vec<(String, DomainError)> = stream::iter(futures)
            .buffer_unordered(self.config.handler_concurrency.max(1))
            .filter_map(|(name, res)| async move { res.err().map(|e| (name, e)) })
            .collect()
            .await;

        let Some((handler, first)) = failures.first() else {
            return Ok(());
        };

        for (name, err) in &failures {
            tracing::warn!(
                handler = %name,
                event_id = event.event_id(),
                event_type = event.event_type(),
                error = %err,
                "event handler failed"
            );
        }

        Err(DomainError::event_handler(handler.clone(), first.to_string()))
    }
}

#[async_trait]
impl EventPublisher for InProcessEventPublisher {
    async fn publish(
        &self,
        event: &SerializedEvent,
        cancel: &CancellationToken,
    ) -> DomainResult<()> {
        if cancel.is_cancelled() {
            return Err(DomainError::Cancelled);
        }

        tokio::select! {
            _ = cancel.cancelled() => Err(DomainError::Cancelled),
            res = self.dispatch(event) => res,
        }
    }
}

#[derive(Clone, Default)]
struct HandlerRegistry {
    by_type: HashMap<String, Vec<Arc<dyn EventHandler>>>,
    all: Vec<Arc<dyn EventHandler>>,
}

impl HandlerRegistry {
    fn new(handlers: Vec<Arc<dyn EventHandler>>) -> Self {
        let mut by_type: HashMap<String, Vec<Arc<dyn EventHandler>>> = HashMap::new();
        let mut all: Vec<Arc<dyn EventHandler>> = Vec::new();

        for h in handlers {
            match h.handled_event_type() {
                HandledEventType::All => all.push(h),
                HandledEventType::One(t) => {
                    by_type.entry(t).or_default().push(h);
                }
                HandledEventType::Many(ts) => {
                    for t in ts {
                        by_type.entry(t).or_default().push(h.clone());
                    }
                }
            }
        }

        Self { by_type, all }
    }

    fn matching(&self, event_type: &str) -> Vec<Arc<dyn EventHandler>> {
        let mut merged: Vec<Arc<dyn EventHandler>> = Vec::new();
        if let Some(list) = self.by_type.get(event_type) {
            merged.extend(list.iter().cloned());
        }
        merged.extend(self.all.iter().cloned());
        merged
    }
}
