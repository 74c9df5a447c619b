//! 命令管道（Pipeline）
//!
//! 每个命令在到达处理器之前依次经过已注册的管道行为。行为拿到的是类型擦除后的
//! 响应（`BoxAnySend`），由总线在最外层还原为 `C::Response`。
//!
//! `Next` 代表“管道的剩余部分”，可以被调用多次（事务重试时每次尝试都会重新执行）。
//!
use crate::{context::AppContext, error::AppError, transaction_scope::HandlerMetadata};
use async_trait::async_trait;
use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub type BoxAnySend = Box<dyn Any + Send>;

pub type PipelineFuture<'a> =
    Pin<Box<dyn Future<Output = Result<BoxAnySend, AppError>> + Send + 'a>>;

type NextFn<'a> = Arc<dyn Fn() -> PipelineFuture<'a> + Send + Sync + 'a>;

/// 管道剩余部分的续延
#[derive(Clone)]
pub struct Next<'a> {
    inner: NextFn<'a>,
}

impl<'a> Next<'a> {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'a,
        Fut: Future<Output = Result<BoxAnySend, AppError>> + Send + 'a,
    {
        Self {
            inner: Arc::new(move || Box::pin(f()) as PipelineFuture<'a>),
        }
    }

    /// 执行管道剩余部分（最终到达处理器）
    pub fn run(&self) -> PipelineFuture<'a> {
        (self.inner)()
    }
}

/// 管道行为：包裹“下一步”的横切逻辑（事务、审计、校验等）
#[async_trait]
pub trait PipelineBehavior: Send + Sync {
    async fn handle(
        &self,
        ctx: &AppContext,
        metadata: &HandlerMetadata,
        next: Next<'_>,
    ) -> Result<BoxAnySend, AppError>;
}

/// 以 `behaviors` 的顺序（第一个在最外层）包裹 `terminal`
pub(crate) fn chain<'a>(
    behaviors: &[Arc<dyn PipelineBehavior>],
    ctx: &'a AppContext,
    metadata: &'a HandlerMetadata,
    terminal: Next<'a>,
) -> Next<'a> {
    behaviors.iter().rev().fold(terminal, |next, behavior| {
        let behavior = behavior.clone();
        Next::new(move || {
            let behavior = behavior.clone();
            let next = next.clone();
            async move { behavior.handle(ctx, metadata, next).await }
        })
    })
}
