use crate::{
    command::Command, context::AppContext, error::AppError, transaction_scope::TransactionScope,
};
use async_trait::async_trait;

/// 命令处理器
///
/// `TRANSACTION_SCOPE` 是处理器声明的事务标记，在注册时一次性读取：
/// - `None`（默认）：未标记，命令在事务之外执行；
/// - `Some(Required)`：在事务中执行，提交后发布领域事件；
/// - `Some(Suppressed)`：显式声明不参与事务。
///
/// 通常使用 `#[transactional]` 属性宏声明，而非手写常量。
#[async_trait]
pub trait CommandHandler<C>: Send + Sync
where
    C: Command,
{
    const TRANSACTION_SCOPE: Option<TransactionScope> = None;

    async fn handle(&self, ctx: &AppContext, cmd: C) -> Result<C::Response, AppError>;
}
