//! 事务范围判定
//!
//! 处理器通过 `CommandHandler::TRANSACTION_SCOPE` 声明是否参与事务，
//! 注册到总线时被固化进 `HandlerMetadata`，之后每次调用只读取元数据，不再做任何查找。
//!
use crate::{command::Command, command_handler::CommandHandler};
use serde::{Deserialize, Serialize};
use std::any::type_name;

/// 事务标记
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionScope {
    /// 必须在事务中执行
    Required,
    /// 显式不参与事务
    Suppressed,
}

/// 处理器元数据（注册时生成，不可变）
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HandlerMetadata {
    command: &'static str,
    handler: &'static str,
    transaction_scope: Option<TransactionScope>,
}

impl HandlerMetadata {
    pub fn new(
        command: &'static str,
        handler: &'static str,
        transaction_scope: Option<TransactionScope>,
    ) -> Self {
        Self {
            command,
            handler,
            transaction_scope,
        }
    }

    /// 读取处理器 `H` 对命令 `C` 声明的元数据
    pub fn of<C, H>() -> Self
    where
        C: Command,
        H: CommandHandler<C>,
    {
        Self::new(C::NAME, type_name::<H>(), H::TRANSACTION_SCOPE)
    }

    pub fn command(&self) -> &'static str {
        self.command
    }

    pub fn handler(&self) -> &'static str {
        self.handler
    }

    pub fn transaction_scope(&self) -> Option<TransactionScope> {
        self.transaction_scope
    }
}

/// 是否需要事务包裹
///
/// 缺少元数据、未声明标记或显式 `Suppressed` 都视为绕过事务。
pub fn requires_transaction(metadata: Option<&HandlerMetadata>) -> bool {
    matches!(
        metadata.and_then(HandlerMetadata::transaction_scope),
        Some(TransactionScope::Required)
    )
}
