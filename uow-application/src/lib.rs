//! 工作单元应用层（uow-application）
//!
//! 命令经由 `CommandBus` 分发，途经一组有序的管道行为（`PipelineBehavior`）后到达处理器。
//! 其中 `TransactionalBehavior` 负责：
//! - 依据处理器声明的事务标记决定是否开启事务；
//! - 在执行策略（重试）下以整次尝试为单位：开启事务 → 执行处理器 → 提交；
//! - 提交成功后取出本次请求收集的领域事件，并发发布并等待全部完成。
//!
pub mod command;
pub mod command_bus;
pub mod command_handler;
pub mod context;
pub mod error;
pub mod inmemory_command_bus;
pub mod pipeline;
#[cfg(feature = "infra-sqlx")]
pub mod postgres;
pub mod retry;
pub mod transaction;
pub mod transaction_scope;
pub mod transactional;

pub use inmemory_command_bus::InMemoryCommandBus;
pub use transactional::{TransactionalBehavior, TransactionalConfig};
pub use uow_macros::transactional;

// 允许 `#[transactional]` 生成的 ::uow_application 路径在本 crate 内部解析
extern crate self as uow_application;
