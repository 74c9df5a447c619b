//! 事务控制（Transaction Controller）
//!
//! 数据访问门面需要提供的最小能力：
//! - 以指定隔离级别开启事务，得到独占的事务句柄；
//! - 句柄 `commit` 提交；未提交即被丢弃的句柄视为回滚；
//! - 给出该数据源配套的执行策略（决定哪些失败值得整体重试）。
//!
use crate::{error::AppError, retry::ExecutionStrategy};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::any::{Any, type_name};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

/// 事务隔离级别
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationLevel {
    ReadUncommitted,
    #[default]
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    /// SQL 标准写法，如 `READ COMMITTED`
    pub fn as_sql(&self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// 事务句柄：由一次尝试独占，提交即消费；未提交而被丢弃时回滚
#[async_trait]
pub trait Transaction: Send + 'static {
    async fn commit(self, cancel: &CancellationToken) -> Result<(), AppError>;
}

/// 数据访问门面
#[async_trait]
pub trait TransactionController: Send + Sync + 'static {
    type Transaction: Transaction;
    type Strategy: ExecutionStrategy;

    /// 当前数据源配套的执行策略
    fn execution_strategy(&self) -> Self::Strategy;

    async fn begin(&self, isolation: IsolationLevel) -> Result<Self::Transaction, AppError>;
}

/// 一次尝试期间开启的事务
///
/// 拦截器在 `begin` 之后放入、`commit` 之前取回；其间处理器（仓储）可以租用它，
/// 在同一事务内执行语句。
#[derive(Default)]
pub(crate) struct TransactionSlot {
    open: AtomicBool,
    tx: Mutex<Option<Box<dyn Any + Send>>>,
}

impl TransactionSlot {
    pub(crate) fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub(crate) async fn put<T: Transaction>(&self, tx: T) {
        *self.tx.lock().await = Some(Box::new(tx));
        self.open.store(true, Ordering::Release);
    }

    /// 取回事务；租约未释放时等待
    pub(crate) async fn take<T: Transaction>(&self) -> Result<T, AppError> {
        let boxed = self.tx.lock().await.take();
        self.open.store(false, Ordering::Release);

        match boxed {
            Some(boxed) => boxed.downcast::<T>().map(|tx| *tx).map_err(|_| mismatch::<T>()),
            None => Err(AppError::NoActiveTransaction),
        }
    }

    /// 租用事务；持有期间同一上下文的其他租用者等待
    pub(crate) async fn lease<T: Transaction>(&self) -> Result<MappedMutexGuard<'_, T>, AppError> {
        let guard = self.tx.lock().await;
        if guard.is_none() {
            return Err(AppError::NoActiveTransaction);
        }
        MutexGuard::try_map(guard, |slot| slot.as_mut().and_then(|tx| tx.downcast_mut::<T>()))
            .map_err(|_| mismatch::<T>())
    }
}

fn mismatch<T>() -> AppError {
    AppError::TypeMismatch {
        expected: type_name::<T>(),
        found: "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Staged(Vec<&'static str>);

    #[async_trait]
    impl Transaction for Staged {
        async fn commit(self, _cancel: &CancellationToken) -> Result<(), AppError> {
            Ok(())
        }
    }

    struct Other;

    #[async_trait]
    impl Transaction for Other {
        async fn commit(self, _cancel: &CancellationToken) -> Result<(), AppError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn empty_slot_has_no_active_transaction() {
        let slot = TransactionSlot::default();
        assert!(!slot.is_open());
        assert!(matches!(
            slot.lease::<Staged>().await,
            Err(AppError::NoActiveTransaction)
        ));
        assert!(matches!(
            slot.take::<Staged>().await,
            Err(AppError::NoActiveTransaction)
        ));
    }

    #[tokio::test]
    async fn leased_writes_are_visible_when_taken_back() {
        let slot = TransactionSlot::default();
        slot.put(Staged(Vec::new())).await;
        assert!(slot.is_open());

        slot.lease::<Staged>().await.unwrap().0.push("insert");
        slot.lease::<Staged>().await.unwrap().0.push("update");

        let tx = slot.take::<Staged>().await.unwrap();
        assert_eq!(tx.0, vec!["insert", "update"]);
        assert!(!slot.is_open());
    }

    #[tokio::test]
    async fn leasing_the_wrong_type_is_a_mismatch() {
        let slot = TransactionSlot::default();
        slot.put(Staged(Vec::new())).await;

        assert!(matches!(
            slot.lease::<Other>().await,
            Err(AppError::TypeMismatch { .. })
        ));
        // 失败的租用不会取走事务
        assert!(slot.take::<Staged>().await.is_ok());
    }

    #[test]
    fn read_committed_is_default() {
        assert_eq!(IsolationLevel::default(), IsolationLevel::ReadCommitted);
        assert_eq!(IsolationLevel::default().to_string(), "READ COMMITTED");
    }

    #[test]
    fn isolation_level_deserializes_from_snake_case() {
        let lvl: IsolationLevel = serde_json::from_str("\"repeatable_read\"").unwrap();
        assert_eq!(lvl, IsolationLevel::RepeatableRead);
        assert_eq!(lvl.as_sql(), "REPEATABLE READ");
    }
}
