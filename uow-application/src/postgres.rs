//! Postgres 事务控制器（需启用 `infra-sqlx` feature）
//!
//! - `begin`：从连接池开启事务后立即设置隔离级别；
//! - 执行策略为 `RetryingStrategy`，序列化失败、死锁与连接层故障会被归类为瞬时错误；
//! - 事务句柄被丢弃而未提交时，由 sqlx 负责回滚。
//!
//! 处理器在事务内写入：
//! ```rust,no_run
//! use uow_application::context::AppContext;
//! use uow_application::error::AppError;
//! use uow_application::postgres::PgTransaction;
//!
//! async fn open_account(ctx: &AppContext, id: &str) -> Result<(), AppError> {
//!     let mut tx = ctx.transaction::<PgTransaction>().await?;
//!     sqlx::query("INSERT INTO accounts (id) VALUES ($1)")
//!         .bind(id)
//!         .execute(tx.connection())
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
use crate::error::AppError;
use crate::retry::{RetryPolicy, RetryingStrategy};
use crate::transaction::{IsolationLevel, Transaction, TransactionController};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres};
use tokio_util::sync::CancellationToken;

/// SQLSTATE：serialization_failure / deadlock_detected
const TRANSIENT_SQLSTATES: [&str; 2] = ["40001", "40P01"];

#[derive(Clone, Debug)]
pub struct PgTransactionController {
    pool: PgPool,
    retry: RetryPolicy,
}

impl PgTransactionController {
    pub fn new(pool: PgPool) -> Self {
        Self::with_retry(pool, RetryPolicy::default())
    }

    pub fn with_retry(pool: PgPool, retry: RetryPolicy) -> Self {
        Self { pool, retry }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl TransactionController for PgTransactionController {
    type Transaction = PgTransaction;
    type Strategy = RetryingStrategy;

    fn execution_strategy(&self) -> Self::Strategy {
        RetryingStrategy::new(self.retry.clone())
    }

    async fn begin(&self, isolation: IsolationLevel) -> Result<Self::Transaction, AppError> {
        let mut tx = self.pool.begin().await?;

        // 必须是事务内的第一条语句
        let stmt = format!("SET TRANSACTION ISOLATION LEVEL {}", isolation.as_sql());
        sqlx::query(&stmt).execute(&mut *tx).await?;

        Ok(PgTransaction { inner: tx })
    }
}

/// 一次尝试独占的 Postgres 事务
pub struct PgTransaction {
    inner: sqlx::Transaction<'static, Postgres>,
}

impl PgTransaction {
    /// 供仓储在同一事务内执行语句，例如 `query.execute(tx.connection())`
    pub fn connection(&mut self) -> &mut sqlx::PgConnection {
        &mut self.inner
    }
}

#[async_trait]
impl Transaction for PgTransaction {
    async fn commit(self, cancel: &CancellationToken) -> Result<(), AppError> {
        if cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }

        tokio::select! {
            _ = cancel.cancelled() => Err(AppError::Cancelled),
            res = self.inner.commit() => res.map_err(AppError::from),
        }
    }
}

fn is_transient_sqlstate(code: &str) -> bool {
    TRANSIENT_SQLSTATES.contains(&code)
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        let transient = match &err {
            sqlx::Error::Database(db) => db.code().is_some_and(|code| is_transient_sqlstate(&code)),
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => true,
            _ => false,
        };

        if transient {
            AppError::Transient(err.to_string())
        } else {
            AppError::Infra(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialization_failure_and_deadlock_are_transient() {
        assert!(is_transient_sqlstate("40001"));
        assert!(is_transient_sqlstate("40P01"));
        assert!(!is_transient_sqlstate("23505"));
    }

    #[test]
    fn connection_level_failures_map_to_transient() {
        assert!(AppError::from(sqlx::Error::PoolTimedOut).is_transient());

        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        assert!(AppError::from(sqlx::Error::Io(io)).is_transient());
    }

    #[test]
    fn other_failures_map_to_infra() {
        let err = AppError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, AppError::Infra(_)));
        assert!(!err.is_transient());
    }
}
