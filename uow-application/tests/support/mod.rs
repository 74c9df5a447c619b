#![allow(dead_code)]

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uow_application::error::AppError;
use uow_application::retry::{RetryPolicy, RetryingStrategy};
use uow_application::transaction::{IsolationLevel, Transaction, TransactionController};
use uow_domain::domain_event::{DomainEvent, SerializedEvent};
use uow_domain::error::{DomainError, DomainResult};
use uow_domain::eventing::EventPublisher;

/// 按发生顺序记录 begin/commit/rollback/publish 的共享日志
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.entries().iter().filter(|e| e.starts_with(prefix)).count()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries().iter().position(|e| e == entry)
    }
}

pub struct FakeController {
    journal: Journal,
    policy: RetryPolicy,
    begin_failures: Arc<AtomicUsize>,
    commit_failures: Arc<AtomicUsize>,
    commit_failure_transient: bool,
}

impl FakeController {
    pub fn new(journal: Journal) -> Self {
        Self::with_retries(journal, 3)
    }

    pub fn with_retries(journal: Journal, max_retries: usize) -> Self {
        Self {
            journal,
            policy: RetryPolicy::builder()
                .max_retries(max_retries)
                .initial_delay(Duration::from_millis(1))
                .max_delay(Duration::from_millis(5))
                .build(),
            begin_failures: Arc::new(AtomicUsize::new(0)),
            commit_failures: Arc::new(AtomicUsize::new(0)),
            commit_failure_transient: true,
        }
    }

    /// 前 `n` 次 begin 以瞬时错误失败
    pub fn failing_begins(self, n: usize) -> Self {
        self.begin_failures.store(n, Ordering::SeqCst);
        self
    }

    /// 前 `n` 次 commit 失败；`transient` 决定错误是否可重试
    pub fn failing_commits(mut self, n: usize, transient: bool) -> Self {
        self.commit_failures.store(n, Ordering::SeqCst);
        self.commit_failure_transient = transient;
        self
    }
}

fn consume_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl TransactionController for FakeController {
    type Transaction = FakeTransaction;
    type Strategy = RetryingStrategy;

    fn execution_strategy(&self) -> Self::Strategy {
        RetryingStrategy::new(self.policy.clone())
    }

    async fn begin(&self, isolation: IsolationLevel) -> Result<Self::Transaction, AppError> {
        if consume_one(&self.begin_failures) {
            self.journal.push("begin_failed");
            return Err(AppError::Transient("connection reset".into()));
        }
        self.journal.push(format!("begin:{isolation}"));
        Ok(FakeTransaction {
            journal: self.journal.clone(),
            staged: Vec::new(),
            committed: false,
            commit_failures: self.commit_failures.clone(),
            commit_failure_transient: self.commit_failure_transient,
        })
    }
}

/// 暂存写入，提交时才落入日志（`persisted:<row>`）
pub struct FakeTransaction {
    journal: Journal,
    staged: Vec<String>,
    committed: bool,
    commit_failures: Arc<AtomicUsize>,
    commit_failure_transient: bool,
}

impl FakeTransaction {
    pub fn write(&mut self, row: impl Into<String>) {
        self.staged.push(row.into());
    }
}

#[async_trait]
impl Transaction for FakeTransaction {
    async fn commit(mut self, cancel: &CancellationToken) -> Result<(), AppError> {
        if cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }
        if consume_one(&self.commit_failures) {
            self.journal.push("commit_failed");
            return Err(if self.commit_failure_transient {
                AppError::Transient("could not serialize access".into())
            } else {
                AppError::Infra("disk full".into())
            });
        }
        for row in self.staged.drain(..) {
            self.journal.push(format!("persisted:{row}"));
        }
        self.committed = true;
        self.journal.push("commit");
        Ok(())
    }
}

impl Drop for FakeTransaction {
    fn drop(&mut self) {
        if !self.committed {
            self.journal.push("rollback");
        }
    }
}

pub struct FakePublisher {
    journal: Journal,
    fail_on: Option<String>,
    delay: Duration,
}

impl FakePublisher {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            fail_on: None,
            delay: Duration::from_millis(2),
        }
    }

    pub fn failing_on(mut self, event_type: &str) -> Self {
        self.fail_on = Some(event_type.to_string());
        self
    }
}

#[async_trait]
impl EventPublisher for FakePublisher {
    async fn publish(&self, event: &SerializedEvent, cancel: &CancellationToken) -> DomainResult<()> {
        if cancel.is_cancelled() {
            return Err(DomainError::Cancelled);
        }
        tokio::time::sleep(self.delay).await;

        if self.fail_on.as_deref() == Some(event.event_type()) {
            self.journal
                .push(format!("publish_failed:{}", event.event_type()));
            return Err(DomainError::event_bus("broker unavailable"));
        }
        self.journal.push(format!("publish:{}", event.event_type()));
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AccountEvent {
    Opened { id: String, owner: String },
    Deposited { id: String, amount: i64 },
    Closed { id: String },
}

impl AccountEvent {
    pub fn opened(owner: &str) -> Self {
        Self::Opened {
            id: ulid::Ulid::new().to_string(),
            owner: owner.to_string(),
        }
    }

    pub fn deposited(amount: i64) -> Self {
        Self::Deposited {
            id: ulid::Ulid::new().to_string(),
            amount,
        }
    }

    pub fn closed() -> Self {
        Self::Closed {
            id: ulid::Ulid::new().to_string(),
        }
    }
}

impl DomainEvent for AccountEvent {
    fn event_id(&self) -> &str {
        match self {
            Self::Opened { id, .. } | Self::Deposited { id, .. } | Self::Closed { id } => {
                id.as_str()
            }
        }
    }

    fn event_type(&self) -> &str {
        match self {
            Self::Opened { .. } => "AccountEvent.Opened",
            Self::Deposited { .. } => "AccountEvent.Deposited",
            Self::Closed { .. } => "AccountEvent.Closed",
        }
    }
}
