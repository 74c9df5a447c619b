//! 领域事件收集器（DomainEventCollector）
//!
//! 业务逻辑在一次工作单元内产生的事件先暂存于收集器，
//! 事务提交成功后由应用层一次性取出并发布。
//!
//! 收集器应当是“请求级”的：并发执行的两个命令不能看到彼此的事件。
//!
use crate::domain_event::SerializedEvent;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// 事件收集器协议
pub trait DomainEventCollector: Send + Sync {
    /// 追加一条事件（保持产生顺序）
    fn record(&self, event: SerializedEvent);

    /// 取出自上次取出（或清空）以来记录的全部事件，并清空缓冲
    fn drain_events(&self) -> Vec<SerializedEvent>;

    /// 丢弃尚未取出的事件
    fn clear(&self);

    /// 当前暂存的事件数量
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 基于内存的收集器实现
#[derive(Debug, Default)]
pub struct InMemoryEventCollector {
    events: Mutex<Vec<SerializedEvent>>,
}

impl InMemoryEventCollector {
    pub fn new() -> Self {
        Self::default()
    }

    fn events(&self) -> MutexGuard<'_, Vec<SerializedEvent>> {
        // 缓冲区只做 push/take，中毒后数据依然一致
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DomainEventCollector for InMemoryEventCollector {
    fn record(&self, event: SerializedEvent) {
        self.events().push(event);
    }

    fn drain_events(&self) -> Vec<SerializedEvent> {
        std::mem::take(&mut *self.events())
    }

    fn clear(&self) {
        self.events().clear();
    }

    fn len(&self) -> usize {
        self.events().len()
    }
}
