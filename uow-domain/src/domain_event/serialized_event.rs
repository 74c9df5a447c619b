//! 事件传输模型（SerializedEvent）
//!
//! 事件在收集、发布与订阅处理之间流转时的统一形态：
//! 载荷以 JSON 保存，具体事件类型在订阅端按需还原。
//!
use super::{BusinessContext, DomainEvent};
use crate::error::{DomainError, DomainResult};
use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
pub struct SerializedEvent {
    /// 事件唯一标识符
    event_id: String,
    /// 事件类型，订阅者据此匹配
    event_type: String,
    /// 事件版本
    event_version: usize,
    /// 聚合 ID，标识事件所属的领域对象实例
    aggregate_id: String,
    /// 聚合类型
    aggregate_type: String,
    /// 关联 ID
    correlation_id: Option<String>,
    /// 因果 ID
    causation_id: Option<String>,
    /// 触发事件的主体类型
    actor_type: Option<String>,
    /// 触发事件的主体 ID
    actor_id: Option<String>,
    /// 事件发生时间
    occurred_at: DateTime<Utc>,
    /// 事件负载
    payload: Value,
}

impl SerializedEvent {
    /// 由具体领域事件构造传输形态，业务语境取自当前请求
    pub fn from_domain_event<E>(
        aggregate_type: &str,
        aggregate_id: &str,
        event: &E,
        biz: &BusinessContext,
    ) -> DomainResult<Self>
    where
        E: DomainEvent,
    {
        Ok(SerializedEvent {
            event_id: event.event_id().to_string(),
            event_type: event.event_type().to_string(),
            event_version: event.event_version(),
            aggregate_id: aggregate_id.to_string(),
            aggregate_type: aggregate_type.to_string(),
            correlation_id: biz.correlation_id().map(str::to_string),
            causation_id: biz.causation_id().map(str::to_string),
            actor_type: biz.actor_type().map(str::to_string),
            actor_id: biz.actor_id().map(str::to_string),
            occurred_at: Utc::now(),
            payload: serde_json::to_value(event)?,
        })
    }

    /// 将载荷还原为具体事件类型
    pub fn payload_as<E>(&self) -> DomainResult<E>
    where
        E: DomainEvent,
    {
        let event: E = serde_json::from_value(self.payload.clone())?;
        if event.event_type() != self.event_type {
            return Err(DomainError::TypeMismatch {
                expected: self.event_type.clone(),
                found: event.event_type().to_string(),
            });
        }
        Ok(event)
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn event_version(&self) -> usize {
        self.event_version
    }

    pub fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }

    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    pub fn causation_id(&self) -> Option<&str> {
        self.causation_id.as_deref()
    }

    pub fn actor_type(&self) -> Option<&str> {
        self.actor_type.as_deref()
    }

    pub fn actor_id(&self) -> Option<&str> {
        self.actor_id.as_deref()
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    enum TicketEvent {
        Reserved { id: String, seats: u32 },
        Released { id: String },
    }

    impl DomainEvent for TicketEvent {
        fn event_id(&self) -> &str {
            match self {
                Self::Reserved { id, .. } | Self::Released { id } => id.as_str(),
            }
        }

        fn event_type(&self) -> &str {
            match self {
                Self::Reserved { .. } => "TicketEvent.Reserved",
                Self::Released { .. } => "TicketEvent.Released",
            }
        }
    }

    #[test]
    fn from_domain_event_copies_business_context() {
        let biz = BusinessContext::builder()
            .correlation_id("cor-1".into())
            .actor_type("user".into())
            .actor_id("u-9".into())
            .build();
        let ev = TicketEvent::Reserved {
            id: ulid::Ulid::new().to_string(),
            seats: 2,
        };

        let se = SerializedEvent::from_domain_event("ticket", "t-1", &ev, &biz).unwrap();

        assert_eq!(se.event_id(), ev.event_id());
        assert_eq!(se.event_type(), "TicketEvent.Reserved");
        assert_eq!(se.event_version(), 1);
        assert_eq!(se.aggregate_type(), "ticket");
        assert_eq!(se.aggregate_id(), "t-1");
        assert_eq!(se.correlation_id(), Some("cor-1"));
        assert_eq!(se.causation_id(), None);
        assert_eq!(se.actor_id(), Some("u-9"));

        let back: TicketEvent = se.payload_as().unwrap();
        assert_eq!(back, ev);
    }

    #[test]
    fn payload_as_rejects_mismatched_event_type() {
        let ev = TicketEvent::Released { id: "e-1".into() };
        let se = SerializedEvent::builder()
            .event_id("e-1".into())
            .event_type("TicketEvent.Reserved".into())
            .event_version(1)
            .aggregate_id("t-1".into())
            .aggregate_type("ticket".into())
            .occurred_at(Utc::now())
            .payload(serde_json::to_value(&ev).unwrap())
            .build();

        match se.payload_as::<TicketEvent>() {
            Err(DomainError::TypeMismatch { expected, found }) => {
                assert_eq!(expected, "TicketEvent.Reserved");
                assert_eq!(found, "TicketEvent.Released");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
