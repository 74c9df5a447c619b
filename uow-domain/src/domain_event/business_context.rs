use bon::Builder;
use serde::{Deserialize, Serialize};

/// 一次命令调用的业务语境，随事件一同写入 `SerializedEvent`
#[derive(Builder, Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessContext {
    /// 关联ID：同一业务操作链路上的请求与事件共享
    correlation_id: Option<String>,
    /// 因果ID：直接触发本次操作的请求/事件
    causation_id: Option<String>,
    /// 触发主体类型（如用户、系统等）
    actor_type: Option<String>,
    /// 触发主体ID
    actor_id: Option<String>,
}

impl BusinessContext {
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
}
