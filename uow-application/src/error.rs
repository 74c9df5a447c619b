use uow_domain::error::DomainError;

#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("domain: {0}")]
    Domain(#[from] DomainError),

    #[error("validation: {0}")]
    Validation(String),

    #[error("infra: {0}")]
    Infra(String),

    /// 可重试的基础设施错误（死锁、序列化冲突、连接抖动等），由执行策略决定是否重试
    #[error("transient: {0}")]
    Transient(String),

    #[error("operation cancelled")]
    Cancelled,

    /// 事务已提交，但事件未能全部发布
    #[error("event publication failed: event_type={event_type}, reason={reason}")]
    EventPublication { event_type: String, reason: String },

    /// 当前上下文没有已开启的事务（处理器未在事务范围内执行）
    #[error("no active transaction")]
    NoActiveTransaction,

    #[error("handler not found: {0}")]
    HandlerNotFound(&'static str),

    #[error("handler already registered: command={command}")]
    AlreadyRegisteredCommand { command: &'static str },

    #[error("type mismatch: expected={expected}, found={found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

impl AppError {
    /// 是否值得整体重试一次工作单元
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Transient(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_errors_are_retryable() {
        assert!(AppError::Transient("deadlock detected".into()).is_transient());

        let fatal = [
            AppError::Domain(DomainError::Cancelled),
            AppError::Validation("negative deposit".into()),
            AppError::Infra("disk full".into()),
            AppError::Cancelled,
            AppError::EventPublication {
                event_type: "AccountEvent.Opened".into(),
                reason: "broker unavailable".into(),
            },
            AppError::NoActiveTransaction,
            AppError::HandlerNotFound("OpenAccount"),
        ];
        assert!(fatal.iter().all(|err| !err.is_transient()));
    }

    #[test]
    fn domain_errors_convert_with_their_message() {
        let err = AppError::from(DomainError::event_bus("broker unavailable"));
        assert_eq!(err.to_string(), "domain: event bus error: broker unavailable");
    }
}
