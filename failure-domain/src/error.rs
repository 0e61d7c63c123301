//! 失败处理统一错误定义
//!
//! 覆盖批次构造、处理器执行、提交队列与服务生命周期的最小必要集合，
//! 便于在应用层统一转换。
//!
use crate::failure::FailureType;
use crate::handling::ServiceState;
use thiserror::Error;

/// 统一错误类型（失败处理核心的最小必要集）
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum FailureError {
    // --- 数据模型 ---
    #[error("failure batch must contain at least one failure")]
    EmptyBatch,
    #[error("mixed failure batch: expected={expected}, found={found}")]
    MixedBatch {
        expected: FailureType,
        found: FailureType,
    },

    // --- 处理器 ---
    #[error("failure handler error: handler={handler}, reason={reason}")]
    Handler { handler: String, reason: String },
    #[error("failure handler panicked: handler={handler}")]
    HandlerPanicked { handler: String },

    // --- 提交队列 ---
    #[error("consume cancelled")]
    Cancelled,
    #[error("submission queue closed")]
    QueueClosed,
    #[error("submission queue full: capacity={capacity}")]
    QueueFull { capacity: usize },

    // --- 生命周期 ---
    #[error("illegal service state transition: from={from}, to={to}")]
    IllegalTransition { from: ServiceState, to: ServiceState },
    #[error("unexpected service state: expected={expected}, actual={actual}")]
    UnexpectedState {
        expected: ServiceState,
        actual: ServiceState,
    },
    #[error("service worker aborted: {reason}")]
    WorkerAborted { reason: String },
}

impl FailureError {
    pub fn handler(handler: impl Into<String>, reason: impl Into<String>) -> Self {
        FailureError::Handler {
            handler: handler.into(),
            reason: reason.into(),
        }
    }
}

/// 统一 Result 类型别名
pub type FailureResult<T> = Result<T, FailureError>;
