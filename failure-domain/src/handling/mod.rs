//! 失败处理子系统（handling）
//!
//! 提供失败批次分发与处理的基础抽象与运行时：
//! - `SubmissionQueue`：生产者与分发服务之间的批次缓冲（阻塞/超时消费）；
//! - `FailureHandler`：可插拔的失败处理策略（含唯一的兜底处理器）；
//! - `Acknowledger`：对已处理的上游单元进行持久确认；
//! - `FailureHandlingService`：独占工作任务，选择处理器、隔离失败、有界排空并关闭。
//!
//! 该模块仅定义协议与服务，不绑定具体存储/消息实现；内存队列可用于测试与本地开发。
//!
pub mod acknowledger;
pub mod handler;
pub mod lifecycle;
pub mod metrics;
pub mod service;
pub mod submission;
pub mod submission_inmemory;

pub use acknowledger::Acknowledger;
pub use handler::FailureHandler;
pub use lifecycle::ServiceState;
pub use service::{FailureHandlingConfig, FailureHandlingService, ServiceHandle};
pub use submission::SubmissionQueue;
pub use submission_inmemory::InMemorySubmissionQueue;
