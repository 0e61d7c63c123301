//! 提交队列（SubmissionQueue）协议
//!
//! 生产者提交的失败批次在此缓冲，由分发服务的工作任务单独消费。
//! 阻塞消费通过 `CancellationToken` 协作式取消。
//!
use crate::{error::FailureResult as Result, failure::FailureBatch};
use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[async_trait]
pub trait SubmissionQueue: Send + Sync {
    /// 等待下一个批次；`token` 被取消时返回 `FailureError::Cancelled`
    async fn consume_blocking(&self, token: &CancellationToken) -> Result<FailureBatch>;

    /// 最多等待 `timeout`；超时返回 `None`
    async fn consume_blocking_with_timeout(&self, timeout: Duration)
    -> Result<Option<FailureBatch>>;

    /// 当前积压的批次数
    fn queue_size(&self) -> usize;

    /// 输出诊断统计
    fn log_stats(&self, tag: &str);
}
