//! 失败处理器（FailureHandler）
//!
//! 定义对失败批次的处理策略与元信息（名称、是否支持、是否启用）。
//!
use crate::error::FailureResult;
use crate::failure::FailureBatch;
use async_trait::async_trait;

/// 失败处理器：决定是否适用于某个批次，以及如何处理它
///
/// 同一批次可能同时匹配多个处理器，处理器之间不应假设执行顺序或相互可见。
#[async_trait]
pub trait FailureHandler: Send + Sync {
    /// 处理器名称（用于日志与审计）
    fn handler_name(&self) -> &str;

    /// 是否支持该批次
    fn supports(&self, batch: &FailureBatch) -> bool;

    /// 是否启用；兜底处理器的该标志不会被检查
    fn is_enabled(&self) -> bool {
        true
    }

    /// 处理批次
    async fn handle(&self, batch: &FailureBatch) -> FailureResult<()>;
}
