//! 确认器（Acknowledger）
//!
//! 向上游持久标记“该单元已被处理，无需再经此路径重试”。
//!
use crate::failure::AckRef;
use async_trait::async_trait;

/// 确认器：即发即忘，失败由实现自行记录与处理
#[async_trait]
pub trait Acknowledger: Send + Sync {
    async fn acknowledge(&self, refs: Vec<AckRef>);
}
