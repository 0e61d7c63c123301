/// 失败处理服务（内存版）示例
/// 展示 提交队列 -> 分发服务 -> 处理器 -> 确认器 的闭环，以及关闭时的有界排空
use anyhow::Result as AnyResult;
use failure_domain::error::{FailureError, FailureResult};
use failure_domain::failure::{AckRef, Failure, FailureBatch, FailureType, Message, OpaqueUnit};
use failure_domain::handling::{
    Acknowledger, FailureHandler, FailureHandlingConfig, FailureHandlingService,
    InMemorySubmissionQueue,
};
use std::{sync::Arc, time::Duration};

// ============================================================================
// 确认器（Acknowledger）
// ============================================================================

struct PrintAcknowledger;

#[async_trait::async_trait]
impl Acknowledger for PrintAcknowledger {
    async fn acknowledge(&self, refs: Vec<AckRef>) {
        println!("[ack] {refs:?}");
    }
}

// ============================================================================
// 示例处理器（FailureHandler）
// ============================================================================

/// 只处理索引失败，遇到指定目标索引时失败
struct IndexRetryHandler {
    broken_target: &'static str,
}

#[async_trait::async_trait]
impl FailureHandler for IndexRetryHandler {
    fn handler_name(&self) -> &str {
        "index-retry"
    }

    fn supports(&self, batch: &FailureBatch) -> bool {
        batch.contains_indexing_failures()
    }

    async fn handle(&self, batch: &FailureBatch) -> FailureResult<()> {
        for failure in batch.failures() {
            if failure.target() == Some(self.broken_target) {
                return Err(FailureError::handler(
                    self.handler_name(),
                    format!("target {} is read-only", self.broken_target),
                ));
            }
            println!("[index-retry] re-queued {}", failure.failed_unit().unit_id());
        }
        Ok(())
    }
}

/// 兜底：打印并丢弃
struct PrintFallback;

#[async_trait::async_trait]
impl FailureHandler for PrintFallback {
    fn handler_name(&self) -> &str {
        "print-fallback"
    }

    fn supports(&self, _batch: &FailureBatch) -> bool {
        true
    }

    async fn handle(&self, batch: &FailureBatch) -> FailureResult<()> {
        for failure in batch.failures() {
            println!(
                "[fallback] {} {}: {}",
                failure.failure_type(),
                failure.cause(),
                failure.message()
            );
        }
        Ok(())
    }
}

fn indexing(id: &str, target: &str) -> FailureResult<FailureBatch> {
    FailureBatch::indexing(vec![
        Failure::builder()
            .failure_type(FailureType::Indexing)
            .cause("MappingError")
            .message(format!("could not index message {id}"))
            .target(target.to_string())
            .failed_unit(Arc::new(
                Message::new(id).with_queue_id(format!("journal-{id}")),
            ))
            .build(),
    ])
}

fn processing(id: &str) -> FailureResult<FailureBatch> {
    FailureBatch::processing(vec![
        Failure::builder()
            .failure_type(FailureType::Processing)
            .cause("ExtractorException")
            .message("regex extractor failed")
            .failed_unit(Arc::new(OpaqueUnit::new(id)))
            .build(),
    ])
}

#[tokio::main]
async fn main() -> AnyResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("debug"))
        .init();

    let queue = Arc::new(InMemorySubmissionQueue::new(64));
    let service = Arc::new(
        FailureHandlingService::builder()
            .submission_queue(queue.clone())
            .acknowledger(Arc::new(PrintAcknowledger))
            .fallback_handler(Arc::new(PrintFallback))
            .failure_handlers(vec![Arc::new(IndexRetryHandler {
                broken_target: "archive_3",
            })])
            .config(FailureHandlingConfig {
                shutdown_await: Duration::from_millis(300),
            })
            .build(),
    );

    let handle = service.clone().start()?;
    handle.await_running().await?;

    let ulid = ulid::Ulid::new().to_string();
    queue.submit_blocking(indexing(&ulid, "graylog_0")?).await?;
    queue.submit_blocking(indexing("m-2", "archive_3")?).await?;
    queue.submit_blocking(processing("raw-1")?).await?;

    tokio::time::sleep(Duration::from_millis(100)).await;

    // 关闭后仍会处理等待窗口内到达的批次
    queue.submit_blocking(indexing("m-3", "graylog_0")?).await?;
    let drained = handle.shutdown().await?;
    println!("service {} after draining {drained} batches", service.state());

    Ok(())
}
