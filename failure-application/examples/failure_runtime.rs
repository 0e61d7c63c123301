/// 失败处理运行时示例
/// 从 YAML 加载配置（不存在时使用默认值），注册处理器并走完一次启动/提交/关闭
use async_trait::async_trait;
use failure_application::telemetry::init_tracing;
use failure_application::{AppConfig, FailureHandlingRuntime, HandlerRegistry};
use failure_domain::error::FailureResult;
use failure_domain::failure::{AckRef, Failure, FailureBatch, FailureType, Message};
use failure_domain::handling::{Acknowledger, FailureHandler};
use std::path::Path;
use std::sync::Arc;

struct JournalAcknowledger;

#[async_trait]
impl Acknowledger for JournalAcknowledger {
    async fn acknowledge(&self, refs: Vec<AckRef>) {
        tracing::info!(?refs, "journal offsets committed");
    }
}

struct ReindexHandler;

#[async_trait]
impl FailureHandler for ReindexHandler {
    fn handler_name(&self) -> &str {
        "reindex"
    }

    fn supports(&self, batch: &FailureBatch) -> bool {
        batch.contains_indexing_failures()
    }

    async fn handle(&self, batch: &FailureBatch) -> FailureResult<()> {
        for failure in batch.failures() {
            tracing::info!(unit_id = failure.failed_unit().unit_id(), "scheduled reindex");
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args().nth(1);
    let config = match path {
        Some(path) => AppConfig::from_file(Path::new(&path))?,
        None => AppConfig::default(),
    };
    init_tracing(&config.logging)?;

    let registry = HandlerRegistry::new().with_handler(Arc::new(ReindexHandler))?;
    let runtime =
        FailureHandlingRuntime::start(&config, Arc::new(JournalAcknowledger), registry).await?;

    for i in 0..3 {
        let id = format!("m-{i}");
        let batch = FailureBatch::indexing(vec![
            Failure::builder()
                .failure_type(FailureType::Indexing)
                .cause("MapperParsingException")
                .message(format!("field [ts] of {id} is not a date"))
                .target("graylog_0".to_string())
                .failed_unit(Arc::new(Message::new(id.clone()).with_queue_id(id)))
                .build(),
        ])?;
        runtime.submit(batch).await?;
    }

    let drained = runtime.shutdown().await?;
    println!("drained {drained} batches during shutdown");
    Ok(())
}
