use async_trait::async_trait;
use failure_domain::error::FailureResult;
use failure_domain::failure::FailureBatch;
use failure_domain::handling::FailureHandler;

/// 默认兜底处理器：接受所有批次，逐条以 warn 级别记录后视为处理成功
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingFailureHandler;

impl LoggingFailureHandler {
    pub const NAME: &'static str = "logging-fallback";
}

#[async_trait]
impl FailureHandler for LoggingFailureHandler {
    fn handler_name(&self) -> &str {
        Self::NAME
    }

    fn supports(&self, _batch: &FailureBatch) -> bool {
        true
    }

    async fn handle(&self, batch: &FailureBatch) -> FailureResult<()> {
        for failure in batch.failures() {
            tracing::warn!(
                failure_type = %failure.failure_type(),
                unit_id = failure.failed_unit().unit_id(),
                cause = failure.cause(),
                target = failure.target().unwrap_or("-"),
                "{}",
                failure.message()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use failure_domain::failure::{Failure, FailureType, OpaqueUnit};
    use std::sync::Arc;

    fn processing_batch() -> FailureBatch {
        FailureBatch::processing(vec![
            Failure::builder()
                .failure_type(FailureType::Processing)
                .cause("ExtractorException")
                .message("extractor failed")
                .failed_unit(Arc::new(OpaqueUnit::new("raw-1")))
                .build(),
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn accepts_and_handles_any_batch() {
        let handler = LoggingFailureHandler;
        let batch = processing_batch();

        assert!(handler.supports(&batch));
        assert!(handler.is_enabled());
        assert_eq!(handler.handler_name(), LoggingFailureHandler::NAME);
        assert!(handler.handle(&batch).await.is_ok());
    }
}
