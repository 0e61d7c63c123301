//! 失败处理运行时
//!
//! 按配置装配内存提交队列与分发服务，启动后对外提供提交入口与关闭流程。

use crate::config::AppConfig;
use crate::error::AppResult;
use crate::registry::HandlerRegistry;
use failure_domain::failure::FailureBatch;
use failure_domain::handling::{
    Acknowledger, FailureHandlingService, InMemorySubmissionQueue, ServiceHandle, ServiceState,
    metrics,
};
use std::sync::Arc;

pub struct FailureHandlingRuntime {
    queue: Arc<InMemorySubmissionQueue>,
    service: Arc<FailureHandlingService>,
    handle: ServiceHandle,
}

impl FailureHandlingRuntime {
    /// 装配并启动服务，返回时服务已处于 `Running`
    pub async fn start(
        config: &AppConfig,
        acknowledger: Arc<dyn Acknowledger>,
        registry: HandlerRegistry,
    ) -> AppResult<Self> {
        config.validate()?;
        metrics::describe();

        let queue = Arc::new(InMemorySubmissionQueue::new(
            config.failure_handling.queue_capacity,
        ));
        let (handlers, fallback) = registry.into_parts();

        let service = Arc::new(
            FailureHandlingService::builder()
                .submission_queue(queue.clone())
                .acknowledger(acknowledger)
                .fallback_handler(fallback)
                .failure_handlers(handlers)
                .config(config.failure_handling_config())
                .build(),
        );

        let handle = service.clone().start()?;
        handle.await_running().await?;

        tracing::info!(
            queue_capacity = queue.capacity(),
            shutdown_await_ms = config.failure_handling.shutdown_await_ms,
            "failure handling runtime started"
        );

        Ok(Self {
            queue,
            service,
            handle,
        })
    }

    /// 提交批次，队列满时等待
    pub async fn submit(&self, batch: FailureBatch) -> AppResult<()> {
        self.queue.submit_blocking(batch).await?;
        Ok(())
    }

    /// 提交批次，队列满时立即返回 `QueueFull`
    pub fn try_submit(&self, batch: FailureBatch) -> AppResult<()> {
        self.queue.try_submit(batch)?;
        Ok(())
    }

    pub fn queue(&self) -> &Arc<InMemorySubmissionQueue> {
        &self.queue
    }

    pub fn service(&self) -> &Arc<FailureHandlingService> {
        &self.service
    }

    pub fn state(&self) -> ServiceState {
        self.service.state()
    }

    /// 关闭服务并等待排空结束，返回排空阶段处理的批次数
    ///
    /// 排空期间仍接受提交，结束后队列关闭。
    pub async fn shutdown(self) -> AppResult<usize> {
        let result = self.handle.shutdown().await;
        self.queue.close();

        let drained = result?;
        tracing::info!(
            drained,
            state = %self.service.state(),
            "failure handling runtime stopped"
        );
        Ok(drained)
    }
}
