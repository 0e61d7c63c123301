//! 失败处理服务（FailureHandlingService）
//!
//! 独占一个工作任务，统一编排“消费 → 选择处理器 → 分发 → 确认”：
//! - 阻塞等待提交队列中的下一个批次，可被关闭请求打断；
//! - 按 `supports && is_enabled` 选出全部匹配的处理器，无匹配时退回兜底处理器；
//! - 单个处理器的错误或 panic 被就地记录，不影响同批次其他处理器与主循环；
//! - 关闭时以有界超时反复消费，排空即将到来的批次后终止。
//!
use super::lifecycle::StateCell;
use super::metrics;
use super::{Acknowledger, FailureHandler, ServiceState, SubmissionQueue};
use crate::error::{FailureError, FailureResult};
use crate::failure::FailureBatch;
use bon::Builder;
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::{sync::Arc, time::Duration};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

// 导入由 bon::Builder 生成的 typestate 模块与状态转换别名
use self::failure_handling_service_builder::{IsUnset, SetRegistry, State as BuilderState};

const TRIGGER_SHUTDOWN_TAG: &str = "FailureHandlingService#trigger_shutdown";
const SHUTDOWN_TAG: &str = "FailureHandlingService#shut_down";

/// FailureHandlingService：
/// - 通过 `start` 启动独立工作任务，返回用于关闭/等待的 `ServiceHandle`
/// - 注册处理器在构造后只读；兜底处理器单独持有
#[derive(Builder)]
pub struct FailureHandlingService {
    submission_queue: Arc<dyn SubmissionQueue>,
    acknowledger: Arc<dyn Acknowledger>,
    fallback_handler: Arc<dyn FailureHandler>,
    #[builder(default, setters(vis = "pub(crate)"))]
    registry: HandlerRegistry,
    #[builder(default)]
    config: FailureHandlingConfig,
    #[builder(skip)]
    state: StateCell,
}

impl<S: BuilderState> FailureHandlingServiceBuilder<S> {
    pub fn failure_handlers(
        self,
        handlers: Vec<Arc<dyn FailureHandler>>,
    ) -> FailureHandlingServiceBuilder<SetRegistry<S>>
    where
        <S as BuilderState>::Registry: IsUnset,
    {
        self.registry(HandlerRegistry::new(handlers))
    }
}

impl FailureHandlingService {
    /// 启动服务，返回可用于关闭/等待的句柄
    ///
    /// 需在 tokio 运行时内调用；重复启动返回 `IllegalTransition`。
    pub fn start(self: Arc<Self>) -> FailureResult<ServiceHandle> {
        self.state.transition(ServiceState::Starting)?;

        let token = CancellationToken::new();
        let task = tokio::spawn(Self::run_worker(self.clone(), token.clone()));

        Ok(ServiceHandle {
            service: self,
            token,
            task: Some(task),
        })
    }

    pub fn state(&self) -> ServiceState {
        self.state.get()
    }

    pub fn config(&self) -> &FailureHandlingConfig {
        &self.config
    }

    /// 订阅状态变化
    pub fn state_changes(&self) -> watch::Receiver<ServiceState> {
        self.state.subscribe()
    }

    /// 等待服务进入 `Running`；若启动阶段即被关闭或失败则返回错误
    pub async fn await_running(&self) -> FailureResult<()> {
        let actual = self
            .state
            .wait_until(|s| !matches!(s, ServiceState::New | ServiceState::Starting))
            .await;

        if actual == ServiceState::Running {
            Ok(())
        } else {
            Err(FailureError::UnexpectedState {
                expected: ServiceState::Running,
                actual,
            })
        }
    }

    /// 等待服务进入终态（`Terminated` 或 `Failed`）
    pub async fn await_terminated(&self) -> ServiceState {
        self.state.wait_until(ServiceState::is_terminal).await
    }

    async fn run_worker(self: Arc<Self>, token: CancellationToken) -> FailureResult<usize> {
        debug!(
            handlers = self.registry.len(),
            fallback = self.fallback_handler.handler_name(),
            "starting up the failure handling service"
        );

        // 启动期间可能已收到关闭请求，此时直接进入排空
        if self.state.transition(ServiceState::Running).is_ok() {
            debug!("the failure handling service is up and running");
            self.run(&token).await;
        }

        self.shut_down().await
    }

    async fn run(&self, token: &CancellationToken) {
        while self.state.get() == ServiceState::Running && !token.is_cancelled() {
            match self.submission_queue.consume_blocking(token).await {
                Ok(batch) => self.dispatch(&batch).await,
                Err(FailureError::Cancelled) => {
                    info!(
                        queue_size = self.submission_queue.queue_size(),
                        "the service's worker has been interrupted"
                    );
                }
                Err(FailureError::QueueClosed) => {
                    // 队列已关闭，不会再有新批次
                    error!("submission queue closed while the service is running");
                    token.cancelled().await;
                }
                Err(e) => {
                    error!(error = %e, "error occurred while handling failures");
                }
            }
        }

        debug!("the failure handling service has been interrupted");
    }

    /// 关闭请求：迁移到 `Stopping` 并打断当前的阻塞等待
    fn trigger_shutdown(&self, token: &CancellationToken) {
        let transitioned = self.state.transition(ServiceState::Stopping).is_ok();
        token.cancel();

        if transitioned {
            debug!("requested to shut down");
            self.submission_queue.log_stats(TRIGGER_SHUTDOWN_TAG);
        }
    }

    /// 有界排空：直到一次超时消费没有拿到批次为止
    async fn shut_down(&self) -> FailureResult<usize> {
        let shutdown_await = self.config.shutdown_await;
        let mut remaining = 0usize;

        let drained = loop {
            match self
                .submission_queue
                .consume_blocking_with_timeout(shutdown_await)
                .await
            {
                Ok(Some(batch)) => {
                    self.dispatch(&batch).await;
                    remaining += 1;
                }
                Ok(None) => break Ok(remaining),
                Err(e) => break Err(e),
            }
        };

        metrics::batches_drained(remaining as u64);
        self.submission_queue.log_stats(SHUTDOWN_TAG);

        match drained {
            Ok(remaining) => {
                info!(
                    drained = remaining,
                    "shutting down the service, processed remaining failure batches"
                );
                self.state.transition(ServiceState::Terminated)?;
                Ok(remaining)
            }
            Err(e) => {
                error!(error = %e, drained = remaining, "failed to drain the submission queue");
                let _ = self.state.transition(ServiceState::Failed);
                Err(e)
            }
        }
    }

    /// 将批次分发给全部适用的处理器；成功的处理器各自触发一次确认
    async fn dispatch(&self, batch: &FailureBatch) {
        let failure_type = batch.failure_type();

        let handlers = self.suitable_handlers(batch);
        if handlers.is_empty() {
            warn!(
                %failure_type,
                batch_size = batch.size(),
                "no suitable failure handler found, discarding batch"
            );
            metrics::batch_dropped(failure_type.as_str());
            return;
        }
        metrics::batch_handled(failure_type.as_str());

        for handler in handlers {
            let name = handler.handler_name();
            let outcome = AssertUnwindSafe(async {
                handler.handle(batch).await?;
                self.acknowledge(batch).await;
                Ok::<(), FailureError>(())
            })
            .catch_unwind()
            .await
            .unwrap_or_else(|_| {
                Err(FailureError::HandlerPanicked {
                    handler: name.to_string(),
                })
            });

            if let Err(e) = outcome {
                error!(
                    handler = name,
                    %failure_type,
                    batch_size = batch.size(),
                    error = %e,
                    "error occurred while handling failures"
                );
                metrics::handler_failed(name);
            }
        }
    }

    async fn acknowledge(&self, batch: &FailureBatch) {
        let refs = batch.ack_refs();
        metrics::units_acknowledged(refs.len());
        self.acknowledger.acknowledge(refs).await;
    }

    /// 主处理器优先（全部匹配者扇出）；无主处理器时退回兜底，兜底不检查启用标志
    fn suitable_handlers(&self, batch: &FailureBatch) -> Vec<Arc<dyn FailureHandler>> {
        let primary = self.registry.matching(batch);
        if !primary.is_empty() {
            return primary;
        }

        if applies(&self.fallback_handler, batch, false) {
            vec![self.fallback_handler.clone()]
        } else {
            Vec::new()
        }
    }
}

#[derive(Clone, Default)]
pub(crate) struct HandlerRegistry {
    handlers: Vec<Arc<dyn FailureHandler>>,
}

impl HandlerRegistry {
    fn new(handlers: Vec<Arc<dyn FailureHandler>>) -> Self {
        Self { handlers }
    }

    fn len(&self) -> usize {
        self.handlers.len()
    }

    fn matching(&self, batch: &FailureBatch) -> Vec<Arc<dyn FailureHandler>> {
        self.handlers
            .iter()
            .filter(|h| applies(h, batch, true))
            .cloned()
            .collect()
    }
}

/// `supports`（及可选的 `is_enabled`）判定；panic 视为不适用
fn applies(handler: &Arc<dyn FailureHandler>, batch: &FailureBatch, check_enabled: bool) -> bool {
    let verdict = std::panic::catch_unwind(AssertUnwindSafe(|| {
        handler.supports(batch) && (!check_enabled || handler.is_enabled())
    }));

    verdict.unwrap_or_else(|_| {
        let name = handler.handler_name();
        error!(
            handler = name,
            failure_type = %batch.failure_type(),
            "failure handler panicked while being selected, skipping it"
        );
        metrics::handler_failed(name);
        false
    })
}

/// 失败处理服务配置
#[derive(Clone, Copy, Debug)]
pub struct FailureHandlingConfig {
    /// 关闭排空时单次消费的最长等待
    pub shutdown_await: Duration,
}

impl Default for FailureHandlingConfig {
    fn default() -> Self {
        Self {
            shutdown_await: Duration::from_secs(3),
        }
    }
}

/// 服务运行句柄：用于触发关闭与等待工作任务结束
pub struct ServiceHandle {
    service: Arc<FailureHandlingService>,
    token: CancellationToken,
    task: Option<JoinHandle<FailureResult<usize>>>,
}

impl ServiceHandle {
    pub fn service(&self) -> &Arc<FailureHandlingService> {
        &self.service
    }

    pub fn state(&self) -> ServiceState {
        self.service.state()
    }

    pub async fn await_running(&self) -> FailureResult<()> {
        self.service.await_running().await
    }

    /// 触发关闭，不等待排空完成；可重复调用
    pub fn stop(&self) {
        self.service.trigger_shutdown(&self.token);
    }

    /// 等待工作任务结束，返回排空阶段处理的批次数
    ///
    /// 工作任务只在关闭请求后结束，通常先调用 `stop`。
    pub async fn join(mut self) -> FailureResult<usize> {
        let Some(task) = self.task.take() else {
            return Ok(0);
        };

        match task.await {
            Ok(result) => result,
            Err(e) => {
                let _ = self.service.state.transition(ServiceState::Failed);
                Err(FailureError::WorkerAborted {
                    reason: e.to_string(),
                })
            }
        }
    }

    /// `stop` + `join`
    pub async fn shutdown(self) -> FailureResult<usize> {
        self.stop();
        self.join().await
    }
}

impl Drop for ServiceHandle {
    fn drop(&mut self) {
        if self.task.is_some() {
            self.stop();
        }
    }
}
