use anyhow::Result as AnyResult;
use async_trait::async_trait;
use failure_application::error::AppError;
use failure_application::{AppConfig, FailureHandlingRuntime, HandlerRegistry};
use failure_domain::error::{FailureError, FailureResult};
use failure_domain::failure::{AckRef, Failure, FailureBatch, FailureType, Message, OpaqueUnit};
use failure_domain::handling::{Acknowledger, FailureHandler, ServiceState, SubmissionQueue};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct Acks {
    calls: Mutex<Vec<Vec<AckRef>>>,
}

impl Acks {
    fn calls(&self) -> Vec<Vec<AckRef>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Acknowledger for Acks {
    async fn acknowledge(&self, refs: Vec<AckRef>) {
        self.calls.lock().unwrap().push(refs);
    }
}

struct Collecting {
    name: &'static str,
    seen: Mutex<Vec<String>>,
}

impl Collecting {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            seen: Mutex::new(Vec::new()),
        }
    }

    fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl FailureHandler for Collecting {
    fn handler_name(&self) -> &str {
        self.name
    }

    fn supports(&self, batch: &FailureBatch) -> bool {
        batch.contains_indexing_failures()
    }

    async fn handle(&self, batch: &FailureBatch) -> FailureResult<()> {
        let mut seen = self.seen.lock().unwrap();
        for failure in batch.failures() {
            seen.push(failure.failed_unit().unit_id().to_string());
        }
        Ok(())
    }
}

fn indexing_batch(id: &str) -> FailureBatch {
    FailureBatch::indexing(vec![
        Failure::builder()
            .failure_type(FailureType::Indexing)
            .cause("MappingError")
            .message(format!("failed to index {id}"))
            .failed_unit(Arc::new(Message::new(id).with_queue_id(format!("q-{id}"))))
            .build(),
    ])
    .unwrap()
}

fn processing_batch(id: &str) -> FailureBatch {
    FailureBatch::processing(vec![
        Failure::builder()
            .failure_type(FailureType::Processing)
            .cause("ExtractorException")
            .message("extractor failed")
            .failed_unit(Arc::new(OpaqueUnit::new(id)))
            .build(),
    ])
    .unwrap()
}

fn config(queue_capacity: usize) -> AppConfig {
    let mut config = AppConfig::default();
    config.failure_handling.queue_capacity = queue_capacity;
    config.failure_handling.shutdown_await_ms = 50;
    config
}

#[tokio::test(flavor = "multi_thread")]
async fn runtime_routes_batches_and_falls_back_to_logging() -> AnyResult<()> {
    let acks = Arc::new(Acks::default());
    let indexer = Arc::new(Collecting::new("indexer"));
    let registry = HandlerRegistry::new().with_handler(indexer.clone())?;

    let runtime = FailureHandlingRuntime::start(&config(8), acks.clone(), registry).await?;
    assert_eq!(runtime.state(), ServiceState::Running);

    runtime.submit(indexing_batch("m-1")).await?;
    // 无匹配处理器，交给默认的日志兜底处理器
    runtime.submit(processing_batch("raw-1")).await?;
    runtime.submit(indexing_batch("m-2")).await?;

    let _ = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if acks.calls().len() == 3 && runtime.queue().queue_size() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;

    let queue = runtime.queue().clone();
    let service = runtime.service().clone();
    let drained = runtime.shutdown().await?;

    assert_eq!(drained, 0);
    assert_eq!(service.state(), ServiceState::Terminated);
    assert!(queue.is_closed());
    assert_eq!(indexer.seen(), vec!["m-1", "m-2"]);
    // 兜底处理了 raw-1：不透明单元不可确认，确认集合为空但仍会调用
    assert_eq!(
        acks.calls(),
        vec![
            vec![AckRef::new("q-m-1")],
            vec![],
            vec![AckRef::new("q-m-2")],
        ]
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn try_submit_reports_full_queue() -> AnyResult<()> {
    // 处理器阻塞在第一个批次上，队列随后被填满
    #[derive(Default)]
    struct Stuck {
        gate: tokio::sync::Notify,
        handled: AtomicUsize,
    }

    #[async_trait]
    impl FailureHandler for Stuck {
        fn handler_name(&self) -> &str {
            "stuck"
        }

        fn supports(&self, _batch: &FailureBatch) -> bool {
            true
        }

        async fn handle(&self, _batch: &FailureBatch) -> FailureResult<()> {
            self.gate.notified().await;
            self.handled.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    let stuck = Arc::new(Stuck::default());
    let registry = HandlerRegistry::new().with_handler(stuck.clone())?;
    let runtime =
        FailureHandlingRuntime::start(&config(1), Arc::new(Acks::default()), registry).await?;

    runtime.submit(indexing_batch("first")).await?;
    let _ = tokio::time::timeout(Duration::from_secs(2), async {
        while runtime.queue().consumed() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;

    runtime.try_submit(indexing_batch("second"))?;
    let err = runtime.try_submit(indexing_batch("third")).unwrap_err();
    assert!(matches!(
        err,
        AppError::Domain(FailureError::QueueFull { capacity: 1 })
    ));

    // 放行两个批次：当前处理中的与其后取到的
    stuck.gate.notify_one();
    let release = {
        let stuck = stuck.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            stuck.gate.notify_one();
        })
    };

    let drained = runtime.shutdown().await?;
    release.await?;
    // 第二个批次可能在主循环或排空阶段被处理
    assert!(drained <= 1);
    assert_eq!(stuck.handled.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn invalid_config_is_rejected_before_start() {
    let err = FailureHandlingRuntime::start(
        &config(0),
        Arc::new(Acks::default()),
        HandlerRegistry::new(),
    )
    .await
    .err()
    .expect("zero capacity must be rejected");

    assert!(matches!(err, AppError::Config(_)));
}
