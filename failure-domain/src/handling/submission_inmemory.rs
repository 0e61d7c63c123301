//! 内存版提交队列（InMemorySubmissionQueue）
//!
//! 基于 `tokio::sync::mpsc` 有界通道实现的 `SubmissionQueue`：
//! - `submit_blocking`：队列满时等待空位（背压）；
//! - `try_submit`：队列满时立即返回 `QueueFull`；
//! - `close`：拒绝后续提交，已缓冲的批次仍可被消费。
//!
//! 注意：该实现假定只有一个消费者（分发服务的工作任务）。

use crate::error::{FailureError, FailureResult as Result};
use crate::failure::FailureBatch;
use crate::handling::SubmissionQueue;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

pub struct InMemorySubmissionQueue {
    capacity: usize,
    tx: RwLock<Option<mpsc::Sender<FailureBatch>>>,
    rx: Mutex<mpsc::Receiver<FailureBatch>>,
    submitted: AtomicU64,
    consumed: AtomicU64,
    rejected: AtomicU64,
}

impl InMemorySubmissionQueue {
    /// 创建有界队列，`capacity` 为可缓冲的批次数（最小为 1）
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            capacity,
            tx: RwLock::new(Some(tx)),
            rx: Mutex::new(rx),
            submitted: AtomicU64::new(0),
            consumed: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 提交批次，队列满时等待
    pub async fn submit_blocking(&self, batch: FailureBatch) -> Result<()> {
        let Some(tx) = self.sender() else {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            return Err(FailureError::QueueClosed);
        };

        match tx.send(batch).await {
            Ok(()) => {
                self.submitted.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(_) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                Err(FailureError::QueueClosed)
            }
        }
    }

    /// 尝试提交批次，不等待
    pub fn try_submit(&self, batch: FailureBatch) -> Result<()> {
        let Some(tx) = self.sender() else {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            return Err(FailureError::QueueClosed);
        };

        match tx.try_send(batch) {
            Ok(()) => {
                self.submitted.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                Err(FailureError::QueueFull {
                    capacity: self.capacity,
                })
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                Err(FailureError::QueueClosed)
            }
        }
    }

    /// 关闭队列：后续提交失败，缓冲区耗尽后消费端观察到关闭
    pub fn close(&self) {
        self.tx
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub fn is_closed(&self) -> bool {
        self.tx
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    pub fn consumed(&self) -> u64 {
        self.consumed.load(Ordering::Relaxed)
    }

    fn sender(&self) -> Option<mpsc::Sender<FailureBatch>> {
        self.tx
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn mark_consumed(&self, batch: Option<FailureBatch>) -> Option<FailureBatch> {
        if batch.is_some() {
            self.consumed.fetch_add(1, Ordering::Relaxed);
        }
        batch
    }
}

#[async_trait]
impl SubmissionQueue for InMemorySubmissionQueue {
    async fn consume_blocking(&self, token: &CancellationToken) -> Result<FailureBatch> {
        let mut rx = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(FailureError::Cancelled),
            rx = self.rx.lock() => rx,
        };

        tokio::select! {
            biased;
            _ = token.cancelled() => Err(FailureError::Cancelled),
            batch = rx.recv() => self.mark_consumed(batch).ok_or(FailureError::QueueClosed),
        }
    }

    async fn consume_blocking_with_timeout(
        &self,
        timeout: Duration,
    ) -> Result<Option<FailureBatch>> {
        let received = tokio::time::timeout(timeout, async {
            let mut rx = self.rx.lock().await;
            rx.recv().await
        })
        .await;

        // 超时与“已关闭且为空”都意味着没有即将到来的批次
        Ok(received.ok().and_then(|batch| self.mark_consumed(batch)))
    }

    fn queue_size(&self) -> usize {
        let submitted = self.submitted.load(Ordering::Relaxed);
        let consumed = self.consumed.load(Ordering::Relaxed);
        submitted.saturating_sub(consumed) as usize
    }

    fn log_stats(&self, tag: &str) {
        tracing::info!(
            tag,
            queue_size = self.queue_size(),
            capacity = self.capacity,
            submitted = self.submitted(),
            consumed = self.consumed(),
            rejected = self.rejected.load(Ordering::Relaxed),
            "failure submission queue stats"
        );
    }
}
