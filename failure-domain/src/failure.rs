//! 失败记录与失败批次（Failure / FailureBatch）
//!
//! 定义上游失败检测产出的单条失败记录、可确认单元的能力判定，
//! 以及作为一次分发单元的有序批次。批次一经构造即不可变。
//!
use crate::error::{FailureError, FailureResult};
use bon::Builder;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

/// 失败类别，用于批次级别的分类（处理器据此判断是否支持）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureType {
    Indexing,
    Processing,
}

impl FailureType {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureType::Indexing => "indexing",
            FailureType::Processing => "processing",
        }
    }
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 确认引用：交给 Acknowledger 的、可持久确认的上游单元标识（如消息队列位点）
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AckRef(String);

impl AckRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AckRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 失败单元：失败记录所指向的、处理失败的对象
///
/// `ack_ref` 是“能否确认”的能力判定：返回 `None` 的单元不会进入确认集合，
/// 也不视为错误。
pub trait FailedUnit: fmt::Debug + Send + Sync {
    /// 单元标识（用于日志与审计）
    fn unit_id(&self) -> &str;

    /// 可确认时返回确认引用
    fn ack_ref(&self) -> Option<AckRef> {
        None
    }
}

/// 消息单元：携带消息队列位点时可被确认
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    id: String,
    queue_id: Option<String>,
}

impl Message {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            queue_id: None,
        }
    }

    pub fn with_queue_id(mut self, queue_id: impl Into<String>) -> Self {
        self.queue_id = Some(queue_id.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn queue_id(&self) -> Option<&str> {
        self.queue_id.as_deref()
    }
}

impl FailedUnit for Message {
    fn unit_id(&self) -> &str {
        &self.id
    }

    fn ack_ref(&self) -> Option<AckRef> {
        self.queue_id.as_deref().map(AckRef::new)
    }
}

/// 不可确认的单元（如原始负载、外部引用）
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpaqueUnit {
    id: String,
}

impl OpaqueUnit {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl FailedUnit for OpaqueUnit {
    fn unit_id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Builder)]
pub struct Failure {
    /// 失败类别
    failure_type: FailureType,
    /// 失败原因标签（如 `MappingError`、`ExtractorException`）
    #[builder(into)]
    cause: String,
    /// 面向人的失败描述
    #[builder(into)]
    message: String,
    /// 附加上下文（如底层错误信息）
    context: Option<String>,
    /// 失败目标（如目标索引名）
    target: Option<String>,
    /// 失败发生时间
    #[builder(default = Utc::now())]
    occurred_at: DateTime<Utc>,
    /// 失败单元
    failed_unit: Arc<dyn FailedUnit>,
    /// 成功处理后是否需要确认该单元
    #[builder(default = true)]
    requires_acknowledgement: bool,
}

impl Failure {
    pub fn failure_type(&self) -> FailureType {
        self.failure_type
    }

    pub fn cause(&self) -> &str {
        &self.cause
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn failed_unit(&self) -> &Arc<dyn FailedUnit> {
        &self.failed_unit
    }

    pub fn requires_acknowledgement(&self) -> bool {
        self.requires_acknowledgement
    }
}

/// 失败批次：同一处理窗口内收集的、同一类别的有序失败记录
#[derive(Debug, Clone)]
pub struct FailureBatch {
    failure_type: FailureType,
    failures: Vec<Failure>,
}

impl FailureBatch {
    /// 构造批次；空批次或混合类别的批次会被拒绝
    pub fn new(failure_type: FailureType, failures: Vec<Failure>) -> FailureResult<Self> {
        if failures.is_empty() {
            return Err(FailureError::EmptyBatch);
        }

        if let Some(other) = failures.iter().find(|f| f.failure_type != failure_type) {
            return Err(FailureError::MixedBatch {
                expected: failure_type,
                found: other.failure_type,
            });
        }

        Ok(Self {
            failure_type,
            failures,
        })
    }

    pub fn indexing(failures: Vec<Failure>) -> FailureResult<Self> {
        Self::new(FailureType::Indexing, failures)
    }

    pub fn processing(failures: Vec<Failure>) -> FailureResult<Self> {
        Self::new(FailureType::Processing, failures)
    }

    pub fn failure_type(&self) -> FailureType {
        self.failure_type
    }

    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    pub fn size(&self) -> usize {
        self.failures.len()
    }

    pub fn contains_indexing_failures(&self) -> bool {
        self.failure_type == FailureType::Indexing
    }

    pub fn contains_processing_failures(&self) -> bool {
        self.failure_type == FailureType::Processing
    }

    /// 成功处理后应确认的引用：需要确认且单元可确认的条目，保持批次顺序
    pub fn ack_refs(&self) -> Vec<AckRef> {
        self.failures
            .iter()
            .filter(|f| f.requires_acknowledgement)
            .filter_map(|f| f.failed_unit.ack_ref())
            .collect()
    }
}
