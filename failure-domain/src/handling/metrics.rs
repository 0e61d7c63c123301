//! 失败处理指标名称
//!
//! 通过 `metrics` facade 上报；未安装 recorder 时为空操作。
//!
use metrics::{Unit, counter, describe_counter};

pub const BATCHES_HANDLED: &str = "failure_handling.batches.handled";
pub const BATCHES_DROPPED: &str = "failure_handling.batches.dropped";
pub const BATCHES_DRAINED: &str = "failure_handling.batches.drained";
pub const HANDLER_FAILURES: &str = "failure_handling.handler.failures";
pub const UNITS_ACKNOWLEDGED: &str = "failure_handling.units.acknowledged";

/// 注册指标描述，供导出器展示
pub fn describe() {
    describe_counter!(BATCHES_HANDLED, Unit::Count, "Failure batches consumed and dispatched");
    describe_counter!(
        BATCHES_DROPPED,
        Unit::Count,
        "Failure batches discarded because no handler supports them"
    );
    describe_counter!(BATCHES_DRAINED, Unit::Count, "Failure batches processed during shutdown drain");
    describe_counter!(HANDLER_FAILURES, Unit::Count, "Failure handler invocations that failed");
    describe_counter!(UNITS_ACKNOWLEDGED, Unit::Count, "Failed units passed to the acknowledger");
}

pub(crate) fn batch_handled(failure_type: &'static str) {
    counter!(BATCHES_HANDLED, "failure_type" => failure_type).increment(1);
}

pub(crate) fn batch_dropped(failure_type: &'static str) {
    counter!(BATCHES_DROPPED, "failure_type" => failure_type).increment(1);
}

pub(crate) fn batches_drained(count: u64) {
    counter!(BATCHES_DRAINED).increment(count);
}

pub(crate) fn handler_failed(handler: &str) {
    counter!(HANDLER_FAILURES, "handler" => handler.to_string()).increment(1);
}

pub(crate) fn units_acknowledged(count: usize) {
    counter!(UNITS_ACKNOWLEDGED).increment(count as u64);
}
