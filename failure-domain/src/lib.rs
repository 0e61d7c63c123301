//! 失败处理核心库（failure-domain）
//!
//! 上游流水线中无法持久化、索引或处理的“失败”被收集成批次，
//! 由本 crate 的分发服务路由到一个或多个可扩展的处理器：
//! - 失败记录与批次（`failure`）：不可变的数据模型与“能否确认”的能力判定；
//! - 失败处理子系统（`handling`）：处理器协议、确认器、提交队列、生命周期与分发服务。
//!
//! 本 crate 只定义协议与调度引擎，不绑定具体存储/消息实现，
//! 以便在不同基础设施上适配处理器、确认器与提交队列。
//!
//! 典型用法：
//! 1. 实现 `FailureHandler`（以及一个兜底处理器）与 `Acknowledger`；
//! 2. 选择 `SubmissionQueue` 实现（如 `InMemorySubmissionQueue`）；
//! 3. 通过 `FailureHandlingService::builder()` 装配并 `start`；
//! 4. 关闭时调用 `ServiceHandle::shutdown`，等待有界排空完成。
//!
pub mod error;
pub mod failure;
pub mod handling;
