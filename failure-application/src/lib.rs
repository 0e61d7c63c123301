//! 失败处理应用层（failure-application）
//!
//! 在 `failure-domain` 之上提供进程级装配：配置加载、日志初始化、
//! 默认兜底处理器、处理器注册表以及一键启动/关闭的运行时。
//!
pub mod config;
pub mod error;
pub mod fallback_handler;
pub mod registry;
pub mod runtime;
pub mod telemetry;

pub use config::AppConfig;
pub use fallback_handler::LoggingFailureHandler;
pub use registry::HandlerRegistry;
pub use runtime::FailureHandlingRuntime;
