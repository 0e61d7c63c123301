use crate::error::{AppError, AppResult};
use crate::fallback_handler::LoggingFailureHandler;
use failure_domain::handling::FailureHandler;
use std::sync::Arc;

/// 处理器注册表
/// - 以 `handler_name()` 作为唯一键，重复注册返回 `HandlerAlreadyRegistered`
/// - 保持注册顺序，分发时按此顺序调用
/// - 兜底处理器默认为 `LoggingFailureHandler`
#[derive(Clone)]
pub struct HandlerRegistry {
    handlers: Vec<Arc<dyn FailureHandler>>,
    fallback: Arc<dyn FailureHandler>,
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self {
            handlers: Vec::new(),
            fallback: Arc::new(LoggingFailureHandler),
        }
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册处理器
    pub fn register(&mut self, handler: Arc<dyn FailureHandler>) -> AppResult<&mut Self> {
        let name = handler.handler_name();
        if self.contains(name) {
            return Err(AppError::HandlerAlreadyRegistered {
                handler: name.to_string(),
            });
        }

        tracing::debug!(handler = name, "registered failure handler");
        self.handlers.push(handler);
        Ok(self)
    }

    /// 链式注册
    pub fn with_handler(mut self, handler: Arc<dyn FailureHandler>) -> AppResult<Self> {
        self.register(handler)?;
        Ok(self)
    }

    /// 替换兜底处理器
    pub fn with_fallback(mut self, fallback: Arc<dyn FailureHandler>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.iter().any(|h| h.handler_name() == name)
    }

    pub fn handler_names(&self) -> Vec<&str> {
        self.handlers.iter().map(|h| h.handler_name()).collect()
    }

    pub fn fallback(&self) -> &Arc<dyn FailureHandler> {
        &self.fallback
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub(crate) fn into_parts(self) -> (Vec<Arc<dyn FailureHandler>>, Arc<dyn FailureHandler>) {
        (self.handlers, self.fallback)
    }
}
