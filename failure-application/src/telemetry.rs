use crate::config::LoggingConfig;
use crate::error::{AppError, AppResult};
use tracing_subscriber::EnvFilter;

/// 安装全局 fmt 订阅者
///
/// `RUST_LOG` 存在且合法时优先，否则使用配置中的过滤指令。
/// 进程内只能安装一次，重复调用返回 `AppError::Telemetry`。
pub fn init_tracing(config: &LoggingConfig) -> AppResult<()> {
    let filter = env_filter(config)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| AppError::Telemetry(e.to_string()))
}

fn env_filter(config: &LoggingConfig) -> AppResult<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    EnvFilter::try_new(&config.filter).map_err(|e| AppError::Telemetry(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_install_reports_error() {
        let config = LoggingConfig::default();
        // 同进程的其它测试可能已抢先安装，因此不检查第一次的结果
        let _ = init_tracing(&config);
        let second = init_tracing(&config);

        assert!(matches!(second, Err(AppError::Telemetry(_))));
    }

    #[test]
    fn configured_filter_is_parsed() {
        let config = LoggingConfig {
            filter: "failure_domain=debug,warn".to_string(),
        };

        assert!(env_filter(&config).is_ok());
    }
}
