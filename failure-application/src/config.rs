//! 应用配置
//!
//! 从 YAML 文件加载，所有字段均有默认值：
//! ```yaml
//! failure_handling:
//!   shutdown_await_ms: 3000
//!   queue_capacity: 1000
//! logging:
//!   filter: info
//! ```

use crate::error::ConfigError;
use failure_domain::handling::FailureHandlingConfig;
use serde::Deserialize;
use std::fs::File;
use std::path::Path;
use std::time::Duration;

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub failure_handling: FailureHandlingSettings,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct FailureHandlingSettings {
    /// 关闭排空时单次等待（毫秒）
    pub shutdown_await_ms: u64,
    /// 内存提交队列容量（批次数）
    pub queue_capacity: usize,
}

impl Default for FailureHandlingSettings {
    fn default() -> Self {
        Self {
            shutdown_await_ms: 3000,
            queue_capacity: 1000,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` 指令，`RUST_LOG` 存在时以其为准
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let config: Self = serde_yaml::from_reader(file)?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.failure_handling.queue_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "failure_handling.queue_capacity",
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.failure_handling.shutdown_await_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "failure_handling.shutdown_await_ms",
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.logging.filter.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "logging.filter",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn failure_handling_config(&self) -> FailureHandlingConfig {
        FailureHandlingConfig {
            shutdown_await: Duration::from_millis(self.failure_handling.shutdown_await_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tmp_file(s: &str) -> tempfile::NamedTempFile {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        write!(tmp, "{}", s).expect("write yaml");

        tmp
    }

    #[test]
    fn full_config() {
        let yaml = r#"
            failure_handling:
                shutdown_await_ms: 250
                queue_capacity: 16
            logging:
                filter: failure_domain=debug,info
            "#;
        let tmp = write_tmp_file(yaml);
        let config = AppConfig::from_file(tmp.path()).expect("load config");

        assert_eq!(config.failure_handling.queue_capacity, 16);
        assert_eq!(config.logging.filter, "failure_domain=debug,info");
        assert_eq!(
            config.failure_handling_config().shutdown_await,
            Duration::from_millis(250)
        );
    }

    #[test]
    fn missing_fields_use_defaults() {
        let tmp = write_tmp_file("failure_handling:\n  queue_capacity: 8\n");
        let config = AppConfig::from_file(tmp.path()).expect("load config");

        assert_eq!(config.failure_handling.queue_capacity, 8);
        assert_eq!(config.failure_handling.shutdown_await_ms, 3000);
        assert_eq!(config.logging, LoggingConfig::default());
        assert_eq!(
            config.failure_handling_config().shutdown_await,
            FailureHandlingConfig::default().shutdown_await
        );
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let tmp = write_tmp_file("failure_handling:\n  queue_capacity: 0\n");
        let err = AppConfig::from_file(tmp.path()).unwrap_err();

        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "failure_handling.queue_capacity",
                ..
            }
        ));
    }

    #[test]
    fn zero_shutdown_await_is_rejected() {
        let tmp = write_tmp_file("failure_handling:\n  shutdown_await_ms: 0\n");
        let err = AppConfig::from_file(tmp.path()).unwrap_err();

        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "failure_handling.shutdown_await_ms",
                ..
            }
        ));
    }

    #[test]
    fn unknown_field_fails_to_parse() {
        let tmp = write_tmp_file("failure_handling:\n  queue_size: 3\n");
        let err = AppConfig::from_file(tmp.path()).unwrap_err();

        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_fails_to_load() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let err = AppConfig::from_file(&dir.path().join("absent.yaml")).unwrap_err();

        assert!(matches!(err, ConfigError::Load(_)));
    }
}
