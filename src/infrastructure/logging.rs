//! 日志系统配置模块
//! 支持结构化日志、日志级别配置和可选的文件输出

use std::{
    fs::{File, OpenOptions},
    path::Path,
    sync::Mutex,
};

use anyhow::{Context, Result};
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

use crate::config::LoggingConfig;

/// 初始化日志系统（RUST_LOG 优先于配置的级别）
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let file = open_log_file(config)?;

    if config.format == "json" {
        init_json_logging(filter, file)
    } else {
        init_text_logging(filter, file)
    }
}

fn open_log_file(config: &LoggingConfig) -> Result<Option<File>> {
    if !config.enable_file_logging {
        return Ok(None);
    }
    let path = config
        .log_file_path
        .as_deref()
        .context("log_file_path is required when file logging is enabled")?;
    if let Some(dir) = Path::new(path).parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory: {:?}", dir))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file: {}", path))?;
    Ok(Some(file))
}

/// JSON 格式日志（结构化日志）
fn init_json_logging(filter: EnvFilter, file: Option<File>) -> Result<()> {
    let stdout_layer = fmt::layer().json().with_timer(ChronoUtc::rfc_3339());
    let file_layer = file.map(|f| {
        fmt::layer()
            .json()
            .with_writer(Mutex::new(f))
            .with_timer(ChronoUtc::rfc_3339())
    });

    Registry::default()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")
}

/// 文本格式日志
fn init_text_logging(filter: EnvFilter, file: Option<File>) -> Result<()> {
    let stdout_layer = fmt::layer()
        .with_timer(ChronoUtc::rfc_3339())
        .with_ansi(true);
    let file_layer = file.map(|f| {
        fmt::layer()
            .with_writer(Mutex::new(f))
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(false)
    });

    Registry::default()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_logging_requires_path() {
        let config = LoggingConfig {
            level: "debug".to_string(),
            format: "json".to_string(),
            enable_file_logging: true,
            log_file_path: None,
        };
        assert!(open_log_file(&config).is_err());
    }

    #[test]
    fn test_log_file_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("coincore.log");
        let config = LoggingConfig {
            level: "info".to_string(),
            format: "text".to_string(),
            enable_file_logging: true,
            log_file_path: Some(path.to_string_lossy().into_owned()),
        };
        assert!(open_log_file(&config).unwrap().is_some());
        assert!(path.exists());
    }

    #[test]
    fn test_console_only() {
        let config = LoggingConfig {
            level: "info".to_string(),
            format: "text".to_string(),
            enable_file_logging: false,
            log_file_path: None,
        };
        assert!(open_log_file(&config).unwrap().is_none());
    }
}
