//! 配置管理模块
//! 支持从环境变量和配置文件加载配置

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::service::feature_lookup::DEFAULT_FEATURES_KEY;
use crate::utils::address_validator::{CustodialAddressPattern, DEFAULT_CUSTODIAL_ADDRESS_PATTERN};

/// 应用配置结构体
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub remote_config: RemoteConfigSettings,
    #[serde(default)]
    pub features: FeaturesConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub address: AddressConfig,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "text"
    pub enable_file_logging: bool,
    pub log_file_path: Option<String>,
}

/// 远程能力配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfigSettings {
    /// 为空时使用内存配置（总是走回退表）
    pub url: Option<String>,
    pub timeout_secs: u64,
    pub features_key: String,
}

/// 功能开关配置 (Feature Flags)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesConfig {
    pub enable_dynamic_asset_loading: bool,
}

/// 展示配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    pub fiat_currency: String,
}

/// 地址校验配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressConfig {
    pub custodial_address_pattern: String,
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".into()),
            enable_file_logging: env_flag("LOG_FILE_ENABLED", false),
            log_file_path: std::env::var("LOG_FILE_PATH").ok(),
        }
    }
}

impl Default for RemoteConfigSettings {
    fn default() -> Self {
        Self {
            url: std::env::var("REMOTE_CONFIG_URL").ok().filter(|u| !u.is_empty()),
            timeout_secs: std::env::var("REMOTE_CONFIG_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            features_key: DEFAULT_FEATURES_KEY.to_string(),
        }
    }
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            enable_dynamic_asset_loading: env_flag("ENABLE_DYNAMIC_ASSET_LOADING", true),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            fiat_currency: std::env::var("FIAT_CURRENCY").unwrap_or_else(|_| "USD".into()),
        }
    }
}

impl Default for AddressConfig {
    fn default() -> Self {
        Self {
            custodial_address_pattern: std::env::var("CUSTODIAL_ADDRESS_PATTERN")
                .unwrap_or_else(|_| DEFAULT_CUSTODIAL_ADDRESS_PATTERN.into()),
        }
    }
}

impl Config {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self> {
        Ok(Self::default())
    }

    /// 从配置文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse config file as TOML")?;

        Ok(config)
    }

    /// 从环境变量和配置文件合并加载（配置文件优先级更高）
    pub fn from_env_and_file<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let mut config = Self::from_env()?;

        if let Some(path) = path {
            if path.as_ref().exists() {
                // 文件中缺失的段落回落到环境变量默认值
                config = Self::from_file(path)?;
            }
        }

        Ok(config)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!("LOG_LEVEL must be one of: {:?}", valid_levels);
        }

        if self.logging.format != "json" && self.logging.format != "text" {
            anyhow::bail!("LOG_FORMAT must be 'json' or 'text'");
        }

        if self.logging.enable_file_logging && self.logging.log_file_path.is_none() {
            anyhow::bail!("LOG_FILE_PATH is required when file logging is enabled");
        }

        if let Some(url) = &self.remote_config.url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                anyhow::bail!("REMOTE_CONFIG_URL must start with http:// or https://");
            }
        }

        if self.remote_config.timeout_secs == 0 {
            anyhow::bail!("REMOTE_CONFIG_TIMEOUT_SECS must be greater than 0");
        }

        if self.remote_config.features_key.trim().is_empty() {
            anyhow::bail!("remote_config.features_key must not be empty");
        }

        let fiat = &self.display.fiat_currency;
        if fiat.len() != 3 || !fiat.chars().all(|c| c.is_ascii_alphabetic()) {
            anyhow::bail!("FIAT_CURRENCY must be a 3-letter ISO code");
        }

        CustodialAddressPattern::new(&self.address.custodial_address_pattern)
            .context("CUSTODIAL_ADDRESS_PATTERN is not a valid regex")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn test_config_from_env() {
        let config = Config::from_env().unwrap();
        assert_eq!(config.remote_config.features_key, "custodial_only_tokens");
        assert!(config.remote_config.timeout_secs > 0);
    }

    #[test]
    fn test_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[logging]
level = "debug"
format = "json"
enable_file_logging = false

[remote_config]
url = "https://config.example.com/v1"
timeout_secs = 3
features_key = "custodial_only_tokens"

[features]
enable_dynamic_asset_loading = false

[display]
fiat_currency = "EUR"

[address]
custodial_address_pattern = "[a-z0-9]{{20,}}"
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.remote_config.url.as_deref(), Some("https://config.example.com/v1"));
        assert_eq!(config.remote_config.timeout_secs, 3);
        assert!(!config.features.enable_dynamic_asset_loading);
        assert_eq!(config.display.fiat_currency, "EUR");
        assert_eq!(config.address.custodial_address_pattern, "[a-z0-9]{20,}");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[display]\nfiat_currency = \"GBP\"").unwrap();

        let config = Config::from_env_and_file(Some(file.path())).unwrap();
        assert_eq!(config.display.fiat_currency, "GBP");
        assert_eq!(config.remote_config.features_key, DEFAULT_FEATURES_KEY);
    }

    #[test]
    fn test_missing_file_falls_back_to_env() {
        let config = Config::from_env_and_file(Some("/nonexistent/coincore.toml")).unwrap();
        assert_eq!(config.remote_config.features_key, DEFAULT_FEATURES_KEY);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.logging.level = "info".into();
        config.logging.format = "text".into();
        config.logging.enable_file_logging = false;
        config.remote_config.url = None;
        config.display.fiat_currency = "USD".into();
        config.address.custodial_address_pattern = DEFAULT_CUSTODIAL_ADDRESS_PATTERN.into();
        assert!(config.validate().is_ok());

        let mut bad = config.clone();
        bad.logging.format = "xml".into();
        assert!(bad.validate().is_err());

        let mut bad = config.clone();
        bad.remote_config.url = Some("ftp://config".into());
        assert!(bad.validate().is_err());

        let mut bad = config.clone();
        bad.display.fiat_currency = "DOLLARS".into();
        assert!(bad.validate().is_err());

        let mut bad = config;
        bad.address.custodial_address_pattern = "([".into();
        assert!(bad.validate().is_err());
    }
}
