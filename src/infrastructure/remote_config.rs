//! 远程配置客户端
//! - `HttpRemoteConfig`：GET {base_url}/{key}，带超时与重试
//! - `InMemoryRemoteConfig`：测试与离线运行使用

use std::{collections::HashMap, time::Duration};

use anyhow::Context;
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{config::RemoteConfigSettings, service::sources::RemoteConfig};

#[derive(Clone)]
pub struct HttpRemoteConfig {
    base_url: String,
    retries: usize,
    client: reqwest::Client,
}

impl HttpRemoteConfig {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build remote config HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            retries: 2,
            client,
        })
    }

    pub fn from_settings(settings: &RemoteConfigSettings) -> anyhow::Result<Option<Self>> {
        settings
            .url
            .as_deref()
            .map(|url| Self::new(url, Duration::from_secs(settings.timeout_secs)))
            .transpose()
    }

    pub fn with_retries(mut self, retries: usize) -> Self {
        self.retries = retries;
        self
    }

    fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }
}

#[async_trait]
impl RemoteConfig for HttpRemoteConfig {
    async fn raw_json(&self, key: &str) -> anyhow::Result<String> {
        let url = self.url_for(key);
        let mut attempt = 0usize;
        loop {
            match self.client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    let body = resp.text().await?;
                    tracing::debug!(key = %key, bytes = body.len(), "Remote config fetched");
                    return Ok(body);
                }
                Ok(resp) => {
                    tracing::warn!(key = %key, status = %resp.status(), attempt, "Remote config request rejected");
                }
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, attempt, "Remote config request failed");
                }
            }
            attempt += 1;
            if attempt > self.retries {
                break;
            }
            let backoff = 50 * (1u64 << attempt.min(5));
            tokio::time::sleep(Duration::from_millis(backoff)).await;
        }
        Err(anyhow::anyhow!(
            "remote config '{}' unavailable after {} attempts",
            key,
            attempt
        ))
    }
}

/// 内存配置；缺失的 key 视为拉取失败
#[derive(Default)]
pub struct InMemoryRemoteConfig {
    values: RwLock<HashMap<String, String>>,
}

impl InMemoryRemoteConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(key: &str, json: &str) -> Self {
        Self {
            values: RwLock::new(HashMap::from([(key.to_string(), json.to_string())])),
        }
    }

    pub async fn set(&self, key: &str, json: &str) {
        self.values
            .write()
            .await
            .insert(key.to_string(), json.to_string());
    }
}

#[async_trait]
impl RemoteConfig for InMemoryRemoteConfig {
    async fn raw_json(&self, key: &str) -> anyhow::Result<String> {
        self.values
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("remote config key '{}' not set", key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_trims_trailing_slash() {
        let remote = HttpRemoteConfig::new("https://config.example.com/v1/", Duration::from_secs(1)).unwrap();
        assert_eq!(
            remote.url_for("custodial_only_tokens"),
            "https://config.example.com/v1/custodial_only_tokens"
        );
    }

    #[test]
    fn test_from_settings_without_url() {
        let settings = RemoteConfigSettings {
            url: None,
            timeout_secs: 5,
            features_key: "custodial_only_tokens".into(),
        };
        assert!(HttpRemoteConfig::from_settings(&settings).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_in_memory_values() {
        let remote = InMemoryRemoteConfig::new();
        assert!(remote.raw_json("k").await.is_err());
        remote.set("k", r#"{"DOT":["FULL_SUPPORT"]}"#).await;
        assert_eq!(remote.raw_json("k").await.unwrap(), r#"{"DOT":["FULL_SUPPORT"]}"#);
    }

    #[tokio::test]
    async fn test_unreachable_host_fails_after_retries() {
        let remote = HttpRemoteConfig::new("http://127.0.0.1:1", Duration::from_millis(200))
            .unwrap()
            .with_retries(0);
        assert!(remote.raw_json("custodial_only_tokens").await.is_err());
    }
}
