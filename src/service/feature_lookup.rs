//! 资产能力查询
//!
//! 远程配置下发 ticker → 能力名列表，解析后展开为原子能力集。
//! 拉取失败时回退到内置表，整个会话只拉取一次。

use std::{collections::HashMap, sync::Arc};

use once_cell::sync::Lazy;
use tokio::sync::OnceCell;

use crate::{
    domain::{
        asset_table::AssetTable,
        remote_feature::{full_support, parse_feature_list, FeatureSet},
    },
    service::sources::RemoteConfig,
};

pub const DEFAULT_FEATURES_KEY: &str = "custodial_only_tokens";

/// 拉取失败时使用的能力表
static FALLBACK_FEATURES: Lazy<HashMap<String, FeatureSet>> = Lazy::new(|| {
    HashMap::from([
        ("DOT".to_string(), full_support()),
        ("ALGO".to_string(), full_support()),
    ])
});

pub struct AssetFeatureLookup {
    remote: Arc<dyn RemoteConfig>,
    table: Arc<AssetTable>,
    key: String,
    features: OnceCell<HashMap<String, FeatureSet>>,
}

impl AssetFeatureLookup {
    pub fn new(remote: Arc<dyn RemoteConfig>, table: Arc<AssetTable>) -> Self {
        Self::with_key(remote, table, DEFAULT_FEATURES_KEY)
    }

    pub fn with_key(remote: Arc<dyn RemoteConfig>, table: Arc<AssetTable>, key: &str) -> Self {
        Self {
            remote,
            table,
            key: key.to_string(),
            features: OnceCell::new(),
        }
    }

    pub fn fallback_features() -> HashMap<String, FeatureSet> {
        FALLBACK_FEATURES.clone()
    }

    /// 解析远程 JSON：`{"DOT": ["FULL_SUPPORT"], ...}`
    pub fn parse_remote(json: &str) -> anyhow::Result<HashMap<String, FeatureSet>> {
        let raw: HashMap<String, Vec<String>> = serde_json::from_str(json)?;
        Ok(raw
            .into_iter()
            .map(|(ticker, names)| (ticker.to_uppercase(), parse_feature_list(&names)))
            .collect())
    }

    async fn remote_features(&self) -> &HashMap<String, FeatureSet> {
        self.features
            .get_or_init(|| async {
                let fetched = self
                    .remote
                    .raw_json(&self.key)
                    .await
                    .and_then(|json| Self::parse_remote(&json));
                match fetched {
                    Ok(map) => {
                        tracing::info!(key = %self.key, assets = map.len(), "Remote asset features loaded");
                        map
                    }
                    Err(e) => {
                        tracing::warn!(key = %self.key, error = %e, "Remote asset features unavailable, using fallback");
                        Self::fallback_features()
                    }
                }
            })
            .await
    }

    /// 某 ticker 的原子能力集；固定/静态资产始终为完整能力集，未知 ticker 为空集
    pub async fn features_for(&self, ticker: &str) -> FeatureSet {
        if self.table.is_non_dynamic(ticker) {
            return full_support();
        }
        self.remote_features()
            .await
            .get(&ticker.to_uppercase())
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::domain::remote_feature::RemoteFeature;

    struct StubRemote(Option<&'static str>);

    #[async_trait]
    impl RemoteConfig for StubRemote {
        async fn raw_json(&self, _key: &str) -> anyhow::Result<String> {
            self.0
                .map(str::to_string)
                .ok_or_else(|| anyhow::anyhow!("remote config offline"))
        }
    }

    fn lookup(json: Option<&'static str>) -> AssetFeatureLookup {
        AssetFeatureLookup::new(Arc::new(StubRemote(json)), Arc::new(AssetTable::builtin()))
    }

    /// Test 1: 远程映射解析与展开
    #[tokio::test]
    async fn test_remote_features_parsed() {
        let lookup = lookup(Some(r#"{"dot": ["send_receive"], "LTC": ["BROKERAGE", "nope"]}"#));

        let dot = lookup.features_for("DOT").await;
        assert!(dot.contains(&RemoteFeature::CanSend));
        assert!(dot.contains(&RemoteFeature::Balance));
        assert!(!dot.contains(&RemoteFeature::CanBuy));

        let ltc = lookup.features_for("ltc").await;
        assert!(ltc.contains(&RemoteFeature::CanSwap));
        assert!(!ltc.contains(&RemoteFeature::CanSend));
    }

    /// Test 2: 未知 ticker 为空集
    #[tokio::test]
    async fn test_unknown_ticker_is_empty() {
        let lookup = lookup(Some(r#"{"DOT": ["FULL_SUPPORT"]}"#));
        assert!(lookup.features_for("XYZ").await.is_empty());
    }

    /// Test 3: 固定/静态资产不受远程映射影响
    #[tokio::test]
    async fn test_fixed_assets_always_full() {
        let lookup = lookup(Some("{}"));
        assert_eq!(lookup.features_for("ETH").await, full_support());
        assert_eq!(lookup.features_for("usdt").await, full_support());
    }

    /// Test 4: 拉取失败回退到内置表
    #[tokio::test]
    async fn test_fetch_failure_falls_back() {
        let lookup = lookup(None);
        assert_eq!(lookup.features_for("DOT").await, full_support());
        assert_eq!(lookup.features_for("ALGO").await, full_support());
        assert!(lookup.features_for("LTC").await.is_empty());
    }

    /// Test 5: 非法 JSON 同样回退
    #[tokio::test]
    async fn test_malformed_json_falls_back() {
        let lookup = lookup(Some("not json"));
        assert_eq!(lookup.features_for("DOT").await, full_support());
    }
}
