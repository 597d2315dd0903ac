//! 资产目录
//!
//! 合并固定资产、静态附加资产与受远程能力开关控制的动态资产，
//! 构建大小写不敏感的 ticker 索引。初始化后在会话内不再变化。

use std::{collections::HashMap, sync::Arc};

use futures::future::join_all;
use tokio::sync::OnceCell;

use crate::{
    domain::{asset_info::AssetRef, asset_table::AssetTable},
    service::feature_lookup::AssetFeatureLookup,
};

#[derive(Debug, Default)]
struct CatalogueIndex {
    by_ticker: HashMap<String, AssetRef>,
    /// 已启用的动态资产 + 静态附加资产（不含固定资产）
    dynamic_enabled: Vec<AssetRef>,
}

pub struct AssetCatalogue {
    table: Arc<AssetTable>,
    feature_lookup: Arc<AssetFeatureLookup>,
    index: OnceCell<CatalogueIndex>,
}

impl AssetCatalogue {
    pub fn new(table: Arc<AssetTable>, feature_lookup: Arc<AssetFeatureLookup>) -> Self {
        Self {
            table,
            feature_lookup,
            index: OnceCell::new(),
        }
    }

    pub fn table(&self) -> &Arc<AssetTable> {
        &self.table
    }

    pub fn feature_lookup(&self) -> &Arc<AssetFeatureLookup> {
        &self.feature_lookup
    }

    /// 初始化目录，返回已启用的动态资产（含静态附加资产）。
    /// 远程能力拉取失败不会导致失败，只会缩小动态资产集。
    pub async fn initialise(&self, fixed_assets: &[AssetRef]) -> Vec<AssetRef> {
        let index = self
            .index
            .get_or_init(|| self.build_index(fixed_assets))
            .await;
        index.dynamic_enabled.clone()
    }

    async fn build_index(&self, fixed_assets: &[AssetRef]) -> CatalogueIndex {
        let candidates: Vec<AssetRef> = self
            .table
            .dynamic()
            .iter()
            .filter(|a| !self.table.is_non_dynamic(a.ticker()))
            .cloned()
            .collect();

        let features = join_all(
            candidates
                .iter()
                .map(|asset| self.feature_lookup.features_for(asset.ticker())),
        )
        .await;

        let mut dynamic_enabled: Vec<AssetRef> = candidates
            .into_iter()
            .zip(features)
            .filter(|(_, f)| !f.is_empty())
            .map(|(asset, _)| asset)
            .collect();
        dynamic_enabled.extend(self.table.static_extras().iter().cloned());

        let by_ticker: HashMap<String, AssetRef> = fixed_assets
            .iter()
            .chain(dynamic_enabled.iter())
            .map(|a| (a.ticker().to_uppercase(), a.clone()))
            .collect();

        tracing::info!(
            fixed = fixed_assets.len(),
            dynamic = dynamic_enabled.len(),
            total = by_ticker.len(),
            "Asset catalogue initialised"
        );

        CatalogueIndex {
            by_ticker,
            dynamic_enabled,
        }
    }

    pub fn is_initialised(&self) -> bool {
        self.index.initialized()
    }

    fn index(&self) -> Option<&CatalogueIndex> {
        self.index.get()
    }

    /// 大小写不敏感查找
    pub fn from_network_ticker(&self, ticker: &str) -> Option<AssetRef> {
        self.index()
            .and_then(|i| i.by_ticker.get(&ticker.to_uppercase()))
            .cloned()
    }

    pub fn supported_crypto_assets(&self) -> Vec<AssetRef> {
        let mut assets: Vec<AssetRef> = self
            .index()
            .map(|i| i.by_ticker.values().cloned().collect())
            .unwrap_or_default();
        assets.sort_by(|a, b| a.ticker().cmp(b.ticker()));
        assets
    }

    pub fn supported_custodial_assets(&self) -> Vec<AssetRef> {
        self.supported_crypto_assets()
            .into_iter()
            .filter(|a| a.is_custodial())
            .collect()
    }

    /// 父链为 `chain` 的全部代币
    pub fn supported_l2_assets(&self, chain: &str) -> Vec<AssetRef> {
        self.supported_crypto_assets()
            .into_iter()
            .filter(|a| a.is_token_of(chain))
            .collect()
    }
}
