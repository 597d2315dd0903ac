//! 动态加载策略
//!
//! 流程：目录初始化 → L1 顺序初始化 → 动态资产分区 → 按活跃集合过滤 → 构建 → 整体发布。
//! 不在活跃集合中的资产在首次 `get` 时才构建。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;

use super::{
    factory::{insert_new, AssetFactory, AssetPartition, LoadContext},
    AssetLoader, PublishedAssets,
};
use crate::{
    domain::asset_info::AssetRef,
    error::{CoreError, CoreResult},
    service::{asset_catalogue::AssetCatalogue, crypto_asset::CryptoAsset},
};

pub struct DynamicAssetLoader {
    catalogue: Arc<AssetCatalogue>,
    factory: Arc<AssetFactory>,
    published: PublishedAssets,
}

impl DynamicAssetLoader {
    pub fn new(catalogue: Arc<AssetCatalogue>, factory: Arc<AssetFactory>) -> Self {
        Self {
            catalogue,
            factory,
            published: PublishedAssets::default(),
        }
    }

    async fn preload(&self) -> CoreResult<(LoadContext, HashMap<String, Arc<CryptoAsset>>)> {
        let fixed: Vec<AssetRef> = self.catalogue.table().fixed().to_vec();
        let dynamic = self.catalogue.initialise(&fixed).await;

        let context = self.factory.init_l1_assets(&fixed).await;
        let partition = AssetPartition::of(&dynamic)?;

        let (active_tokens, active_custodial) = tokio::join!(
            self.factory.active_token_tickers(),
            self.factory.active_custodial_tickers(),
        );

        let mut assets = HashMap::new();
        for asset in &fixed {
            insert_new(&mut assets, self.factory.build_l1(asset, &context).await)?;
        }
        for asset in partition
            .tokens
            .iter()
            .filter(|a| active_tokens.contains(a.ticker()))
        {
            insert_new(&mut assets, self.factory.build_token(asset, &context).await?)?;
        }
        for asset in partition
            .custodial_only
            .iter()
            .filter(|a| active_custodial.contains(a.ticker()))
        {
            insert_new(&mut assets, self.factory.build_custodial_only(asset).await)?;
        }

        tracing::info!(
            fixed = fixed.len(),
            tokens = partition.tokens.len(),
            active_tokens = active_tokens.len(),
            custodial_only = partition.custodial_only.len(),
            active_custodial = active_custodial.len(),
            "Dynamic asset preload complete"
        );
        Ok((context, assets))
    }
}

#[async_trait]
impl AssetLoader for DynamicAssetLoader {
    async fn init_and_preload(&self) -> CoreResult<()> {
        self.published.publish_once(|| self.preload()).await
    }

    async fn get(&self, ticker: &str) -> CoreResult<Arc<CryptoAsset>> {
        let context = self.published.context()?;
        if let Some(asset) = self.published.lookup(ticker).await {
            return Ok(asset);
        }

        let info = self
            .catalogue
            .from_network_ticker(ticker)
            .ok_or_else(|| CoreError::UnknownAsset(ticker.to_string()))?;

        let mut map = self.published.map().write().await;
        // 等待写锁期间可能已被其他调用构建
        if let Some(asset) = map.get(info.ticker()) {
            return Ok(asset.clone());
        }
        let asset = self.factory.build(&info, context).await?;
        tracing::debug!(asset = %info, "Lazily loaded asset");
        insert_new(&mut map, asset)
    }

    async fn loaded_assets(&self) -> Vec<Arc<CryptoAsset>> {
        self.published.all().await
    }
}
