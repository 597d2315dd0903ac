//! 静态加载策略：一次性构建全部已启用资产，不做活跃过滤

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

pub struct EagerAssetLoader {
    catalogue: Arc<AssetCatalogue>,
    factory: Arc<AssetFactory>,
    published: PublishedAssets,
}

impl EagerAssetLoader {
    pub fn new(catalogue: Arc<AssetCatalogue>, factory: Arc<AssetFactory>) -> Self {
        Self {
            catalogue,
            factory,
            published: PublishedAssets::default(),
        }
    }

    /// 预先断言资产类型：代币必须同时支持托管与非托管，其余必须是纯托管
    fn check_types(partition: &AssetPartition, dynamic: &[AssetRef]) -> CoreResult<()> {
        if let Some(bad) = partition
            .tokens
            .iter()
            .find(|a| !(a.is_custodial() && a.is_non_custodial()))
        {
            return Err(CoreError::UnknownAssetType(bad.ticker().to_string()));
        }
        let classified = partition.tokens.len() + partition.custodial_only.len();
        if classified != dynamic.len() {
            let unclassified = dynamic
                .iter()
                .find(|a| a.l2chain.is_none() && !a.is_custodial_only())
                .map(|a| a.ticker().to_string())
                .unwrap_or_default();
            return Err(CoreError::UnknownAssetType(unclassified));
        }
        Ok(())
    }

    async fn preload(&self) -> CoreResult<(LoadContext, HashMap<String, Arc<CryptoAsset>>)> {
        let fixed: Vec<AssetRef> = self.catalogue.table().fixed().to_vec();
        let dynamic = self.catalogue.initialise(&fixed).await;

        let context = self.factory.init_l1_assets(&fixed).await;
        let partition = AssetPartition::of(&dynamic)?;
        Self::check_types(&partition, &dynamic)?;

        let mut assets = HashMap::new();
        for asset in &fixed {
            insert_new(&mut assets, self.factory.build_l1(asset, &context).await)?;
        }
        for asset in &partition.tokens {
            insert_new(&mut assets, self.factory.build_token(asset, &context).await?)?;
        }
        for asset in &partition.custodial_only {
            insert_new(&mut assets, self.factory.build_custodial_only(asset).await)?;
        }

        tracing::info!(assets = assets.len(), "Eager asset preload complete");
        Ok((context, assets))
    }
}

#[async_trait]
impl AssetLoader for EagerAssetLoader {
    async fn init_and_preload(&self) -> CoreResult<()> {
        self.published.publish_once(|| self.preload()).await
    }

    async fn get(&self, ticker: &str) -> CoreResult<Arc<CryptoAsset>> {
        self.published.context()?;
        self.published
            .lookup(ticker)
            .await
            .ok_or_else(|| CoreError::UnknownAsset(ticker.to_string()))
    }

    async fn loaded_assets(&self) -> Vec<Arc<CryptoAsset>> {
        self.published.all().await
    }
}
