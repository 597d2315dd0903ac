//! 按功能开关选择加载策略

use std::sync::Arc;

use async_trait::async_trait;

use super::{AssetFactory, AssetLoader, DynamicAssetLoader, EagerAssetLoader};
use crate::{
    error::CoreResult,
    service::{asset_catalogue::AssetCatalogue, crypto_asset::CryptoAsset},
};

pub struct AssetLoaderSwitcher {
    inner: Arc<dyn AssetLoader>,
}

impl AssetLoaderSwitcher {
    pub fn new(
        dynamic_enabled: bool,
        catalogue: Arc<AssetCatalogue>,
        factory: Arc<AssetFactory>,
    ) -> Self {
        let inner: Arc<dyn AssetLoader> = if dynamic_enabled {
            Arc::new(DynamicAssetLoader::new(catalogue, factory))
        } else {
            Arc::new(EagerAssetLoader::new(catalogue, factory))
        };
        tracing::info!(dynamic = dynamic_enabled, "Asset loader selected");
        Self { inner }
    }
}

#[async_trait]
impl AssetLoader for AssetLoaderSwitcher {
    async fn init_and_preload(&self) -> CoreResult<()> {
        self.inner.init_and_preload().await
    }

    async fn get(&self, ticker: &str) -> CoreResult<Arc<CryptoAsset>> {
        self.inner.get(ticker).await
    }

    async fn loaded_assets(&self) -> Vec<Arc<CryptoAsset>> {
        self.inner.loaded_assets().await
    }
}
