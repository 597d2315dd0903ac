//! 资产加载器
//!
//! 两种策略实现同一契约：
//! - `DynamicAssetLoader`：只实例化用户有活动/资格的资产，其余按需懒加载
//! - `EagerAssetLoader`：一次性加载全部已启用资产并预先校验资产类型
//!
//! `AssetLoaderSwitcher` 根据功能开关在两者间选择。

pub mod dynamic;
pub mod eager;
pub mod factory;
pub mod switcher;

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::{OnceCell, RwLock};

pub use dynamic::DynamicAssetLoader;
pub use eager::EagerAssetLoader;
pub use factory::{AssetFactory, AssetPartition, LoadContext};
pub use switcher::AssetLoaderSwitcher;

use crate::{
    error::{CoreError, CoreResult},
    service::crypto_asset::CryptoAsset,
};

#[async_trait]
pub trait AssetLoader: Send + Sync {
    /// 初始化目录与 L1 钱包并预加载资产。幂等，只执行一次。
    async fn init_and_preload(&self) -> CoreResult<()>;

    async fn get(&self, ticker: &str) -> CoreResult<Arc<CryptoAsset>>;

    /// 已发布的资产（预加载完成前为空）
    async fn loaded_assets(&self) -> Vec<Arc<CryptoAsset>>;
}

/// 一次性发布的资产表
#[derive(Default)]
pub(crate) struct PublishedAssets {
    context: OnceCell<LoadContext>,
    assets: RwLock<HashMap<String, Arc<CryptoAsset>>>,
}

impl PublishedAssets {
    pub(crate) fn context(&self) -> CoreResult<&LoadContext> {
        self.context
            .get()
            .ok_or(CoreError::NotInitialised("asset loader"))
    }

    /// 执行一次预加载并整体发布结果；失败时不发布任何内容，可重试
    pub(crate) async fn publish_once<F, Fut>(&self, preload: F) -> CoreResult<()>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = CoreResult<(LoadContext, HashMap<String, Arc<CryptoAsset>>)>>,
    {
        self.context
            .get_or_try_init(|| async {
                let (context, assets) = preload().await?;
                let count = assets.len();
                *self.assets.write().await = assets;
                tracing::info!(assets = count, "Assets published");
                Ok::<_, CoreError>(context)
            })
            .await?;
        Ok(())
    }

    pub(crate) async fn lookup(&self, ticker: &str) -> Option<Arc<CryptoAsset>> {
        self.assets.read().await.get(&ticker.to_uppercase()).cloned()
    }

    pub(crate) fn map(&self) -> &RwLock<HashMap<String, Arc<CryptoAsset>>> {
        &self.assets
    }

    pub(crate) async fn all(&self) -> Vec<Arc<CryptoAsset>> {
        if !self.context.initialized() {
            return Vec::new();
        }
        let mut assets: Vec<Arc<CryptoAsset>> = self.assets.read().await.values().cloned().collect();
        assets.sort_by(|a, b| a.ticker().cmp(b.ticker()));
        assets
    }
}
