//! Coincore 主入口
//! 加载配置、初始化资产目录并输出当前会话可用的资产

use std::sync::Arc;

use anyhow::{Context, Result};
use coincore::{
    config::Config,
    domain::AssetTable,
    infrastructure::{logging::init_logging, HttpRemoteConfig, InMemoryRemoteConfig},
    service::{sources::RemoteConfig, AssetCatalogue, AssetFeatureLookup},
};

#[tokio::main]
async fn main() -> Result<()> {
    // ✅ 1. 加载环境变量
    dotenvy::dotenv().ok();

    // ✅ 2. 加载配置（CONFIG_PATH 指定的文件优先）
    let config_path = std::env::var("CONFIG_PATH").ok();
    let config = Config::from_env_and_file(config_path.as_deref())?;
    config.validate().context("Invalid configuration")?;

    // ✅ 3. 初始化日志
    init_logging(&config.logging)?;
    tracing::info!("🚀 Starting Coincore asset catalogue");

    // ✅ 4. 远程能力配置
    let remote: Arc<dyn RemoteConfig> = match HttpRemoteConfig::from_settings(&config.remote_config)? {
        Some(http) => {
            tracing::info!(url = ?config.remote_config.url, "Using HTTP remote config");
            Arc::new(http)
        }
        None => {
            tracing::warn!("⚠️ REMOTE_CONFIG_URL not set, dynamic assets use the fallback table");
            Arc::new(InMemoryRemoteConfig::new())
        }
    };

    // ✅ 5. 初始化资产目录
    let table = Arc::new(AssetTable::builtin());
    let lookup = Arc::new(AssetFeatureLookup::with_key(
        remote,
        table.clone(),
        &config.remote_config.features_key,
    ));
    let catalogue = AssetCatalogue::new(table.clone(), lookup);
    let dynamic = catalogue.initialise(table.fixed()).await;

    let tickers = |assets: &[coincore::domain::AssetRef]| {
        assets
            .iter()
            .map(|a| a.ticker().to_string())
            .collect::<Vec<_>>()
            .join(",")
    };

    tracing::info!(
        enabled_dynamic = %tickers(&dynamic),
        "✅ Asset catalogue initialised"
    );
    tracing::info!(assets = %tickers(&catalogue.supported_crypto_assets()), "Supported assets");
    tracing::info!(assets = %tickers(&catalogue.supported_custodial_assets()), "Custodial assets");
    for l1 in table.fixed() {
        let l2 = catalogue.supported_l2_assets(l1.ticker());
        if !l2.is_empty() {
            tracing::info!(chain = %l1, tokens = %tickers(&l2), "L2 assets");
        }
    }

    Ok(())
}
