//! 会话上下文
//!
//! 每次登录构造一个 `CoincoreSession`，显式持有目录、加载器与协作方，
//! 会话内的所有交易流程共享同一个父级取消令牌。

use std::{collections::HashMap, sync::Arc};

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    config::Config,
    domain::{asset_table::AssetTable, pending_tx::ReceiveAddress},
    error::CoreResult,
    service::{
        account::CryptoAccount,
        asset_catalogue::AssetCatalogue,
        asset_loader::{switcher::AssetLoaderSwitcher, AssetFactory, AssetLoader},
        crypto_asset::CryptoAsset,
        feature_lookup::AssetFeatureLookup,
        sources::{
            ActiveAssetSource, CrashLogger, CustodialWalletManager, ExchangeRates, FeeDataSource,
            FeePreferences, OnChainLedger, RemoteConfig, TradingBalanceSource, TransactionSigner,
        },
        tx_engine::TxFlow,
    },
    utils::address_validator::CustodialAddressPattern,
};

/// 一条账户模型链的链上能力
#[derive(Clone)]
pub struct ChainBackend {
    pub ledger: Arc<dyn OnChainLedger>,
    pub signer: Arc<dyn TransactionSigner>,
    /// 原生币链上保留最低额（最小单位），不可转出
    pub reserved_minimum: i128,
}

impl ChainBackend {
    pub fn new(ledger: Arc<dyn OnChainLedger>, signer: Arc<dyn TransactionSigner>) -> Self {
        Self {
            ledger,
            signer,
            reserved_minimum: 0,
        }
    }

    pub fn with_reserved_minimum(mut self, reserved_minimum: i128) -> Self {
        self.reserved_minimum = reserved_minimum.max(0);
        self
    }
}

/// 会话所需的全部外部协作方
#[derive(Clone)]
pub struct CoincoreDeps {
    pub remote_config: Arc<dyn RemoteConfig>,
    /// L1 ticker → 链上能力
    pub chains: HashMap<String, ChainBackend>,
    pub trading_balances: Arc<dyn TradingBalanceSource>,
    pub custodial_wallet: Arc<dyn CustodialWalletManager>,
    pub fee_source: Arc<dyn FeeDataSource>,
    pub exchange_rates: Arc<dyn ExchangeRates>,
    pub fee_preferences: Arc<dyn FeePreferences>,
    pub crash_logger: Arc<dyn CrashLogger>,
    /// 托管侧活跃资产来源（交易余额、理财余额）
    pub custodial_activity_sources: Vec<Arc<dyn ActiveAssetSource>>,
    /// 链上代币活跃资产来源
    pub token_activity_sources: Vec<Arc<dyn ActiveAssetSource>>,
}

pub struct CoincoreSession {
    id: Uuid,
    config: Arc<Config>,
    catalogue: Arc<AssetCatalogue>,
    loader: Arc<dyn AssetLoader>,
    cancel: CancellationToken,
}

impl CoincoreSession {
    pub fn new(config: Arc<Config>, table: AssetTable, deps: CoincoreDeps) -> anyhow::Result<Self> {
        let table = Arc::new(table);
        let lookup = Arc::new(AssetFeatureLookup::with_key(
            deps.remote_config.clone(),
            table.clone(),
            &config.remote_config.features_key,
        ));
        let catalogue = Arc::new(AssetCatalogue::new(table, lookup.clone()));
        let pattern = CustodialAddressPattern::new(&config.address.custodial_address_pattern)?;
        let factory = Arc::new(AssetFactory::new(
            deps,
            lookup,
            pattern,
            &config.display.fiat_currency,
        ));
        let loader = Arc::new(AssetLoaderSwitcher::new(
            config.features.enable_dynamic_asset_loading,
            catalogue.clone(),
            factory,
        ));

        let session = Self {
            id: Uuid::new_v4(),
            config,
            catalogue,
            loader,
            cancel: CancellationToken::new(),
        };
        tracing::info!(session_id = %session.id, "Coincore session created");
        Ok(session)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn catalogue(&self) -> &Arc<AssetCatalogue> {
        &self.catalogue
    }

    pub fn loader(&self) -> &Arc<dyn AssetLoader> {
        &self.loader
    }

    /// 初始化目录并预加载资产（幂等）
    pub async fn init(&self) -> CoreResult<()> {
        self.loader.init_and_preload().await
    }

    pub async fn asset(&self, ticker: &str) -> CoreResult<Arc<CryptoAsset>> {
        self.loader.get(ticker).await
    }

    pub async fn assets(&self) -> Vec<Arc<CryptoAsset>> {
        self.loader.loaded_assets().await
    }

    /// 当前有资金的账户
    pub async fn active_accounts(&self) -> Vec<Arc<dyn CryptoAccount>> {
        let accounts: Vec<Arc<dyn CryptoAccount>> = self
            .assets()
            .await
            .iter()
            .flat_map(|asset| asset.accounts())
            .collect();
        let funded = join_all(accounts.iter().map(|account| async move {
            match account.balance().await {
                Ok(balance) => balance.total.is_positive(),
                Err(e) => {
                    tracing::warn!(account = account.label(), error = %e, "Balance unavailable");
                    false
                }
            }
        }))
        .await;
        accounts
            .into_iter()
            .zip(funded)
            .filter_map(|(account, funded)| funded.then_some(account))
            .collect()
    }

    /// 为（来源账户, 目标）创建一个新的交易流程
    pub fn start_transaction(
        &self,
        source: &Arc<dyn CryptoAccount>,
        target: ReceiveAddress,
    ) -> CoreResult<TxFlow> {
        let engine = source.create_tx_engine(target)?;
        Ok(TxFlow::new(engine, self.cancel.child_token()))
    }

    /// 结束会话：取消全部进行中的流程
    pub fn shutdown(&self) {
        tracing::info!(session_id = %self.id, "Coincore session shutting down");
        self.cancel.cancel();
    }
}
