//! CryptoAsset 构建工厂
//!
//! 负责 L1 钱包初始化、动态资产分区、活跃资产集合查询，
//! 以及把 AssetInfo 绑定到托管/非托管账户。两种加载策略共用本工厂。

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use futures::future::join_all;

use crate::{
    domain::{
        asset_action::{custodial_actions, non_custodial_actions},
        asset_info::AssetRef,
        pending_tx::AddressKind,
        remote_feature::FeatureSet,
    },
    error::{CoreError, CoreResult},
    service::{
        account::{CustodialTradingAccount, NonCustodialAccount, OnChainKind},
        crypto_asset::{AddressRules, CryptoAsset},
        feature_lookup::AssetFeatureLookup,
        session::{ChainBackend, CoincoreDeps},
        sources::ActiveAssetSource,
        tx_engine::on_chain::OnChainEngineDeps,
    },
    utils::address_validator::CustodialAddressPattern,
};

/// 动态资产分区：父链代币 / 纯托管资产，二者必须不相交
#[derive(Debug, Clone, Default)]
pub struct AssetPartition {
    pub tokens: Vec<AssetRef>,
    pub custodial_only: Vec<AssetRef>,
}

impl AssetPartition {
    /// 划分动态资产；同一 ticker 同时落入两个分区属于配置错误
    pub fn of(assets: &[AssetRef]) -> CoreResult<Self> {
        let tokens: Vec<AssetRef> = assets.iter().filter(|a| a.l2chain.is_some()).cloned().collect();
        let custodial_only: Vec<AssetRef> = assets
            .iter()
            .filter(|a| a.is_custodial_only())
            .cloned()
            .collect();

        let token_tickers: HashSet<&str> = tokens.iter().map(|a| a.ticker()).collect();
        let mut overlap: Vec<String> = custodial_only
            .iter()
            .filter(|a| token_tickers.contains(a.ticker()))
            .map(|a| a.ticker().to_string())
            .collect();
        if !overlap.is_empty() {
            overlap.sort();
            tracing::error!(tickers = ?overlap, "Asset partition overlap");
            return Err(CoreError::AssetPartitionOverlap { tickers: overlap });
        }

        Ok(Self {
            tokens,
            custodial_only,
        })
    }
}

/// L1 初始化结果
#[derive(Debug, Clone, Default)]
pub struct LoadContext {
    /// 钱包已成功初始化的链
    pub ready_chains: HashSet<String>,
    /// L1 ticker → AssetInfo
    pub l1_assets: HashMap<String, AssetRef>,
}

impl LoadContext {
    pub fn is_ready(&self, chain: &str) -> bool {
        self.ready_chains.contains(&chain.to_uppercase())
    }
}

/// 并发查询全部来源并取并集；失败的来源视为空集
pub async fn union_active(sources: &[Arc<dyn ActiveAssetSource>]) -> HashSet<String> {
    let results = join_all(sources.iter().map(|s| s.active_assets())).await;
    sources
        .iter()
        .zip(results)
        .flat_map(|(source, result)| match result {
            Ok(tickers) => tickers,
            Err(e) => {
                tracing::warn!(source = source.name(), error = %e, "Active asset source failed");
                HashSet::new()
            }
        })
        .map(|t| t.to_uppercase())
        .collect()
}

pub struct AssetFactory {
    deps: CoincoreDeps,
    feature_lookup: Arc<AssetFeatureLookup>,
    custodial_pattern: CustodialAddressPattern,
    fiat_currency: String,
}

impl AssetFactory {
    pub fn new(
        deps: CoincoreDeps,
        feature_lookup: Arc<AssetFeatureLookup>,
        custodial_pattern: CustodialAddressPattern,
        fiat_currency: &str,
    ) -> Self {
        Self {
            deps,
            feature_lookup,
            custodial_pattern,
            fiat_currency: fiat_currency.to_uppercase(),
        }
    }

    pub fn deps(&self) -> &CoincoreDeps {
        &self.deps
    }

    fn backend(&self, chain: &str) -> Option<&ChainBackend> {
        self.deps.chains.get(&chain.to_uppercase())
    }

    /// 逐个（顺序）初始化 L1 钱包。单个失败上报后继续下一个。
    pub async fn init_l1_assets(&self, fixed: &[AssetRef]) -> LoadContext {
        let mut context = LoadContext::default();
        for asset in fixed {
            context
                .l1_assets
                .insert(asset.ticker().to_string(), asset.clone());
            let Some(backend) = self.backend(asset.ticker()) else {
                tracing::debug!(asset = %asset, "No on-chain backend, custodial only");
                continue;
            };
            match backend.ledger.init_wallet().await {
                Ok(()) => {
                    tracing::info!(asset = %asset, "L1 wallet initialised");
                    context.ready_chains.insert(asset.ticker().to_string());
                }
                Err(e) => {
                    self.deps
                        .crash_logger
                        .log_exception(&e, &format!("init L1 asset {}", asset.ticker()));
                }
            }
        }
        context
    }

    /// 代币分区的活跃集合：托管来源 ∪ 链上代币来源
    pub async fn active_token_tickers(&self) -> HashSet<String> {
        let (custodial, on_chain) = tokio::join!(
            union_active(&self.deps.custodial_activity_sources),
            union_active(&self.deps.token_activity_sources),
        );
        custodial.into_iter().chain(on_chain).collect()
    }

    /// 纯托管分区的活跃集合
    pub async fn active_custodial_tickers(&self) -> HashSet<String> {
        union_active(&self.deps.custodial_activity_sources).await
    }

    fn custodial_account(&self, asset: &AssetRef, features: &FeatureSet) -> Arc<CustodialTradingAccount> {
        Arc::new(CustodialTradingAccount::new(
            asset.clone(),
            custodial_actions(features),
            self.deps.trading_balances.clone(),
            self.deps.custodial_wallet.clone(),
            self.deps.exchange_rates.clone(),
            &self.fiat_currency,
        ))
    }

    fn engine_deps(&self, backend: &ChainBackend) -> OnChainEngineDeps {
        OnChainEngineDeps {
            ledger: backend.ledger.clone(),
            signer: backend.signer.clone(),
            fee_source: self.deps.fee_source.clone(),
            exchange_rates: self.deps.exchange_rates.clone(),
            fee_preferences: self.deps.fee_preferences.clone(),
            fiat_currency: self.fiat_currency.clone(),
        }
    }

    /// 固定 L1 资产
    pub async fn build_l1(&self, asset: &AssetRef, context: &LoadContext) -> CryptoAsset {
        let features = self.feature_lookup.features_for(asset.ticker()).await;
        let custodial = asset
            .is_custodial()
            .then(|| self.custodial_account(asset, &features));

        let backend = self.backend(asset.ticker());
        let non_custodial = match backend {
            Some(backend) if asset.is_non_custodial() && context.is_ready(asset.ticker()) => {
                Some(Arc::new(NonCustodialAccount::new(
                    asset.clone(),
                    asset.clone(),
                    OnChainKind::Native,
                    non_custodial_actions(&features),
                    self.engine_deps(backend),
                    self.deps.custodial_wallet.clone(),
                )
                .with_reserved_minimum(backend.reserved_minimum)))
            }
            _ => None,
        };
        let rules = match backend {
            Some(backend) => AddressRules::AccountBased {
                ledger: backend.ledger.clone(),
                kind: AddressKind::OnChain,
            },
            None => AddressRules::Custodial(self.custodial_pattern.clone()),
        };

        CryptoAsset::new(asset.clone(), features, custodial, non_custodial, rules)
    }

    /// 父链代币；父链没有链上能力时无法构建
    pub async fn build_token(&self, asset: &AssetRef, context: &LoadContext) -> CoreResult<CryptoAsset> {
        let chain = asset
            .l2chain
            .as_deref()
            .ok_or_else(|| CoreError::UnknownAssetType(asset.ticker().to_string()))?;
        let backend = self
            .backend(chain)
            .ok_or_else(|| CoreError::UnknownAssetType(asset.ticker().to_string()))?;
        let fee_asset = context
            .l1_assets
            .get(chain)
            .cloned()
            .ok_or_else(|| CoreError::UnknownAssetType(asset.ticker().to_string()))?;
        let contract = asset.l2identifier.clone().unwrap_or_default();

        let features = self.feature_lookup.features_for(asset.ticker()).await;
        let custodial = asset
            .is_custodial()
            .then(|| self.custodial_account(asset, &features));
        let non_custodial = (asset.is_non_custodial() && context.is_ready(chain)).then(|| {
            Arc::new(NonCustodialAccount::new(
                asset.clone(),
                fee_asset,
                OnChainKind::Token { contract },
                non_custodial_actions(&features),
                self.engine_deps(backend),
                self.deps.custodial_wallet.clone(),
            ))
        });
        let rules = AddressRules::AccountBased {
            ledger: backend.ledger.clone(),
            kind: AddressKind::Token,
        };

        Ok(CryptoAsset::new(asset.clone(), features, custodial, non_custodial, rules))
    }

    /// 纯托管资产
    pub async fn build_custodial_only(&self, asset: &AssetRef) -> CryptoAsset {
        let features = self.feature_lookup.features_for(asset.ticker()).await;
        let custodial = self.custodial_account(asset, &features);
        CryptoAsset::new(
            asset.clone(),
            features,
            Some(custodial),
            None,
            AddressRules::Custodial(self.custodial_pattern.clone()),
        )
    }

    /// 按资产类型分派构建
    pub async fn build(&self, asset: &AssetRef, context: &LoadContext) -> CoreResult<CryptoAsset> {
        if context.l1_assets.contains_key(asset.ticker()) {
            Ok(self.build_l1(asset, context).await)
        } else if asset.l2chain.is_some() {
            self.build_token(asset, context).await
        } else if asset.is_custodial_only() {
            Ok(self.build_custodial_only(asset).await)
        } else {
            Err(CoreError::UnknownAssetType(asset.ticker().to_string()))
        }
    }
}

/// 插入新资产；同一 ticker 重复加载属于编程错误
pub(crate) fn insert_new(
    map: &mut HashMap<String, Arc<CryptoAsset>>,
    asset: CryptoAsset,
) -> CoreResult<Arc<CryptoAsset>> {
    let ticker = asset.ticker().to_string();
    if map.contains_key(&ticker) {
        return Err(CoreError::AssetAlreadyLoaded(ticker));
    }
    let asset = Arc::new(asset);
    map.insert(ticker, asset.clone());
    Ok(asset)
}
