//! 外部协作方接口
//!
//! 余额、费用、汇率、远程配置、签名等均通过以下 trait 注入，
//! 其网络协议不在本 crate 范围内，只关心返回值。

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::{
    activity::ActivityItem, asset_info::AssetInfo, fee::FeeLevel, fee::FeeOptions,
    money::CryptoValue,
};

/// 远程配置（返回原始 JSON 字符串）
#[async_trait]
pub trait RemoteConfig: Send + Sync {
    async fn raw_json(&self, key: &str) -> Result<String>;
}

/// 返回“当前对我可用/活跃”的 ticker 集合
#[async_trait]
pub trait ActiveAssetSource: Send + Sync {
    fn name(&self) -> &str;

    async fn active_assets(&self) -> Result<HashSet<String>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradingBalance {
    pub total: CryptoValue,
    pub actionable: CryptoValue,
    pub pending: CryptoValue,
}

/// 托管账户余额
#[async_trait]
pub trait TradingBalanceSource: Send + Sync {
    async fn balance_for(&self, asset: &AssetInfo) -> Result<TradingBalance>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawFeeAndLimit {
    pub fee: CryptoValue,
    pub min_limit: CryptoValue,
}

/// 托管钱包后端
#[async_trait]
pub trait CustodialWalletManager: Send + Sync {
    async fn receive_address(&self, asset: &AssetInfo) -> Result<String>;

    /// 托管订单与划转历史
    async fn custodial_activity(&self, asset: &AssetInfo) -> Result<Vec<ActivityItem>>;

    /// 与该资产相关的兑换/交易记录
    async fn trade_activity(&self, asset: &AssetInfo) -> Result<Vec<ActivityItem>>;

    async fn withdraw_fee_and_min_limit(&self, asset: &AssetInfo) -> Result<WithdrawFeeAndLimit>;

    /// 提现到外部地址
    async fn withdraw(&self, amount: &CryptoValue, address: &str) -> Result<()>;
}

/// 待签名交易
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTransaction {
    pub nonce: u64,
    pub from: String,
    pub to: String,
    /// 原生币数量（wei），代币转账为 0
    pub value: i128,
    pub gas_price: i128,
    pub gas_limit: u64,
    /// 合约调用数据
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub raw: Vec<u8>,
}

/// 账户模型链的链上数据
#[async_trait]
pub trait OnChainLedger: Send + Sync {
    /// 父链 ticker
    fn chain(&self) -> &str;

    /// 派生/初始化 L1 钱包
    async fn init_wallet(&self) -> Result<()>;

    async fn account_address(&self) -> Result<String>;

    async fn balance(&self, asset: &AssetInfo) -> Result<CryptoValue>;

    async fn transaction_history(&self, asset: &AssetInfo) -> Result<Vec<ActivityItem>>;

    async fn has_unconfirmed_transactions(&self) -> Result<bool>;

    async fn is_contract_address(&self, address: &str) -> Result<bool>;

    async fn next_nonce(&self) -> Result<u64>;

    async fn push_transaction(&self, signed: &SignedTransaction) -> Result<String>;

    async fn put_transaction_note(&self, tx_hash: &str, note: &str) -> Result<()>;

    /// 旧版钱包需要二级密码签名
    fn requires_second_password(&self) -> bool {
        false
    }
}

/// 不透明签名能力
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    async fn sign(
        &self,
        raw: &RawTransaction,
        second_password: Option<&str>,
    ) -> Result<SignedTransaction>;
}

/// 单资产费用表
#[async_trait]
pub trait FeeDataSource: Send + Sync {
    async fn fee_options(&self, asset: &AssetInfo) -> Result<FeeOptions>;
}

/// 1 单位资产 → 法币汇率
#[async_trait]
pub trait ExchangeRates: Send + Sync {
    async fn fiat_rate(&self, asset: &AssetInfo, fiat_currency: &str) -> Result<Decimal>;
}

/// 每资产最近使用的费用档位
#[async_trait]
pub trait FeePreferences: Send + Sync {
    async fn fee_level_for(&self, ticker: &str) -> Option<FeeLevel>;

    async fn set_fee_level_for(&self, ticker: &str, level: FeeLevel);
}

/// 崩溃/遥测上报
pub trait CrashLogger: Send + Sync {
    fn log_event(&self, message: &str);

    fn log_exception(&self, error: &anyhow::Error, context: &str);
}
