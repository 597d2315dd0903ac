//! 账户模型
//!
//! 每个 CryptoAsset 最多一个托管交易账户和一个非托管账户。

pub mod custodial;
pub mod non_custodial;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use custodial::CustodialTradingAccount;
pub use non_custodial::{NonCustodialAccount, OnChainKind};

use crate::{
    domain::{
        activity::ActivityItem,
        asset_action::ActionSet,
        asset_info::AssetRef,
        money::CryptoValue,
        pending_tx::ReceiveAddress,
    },
    error::CoreResult,
    service::tx_engine::TxEngine,
};

/// 作为交易来源时的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxSourceState {
    CanTransact,
    NoFunds,
    FundsLocked,
    NotSupported,
    TransactionInFlight,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountBalance {
    pub total: CryptoValue,
    pub actionable: CryptoValue,
    pub pending: CryptoValue,
}

impl AccountBalance {
    pub fn zero(asset: &AssetRef) -> Self {
        Self {
            total: CryptoValue::zero(asset.clone()),
            actionable: CryptoValue::zero(asset.clone()),
            pending: CryptoValue::zero(asset.clone()),
        }
    }
}

#[async_trait]
pub trait CryptoAccount: Send + Sync {
    fn label(&self) -> &str;

    fn asset(&self) -> &AssetRef;

    fn is_custodial(&self) -> bool;

    /// 最近一次拉取余额时是否有资金
    fn is_funded(&self) -> bool;

    /// 该账户允许的用户操作
    fn actions(&self) -> &ActionSet;

    async fn balance(&self) -> CoreResult<AccountBalance>;

    async fn account_balance(&self) -> CoreResult<CryptoValue> {
        Ok(self.balance().await?.total)
    }

    async fn actionable_balance(&self) -> CoreResult<CryptoValue> {
        Ok(self.balance().await?.actionable)
    }

    async fn pending_balance(&self) -> CoreResult<CryptoValue> {
        Ok(self.balance().await?.pending)
    }

    async fn receive_address(&self) -> CoreResult<ReceiveAddress>;

    /// 合并后的活动记录，按时间倒序
    async fn activity(&self) -> CoreResult<Vec<ActivityItem>>;

    async fn source_state(&self) -> CoreResult<TxSourceState>;

    fn create_tx_engine(&self, target: ReceiveAddress) -> CoreResult<Arc<dyn TxEngine>>;
}
