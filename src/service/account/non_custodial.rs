//! 非托管账户（账户模型链：原生币与代币）
//!
//! 余额直接来自链上；可用余额 = 余额 - 链上保留最低额，挂起余额恒为 0。
//! 链上存在未确认交易时，来源状态为 TRANSACTION_IN_FLIGHT。

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use async_trait::async_trait;

use super::{AccountBalance, CryptoAccount, TxSourceState};
use crate::{
    domain::{
        activity::{sort_newest_first, ActivityItem, TransactionDirection},
        asset_action::ActionSet,
        asset_info::AssetRef,
        money::CryptoValue,
        pending_tx::{AddressKind, ReceiveAddress},
    },
    error::{CoreError, CoreResult},
    service::{
        sources::CustodialWalletManager,
        tx_engine::{
            on_chain::{OnChainEngineDeps, OnChainTxEngine},
            TxEngine,
        },
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OnChainKind {
    Native,
    Token { contract: String },
}

pub struct NonCustodialAccount {
    asset: AssetRef,
    fee_asset: AssetRef,
    kind: OnChainKind,
    label: String,
    actions: ActionSet,
    deps: OnChainEngineDeps,
    trades: Arc<dyn CustodialWalletManager>,
    reserved_minimum: i128,
    has_funds: AtomicBool,
}

impl NonCustodialAccount {
    pub fn new(
        asset: AssetRef,
        fee_asset: AssetRef,
        kind: OnChainKind,
        actions: ActionSet,
        deps: OnChainEngineDeps,
        trades: Arc<dyn CustodialWalletManager>,
    ) -> Self {
        Self {
            label: format!("My {} Wallet", asset.display_ticker),
            asset,
            fee_asset,
            kind,
            actions,
            deps,
            trades,
            reserved_minimum: 0,
            has_funds: AtomicBool::new(false),
        }
    }

    /// 链上保留最低额（最小单位）
    pub fn with_reserved_minimum(mut self, reserved_minimum: i128) -> Self {
        self.reserved_minimum = reserved_minimum.max(0);
        self
    }

    pub fn kind(&self) -> &OnChainKind {
        &self.kind
    }

    pub fn fee_asset(&self) -> &AssetRef {
        &self.fee_asset
    }

    fn address_kind(&self) -> AddressKind {
        match self.kind {
            OnChainKind::Native => AddressKind::OnChain,
            OnChainKind::Token { .. } => AddressKind::Token,
        }
    }

    /// 链上 SENT 记录若与兑换单入金哈希一致，则以兑换记录替换
    fn reconcile_swaps(history: Vec<ActivityItem>, trades: Vec<ActivityItem>) -> Vec<ActivityItem> {
        let mut by_deposit: HashMap<String, ActivityItem> = trades
            .into_iter()
            .filter_map(|t| t.deposit_tx_hash.clone().map(|h| (h.to_lowercase(), t)))
            .collect();

        let mut merged: Vec<ActivityItem> = history
            .into_iter()
            .map(|item| {
                if item.direction != TransactionDirection::Sent {
                    return item;
                }
                by_deposit.remove(&item.tx_id.to_lowercase()).unwrap_or(item)
            })
            .collect();
        sort_newest_first(&mut merged);
        merged
    }
}

#[async_trait]
impl CryptoAccount for NonCustodialAccount {
    fn label(&self) -> &str {
        &self.label
    }

    fn asset(&self) -> &AssetRef {
        &self.asset
    }

    fn is_custodial(&self) -> bool {
        false
    }

    fn is_funded(&self) -> bool {
        self.has_funds.load(Ordering::SeqCst)
    }

    fn actions(&self) -> &ActionSet {
        &self.actions
    }

    async fn balance(&self) -> CoreResult<AccountBalance> {
        let total = self.deps.ledger.balance(&self.asset).await?;
        total.ensure_currency(&self.asset)?;
        let reserved = CryptoValue::new(self.asset.clone(), self.reserved_minimum);
        let actionable = total.saturating_sub_floor_zero(&reserved)?;
        self.has_funds.store(total.is_positive(), Ordering::SeqCst);
        Ok(AccountBalance {
            total,
            actionable,
            pending: CryptoValue::zero(self.asset.clone()),
        })
    }

    async fn receive_address(&self) -> CoreResult<ReceiveAddress> {
        let address = self.deps.ledger.account_address().await?;
        Ok(ReceiveAddress::new(
            self.asset.clone(),
            &address,
            &self.label,
            self.address_kind(),
        ))
    }

    async fn activity(&self) -> CoreResult<Vec<ActivityItem>> {
        let (history, trades) = tokio::try_join!(
            self.deps.ledger.transaction_history(&self.asset),
            self.trades.trade_activity(&self.asset),
        )?;
        Ok(Self::reconcile_swaps(history, trades))
    }

    async fn source_state(&self) -> CoreResult<TxSourceState> {
        let (in_flight, balance) = tokio::try_join!(
            async {
                self.deps
                    .ledger
                    .has_unconfirmed_transactions()
                    .await
                    .map_err(CoreError::from)
            },
            self.balance(),
        )?;
        if in_flight {
            return Ok(TxSourceState::TransactionInFlight);
        }
        Ok(if balance.actionable.is_positive() {
            TxSourceState::CanTransact
        } else {
            TxSourceState::NoFunds
        })
    }

    fn create_tx_engine(&self, target: ReceiveAddress) -> CoreResult<Arc<dyn TxEngine>> {
        let engine = OnChainTxEngine::new(
            self.asset.clone(),
            self.fee_asset.clone(),
            self.kind.clone(),
            &self.label,
            target,
            self.reserved_minimum,
            self.deps.clone(),
        )?;
        Ok(Arc::new(engine))
    }
}
