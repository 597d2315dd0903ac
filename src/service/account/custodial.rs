//! 托管交易账户
//! 余额由后端账本维护；余额拉取失败时按零处理

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use async_trait::async_trait;

use super::{AccountBalance, CryptoAccount, TxSourceState};
use crate::{
    domain::{
        activity::{sort_newest_first, ActivityItem},
        asset_action::ActionSet,
        asset_info::AssetRef,
        pending_tx::{AddressKind, ReceiveAddress},
    },
    error::CoreResult,
    service::{
        sources::{CustodialWalletManager, ExchangeRates, TradingBalanceSource},
        tx_engine::{trading_withdraw::TradingWithdrawTxEngine, TxEngine},
    },
};

pub struct CustodialTradingAccount {
    asset: AssetRef,
    label: String,
    actions: ActionSet,
    balances: Arc<dyn TradingBalanceSource>,
    custodial: Arc<dyn CustodialWalletManager>,
    exchange_rates: Arc<dyn ExchangeRates>,
    fiat_currency: String,
    has_funds: AtomicBool,
}

impl CustodialTradingAccount {
    pub fn new(
        asset: AssetRef,
        actions: ActionSet,
        balances: Arc<dyn TradingBalanceSource>,
        custodial: Arc<dyn CustodialWalletManager>,
        exchange_rates: Arc<dyn ExchangeRates>,
        fiat_currency: &str,
    ) -> Self {
        Self {
            label: format!("{} Trading Account", asset.display_ticker),
            asset,
            actions,
            balances,
            custodial,
            exchange_rates,
            fiat_currency: fiat_currency.to_string(),
            has_funds: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl CryptoAccount for CustodialTradingAccount {
    fn label(&self) -> &str {
        &self.label
    }

    fn asset(&self) -> &AssetRef {
        &self.asset
    }

    fn is_custodial(&self) -> bool {
        true
    }

    fn is_funded(&self) -> bool {
        self.has_funds.load(Ordering::SeqCst)
    }

    fn actions(&self) -> &ActionSet {
        &self.actions
    }

    async fn balance(&self) -> CoreResult<AccountBalance> {
        let balance = match self.balances.balance_for(&self.asset).await {
            Ok(b) => {
                b.total.ensure_currency(&self.asset)?;
                AccountBalance {
                    total: b.total,
                    actionable: b.actionable,
                    pending: b.pending,
                }
            }
            Err(e) => {
                tracing::debug!(asset = %self.asset, error = %e, "Trading balance unavailable, defaulting to zero");
                AccountBalance::zero(&self.asset)
            }
        };
        self.has_funds
            .store(balance.total.is_positive(), Ordering::SeqCst);
        Ok(balance)
    }

    async fn receive_address(&self) -> CoreResult<ReceiveAddress> {
        let address = self.custodial.receive_address(&self.asset).await?;
        Ok(ReceiveAddress::new(
            self.asset.clone(),
            &address,
            &self.label,
            AddressKind::Custodial,
        ))
    }

    async fn activity(&self) -> CoreResult<Vec<ActivityItem>> {
        let (mut items, trades) = tokio::try_join!(
            self.custodial.custodial_activity(&self.asset),
            self.custodial.trade_activity(&self.asset),
        )?;
        items.extend(trades);
        sort_newest_first(&mut items);
        Ok(items)
    }

    async fn source_state(&self) -> CoreResult<TxSourceState> {
        let balance = self.balance().await?;
        Ok(if !balance.total.is_positive() {
            TxSourceState::NoFunds
        } else if !balance.actionable.is_positive() {
            TxSourceState::FundsLocked
        } else {
            TxSourceState::CanTransact
        })
    }

    fn create_tx_engine(&self, target: ReceiveAddress) -> CoreResult<Arc<dyn TxEngine>> {
        let engine = TradingWithdrawTxEngine::new(
            self.asset.clone(),
            &self.label,
            target,
            self.balances.clone(),
            self.custodial.clone(),
            self.exchange_rates.clone(),
            &self.fiat_currency,
        )?;
        Ok(Arc::new(engine))
    }
}
