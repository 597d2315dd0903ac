//! 托管账户 → 外部地址提现引擎
//!
//! 唯一合法档位 None；提现手续费与最小限额由托管后端给出，
//! 可用余额 = 可操作余额 - 提现手续费。结果不带链上哈希。

use std::{collections::BTreeSet, sync::Arc};

use async_trait::async_trait;

use super::{
    description_of, require_legal_level, require_source_currency,
    validation::{evaluate, ValidationFacts, TRADING_AMOUNT_RULES, TRADING_FULL_RULES},
    TxEngine,
};
use crate::{
    domain::{
        asset_info::AssetRef,
        fee::{levels, FeeLevel, FeeSelection},
        money::CryptoValue,
        pending_tx::{AddressKind, PendingTx, ReceiveAddress, TxConfirmationValue, TxResult},
    },
    error::{CoreError, CoreResult},
    service::sources::{CustodialWalletManager, ExchangeRates, TradingBalanceSource},
};

pub struct TradingWithdrawTxEngine {
    asset: AssetRef,
    source_label: String,
    target: ReceiveAddress,
    balances: Arc<dyn TradingBalanceSource>,
    custodial: Arc<dyn CustodialWalletManager>,
    exchange_rates: Arc<dyn ExchangeRates>,
    fiat_currency: String,
}

impl TradingWithdrawTxEngine {
    pub fn new(
        asset: AssetRef,
        source_label: &str,
        target: ReceiveAddress,
        balances: Arc<dyn TradingBalanceSource>,
        custodial: Arc<dyn CustodialWalletManager>,
        exchange_rates: Arc<dyn ExchangeRates>,
        fiat_currency: &str,
    ) -> CoreResult<Self> {
        if target.asset.ticker() != asset.ticker() {
            return Err(CoreError::currency_mismatch(asset.ticker(), target.asset.ticker()));
        }
        Ok(Self {
            asset,
            source_label: source_label.to_string(),
            target,
            balances,
            custodial,
            exchange_rates,
            fiat_currency: fiat_currency.to_string(),
        })
    }

    fn facts(&self, tx: &PendingTx) -> ValidationFacts {
        ValidationFacts {
            amount: tx.amount.minor(),
            available: tx.available_balance.minor(),
            fee: tx.fee_amount.minor(),
            fee_asset_balance: tx.total_balance.minor(),
            min_limit: tx.min_limit.as_ref().map(CryptoValue::minor),
            max_limit: tx.max_limit.as_ref().map(CryptoValue::minor),
            target_is_contract: false,
            // 托管资产不能提现到另一个托管入金地址
            target_kind_ok: self.target.kind != AddressKind::Custodial
                && !self.target.address.trim().is_empty(),
            has_tx_in_flight: false,
        }
    }
}

#[async_trait]
impl TxEngine for TradingWithdrawTxEngine {
    fn source_asset(&self) -> &AssetRef {
        &self.asset
    }

    fn target(&self) -> &ReceiveAddress {
        &self.target
    }

    fn legal_fee_levels(&self) -> BTreeSet<FeeLevel> {
        levels(&[FeeLevel::None])
    }

    fn produces_hashed_result(&self) -> bool {
        false
    }

    async fn do_initialise_tx(&self) -> CoreResult<PendingTx> {
        let selection = FeeSelection::new(
            self.asset.ticker(),
            FeeLevel::None,
            self.legal_fee_levels(),
            Some(self.asset.clone()),
        )?;
        Ok(PendingTx::zero(&self.asset, &self.asset, selection))
    }

    async fn do_update_amount(&self, amount: CryptoValue, tx: PendingTx) -> CoreResult<PendingTx> {
        require_source_currency(&self.asset, &amount)?;

        let (balance, withdraw) = tokio::try_join!(
            async { self.balances.balance_for(&self.asset).await.map_err(CoreError::from) },
            async {
                self.custodial
                    .withdraw_fee_and_min_limit(&self.asset)
                    .await
                    .map_err(CoreError::from)
            },
        )?;
        let available = balance.actionable.saturating_sub_floor_zero(&withdraw.fee)?;
        let fees = [(FeeLevel::None, withdraw.fee.clone())].into_iter().collect();

        Ok(PendingTx {
            amount,
            total_balance: balance.total,
            available_balance: available,
            fee_amount: withdraw.fee.clone(),
            fee_for_full_available: withdraw.fee,
            fee_selection: tx.fee_selection.clone().with_fees(fees),
            min_limit: Some(withdraw.min_limit),
            ..tx
        })
    }

    async fn do_update_fee_level(
        &self,
        tx: PendingTx,
        level: FeeLevel,
        _custom_amount: Option<u64>,
    ) -> CoreResult<PendingTx> {
        require_legal_level(&self.asset, &self.legal_fee_levels(), level)?;
        Ok(tx)
    }

    async fn do_validate_amount(&self, tx: PendingTx) -> CoreResult<PendingTx> {
        let state = evaluate(TRADING_AMOUNT_RULES, &self.facts(&tx));
        Ok(tx.with_validation(state))
    }

    async fn do_validate_all(&self, tx: PendingTx) -> CoreResult<PendingTx> {
        let state = evaluate(TRADING_FULL_RULES, &self.facts(&tx));
        Ok(tx.with_validation(state))
    }

    async fn do_build_confirmations(&self, tx: PendingTx) -> CoreResult<PendingTx> {
        let rate = self
            .exchange_rates
            .fiat_rate(&self.asset, &self.fiat_currency)
            .await?;
        let fee = tx.fee_amount.clone();
        let total = tx.amount.checked_add(&fee)?;

        let confirmations = vec![
            TxConfirmationValue::From {
                source_label: self.source_label.clone(),
                asset: self.asset.clone(),
            },
            TxConfirmationValue::To {
                address: self.target.address.clone(),
                label: self.target.label.clone(),
            },
            TxConfirmationValue::CompoundNetworkFee {
                fee: (!fee.is_zero()).then(|| fee.clone()),
                fee_fiat: (!fee.is_zero()).then(|| fee.to_fiat(rate, &self.fiat_currency)),
                level: FeeLevel::None,
            },
            TxConfirmationValue::Total {
                fiat: total.to_fiat(rate, &self.fiat_currency),
                total,
            },
            description_of(&tx),
        ];
        Ok(tx.with_confirmations(confirmations))
    }

    async fn do_execute(
        &self,
        tx: &PendingTx,
        _second_password: Option<&str>,
    ) -> CoreResult<TxResult> {
        self.custodial
            .withdraw(&tx.amount, &self.target.address)
            .await
            .map_err(|e| {
                tracing::error!(asset = %self.asset, error = %e, "Custodial withdrawal failed");
                CoreError::ExecutionFailed
            })?;

        tracing::info!(asset = %self.asset, amount = %tx.amount, "Custodial withdrawal submitted");
        Ok(TxResult::UnHashed {
            amount: tx.amount.clone(),
        })
    }
}
