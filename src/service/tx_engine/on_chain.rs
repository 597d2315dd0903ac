//! 账户模型链上转账引擎（原生币 + 代币）
//!
//! - 代币转账：合法档位 {Regular, Priority}，gas limit 取合约调用 limit，手续费以父链资产支付
//! - 原生转账：合法档位 {Regular, Priority, Custom}，可用余额需扣除手续费
//!
//! 手续费 = gas limit × 档位费率(gwei)，换算为 wei。

use std::{collections::BTreeSet, sync::Arc};

use async_trait::async_trait;

use super::{
    description_of, require_legal_level, require_source_currency,
    validation::{evaluate, ValidationFacts, ON_CHAIN_AMOUNT_RULES, ON_CHAIN_FULL_RULES},
    TxEngine,
};
use crate::{
    domain::{
        asset_info::AssetRef,
        fee::{levels, FeeLevel, FeeLimits, FeeOptions, FeeSelection},
        money::{gwei_to_wei, CryptoValue},
        pending_tx::{AddressKind, PendingTx, ReceiveAddress, TxConfirmationValue, TxResult},
    },
    error::{CoreError, CoreResult},
    service::{
        account::OnChainKind,
        sources::{
            ExchangeRates, FeeDataSource, FeePreferences, OnChainLedger, RawTransaction,
            TransactionSigner,
        },
    },
    utils::address_validator::AddressValidator,
};

/// ERC20 `transfer(address,uint256)`
const TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

#[derive(Clone)]
pub struct OnChainEngineDeps {
    pub ledger: Arc<dyn OnChainLedger>,
    pub signer: Arc<dyn TransactionSigner>,
    pub fee_source: Arc<dyn FeeDataSource>,
    pub exchange_rates: Arc<dyn ExchangeRates>,
    pub fee_preferences: Arc<dyn FeePreferences>,
    pub fiat_currency: String,
}

pub struct OnChainTxEngine {
    asset: AssetRef,
    fee_asset: AssetRef,
    kind: OnChainKind,
    source_label: String,
    target: ReceiveAddress,
    reserved_minimum: i128,
    deps: OnChainEngineDeps,
}

impl OnChainTxEngine {
    pub fn new(
        asset: AssetRef,
        fee_asset: AssetRef,
        kind: OnChainKind,
        source_label: &str,
        target: ReceiveAddress,
        reserved_minimum: i128,
        deps: OnChainEngineDeps,
    ) -> CoreResult<Self> {
        // 目标必须是同一资产
        if target.asset.ticker() != asset.ticker() {
            return Err(CoreError::currency_mismatch(asset.ticker(), target.asset.ticker()));
        }
        Ok(Self {
            asset,
            fee_asset,
            kind,
            source_label: source_label.to_string(),
            target,
            reserved_minimum,
            deps,
        })
    }

    fn is_token(&self) -> bool {
        matches!(self.kind, OnChainKind::Token { .. })
    }

    fn gas_limit(&self, options: &FeeOptions) -> u64 {
        match self.kind {
            OnChainKind::Native => options.gas_limit,
            OnChainKind::Token { .. } => options.gas_limit_contract,
        }
    }

    fn target_kind_ok(&self) -> bool {
        let expected = matches!(
            self.target.kind,
            AddressKind::OnChain | AddressKind::Token | AddressKind::Custodial
        );
        expected && AddressValidator::is_valid_evm_address(&self.target.address)
    }

    fn fee_of(&self, tx: &PendingTx) -> CryptoValue {
        tx.fee_selection
            .selected_fee()
            .cloned()
            .unwrap_or_else(|| CryptoValue::zero(self.fee_asset.clone()))
    }

    async fn gather_facts(&self, tx: &PendingTx, full: bool) -> CoreResult<ValidationFacts> {
        let fee_asset_balance = async {
            self.deps
                .ledger
                .balance(&self.fee_asset)
                .await
                .map_err(CoreError::from)
        };
        let target_is_contract = async {
            if !full {
                return Ok(false);
            }
            self.deps
                .ledger
                .is_contract_address(&self.target.address)
                .await
                .map_err(CoreError::from)
        };
        let in_flight = async {
            if !full {
                return Ok(false);
            }
            self.deps
                .ledger
                .has_unconfirmed_transactions()
                .await
                .map_err(CoreError::from)
        };
        let (fee_balance, is_contract, has_tx_in_flight) =
            tokio::try_join!(fee_asset_balance, target_is_contract, in_flight)?;

        Ok(ValidationFacts {
            amount: tx.amount.minor(),
            available: tx.available_balance.minor(),
            fee: tx.fee_amount.minor(),
            fee_asset_balance: fee_balance.minor(),
            min_limit: None,
            max_limit: None,
            target_is_contract: self.is_token() && is_contract,
            target_kind_ok: self.target_kind_ok(),
            has_tx_in_flight,
        })
    }

    fn build_raw_transaction(
        &self,
        tx: &PendingTx,
        nonce: u64,
        from: String,
    ) -> CoreResult<RawTransaction> {
        let level = tx.fee_selection.selected_level();
        let custom = tx.fee_selection.custom_amount();
        let options = self.fee_options_from(tx);
        let gas_price = gwei_to_wei(i128::from(options.rate_for(level, custom)));
        let gas_limit = self.gas_limit(&options);

        Ok(match &self.kind {
            OnChainKind::Native => RawTransaction {
                nonce,
                from,
                to: self.target.address.clone(),
                value: tx.amount.minor(),
                gas_price,
                gas_limit,
                data: Vec::new(),
            },
            OnChainKind::Token { contract } => RawTransaction {
                nonce,
                from,
                to: contract.clone(),
                value: 0,
                gas_price,
                gas_limit,
                data: encode_transfer(&self.target.address, tx.amount.minor())?,
            },
        })
    }

    /// 执行时使用的费用参数，来自 update amount 时缓存的费用表
    fn fee_options_from(&self, tx: &PendingTx) -> FeeOptions {
        let engine_state = &tx.engine_state;
        let read = |key: &str| {
            engine_state
                .get(key)
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or_default()
        };
        FeeOptions {
            gas_limit: read(STATE_GAS_LIMIT),
            gas_limit_contract: read(STATE_GAS_LIMIT_CONTRACT),
            regular_fee: read(STATE_REGULAR_FEE),
            priority_fee: read(STATE_PRIORITY_FEE),
            limits: FeeLimits {
                min: read(STATE_FEE_LIMIT_MIN),
                max: read(STATE_FEE_LIMIT_MAX),
            },
        }
    }
}

const STATE_GAS_LIMIT: &str = "gas_limit";
const STATE_GAS_LIMIT_CONTRACT: &str = "gas_limit_contract";
const STATE_REGULAR_FEE: &str = "regular_fee_gwei";
const STATE_PRIORITY_FEE: &str = "priority_fee_gwei";
const STATE_FEE_LIMIT_MIN: &str = "fee_limit_min_gwei";
const STATE_FEE_LIMIT_MAX: &str = "fee_limit_max_gwei";

/// transfer(to, amount) 调用数据
pub fn encode_transfer(to: &str, amount: i128) -> CoreResult<Vec<u8>> {
    let address = hex::decode(to.trim_start_matches("0x"))
        .map_err(|e| anyhow::anyhow!("invalid transfer recipient {}: {}", to, e))?;
    if address.len() != 20 || amount < 0 {
        return Err(anyhow::anyhow!("invalid transfer arguments: {} {}", to, amount).into());
    }
    let mut data = Vec::with_capacity(4 + 32 + 32);
    data.extend_from_slice(&TRANSFER_SELECTOR);
    data.extend_from_slice(&[0u8; 12]);
    data.extend_from_slice(&address);
    data.extend_from_slice(&[0u8; 16]);
    data.extend_from_slice(&(amount as u128).to_be_bytes());
    Ok(data)
}

#[async_trait]
impl TxEngine for OnChainTxEngine {
    fn source_asset(&self) -> &AssetRef {
        &self.asset
    }

    fn target(&self) -> &ReceiveAddress {
        &self.target
    }

    fn legal_fee_levels(&self) -> BTreeSet<FeeLevel> {
        match self.kind {
            OnChainKind::Native => levels(&[FeeLevel::Regular, FeeLevel::Priority, FeeLevel::Custom]),
            OnChainKind::Token { .. } => levels(&[FeeLevel::Regular, FeeLevel::Priority]),
        }
    }

    fn produces_hashed_result(&self) -> bool {
        true
    }

    async fn do_initialise_tx(&self) -> CoreResult<PendingTx> {
        let preferred = self
            .deps
            .fee_preferences
            .fee_level_for(self.asset.ticker())
            .await;
        let selection = FeeSelection::clamped(
            preferred,
            FeeLevel::Regular,
            self.legal_fee_levels(),
            Some(self.fee_asset.clone()),
        );
        Ok(PendingTx::zero(&self.asset, &self.fee_asset, selection))
    }

    async fn do_update_amount(&self, amount: CryptoValue, tx: PendingTx) -> CoreResult<PendingTx> {
        require_source_currency(&self.asset, &amount)?;

        let (balance, options) = tokio::try_join!(
            async { self.deps.ledger.balance(&self.asset).await.map_err(CoreError::from) },
            async {
                self.deps
                    .fee_source
                    .fee_options(&self.asset)
                    .await
                    .map_err(CoreError::from)
            },
        )?;
        balance.ensure_currency(&self.asset)?;

        let selection = match tx.fee_selection.custom_amount() {
            Some(custom) => {
                let clamped = options.limits.clamp(custom);
                if clamped != custom {
                    tracing::debug!(asset = %self.asset, requested = custom, clamped, "Custom fee clamped to limits");
                }
                tx.fee_selection.clone().with_custom_amount(Some(clamped))
            }
            None => tx.fee_selection,
        };
        let fees = options.fees_for_levels(
            &self.legal_fee_levels(),
            self.gas_limit(&options),
            selection.custom_amount(),
            &self.fee_asset,
        );
        let selection = selection.with_fees(fees);
        let fee = selection
            .selected_fee()
            .cloned()
            .unwrap_or_else(|| CryptoValue::zero(self.fee_asset.clone()));

        let reserved = CryptoValue::new(self.asset.clone(), self.reserved_minimum);
        let mut available = balance.saturating_sub_floor_zero(&reserved)?;
        if !self.is_token() {
            // 原生币：手续费从同一余额支出
            available = available.saturating_sub_floor_zero(&fee)?;
        }

        let mut engine_state = tx.engine_state;
        engine_state.insert(STATE_GAS_LIMIT.into(), options.gas_limit.to_string());
        engine_state.insert(STATE_GAS_LIMIT_CONTRACT.into(), options.gas_limit_contract.to_string());
        engine_state.insert(STATE_REGULAR_FEE.into(), options.regular_fee.to_string());
        engine_state.insert(STATE_PRIORITY_FEE.into(), options.priority_fee.to_string());
        engine_state.insert(STATE_FEE_LIMIT_MIN.into(), options.limits.min.to_string());
        engine_state.insert(STATE_FEE_LIMIT_MAX.into(), options.limits.max.to_string());

        tracing::debug!(
            asset = %self.asset,
            amount = %amount,
            fee = %fee,
            level = %selection.selected_level(),
            "Pending tx amount updated"
        );

        Ok(PendingTx {
            amount,
            total_balance: balance,
            available_balance: available,
            fee_amount: fee.clone(),
            fee_for_full_available: fee,
            fee_selection: selection,
            engine_state,
            ..tx
        })
    }

    async fn do_update_fee_level(
        &self,
        tx: PendingTx,
        level: FeeLevel,
        custom_amount: Option<u64>,
    ) -> CoreResult<PendingTx> {
        let legal = self.legal_fee_levels();
        require_legal_level(&self.asset, &legal, level)?;

        let custom_amount = if level == FeeLevel::Custom { custom_amount } else { None };
        let unchanged = level == tx.fee_selection.selected_level()
            && custom_amount == tx.fee_selection.custom_amount();

        if unchanged {
            // 仅按已缓存费用表重算
            let fee = self.fee_of(&tx);
            return Ok(PendingTx {
                fee_amount: fee.clone(),
                fee_for_full_available: fee,
                ..tx
            });
        }

        self.deps
            .fee_preferences
            .set_fee_level_for(self.asset.ticker(), level)
            .await;

        let selection = tx
            .fee_selection
            .clone()
            .with_selected(self.asset.ticker(), level)?
            .with_custom_amount(custom_amount);
        let amount = tx.amount.clone();
        self.do_update_amount(
            amount,
            PendingTx {
                fee_selection: selection,
                ..tx
            },
        )
        .await
    }

    async fn do_validate_amount(&self, tx: PendingTx) -> CoreResult<PendingTx> {
        let facts = self.gather_facts(&tx, false).await?;
        let state = evaluate(ON_CHAIN_AMOUNT_RULES, &facts);
        Ok(tx.with_validation(state))
    }

    async fn do_validate_all(&self, tx: PendingTx) -> CoreResult<PendingTx> {
        let facts = self.gather_facts(&tx, true).await?;
        let state = evaluate(ON_CHAIN_FULL_RULES, &facts);
        Ok(tx.with_validation(state))
    }

    async fn do_build_confirmations(&self, tx: PendingTx) -> CoreResult<PendingTx> {
        let fiat = self.deps.fiat_currency.as_str();
        let (asset_rate, fee_rate) = tokio::try_join!(
            async {
                self.deps
                    .exchange_rates
                    .fiat_rate(&self.asset, fiat)
                    .await
                    .map_err(CoreError::from)
            },
            async {
                self.deps
                    .exchange_rates
                    .fiat_rate(&self.fee_asset, fiat)
                    .await
                    .map_err(CoreError::from)
            },
        )?;

        let fee = tx.fee_amount.clone();
        let fee_fiat = fee.to_fiat(fee_rate, fiat);
        let (total, total_fiat) = if self.is_token() {
            (tx.amount.clone(), tx.amount.to_fiat(asset_rate, fiat).plus(&fee_fiat))
        } else {
            let total = tx.amount.checked_add(&fee)?;
            let total_fiat = total.to_fiat(asset_rate, fiat);
            (total, total_fiat)
        };

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
                fee_fiat: (!fee.is_zero()).then_some(fee_fiat),
                level: tx.fee_selection.selected_level(),
            },
            TxConfirmationValue::Total {
                total,
                fiat: total_fiat,
            },
            description_of(&tx),
        ];
        Ok(tx.with_confirmations(confirmations))
    }

    async fn do_execute(
        &self,
        tx: &PendingTx,
        second_password: Option<&str>,
    ) -> CoreResult<TxResult> {
        let ledger = &self.deps.ledger;

        let broadcast = async {
            if ledger.requires_second_password() && second_password.is_none() {
                anyhow::bail!("second password required");
            }
            let (nonce, from) = tokio::try_join!(ledger.next_nonce(), ledger.account_address())?;
            let raw = self
                .build_raw_transaction(tx, nonce, from)
                .map_err(anyhow::Error::from)?;
            let signed = self.deps.signer.sign(&raw, second_password).await?;
            ledger.push_transaction(&signed).await
        };

        let tx_hash = broadcast.await.map_err(|e| {
            tracing::error!(asset = %self.asset, error = %e, "Transaction execution failed");
            CoreError::ExecutionFailed
        })?;

        if let Some(note) = tx.note() {
            // 交易已广播，备注失败不影响结果
            if let Err(e) = ledger.put_transaction_note(&tx_hash, note).await {
                tracing::warn!(tx_hash = %tx_hash, error = %e, "Failed to attach transaction note");
            }
        }

        tracing::info!(asset = %self.asset, tx_hash = %tx_hash, "Transaction broadcast");
        Ok(TxResult::Hashed {
            tx_id: tx_hash,
            amount: tx.amount.clone(),
        })
    }
}
