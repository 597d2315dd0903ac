//! 交易引擎
//!
//! 把（来源账户、目标、金额）转换为已定价、已校验、可确认、可执行的交易。
//! 引擎只做单步计算，步骤顺序与取消由 `flow::TxFlow` 负责。

pub mod flow;
pub mod on_chain;
pub mod trading_withdraw;
pub mod validation;

use std::collections::BTreeSet;

use async_trait::async_trait;

pub use flow::TxFlow;

use crate::{
    domain::{
        asset_info::AssetRef,
        fee::FeeLevel,
        money::CryptoValue,
        pending_tx::{PendingTx, ReceiveAddress, TxConfirmationValue, TxResult},
    },
    error::CoreResult,
};

#[async_trait]
pub trait TxEngine: Send + Sync {
    fn source_asset(&self) -> &AssetRef;

    fn target(&self) -> &ReceiveAddress;

    /// 该资产/交易类型允许的费用档位
    fn legal_fee_levels(&self) -> BTreeSet<FeeLevel>;

    /// 是否产生链上哈希
    fn produces_hashed_result(&self) -> bool;

    async fn do_initialise_tx(&self) -> CoreResult<PendingTx>;

    async fn do_update_amount(&self, amount: CryptoValue, tx: PendingTx) -> CoreResult<PendingTx>;

    async fn do_update_fee_level(
        &self,
        tx: PendingTx,
        level: FeeLevel,
        custom_amount: Option<u64>,
    ) -> CoreResult<PendingTx>;

    async fn do_option_update(
        &self,
        tx: PendingTx,
        option: TxConfirmationValue,
    ) -> CoreResult<PendingTx> {
        Ok(tx.with_option(option))
    }

    async fn do_validate_amount(&self, tx: PendingTx) -> CoreResult<PendingTx>;

    async fn do_validate_all(&self, tx: PendingTx) -> CoreResult<PendingTx>;

    async fn do_build_confirmations(&self, tx: PendingTx) -> CoreResult<PendingTx>;

    async fn do_execute(
        &self,
        tx: &PendingTx,
        second_password: Option<&str>,
    ) -> CoreResult<TxResult>;
}

/// 调用方传入的金额必须与来源资产同币种
pub(crate) fn require_source_currency(engine_asset: &AssetRef, amount: &CryptoValue) -> CoreResult<()> {
    amount.ensure_currency(engine_asset)
}

/// 非法档位是调用方错误
pub(crate) fn require_legal_level(
    asset: &AssetRef,
    legal: &BTreeSet<FeeLevel>,
    level: FeeLevel,
) -> CoreResult<()> {
    if !legal.contains(&level) {
        return Err(crate::error::CoreError::illegal_fee_level(asset.ticker(), level));
    }
    Ok(())
}

/// 当前备注（保留已有的描述条目）
pub(crate) fn description_of(tx: &PendingTx) -> TxConfirmationValue {
    TxConfirmationValue::Description {
        text: tx.note().map(str::to_string),
    }
}
