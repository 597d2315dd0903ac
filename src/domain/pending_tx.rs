//! 待执行交易
//!
//! `PendingTx` 作为不可变值在引擎各步骤间传递，每一步都产出新的副本。

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

use super::{
    asset_info::AssetRef,
    fee::{FeeLevel, FeeSelection},
    money::{CryptoValue, FiatValue},
};

/// 用户可修正的校验结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationState {
    Uninitialised,
    CanExecute,
    InvalidAmount,
    InsufficientFunds,
    InsufficientGas,
    InvalidAddress,
    HasTxInFlight,
    UnderMinLimit,
    OverMaxLimit,
    UnknownError,
}

impl ValidationState {
    pub fn is_failure(&self) -> bool {
        !matches!(self, Self::Uninitialised | Self::CanExecute)
    }
}

impl fmt::Display for ValidationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Uninitialised => "UNINITIALISED",
            Self::CanExecute => "CAN_EXECUTE",
            Self::InvalidAmount => "INVALID_AMOUNT",
            Self::InsufficientFunds => "INSUFFICIENT_FUNDS",
            Self::InsufficientGas => "INSUFFICIENT_GAS",
            Self::InvalidAddress => "INVALID_ADDRESS",
            Self::HasTxInFlight => "HAS_TX_IN_FLIGHT",
            Self::UnderMinLimit => "UNDER_MIN_LIMIT",
            Self::OverMaxLimit => "OVER_MAX_LIMIT",
            Self::UnknownError => "UNKNOWN_ERROR",
        };
        f.write_str(s)
    }
}

/// 收款地址的种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressKind {
    /// 账户模型链上的原生地址
    OnChain,
    /// 账户模型链上的代币收款地址
    Token,
    /// 托管账户入金地址
    Custodial,
    /// 托管资产的外部提现地址
    External,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveAddress {
    pub asset: AssetRef,
    pub address: String,
    pub label: String,
    pub kind: AddressKind,
}

impl ReceiveAddress {
    pub fn new(asset: AssetRef, address: &str, label: &str, kind: AddressKind) -> Self {
        Self {
            asset,
            address: address.to_string(),
            label: label.to_string(),
            kind,
        }
    }
}

/// 确认页条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxConfirmationValue {
    From {
        source_label: String,
        asset: AssetRef,
    },
    To {
        address: String,
        label: String,
    },
    CompoundNetworkFee {
        fee: Option<CryptoValue>,
        fee_fiat: Option<FiatValue>,
        level: FeeLevel,
    },
    Total {
        total: CryptoValue,
        fiat: FiatValue,
    },
    Description {
        text: Option<String>,
    },
}

impl TxConfirmationValue {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::From { .. } => "from",
            Self::To { .. } => "to",
            Self::CompoundNetworkFee { .. } => "network_fee",
            Self::Total { .. } => "total",
            Self::Description { .. } => "description",
        }
    }
}

/// 终态结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxResult {
    /// 已广播，带链上哈希
    Hashed { tx_id: String, amount: CryptoValue },
    /// 托管/内部划转
    UnHashed { amount: CryptoValue },
}

impl TxResult {
    pub fn amount(&self) -> &CryptoValue {
        match self {
            Self::Hashed { amount, .. } | Self::UnHashed { amount } => amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTx {
    pub amount: CryptoValue,
    pub total_balance: CryptoValue,
    pub available_balance: CryptoValue,
    pub fee_amount: CryptoValue,
    pub fee_for_full_available: CryptoValue,
    pub fee_selection: FeeSelection,
    pub confirmations: Vec<TxConfirmationValue>,
    pub validation_state: ValidationState,
    pub min_limit: Option<CryptoValue>,
    pub max_limit: Option<CryptoValue>,
    /// 引擎私有扩展（例如链上备注）
    pub engine_state: BTreeMap<String, String>,
}

impl PendingTx {
    /// 零金额初始交易
    pub fn zero(asset: &AssetRef, fee_asset: &AssetRef, fee_selection: FeeSelection) -> Self {
        Self {
            amount: CryptoValue::zero(asset.clone()),
            total_balance: CryptoValue::zero(asset.clone()),
            available_balance: CryptoValue::zero(asset.clone()),
            fee_amount: CryptoValue::zero(fee_asset.clone()),
            fee_for_full_available: CryptoValue::zero(fee_asset.clone()),
            fee_selection,
            confirmations: Vec::new(),
            validation_state: ValidationState::Uninitialised,
            min_limit: None,
            max_limit: None,
            engine_state: BTreeMap::new(),
        }
    }

    pub fn with_validation(self, validation_state: ValidationState) -> Self {
        Self {
            validation_state,
            ..self
        }
    }

    pub fn with_confirmations(self, confirmations: Vec<TxConfirmationValue>) -> Self {
        Self {
            confirmations,
            ..self
        }
    }

    pub fn confirmation(&self, kind: &str) -> Option<&TxConfirmationValue> {
        self.confirmations.iter().find(|c| c.kind() == kind)
    }

    /// 替换同类条目，不存在时追加
    pub fn with_option(mut self, option: TxConfirmationValue) -> Self {
        match self.confirmations.iter().position(|c| c.kind() == option.kind()) {
            Some(idx) => self.confirmations[idx] = option,
            None => self.confirmations.push(option),
        }
        self
    }

    /// 用户备注
    pub fn note(&self) -> Option<&str> {
        match self.confirmation("description") {
            Some(TxConfirmationValue::Description { text }) => {
                text.as_deref().filter(|t| !t.trim().is_empty())
            }
            _ => None,
        }
    }
}
