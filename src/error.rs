//! 统一错误定义
//!
//! 两类失败：
//! - 调用方契约违规（币种不匹配、非法费用档位、资产分区重叠等），属于编程错误，必须中止操作
//! - 执行期失败（签名/广播/提交），统一归一为 `ExecutionFailed`
//!
//! 用户可修正的校验失败不是错误，而是 `PendingTx` 上的 `ValidationState`。

use thiserror::Error;

use crate::domain::{fee::FeeLevel, pending_tx::ValidationState, tx_state::TxFlowState};

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("currency mismatch: expected {expected}, got {actual}")]
    CurrencyMismatch { expected: String, actual: String },

    #[error("fee level {level:?} is not legal for {asset}")]
    IllegalFeeLevel { asset: String, level: FeeLevel },

    #[error("asset partition overlap: {tickers:?} are both tokens and custodial-only")]
    AssetPartitionOverlap { tickers: Vec<String> },

    #[error("unknown asset type for {0}")]
    UnknownAssetType(String),

    #[error("unknown asset: {0}")]
    UnknownAsset(String),

    #[error("asset already loaded: {0}")]
    AssetAlreadyLoaded(String),

    #[error("illegal transaction state transition: {from} -> {to}")]
    IllegalStateTransition { from: TxFlowState, to: TxFlowState },

    #[error("not initialised: {0}")]
    NotInitialised(&'static str),

    #[error("address parse failed: {0}")]
    AddressParse(#[from] AddressParseError),

    /// 执行前的完整复核未通过，交易未广播
    #[error("transaction is not executable: {0:?}")]
    NotExecutable(ValidationState),

    #[error("transaction execution failed")]
    ExecutionFailed,

    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Collaborator(#[from] anyhow::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressParseError {
    #[error("address is a contract and cannot receive a direct token transfer")]
    UnexpectedContractAddress,

    #[error("contract check unavailable: {0}")]
    ContractCheckFailed(String),
}

impl CoreError {
    pub fn currency_mismatch(expected: &str, actual: &str) -> Self {
        Self::CurrencyMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    pub fn illegal_fee_level(asset: &str, level: FeeLevel) -> Self {
        Self::IllegalFeeLevel {
            asset: asset.to_string(),
            level,
        }
    }

    /// 调用方/配置错误，不应向用户展示
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::CurrencyMismatch { .. }
                | Self::IllegalFeeLevel { .. }
                | Self::AssetPartitionOverlap { .. }
                | Self::UnknownAssetType(_)
                | Self::AssetAlreadyLoaded(_)
                | Self::IllegalStateTransition { .. }
                | Self::NotInitialised(_)
        )
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::CurrencyMismatch { .. } => "currency_mismatch",
            Self::IllegalFeeLevel { .. } => "illegal_fee_level",
            Self::AssetPartitionOverlap { .. } => "asset_partition_overlap",
            Self::UnknownAssetType(_) => "unknown_asset_type",
            Self::UnknownAsset(_) => "unknown_asset",
            Self::AssetAlreadyLoaded(_) => "asset_already_loaded",
            Self::IllegalStateTransition { .. } => "illegal_state_transition",
            Self::NotInitialised(_) => "not_initialised",
            Self::AddressParse(_) => "address_parse",
            Self::NotExecutable(_) => "not_executable",
            Self::ExecutionFailed => "execution_failed",
            Self::Cancelled => "cancelled",
            Self::Collaborator(_) => "collaborator",
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
