//! 有序校验链
//!
//! 每条规则是纯谓词 + 失败码，按顺序求值，第一个失败的规则决定结果。
//! I/O 在求值前完成（收集为 `ValidationFacts`），规则本身不做 I/O。

use crate::domain::pending_tx::ValidationState;

/// 校验所需的全部事实（最小单位整数）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationFacts {
    pub amount: i128,
    pub available: i128,
    pub fee: i128,
    pub fee_asset_balance: i128,
    pub min_limit: Option<i128>,
    pub max_limit: Option<i128>,
    pub target_is_contract: bool,
    pub target_kind_ok: bool,
    pub has_tx_in_flight: bool,
}

#[derive(Clone, Copy)]
pub struct ValidationRule {
    pub name: &'static str,
    pub passes: fn(&ValidationFacts) -> bool,
    pub failure: ValidationState,
}

impl std::fmt::Debug for ValidationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationRule")
            .field("name", &self.name)
            .field("failure", &self.failure)
            .finish()
    }
}

pub const AMOUNT_POSITIVE: ValidationRule = ValidationRule {
    name: "amount_positive",
    passes: |f| f.amount > 0,
    failure: ValidationState::InvalidAmount,
};

pub const SUFFICIENT_FUNDS: ValidationRule = ValidationRule {
    name: "sufficient_funds",
    passes: |f| f.amount <= f.available,
    failure: ValidationState::InsufficientFunds,
};

pub const SUFFICIENT_FEE_BALANCE: ValidationRule = ValidationRule {
    name: "sufficient_fee_balance",
    passes: |f| f.fee <= f.fee_asset_balance,
    failure: ValidationState::InsufficientGas,
};

pub const ABOVE_MIN_LIMIT: ValidationRule = ValidationRule {
    name: "above_min_limit",
    passes: |f| f.min_limit.map_or(true, |min| f.amount >= min),
    failure: ValidationState::UnderMinLimit,
};

pub const BELOW_MAX_LIMIT: ValidationRule = ValidationRule {
    name: "below_max_limit",
    passes: |f| f.max_limit.map_or(true, |max| f.amount <= max),
    failure: ValidationState::OverMaxLimit,
};

pub const VALID_TARGET: ValidationRule = ValidationRule {
    name: "valid_target",
    passes: |f| f.target_kind_ok && !f.target_is_contract,
    failure: ValidationState::InvalidAddress,
};

pub const NO_TX_IN_FLIGHT: ValidationRule = ValidationRule {
    name: "no_tx_in_flight",
    passes: |f| !f.has_tx_in_flight,
    failure: ValidationState::HasTxInFlight,
};

pub const ON_CHAIN_AMOUNT_RULES: &[ValidationRule] =
    &[AMOUNT_POSITIVE, SUFFICIENT_FUNDS, SUFFICIENT_FEE_BALANCE];

pub const ON_CHAIN_FULL_RULES: &[ValidationRule] = &[
    AMOUNT_POSITIVE,
    SUFFICIENT_FUNDS,
    SUFFICIENT_FEE_BALANCE,
    VALID_TARGET,
    NO_TX_IN_FLIGHT,
];

pub const TRADING_AMOUNT_RULES: &[ValidationRule] = &[
    AMOUNT_POSITIVE,
    SUFFICIENT_FUNDS,
    ABOVE_MIN_LIMIT,
    BELOW_MAX_LIMIT,
];

pub const TRADING_FULL_RULES: &[ValidationRule] = &[
    AMOUNT_POSITIVE,
    SUFFICIENT_FUNDS,
    ABOVE_MIN_LIMIT,
    BELOW_MAX_LIMIT,
    VALID_TARGET,
];

/// 第一个失败的规则决定结果；全部通过为 CAN_EXECUTE
pub fn evaluate(rules: &[ValidationRule], facts: &ValidationFacts) -> ValidationState {
    rules
        .iter()
        .find(|rule| !(rule.passes)(facts))
        .map(|rule| {
            tracing::debug!(rule = rule.name, failure = %rule.failure, "Validation failed");
            rule.failure
        })
        .unwrap_or(ValidationState::CanExecute)
}
