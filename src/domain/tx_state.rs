//! 交易流程状态机
//!
//! UNINITIALISED → AMOUNT_SET → VALIDATED → CONFIRMATIONS_BUILT → EXECUTING → 结果
//! 校验失败进入非终态 VALIDATION_FAILED，用户修正输入后可重新进入流程。

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxFlowState {
    Uninitialised,
    AmountSet,
    Validated,
    ValidationFailed,
    ConfirmationsBuilt,
    Executing,
    HashedResult,
    UnhashedResult,
    /// 执行失败（签名/广播/提交）
    ExecutionFailed,
}

impl TxFlowState {
    /// 终态不可再转换
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::HashedResult | Self::UnhashedResult | Self::ExecutionFailed
        )
    }

    /// 允许修改输入（金额/档位/备注）的状态
    pub fn accepts_input(&self) -> bool {
        matches!(
            self,
            Self::Uninitialised
                | Self::AmountSet
                | Self::Validated
                | Self::ValidationFailed
                | Self::ConfirmationsBuilt
        )
    }

    pub fn can_transition_to(&self, target: &Self) -> bool {
        use TxFlowState::*;

        match (self, target) {
            _ if self.is_terminal() => false,

            // 输入变更：任何可编辑状态都回到 AMOUNT_SET
            (_, AmountSet) => self.accepts_input(),

            // 校验：金额已设置后可反复校验
            (AmountSet | Validated | ValidationFailed | ConfirmationsBuilt, Validated)
            | (AmountSet | Validated | ValidationFailed | ConfirmationsBuilt, ValidationFailed) => {
                true
            }

            (Validated | ConfirmationsBuilt, ConfirmationsBuilt) => true,

            (ConfirmationsBuilt, Executing) => true,

            (Executing, HashedResult | UnhashedResult | ExecutionFailed) => true,

            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialised => "UNINITIALISED",
            Self::AmountSet => "AMOUNT_SET",
            Self::Validated => "VALIDATED",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::ConfirmationsBuilt => "CONFIRMATIONS_BUILT",
            Self::Executing => "EXECUTING",
            Self::HashedResult => "HASHED_RESULT",
            Self::UnhashedResult => "UNHASHED_RESULT",
            Self::ExecutionFailed => "EXECUTION_FAILED",
        }
    }
}

impl fmt::Display for TxFlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
