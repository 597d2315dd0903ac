//! 金额类型
//!
//! 加密资产金额一律以最小单位整数表示（i128），禁止浮点；
//! 法币金额使用 `rust_decimal` 精确计算。

use std::fmt;

use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::asset_info::AssetRef;
use crate::error::{CoreError, CoreResult};

/// 1 gwei = 10^9 wei
pub const WEI_PER_GWEI: i128 = 1_000_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptoValue {
    currency: AssetRef,
    minor: i128,
}

impl CryptoValue {
    pub fn new(currency: AssetRef, minor: i128) -> Self {
        Self { currency, minor }
    }

    pub fn zero(currency: AssetRef) -> Self {
        Self::new(currency, 0)
    }

    /// 从主单位构造，超出精度部分向零截断
    pub fn from_major(currency: AssetRef, major: Decimal) -> CoreResult<Self> {
        let scale = Decimal::from_i128_with_scale(10i128.pow(currency.precision_dp), 0);
        let minor = major
            .checked_mul(scale)
            .ok_or_else(|| anyhow::anyhow!("amount overflow: {} {}", major, currency))?
            .trunc()
            .to_i128()
            .ok_or_else(|| anyhow::anyhow!("amount out of range: {} {}", major, currency))?;
        Ok(Self::new(currency, minor))
    }

    pub fn currency(&self) -> &AssetRef {
        &self.currency
    }

    pub fn ticker(&self) -> &str {
        self.currency.ticker()
    }

    pub fn minor(&self) -> i128 {
        self.minor
    }

    pub fn is_zero(&self) -> bool {
        self.minor == 0
    }

    pub fn is_positive(&self) -> bool {
        self.minor > 0
    }

    pub fn ensure_currency(&self, other: &AssetRef) -> CoreResult<()> {
        if self.currency.ticker() != other.ticker() {
            return Err(CoreError::currency_mismatch(other.ticker(), self.ticker()));
        }
        Ok(())
    }

    pub fn checked_add(&self, other: &CryptoValue) -> CoreResult<CryptoValue> {
        other.ensure_currency(&self.currency)?;
        Ok(Self::new(self.currency.clone(), self.minor.saturating_add(other.minor)))
    }

    pub fn checked_sub(&self, other: &CryptoValue) -> CoreResult<CryptoValue> {
        other.ensure_currency(&self.currency)?;
        Ok(Self::new(self.currency.clone(), self.minor.saturating_sub(other.minor)))
    }

    /// 差值下限为 0
    pub fn saturating_sub_floor_zero(&self, other: &CryptoValue) -> CoreResult<CryptoValue> {
        let diff = self.checked_sub(other)?;
        Ok(Self::new(diff.currency, diff.minor.max(0)))
    }

    /// 主单位表示；精度超过 Decimal 表示能力时返回 None
    pub fn to_major(&self) -> Option<Decimal> {
        Decimal::try_from_i128_with_scale(self.minor, self.currency.precision_dp).ok()
    }

    /// 按汇率换算为法币，保留两位小数
    pub fn to_fiat(&self, rate: Decimal, fiat_currency: &str) -> FiatValue {
        let amount = self
            .to_major()
            .and_then(|major| major.checked_mul(rate))
            .unwrap_or(Decimal::ZERO)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        FiatValue::new(fiat_currency, amount)
    }
}

impl fmt::Display for CryptoValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_major() {
            Some(major) => write!(f, "{} {}", major.normalize(), self.currency.display_ticker),
            None => write!(f, "{} (minor) {}", self.minor, self.currency.display_ticker),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiatValue {
    pub currency_code: String,
    pub amount: Decimal,
}

impl FiatValue {
    pub fn new(currency_code: &str, amount: Decimal) -> Self {
        Self {
            currency_code: currency_code.to_uppercase(),
            amount,
        }
    }

    pub fn zero(currency_code: &str) -> Self {
        Self::new(currency_code, Decimal::ZERO)
    }

    pub fn plus(&self, other: &FiatValue) -> FiatValue {
        Self::new(&self.currency_code, self.amount + other.amount)
    }
}

impl fmt::Display for FiatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency_code)
    }
}

/// gwei → wei
pub fn gwei_to_wei(gwei: i128) -> i128 {
    gwei.saturating_mul(WEI_PER_GWEI)
}
