//! 费用模型
//!
//! - `FeeLevel`：封闭集合 {None, Regular, Priority, Custom}
//! - `FeeOptions`：费用协作方返回的单资产费用表（gas limit + gwei 费率）
//! - `FeeSelection`：当前档位 + 合法档位集 + 各档位已计算费用
//!
//! 费用始终以费用资产最小单位整数表示：limit × 费率(gwei) → wei。

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use serde::{Deserialize, Serialize};

use super::{
    asset_info::AssetRef,
    money::{gwei_to_wei, CryptoValue},
};
use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeLevel {
    None,
    Regular,
    Priority,
    Custom,
}

impl FeeLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Regular => "regular",
            Self::Priority => "priority",
            Self::Custom => "custom",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" => Some(Self::None),
            "regular" => Some(Self::Regular),
            "priority" => Some(Self::Priority),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }
}

impl fmt::Display for FeeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 自定义费率上下限（gwei）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeLimits {
    pub min: u64,
    pub max: u64,
}

impl FeeLimits {
    /// 自定义费率钳制到 [min, max]；max 为 0 表示费用源未下发上下限
    pub fn clamp(&self, gwei: u64) -> u64 {
        if self.max == 0 {
            return gwei;
        }
        gwei.clamp(self.min.min(self.max), self.max)
    }
}

/// 单资产费用表
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeOptions {
    /// 原生转账 gas limit
    pub gas_limit: u64,
    /// 合约调用（代币转账）gas limit
    pub gas_limit_contract: u64,
    /// gwei
    pub regular_fee: u64,
    /// gwei
    pub priority_fee: u64,
    pub limits: FeeLimits,
}

impl FeeOptions {
    /// 某档位的费率（gwei）；Custom 未填写时按 Priority 计
    pub fn rate_for(&self, level: FeeLevel, custom_gwei: Option<u64>) -> u64 {
        match level {
            FeeLevel::None => 0,
            FeeLevel::Regular => self.regular_fee,
            FeeLevel::Priority => self.priority_fee,
            FeeLevel::Custom => custom_gwei.unwrap_or(self.priority_fee),
        }
    }

    /// limit × rate，gwei 换算为费用资产最小单位
    pub fn absolute_fee(
        &self,
        level: FeeLevel,
        gas_limit: u64,
        custom_gwei: Option<u64>,
        fee_asset: &AssetRef,
    ) -> CryptoValue {
        let gwei = i128::from(gas_limit).saturating_mul(i128::from(self.rate_for(level, custom_gwei)));
        CryptoValue::new(fee_asset.clone(), gwei_to_wei(gwei))
    }

    /// 所有合法档位的费用
    pub fn fees_for_levels(
        &self,
        levels: &BTreeSet<FeeLevel>,
        gas_limit: u64,
        custom_gwei: Option<u64>,
        fee_asset: &AssetRef,
    ) -> BTreeMap<FeeLevel, CryptoValue> {
        levels
            .iter()
            .map(|level| (*level, self.absolute_fee(*level, gas_limit, custom_gwei, fee_asset)))
            .collect()
    }
}

/// 当前档位始终属于合法档位集（构造与修改均校验）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeSelection {
    selected_level: FeeLevel,
    available_levels: BTreeSet<FeeLevel>,
    fees_for_levels: BTreeMap<FeeLevel, CryptoValue>,
    custom_amount: Option<u64>,
    fee_asset: Option<AssetRef>,
}

impl FeeSelection {
    pub fn new(
        asset: &str,
        selected_level: FeeLevel,
        available_levels: BTreeSet<FeeLevel>,
        fee_asset: Option<AssetRef>,
    ) -> CoreResult<Self> {
        if !available_levels.contains(&selected_level) {
            return Err(CoreError::illegal_fee_level(asset, selected_level));
        }
        Ok(Self {
            selected_level,
            available_levels,
            fees_for_levels: BTreeMap::new(),
            custom_amount: None,
            fee_asset,
        })
    }

    /// 用上次使用的档位初始化；不合法时回退到默认档位（再不合法则取集合首个）
    pub fn clamped(
        preferred: Option<FeeLevel>,
        default_level: FeeLevel,
        available_levels: BTreeSet<FeeLevel>,
        fee_asset: Option<AssetRef>,
    ) -> Self {
        let selected_level = preferred
            .filter(|l| available_levels.contains(l))
            .or_else(|| Some(default_level).filter(|l| available_levels.contains(l)))
            .or_else(|| available_levels.iter().next().copied())
            .unwrap_or(FeeLevel::None);
        let mut available_levels = available_levels;
        available_levels.insert(selected_level);
        Self {
            selected_level,
            available_levels,
            fees_for_levels: BTreeMap::new(),
            custom_amount: None,
            fee_asset,
        }
    }

    pub fn selected_level(&self) -> FeeLevel {
        self.selected_level
    }

    pub fn available_levels(&self) -> &BTreeSet<FeeLevel> {
        &self.available_levels
    }

    pub fn is_legal(&self, level: FeeLevel) -> bool {
        self.available_levels.contains(&level)
    }

    pub fn fees_for_levels(&self) -> &BTreeMap<FeeLevel, CryptoValue> {
        &self.fees_for_levels
    }

    pub fn custom_amount(&self) -> Option<u64> {
        self.custom_amount
    }

    pub fn fee_asset(&self) -> Option<&AssetRef> {
        self.fee_asset.as_ref()
    }

    pub fn selected_fee(&self) -> Option<&CryptoValue> {
        self.fees_for_levels.get(&self.selected_level)
    }

    pub fn with_selected(self, asset: &str, level: FeeLevel) -> CoreResult<Self> {
        if !self.is_legal(level) {
            return Err(CoreError::illegal_fee_level(asset, level));
        }
        Ok(Self {
            selected_level: level,
            ..self
        })
    }

    pub fn with_custom_amount(self, custom_amount: Option<u64>) -> Self {
        Self {
            custom_amount,
            ..self
        }
    }

    pub fn with_fees(self, fees_for_levels: BTreeMap<FeeLevel, CryptoValue>) -> Self {
        Self {
            fees_for_levels,
            ..self
        }
    }
}

pub fn levels(levels: &[FeeLevel]) -> BTreeSet<FeeLevel> {
    levels.iter().copied().collect()
}
