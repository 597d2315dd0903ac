//! 资产元数据
//! 构造后不可变；以大写 ticker 作为唯一键（大小写不敏感）

use std::{
    collections::BTreeSet,
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

use serde::{Deserialize, Serialize};

/// 资产可由哪种账户持有
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetCategory {
    Custodial,
    NonCustodial,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssetInfo {
    ticker: String,
    pub display_ticker: String,
    pub name: String,
    pub precision_dp: u32,
    pub required_confirmations: u32,
    /// 父链 ticker（代币资产）
    pub l2chain: Option<String>,
    /// 父链上的标识（合约地址）
    pub l2identifier: Option<String>,
    pub categories: BTreeSet<AssetCategory>,
}

pub type AssetRef = Arc<AssetInfo>;

impl AssetInfo {
    pub fn new(
        ticker: &str,
        name: &str,
        precision_dp: u32,
        required_confirmations: u32,
        categories: &[AssetCategory],
    ) -> Self {
        Self {
            ticker: ticker.to_uppercase(),
            display_ticker: ticker.to_string(),
            name: name.to_string(),
            precision_dp,
            required_confirmations,
            l2chain: None,
            l2identifier: None,
            categories: categories.iter().copied().collect(),
        }
    }

    /// 父链代币
    pub fn token(
        ticker: &str,
        name: &str,
        precision_dp: u32,
        required_confirmations: u32,
        chain: &str,
        identifier: &str,
        categories: &[AssetCategory],
    ) -> Self {
        Self {
            l2chain: Some(chain.to_uppercase()),
            l2identifier: Some(identifier.to_string()),
            ..Self::new(ticker, name, precision_dp, required_confirmations, categories)
        }
    }

    /// 规范化（大写）ticker
    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn is_custodial(&self) -> bool {
        self.categories.contains(&AssetCategory::Custodial)
    }

    pub fn is_non_custodial(&self) -> bool {
        self.categories.contains(&AssetCategory::NonCustodial)
    }

    pub fn is_custodial_only(&self) -> bool {
        self.categories.len() == 1 && self.is_custodial()
    }

    pub fn is_token_of(&self, chain: &str) -> bool {
        self.l2chain
            .as_deref()
            .map(|c| c.eq_ignore_ascii_case(chain))
            .unwrap_or(false)
    }

    pub fn into_ref(self) -> AssetRef {
        Arc::new(self)
    }
}

impl PartialEq for AssetInfo {
    fn eq(&self, other: &Self) -> bool {
        self.ticker == other.ticker
    }
}

impl Eq for AssetInfo {}

impl Hash for AssetInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ticker.hash(state);
    }
}

impl fmt::Display for AssetInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ticker)
    }
}
