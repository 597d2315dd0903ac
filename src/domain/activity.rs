//! 账户活动记录

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::money::CryptoValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionDirection {
    Sent,
    Received,
    Transferred,
    Buy,
    Sell,
    Swap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivitySource {
    OnChain,
    Custodial,
    Trade,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityItem {
    pub tx_id: String,
    pub value: CryptoValue,
    pub fee: Option<CryptoValue>,
    pub direction: TransactionDirection,
    pub timestamp: DateTime<Utc>,
    pub confirmations: u32,
    pub source: ActivitySource,
    /// 兑换单的入金交易哈希，用于与链上 SENT 记录对账
    pub deposit_tx_hash: Option<String>,
}

impl ActivityItem {
    pub fn is_pending(&self, required_confirmations: u32) -> bool {
        self.source == ActivitySource::OnChain && self.confirmations < required_confirmations
    }
}

/// 按时间倒序
pub fn sort_newest_first(items: &mut [ActivityItem]) {
    items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}
