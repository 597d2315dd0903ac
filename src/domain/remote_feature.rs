//! 远程能力标志
//!
//! 远程配置下发的是字符串列表，每个字符串要么是原子能力，要么是多标志简写。
//! 展开为原子能力集的过程是纯函数，不涉及 I/O。

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemoteFeature {
    Balance,
    CanSend,
    CanReceive,
    CanBuy,
    CanSell,
    CanSwap,
    // 简写
    FullSupport,
    SendReceive,
    Brokerage,
    CanBuySell,
}

pub type FeatureSet = BTreeSet<RemoteFeature>;

impl RemoteFeature {
    pub const ATOMIC: [RemoteFeature; 6] = [
        Self::Balance,
        Self::CanSend,
        Self::CanReceive,
        Self::CanBuy,
        Self::CanSell,
        Self::CanSwap,
    ];

    /// 大小写不敏感解析，未知名称返回 None
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_uppercase().as_str() {
            "BALANCE" => Some(Self::Balance),
            "CAN_SEND" => Some(Self::CanSend),
            "CAN_RECEIVE" => Some(Self::CanReceive),
            "CAN_BUY" => Some(Self::CanBuy),
            "CAN_SELL" => Some(Self::CanSell),
            "CAN_SWAP" => Some(Self::CanSwap),
            "FULL_SUPPORT" => Some(Self::FullSupport),
            "SEND_RECEIVE" => Some(Self::SendReceive),
            "BROKERAGE" => Some(Self::Brokerage),
            "CAN_BUY_SELL" => Some(Self::CanBuySell),
            _ => None,
        }
    }

    pub fn is_shorthand(&self) -> bool {
        matches!(
            self,
            Self::FullSupport | Self::SendReceive | Self::Brokerage | Self::CanBuySell
        )
    }

    /// 单个标志展开为原子能力
    pub fn expand(&self) -> &'static [RemoteFeature] {
        use RemoteFeature::*;
        match self {
            FullSupport => &[CanSend, CanReceive, CanBuy, CanSell, CanSwap],
            SendReceive => &[CanSend, CanReceive],
            Brokerage => &[CanBuy, CanSell, CanSwap],
            CanBuySell => &[CanBuy, CanSell],
            Balance => &[Balance],
            CanSend => &[CanSend],
            CanReceive => &[CanReceive],
            CanBuy => &[CanBuy],
            CanSell => &[CanSell],
            CanSwap => &[CanSwap],
        }
    }
}

/// 展开一组标志，结果只含原子能力
pub fn expand_features<'a, I>(features: I) -> FeatureSet
where
    I: IntoIterator<Item = &'a RemoteFeature>,
{
    features
        .into_iter()
        .flat_map(|f| f.expand().iter().copied())
        .collect()
}

/// 解析远程字符串列表：忽略未知名称，展开简写，并始终附带余额可见
pub fn parse_feature_list<S: AsRef<str>>(names: &[S]) -> FeatureSet {
    let parsed: Vec<RemoteFeature> = names
        .iter()
        .filter_map(|n| RemoteFeature::parse(n.as_ref()))
        .collect();
    let mut set = expand_features(&parsed);
    set.insert(RemoteFeature::Balance);
    set
}

/// 固定/静态资产的完整能力集
pub fn full_support() -> FeatureSet {
    RemoteFeature::ATOMIC.iter().copied().collect()
}
