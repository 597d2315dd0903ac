//! 能力 → 用户可见操作的映射

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::remote_feature::{FeatureSet, RemoteFeature};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetAction {
    ViewActivity,
    Send,
    Receive,
    Buy,
    Sell,
    Swap,
    InterestDeposit,
}

pub type ActionSet = BTreeSet<AssetAction>;

fn action_for(feature: RemoteFeature) -> Option<AssetAction> {
    match feature {
        RemoteFeature::CanSend => Some(AssetAction::Send),
        RemoteFeature::CanReceive => Some(AssetAction::Receive),
        RemoteFeature::CanBuy => Some(AssetAction::Buy),
        RemoteFeature::CanSell => Some(AssetAction::Sell),
        RemoteFeature::CanSwap => Some(AssetAction::Swap),
        _ => None,
    }
}

fn mapped(features: &FeatureSet, allowed: &[RemoteFeature]) -> ActionSet {
    features
        .iter()
        .filter(|f| allowed.contains(f))
        .filter_map(|f| action_for(*f))
        .collect()
}

/// 托管账户：买/卖/兑换/发送/接收受能力控制
pub fn custodial_actions(features: &FeatureSet) -> ActionSet {
    let mut actions = mapped(
        features,
        &[
            RemoteFeature::CanBuy,
            RemoteFeature::CanSell,
            RemoteFeature::CanSwap,
            RemoteFeature::CanSend,
            RemoteFeature::CanReceive,
        ],
    );
    actions.insert(AssetAction::ViewActivity);
    actions.insert(AssetAction::InterestDeposit);
    actions
}

/// 非托管账户：发送/接收始终可用，买/卖/兑换受能力控制
pub fn non_custodial_actions(features: &FeatureSet) -> ActionSet {
    let mut actions = mapped(
        features,
        &[RemoteFeature::CanBuy, RemoteFeature::CanSell, RemoteFeature::CanSwap],
    );
    actions.extend([
        AssetAction::ViewActivity,
        AssetAction::InterestDeposit,
        AssetAction::Send,
        AssetAction::Receive,
    ]);
    actions
}
