pub mod activity;
pub mod asset_action;
pub mod asset_info;
pub mod asset_table;
pub mod fee;
pub mod money;
pub mod pending_tx;
pub mod remote_feature;
pub mod tx_state;

pub use asset_info::{AssetCategory, AssetInfo, AssetRef};
pub use asset_table::AssetTable;
pub use fee::{FeeLevel, FeeOptions, FeeSelection};
pub use money::{CryptoValue, FiatValue};
pub use pending_tx::{PendingTx, ReceiveAddress, TxConfirmationValue, TxResult, ValidationState};
pub use remote_feature::RemoteFeature;
pub use tx_state::TxFlowState;
