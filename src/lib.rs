//! Coincore - 多资产钱包核心
//!
//! 资产目录、资产加载、托管/非托管账户与交易引擎

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod service;
pub mod utils;

// 重新导出常用类型
pub use error::{CoreError, CoreResult};

pub mod prelude {
    pub use crate::{
        config::Config,
        domain::{
            AssetInfo, AssetRef, AssetTable, CryptoValue, FeeLevel, PendingTx, ReceiveAddress,
            TxFlowState, TxResult, ValidationState,
        },
        error::{CoreError, CoreResult},
        service::{
            account::CryptoAccount, tx_engine::TxFlow, AssetLoader, CoincoreDeps,
            CoincoreSession, CryptoAsset,
        },
    };
}
