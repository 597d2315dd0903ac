//! 每资产上次使用的手续费档位（会话内存储）

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{domain::fee::FeeLevel, service::sources::FeePreferences};

#[derive(Default)]
pub struct InMemoryFeePreferences {
    levels: RwLock<HashMap<String, FeeLevel>>,
}

impl InMemoryFeePreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FeePreferences for InMemoryFeePreferences {
    async fn fee_level_for(&self, ticker: &str) -> Option<FeeLevel> {
        self.levels.read().await.get(&ticker.to_uppercase()).copied()
    }

    async fn set_fee_level_for(&self, ticker: &str, level: FeeLevel) {
        tracing::debug!(asset = %ticker, level = %level, "Fee level preference saved");
        self.levels.write().await.insert(ticker.to_uppercase(), level);
    }
}
