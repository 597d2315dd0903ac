//! 服务层：资产目录、加载器、账户与交易引擎

pub mod account;
pub mod asset_catalogue;
pub mod asset_loader;
pub mod crypto_asset;
pub mod feature_lookup;
pub mod session;
pub mod sources;
pub mod tx_engine;

pub use asset_catalogue::AssetCatalogue;
pub use asset_loader::{AssetLoader, AssetLoaderSwitcher};
pub use crypto_asset::CryptoAsset;
pub use feature_lookup::AssetFeatureLookup;
pub use session::{ChainBackend, CoincoreDeps, CoincoreSession};
