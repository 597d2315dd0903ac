//! 内置资产表
//!
//! 启动时构造一次的不可变注册表，通过构造参数注入到目录与加载器中，
//! 不依赖全局单例。

use super::asset_info::{AssetCategory, AssetInfo, AssetRef};

const CUSTODIAL: &[AssetCategory] = &[AssetCategory::Custodial];
const BOTH: &[AssetCategory] = &[AssetCategory::Custodial, AssetCategory::NonCustodial];

/// 资产表：固定 L1 资产、静态附加代币、受远程开关控制的动态资产
#[derive(Debug, Clone)]
pub struct AssetTable {
    fixed: Vec<AssetRef>,
    static_extras: Vec<AssetRef>,
    dynamic: Vec<AssetRef>,
}

impl AssetTable {
    pub fn new(fixed: Vec<AssetInfo>, static_extras: Vec<AssetInfo>, dynamic: Vec<AssetInfo>) -> Self {
        Self {
            fixed: fixed.into_iter().map(AssetInfo::into_ref).collect(),
            static_extras: static_extras.into_iter().map(AssetInfo::into_ref).collect(),
            dynamic: dynamic.into_iter().map(AssetInfo::into_ref).collect(),
        }
    }

    /// 生产环境默认资产表
    pub fn builtin() -> Self {
        Self::new(builtin_fixed(), builtin_static_extras(), builtin_dynamic())
    }

    /// 非托管 L1 资产（钱包可直接派生）
    pub fn fixed(&self) -> &[AssetRef] {
        &self.fixed
    }

    pub fn static_extras(&self) -> &[AssetRef] {
        &self.static_extras
    }

    pub fn dynamic(&self) -> &[AssetRef] {
        &self.dynamic
    }

    /// 固定资产 + 静态附加资产，始终拥有完整能力集
    pub fn non_dynamic(&self) -> impl Iterator<Item = &AssetRef> {
        self.fixed.iter().chain(self.static_extras.iter())
    }

    pub fn is_non_dynamic(&self, ticker: &str) -> bool {
        self.non_dynamic().any(|a| a.ticker().eq_ignore_ascii_case(ticker))
    }
}

impl Default for AssetTable {
    fn default() -> Self {
        Self::builtin()
    }
}

fn builtin_fixed() -> Vec<AssetInfo> {
    vec![
        AssetInfo::new("BTC", "Bitcoin", 8, 3, BOTH),
        AssetInfo::new("BCH", "Bitcoin Cash", 8, 3, BOTH),
        AssetInfo::new("ETH", "Ethereum", 18, 12, BOTH),
        AssetInfo::new("XLM", "Stellar", 7, 1, BOTH),
    ]
}

fn erc20(ticker: &str, name: &str, precision_dp: u32, contract: &str) -> AssetInfo {
    AssetInfo::token(ticker, name, precision_dp, 12, "ETH", contract, BOTH)
}

fn builtin_static_extras() -> Vec<AssetInfo> {
    vec![
        erc20("PAX", "Paxos Standard", 18, "0x8E870D67F660D95d5be530380D0eC0bd388289E1"),
        erc20("USDT", "Tether", 6, "0xdAC17F958D2ee523a2206206994597C13D831ec7"),
        erc20("AAVE", "Aave", 18, "0x7Fc66500c84A76Ad7e9c93437bFc5Ac33E2DDaE9"),
        erc20("YFI", "Yearn Finance", 18, "0x0bc529c00C6401aEF6D220BE8C6Ea1667F6Ad93e"),
        erc20("WDGLD", "Wrapped-DGLD", 8, "0x123151402076fc819B7564510989e475c9cD93CA"),
    ]
}

fn builtin_dynamic() -> Vec<AssetInfo> {
    vec![
        AssetInfo::new("ALGO", "Algorand", 6, 12, CUSTODIAL),
        AssetInfo::new("DOT", "Polkadot", 10, 12, CUSTODIAL),
        AssetInfo::new("DOGE", "Dogecoin", 8, 12, CUSTODIAL),
        AssetInfo::new("CLOUT", "BitClout", 9, 12, CUSTODIAL),
        AssetInfo::new("LTC", "Litecoin", 8, 12, CUSTODIAL),
        AssetInfo::new("ETC", "Ethereum Classic", 8, 18, CUSTODIAL),
        AssetInfo::new("XTZ", "Tezos", 6, 12, CUSTODIAL),
        AssetInfo::new("STX", "Stacks", 6, 12, CUSTODIAL),
        AssetInfo::new("MOB", "Mobile Coin", 12, 12, CUSTODIAL),
        AssetInfo::new("THETA", "Theta Network", 18, 12, CUSTODIAL),
        AssetInfo::new("NEAR", "Near Protocol", 24, 12, CUSTODIAL),
        AssetInfo::new("EOS", "EOS", 4, 12, CUSTODIAL),
        erc20("OGN", "Origin Token", 18, "0x8207c1FfC5B6804F6024322CcF34F29c3541Ae26"),
        erc20("ENJ", "Enjin Coin", 18, "0xF629cBd94d3791C9250152BD8dfBDF380E2a3B9c"),
        erc20("COMP", "Compound", 18, "0xc00e94Cb662C3520282E6f5717214004A7f26888"),
        erc20("LINK", "Chainlink", 18, "0x514910771AF9Ca656af840dff83E8264EcF986CA"),
        erc20("TBTC", "tBTC", 18, "0x8dAEBADE922dF735c38C80C7eBD708Af50815fAa"),
        erc20("WBTC", "Wrapped Bitcoin", 8, "0x2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599"),
        erc20("SNX", "Synthetix Network", 18, "0xC011a73ee8576Fb46F5E1c5751cA3B9Fe0af2a6F"),
        erc20("SUSHI", "Sushi Swap", 18, "0x6B3595068778DD592e39A122f4f5a5cF09C90fE2"),
        erc20("ZRX", "ZRX", 18, "0xE41d2489571d322189246DaFA5ebDe1F4699F498"),
        erc20("USDC", "USD Coin", 6, "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
        erc20("UNI", "Uniswap", 18, "0x1f9840a85d5aF5bf1D1762F925BDADdC4201F984"),
        erc20("DAI", "Multi-collateral DAI", 18, "0x6B175474E89094C44Da98b954EedeAC495271d0F"),
        erc20("BAT", "Basic Attention Token", 18, "0x0D8775F648430679A709E98d2b0Cb6250d2887EF"),
    ]
}
