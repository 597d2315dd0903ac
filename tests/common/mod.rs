//! 集成测试共享的模拟协作方
#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use coincore::{
    config::Config,
    domain::{
        activity::{ActivityItem, ActivitySource, TransactionDirection},
        asset_info::{AssetCategory, AssetInfo, AssetRef},
        fee::{FeeLimits, FeeOptions},
        money::CryptoValue,
        AssetTable,
    },
    infrastructure::InMemoryFeePreferences,
    service::{
        sources::{
            ActiveAssetSource, CrashLogger, CustodialWalletManager, ExchangeRates, FeeDataSource,
            OnChainLedger, RawTransaction, RemoteConfig, SignedTransaction, TradingBalance,
            TradingBalanceSource, TransactionSigner, WithdrawFeeAndLimit,
        },
        tx_engine::on_chain::OnChainEngineDeps,
        ChainBackend, CoincoreDeps,
    },
    utils::address_validator::DEFAULT_CUSTODIAL_ADDRESS_PATTERN,
};
use rust_decimal::Decimal;

pub const BOTH: &[AssetCategory] = &[AssetCategory::Custodial, AssetCategory::NonCustodial];
pub const CUSTODIAL: &[AssetCategory] = &[AssetCategory::Custodial];

pub const USER_ADDRESS: &str = "0x1111111111111111111111111111111111111111";
pub const RECIPIENT: &str = "0x2222222222222222222222222222222222222222";
pub const CONTRACT: &str = "0xdac17f958d2ee523a2206206994597c13d831ec7";
pub const USDC_CONTRACT: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";

pub const ETH_WEI: i128 = 1_000_000_000_000_000_000;

pub fn eth() -> AssetRef {
    AssetInfo::new("ETH", "Ethereum", 18, 12, BOTH).into_ref()
}

pub fn btc() -> AssetRef {
    AssetInfo::new("BTC", "Bitcoin", 8, 3, BOTH).into_ref()
}

pub fn usdc() -> AssetRef {
    AssetInfo::token("USDC", "USD Coin", 6, 12, "ETH", USDC_CONTRACT, BOTH).into_ref()
}

pub fn dai() -> AssetRef {
    AssetInfo::token(
        "DAI",
        "Multi-collateral DAI",
        18,
        12,
        "ETH",
        "0x6b175474e89094c44da98b954eedeac495271d0f",
        BOTH,
    )
    .into_ref()
}

pub fn dot() -> AssetRef {
    AssetInfo::new("DOT", "Polkadot", 10, 12, CUSTODIAL).into_ref()
}

pub fn info(asset: &AssetRef) -> AssetInfo {
    (**asset).clone()
}

/// 测试用资产表：ETH/BTC 固定，USDC/DAI/DOT/ALGO 动态
pub fn test_table() -> AssetTable {
    AssetTable::new(
        vec![info(&eth()), info(&btc())],
        vec![],
        vec![
            info(&usdc()),
            info(&dai()),
            info(&dot()),
            AssetInfo::new("ALGO", "Algorand", 6, 12, CUSTODIAL),
        ],
    )
}

pub const FULL_FEATURES_JSON: &str = r#"{
    "USDC": ["FULL_SUPPORT"],
    "DAI": ["SEND_RECEIVE", "CAN_SWAP"],
    "DOT": ["BROKERAGE"],
    "ALGO": ["CAN_BUY_SELL"]
}"#;

pub fn test_config(dynamic: bool) -> Config {
    let mut config = Config::default();
    config.features.enable_dynamic_asset_loading = dynamic;
    config.display.fiat_currency = "USD".into();
    config.remote_config.url = None;
    config.remote_config.features_key = "custodial_only_tokens".into();
    config.address.custodial_address_pattern = DEFAULT_CUSTODIAL_ADDRESS_PATTERN.into();
    config
}

pub fn activity(tx_id: &str, value: CryptoValue, direction: TransactionDirection, secs: i64) -> ActivityItem {
    ActivityItem {
        tx_id: tx_id.to_string(),
        value,
        fee: None,
        direction,
        timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
        confirmations: 12,
        source: ActivitySource::OnChain,
        deposit_tx_hash: None,
    }
}

// ---------------------------------------------------------------- remote config

pub struct MockRemoteConfig {
    json: Option<String>,
    pub calls: AtomicUsize,
}

impl MockRemoteConfig {
    pub fn with_json(json: &str) -> Self {
        Self {
            json: Some(json.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            json: None,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl RemoteConfig for MockRemoteConfig {
    async fn raw_json(&self, _key: &str) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.json
            .clone()
            .ok_or_else(|| anyhow::anyhow!("remote config unreachable"))
    }
}

// ---------------------------------------------------------------- active sources

pub struct MockActiveSource {
    name: String,
    tickers: Option<HashSet<String>>,
}

impl MockActiveSource {
    pub fn new(name: &str, tickers: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            tickers: Some(tickers.iter().map(|t| t.to_string()).collect()),
        }
    }

    pub fn failing(name: &str) -> Self {
        Self {
            name: name.to_string(),
            tickers: None,
        }
    }
}

#[async_trait]
impl ActiveAssetSource for MockActiveSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn active_assets(&self) -> anyhow::Result<HashSet<String>> {
        self.tickers
            .clone()
            .ok_or_else(|| anyhow::anyhow!("{} unavailable", self.name))
    }
}

// ---------------------------------------------------------------- custodial

#[derive(Default)]
pub struct MockTradingBalances {
    balances: Mutex<HashMap<String, (i128, i128)>>,
}

impl MockTradingBalances {
    pub fn set(&self, ticker: &str, total: i128, actionable: i128) {
        self.balances
            .lock()
            .unwrap()
            .insert(ticker.to_string(), (total, actionable));
    }
}

#[async_trait]
impl TradingBalanceSource for MockTradingBalances {
    async fn balance_for(&self, asset: &AssetInfo) -> anyhow::Result<TradingBalance> {
        let (total, actionable) = self
            .balances
            .lock()
            .unwrap()
            .get(asset.ticker())
            .copied()
            .unwrap_or((0, 0));
        let currency = Arc::new(asset.clone());
        Ok(TradingBalance {
            total: CryptoValue::new(currency.clone(), total),
            actionable: CryptoValue::new(currency.clone(), actionable),
            pending: CryptoValue::new(currency, total - actionable),
        })
    }
}

pub struct MockCustodialWallet {
    pub withdraw_fee: i128,
    pub min_limit: i128,
    pub fail_withdraw: AtomicBool,
    pub withdrawals: Mutex<Vec<(String, i128, String)>>,
    pub trades: Mutex<Vec<ActivityItem>>,
}

impl Default for MockCustodialWallet {
    fn default() -> Self {
        Self {
            withdraw_fee: 1_000,
            min_limit: 10_000,
            fail_withdraw: AtomicBool::new(false),
            withdrawals: Mutex::new(Vec::new()),
            trades: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl CustodialWalletManager for MockCustodialWallet {
    async fn receive_address(&self, asset: &AssetInfo) -> anyhow::Result<String> {
        Ok(format!("custodial-{}-deposit-address", asset.ticker().to_lowercase()))
    }

    async fn custodial_activity(&self, _asset: &AssetInfo) -> anyhow::Result<Vec<ActivityItem>> {
        Ok(Vec::new())
    }

    async fn trade_activity(&self, asset: &AssetInfo) -> anyhow::Result<Vec<ActivityItem>> {
        Ok(self
            .trades
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.value.ticker() == asset.ticker())
            .cloned()
            .collect())
    }

    async fn withdraw_fee_and_min_limit(&self, asset: &AssetInfo) -> anyhow::Result<WithdrawFeeAndLimit> {
        let currency = Arc::new(asset.clone());
        Ok(WithdrawFeeAndLimit {
            fee: CryptoValue::new(currency.clone(), self.withdraw_fee),
            min_limit: CryptoValue::new(currency, self.min_limit),
        })
    }

    async fn withdraw(&self, amount: &CryptoValue, address: &str) -> anyhow::Result<()> {
        if self.fail_withdraw.load(Ordering::SeqCst) {
            anyhow::bail!("custodial backend rejected withdrawal");
        }
        self.withdrawals.lock().unwrap().push((
            amount.ticker().to_string(),
            amount.minor(),
            address.to_string(),
        ));
        Ok(())
    }
}

// ---------------------------------------------------------------- on-chain

pub struct MockLedger {
    chain: String,
    balances: Mutex<HashMap<String, i128>>,
    history: Mutex<Vec<ActivityItem>>,
    contracts: HashSet<String>,
    pub in_flight: AtomicBool,
    pub fail_init: AtomicBool,
    pub fail_push: AtomicBool,
    pub second_password: AtomicBool,
    pub balance_delay: Mutex<Option<Duration>>,
    pub init_calls: AtomicUsize,
    pub balance_calls: AtomicUsize,
    pub pushed: Mutex<Vec<SignedTransaction>>,
    pub notes: Mutex<Vec<(String, String)>>,
}

impl MockLedger {
    pub fn new(chain: &str) -> Self {
        Self {
            chain: chain.to_string(),
            balances: Mutex::new(HashMap::new()),
            history: Mutex::new(Vec::new()),
            contracts: HashSet::from([CONTRACT.to_string()]),
            in_flight: AtomicBool::new(false),
            fail_init: AtomicBool::new(false),
            fail_push: AtomicBool::new(false),
            second_password: AtomicBool::new(false),
            balance_delay: Mutex::new(None),
            init_calls: AtomicUsize::new(0),
            balance_calls: AtomicUsize::new(0),
            pushed: Mutex::new(Vec::new()),
            notes: Mutex::new(Vec::new()),
        }
    }

    pub fn set_balance(&self, ticker: &str, minor: i128) {
        self.balances
            .lock()
            .unwrap()
            .insert(ticker.to_string(), minor);
    }

    pub fn push_history(&self, item: ActivityItem) {
        self.history.lock().unwrap().push(item);
    }

    pub fn set_balance_delay(&self, delay: Option<Duration>) {
        *self.balance_delay.lock().unwrap() = delay;
    }
}

#[async_trait]
impl OnChainLedger for MockLedger {
    fn chain(&self) -> &str {
        &self.chain
    }

    async fn init_wallet(&self) -> anyhow::Result<()> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_init.load(Ordering::SeqCst) {
            anyhow::bail!("{} wallet derivation failed", self.chain);
        }
        Ok(())
    }

    async fn account_address(&self) -> anyhow::Result<String> {
        Ok(USER_ADDRESS.to_string())
    }

    async fn balance(&self, asset: &AssetInfo) -> anyhow::Result<CryptoValue> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.balance_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let minor = self
            .balances
            .lock()
            .unwrap()
            .get(asset.ticker())
            .copied()
            .unwrap_or(0);
        Ok(CryptoValue::new(Arc::new(asset.clone()), minor))
    }

    async fn transaction_history(&self, asset: &AssetInfo) -> anyhow::Result<Vec<ActivityItem>> {
        Ok(self
            .history
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.value.ticker() == asset.ticker())
            .cloned()
            .collect())
    }

    async fn has_unconfirmed_transactions(&self) -> anyhow::Result<bool> {
        Ok(self.in_flight.load(Ordering::SeqCst))
    }

    async fn is_contract_address(&self, address: &str) -> anyhow::Result<bool> {
        Ok(self.contracts.contains(&address.to_lowercase()))
    }

    async fn next_nonce(&self) -> anyhow::Result<u64> {
        Ok(self.pushed.lock().unwrap().len() as u64)
    }

    async fn push_transaction(&self, signed: &SignedTransaction) -> anyhow::Result<String> {
        if self.fail_push.load(Ordering::SeqCst) {
            anyhow::bail!("node rejected transaction: nonce too low");
        }
        let mut pushed = self.pushed.lock().unwrap();
        pushed.push(signed.clone());
        Ok(format!("0x{:064x}", pushed.len()))
    }

    async fn put_transaction_note(&self, tx_hash: &str, note: &str) -> anyhow::Result<()> {
        self.notes
            .lock()
            .unwrap()
            .push((tx_hash.to_string(), note.to_string()));
        Ok(())
    }

    fn requires_second_password(&self) -> bool {
        self.second_password.load(Ordering::SeqCst)
    }
}

/// 记录待签名交易，返回其调试表示作为“签名”
#[derive(Default)]
pub struct MockSigner {
    pub signed: Mutex<Vec<RawTransaction>>,
}

#[async_trait]
impl TransactionSigner for MockSigner {
    async fn sign(
        &self,
        raw: &RawTransaction,
        _second_password: Option<&str>,
    ) -> anyhow::Result<SignedTransaction> {
        self.signed.lock().unwrap().push(raw.clone());
        Ok(SignedTransaction {
            raw: format!("{:?}", raw).into_bytes(),
        })
    }
}

pub struct MockFeeSource {
    pub options: FeeOptions,
    pub calls: AtomicUsize,
}

impl Default for MockFeeSource {
    fn default() -> Self {
        Self {
            options: FeeOptions {
                gas_limit: 21_000,
                gas_limit_contract: 5_000,
                regular_fee: 2,
                priority_fee: 5,
                limits: FeeLimits { min: 1, max: 500 },
            },
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl FeeDataSource for MockFeeSource {
    async fn fee_options(&self, _asset: &AssetInfo) -> anyhow::Result<FeeOptions> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.options.clone())
    }
}

pub struct MockRates(pub Decimal);

#[async_trait]
impl ExchangeRates for MockRates {
    async fn fiat_rate(&self, _asset: &AssetInfo, _fiat_currency: &str) -> anyhow::Result<Decimal> {
        Ok(self.0)
    }
}

#[derive(Default)]
pub struct MockCrashLogger {
    pub exceptions: Mutex<Vec<String>>,
}

impl CrashLogger for MockCrashLogger {
    fn log_event(&self, _message: &str) {}

    fn log_exception(&self, _error: &anyhow::Error, context: &str) {
        self.exceptions.lock().unwrap().push(context.to_string());
    }
}

// ---------------------------------------------------------------- environment

/// 一套完整的模拟环境
pub struct TestEnv {
    pub remote: Arc<MockRemoteConfig>,
    pub eth_ledger: Arc<MockLedger>,
    pub signer: Arc<MockSigner>,
    pub trading: Arc<MockTradingBalances>,
    pub custodial: Arc<MockCustodialWallet>,
    pub fees: Arc<MockFeeSource>,
    pub rates: Arc<MockRates>,
    pub preferences: Arc<InMemoryFeePreferences>,
    pub crash: Arc<MockCrashLogger>,
    pub custodial_sources: Vec<Arc<dyn ActiveAssetSource>>,
    pub token_sources: Vec<Arc<dyn ActiveAssetSource>>,
}

impl TestEnv {
    pub fn new() -> Self {
        Self::with_remote(MockRemoteConfig::with_json(FULL_FEATURES_JSON))
    }

    pub fn with_remote(remote: MockRemoteConfig) -> Self {
        Self {
            remote: Arc::new(remote),
            eth_ledger: Arc::new(MockLedger::new("ETH")),
            signer: Arc::new(MockSigner::default()),
            trading: Arc::new(MockTradingBalances::default()),
            custodial: Arc::new(MockCustodialWallet::default()),
            fees: Arc::new(MockFeeSource::default()),
            rates: Arc::new(MockRates(Decimal::new(2000, 0))),
            preferences: Arc::new(InMemoryFeePreferences::new()),
            crash: Arc::new(MockCrashLogger::default()),
            custodial_sources: Vec::new(),
            token_sources: Vec::new(),
        }
    }

    pub fn with_custodial_source(mut self, source: MockActiveSource) -> Self {
        self.custodial_sources.push(Arc::new(source));
        self
    }

    pub fn with_token_source(mut self, source: MockActiveSource) -> Self {
        self.token_sources.push(Arc::new(source));
        self
    }

    pub fn engine_deps(&self) -> OnChainEngineDeps {
        OnChainEngineDeps {
            ledger: self.eth_ledger.clone(),
            signer: self.signer.clone(),
            fee_source: self.fees.clone(),
            exchange_rates: self.rates.clone(),
            fee_preferences: self.preferences.clone(),
            fiat_currency: "USD".into(),
        }
    }

    pub fn deps(&self) -> CoincoreDeps {
        CoincoreDeps {
            remote_config: self.remote.clone(),
            chains: HashMap::from([(
                "ETH".to_string(),
                ChainBackend::new(self.eth_ledger.clone(), self.signer.clone()),
            )]),
            trading_balances: self.trading.clone(),
            custodial_wallet: self.custodial.clone(),
            fee_source: self.fees.clone(),
            exchange_rates: self.rates.clone(),
            fee_preferences: self.preferences.clone(),
            crash_logger: self.crash.clone(),
            custodial_activity_sources: self.custodial_sources.clone(),
            token_activity_sources: self.token_sources.clone(),
        }
    }
}
