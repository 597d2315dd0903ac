//! CryptoAsset：一个 AssetInfo 绑定至多一个托管账户和一个非托管账户

use std::sync::Arc;

use crate::{
    domain::{
        asset_action::ActionSet,
        asset_info::AssetRef,
        pending_tx::{AddressKind, ReceiveAddress},
        remote_feature::FeatureSet,
    },
    error::{AddressParseError, CoreError, CoreResult},
    service::{
        account::{CryptoAccount, CustodialTradingAccount, NonCustodialAccount},
        sources::OnChainLedger,
    },
    utils::address_validator::{AddressValidator, CustodialAddressPattern},
};

/// 外部地址解析规则
#[derive(Clone)]
pub enum AddressRules {
    /// 账户模型链：格式校验 + 代币转账时拒绝合约地址
    AccountBased {
        ledger: Arc<dyn OnChainLedger>,
        kind: AddressKind,
    },
    /// 托管资产：正则校验
    Custodial(CustodialAddressPattern),
}

pub struct CryptoAsset {
    info: AssetRef,
    features: FeatureSet,
    custodial: Option<Arc<CustodialTradingAccount>>,
    non_custodial: Option<Arc<NonCustodialAccount>>,
    address_rules: AddressRules,
}

impl CryptoAsset {
    pub fn new(
        info: AssetRef,
        features: FeatureSet,
        custodial: Option<Arc<CustodialTradingAccount>>,
        non_custodial: Option<Arc<NonCustodialAccount>>,
        address_rules: AddressRules,
    ) -> Self {
        Self {
            info,
            features,
            custodial,
            non_custodial,
            address_rules,
        }
    }

    pub fn info(&self) -> &AssetRef {
        &self.info
    }

    pub fn ticker(&self) -> &str {
        self.info.ticker()
    }

    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    pub fn custodial_account(&self) -> Option<&Arc<CustodialTradingAccount>> {
        self.custodial.as_ref()
    }

    pub fn non_custodial_account(&self) -> Option<&Arc<NonCustodialAccount>> {
        self.non_custodial.as_ref()
    }

    pub fn custodial_actions(&self) -> ActionSet {
        self.custodial
            .as_ref()
            .map(|a| a.actions().clone())
            .unwrap_or_default()
    }

    pub fn non_custodial_actions(&self) -> ActionSet {
        self.non_custodial
            .as_ref()
            .map(|a| a.actions().clone())
            .unwrap_or_default()
    }

    /// 全部账户，非托管在前
    pub fn accounts(&self) -> Vec<Arc<dyn CryptoAccount>> {
        let mut accounts: Vec<Arc<dyn CryptoAccount>> = Vec::new();
        if let Some(a) = &self.non_custodial {
            accounts.push(a.clone());
        }
        if let Some(a) = &self.custodial {
            accounts.push(a.clone());
        }
        accounts
    }

    /// 默认账户：优先非托管
    pub fn default_account(&self) -> Option<Arc<dyn CryptoAccount>> {
        self.accounts().into_iter().next()
    }

    /// 解析外部地址。格式无效返回 None；代币转账的合约地址返回错误。
    pub async fn parse_address(&self, address: &str, label: &str) -> CoreResult<Option<ReceiveAddress>> {
        let address = address.trim();
        match &self.address_rules {
            AddressRules::AccountBased { ledger, kind } => {
                if !AddressValidator::is_valid_evm_address(address) {
                    return Ok(None);
                }
                if *kind == AddressKind::Token {
                    let is_contract = ledger
                        .is_contract_address(address)
                        .await
                        .map_err(|e| AddressParseError::ContractCheckFailed(e.to_string()))?;
                    if is_contract {
                        tracing::warn!(asset = %self.info, address = %address, "Rejected contract address");
                        return Err(CoreError::AddressParse(
                            AddressParseError::UnexpectedContractAddress,
                        ));
                    }
                }
                Ok(Some(ReceiveAddress::new(self.info.clone(), address, label, *kind)))
            }
            AddressRules::Custodial(pattern) => Ok(pattern
                .is_valid(address)
                .then(|| ReceiveAddress::new(self.info.clone(), address, label, AddressKind::External))),
        }
    }
}
