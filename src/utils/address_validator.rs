//! 地址验证模块
//!
//! - 账户模型链（EVM）：0x + 40 hex，含大写字母时校验 EIP-55
//! - 托管资产外部地址：可配置正则（默认 `[a-zA-Z0-9]{15,}`）

use regex::Regex;

pub const DEFAULT_CUSTODIAL_ADDRESS_PATTERN: &str = "[a-zA-Z0-9]{15,}";

/// 地址验证器
pub struct AddressValidator;

impl AddressValidator {
    /// 验证EVM地址（支持EIP-55 Checksum）
    pub fn is_valid_evm_address(address: &str) -> bool {
        // 1. 基本格式检查
        let Some(hex_part) = address.strip_prefix("0x") else {
            return false;
        };

        if hex_part.len() != 40 {
            return false;
        }

        // 2. 验证hex字符
        if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
            return false;
        }

        // 3. 全小写或全大写视为无校验和
        let has_upper = hex_part.chars().any(|c| c.is_ascii_uppercase());
        let has_lower = hex_part.chars().any(|c| c.is_ascii_lowercase());
        if has_upper && has_lower {
            return Self::verify_eip55_checksum(hex_part);
        }

        true
    }

    /// 验证EIP-55 Checksum
    /// https://eips.ethereum.org/EIPS/eip-55
    fn verify_eip55_checksum(hex_part: &str) -> bool {
        use sha3::{Digest, Keccak256};

        let hash = Keccak256::digest(hex_part.to_lowercase().as_bytes());

        hex_part.chars().enumerate().all(|(i, ch)| {
            if !ch.is_ascii_alphabetic() {
                return true;
            }
            let hash_byte = hash[i / 2];
            let hash_nibble = if i % 2 == 0 {
                hash_byte >> 4
            } else {
                hash_byte & 0x0f
            };
            ch.is_ascii_uppercase() == (hash_nibble >= 8)
        })
    }

    /// 生成 EIP-55 校验和地址
    pub fn to_checksum_address(address: &str) -> Option<String> {
        use sha3::{Digest, Keccak256};

        let hex_part = address.strip_prefix("0x")?.to_lowercase();
        if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let hash = hex::encode(Keccak256::digest(hex_part.as_bytes()));
        let checksummed: String = hex_part
            .chars()
            .zip(hash.chars())
            .map(|(c, h)| {
                if c.is_ascii_alphabetic() && h.to_digit(16).unwrap_or(0) >= 8 {
                    c.to_ascii_uppercase()
                } else {
                    c
                }
            })
            .collect();
        Some(format!("0x{}", checksummed))
    }
}

/// 托管资产外部地址校验（整串匹配）
#[derive(Debug, Clone)]
pub struct CustodialAddressPattern {
    regex: Regex,
}

impl CustodialAddressPattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(&format!("^(?:{})$", pattern))?,
        })
    }

    pub fn is_valid(&self, address: &str) -> bool {
        self.regex.is_match(address)
    }
}
